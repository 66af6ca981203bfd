//! CLI binary for edgequake-gradcheck.
//!
//! A thin shim over the library crate: loads the requirements file and
//! reference workbooks, maps CLI flags onto `AuditConfig`, and prints the
//! audit report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_gradcheck::{
    audit_file, inspect, AuditConfig, AuditReport, Catalog, OcrBackendKind,
    ProfessionalElectivePolicy, RequirementsFile,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Audit a transcript (plain-text summary on stdout)
  gradcheck transcript.pdf --requirements requirements.toml \
      --required required.xlsx --substitutions substitutions.xlsx

  # JSON report written to a file
  gradcheck transcript.pdf --json -o report.json

  # Scanned transcript, OCR through a vision model
  gradcheck scan.pdf --ocr vision --provider openai --model gpt-4.1-mini

  # Count every non-mandatory, non-elective course as professional elective
  gradcheck transcript.pdf --elective-policy permissive

  # Inspect PDF metadata and text-layer presence only
  gradcheck --inspect-only transcript.pdf

REQUIREMENTS FILE (TOML):
  [[requirement]]
  metric = "total"                  # total | foreign-language | elective | professional-elective
  min_credits = 240                 # or: min_courses = 2

  [classification]
  professional_elective = "prefix"  # exact | permissive | prefix
  prefixes = ["BIL"]

EXIT STATUS:
  0  every threshold met and no required course missing
  2  not eligible (gap report or missing required courses)
  1  fatal error (unreadable input, missing reference data, ...)

ENVIRONMENT VARIABLES:
  GRADCHECK_REQUIREMENTS  Requirements file path
  GRADCHECK_REQUIRED      Required-course workbook path
  GRADCHECK_SUBSTITUTIONS Substitution catalog workbook path
  OPENAI_API_KEY          OpenAI API key (vision OCR)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Audit a transcript PDF against graduation requirements.
#[derive(Parser, Debug)]
#[command(
    name = "gradcheck",
    version,
    about = "Audit a transcript PDF against graduation requirements",
    long_about = "Extract the course list from a university transcript PDF (structured table, \
text lines, or OCR for scans), sum credits per category, and report every unmet graduation \
threshold together with catalog alternatives for failed courses.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Transcript PDF.
    input: PathBuf,

    /// Requirements file (TOML) with the graduation thresholds.
    #[arg(long, env = "GRADCHECK_REQUIREMENTS", default_value = "requirements.toml")]
    requirements: PathBuf,

    /// Workbook listing the required course codes.
    #[arg(long, env = "GRADCHECK_REQUIRED", default_value = "required.xlsx")]
    required: PathBuf,

    /// Workbook with the substitution catalog.
    #[arg(long, env = "GRADCHECK_SUBSTITUTIONS", default_value = "substitutions.xlsx")]
    substitutions: PathBuf,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "GRADCHECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the structured report as JSON.
    #[arg(long, env = "GRADCHECK_JSON")]
    json: bool,

    /// OCR engine for scanned transcripts.
    #[arg(long, env = "GRADCHECK_OCR", value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// Run OCR even when the PDF has a text layer.
    #[arg(long, env = "GRADCHECK_FORCE_OCR")]
    force_ocr: bool,

    /// Tesseract language pack(s), e.g. tur+eng.
    #[arg(long, env = "GRADCHECK_OCR_LANGUAGE")]
    ocr_language: Option<String>,

    /// Tesseract binary name or path.
    #[arg(long, env = "GRADCHECK_TESSERACT_BIN")]
    tesseract_bin: Option<String>,

    /// Longest edge in pixels of a page rasterised for OCR.
    #[arg(long, env = "GRADCHECK_MAX_PIXELS",
          value_parser = clap::value_parser!(u32).range(100..=10000))]
    max_pixels: Option<u32>,

    /// LLM provider for `--ocr vision`: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model for `--ocr vision` (default gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Professional-elective rule: exact, permissive, prefix.
    #[arg(long, env = "GRADCHECK_ELECTIVE_POLICY", value_enum)]
    elective_policy: Option<PolicyArg>,

    /// Code prefix counted as professional elective (with `--elective-policy prefix`).
    #[arg(long = "elective-prefix", value_delimiter = ',')]
    elective_prefixes: Vec<String>,

    /// PDF user password for encrypted transcripts.
    #[arg(long, env = "GRADCHECK_PASSWORD")]
    password: Option<String>,

    /// Print PDF metadata only, no audit.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRADCHECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report.
    #[arg(short, long, env = "GRADCHECK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
    None,
}

impl From<OcrArg> for OcrBackendKind {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrBackendKind::Tesseract,
            OcrArg::Vision => OcrBackendKind::Vision,
            OcrArg::None => OcrBackendKind::Disabled,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Exact,
    Permissive,
    Prefix,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Text layer:   {}", if meta.has_text_layer { "yes" } else { "no (OCR needed)" });
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Reference data ───────────────────────────────────────────────────
    let requirements =
        RequirementsFile::load(&cli.requirements).context("Failed to load requirements")?;
    let thresholds = requirements
        .thresholds()
        .map_err(anyhow::Error::msg)
        .context("Invalid requirements")?;
    let catalog = Catalog::from_workbooks(
        &cli.required,
        &cli.substitutions,
        &requirements.reference_columns(),
    )
    .context("Failed to load reference data")?;

    let config = build_config(&cli, &requirements)?;

    // ── Run audit ────────────────────────────────────────────────────────
    let start = Instant::now();
    let report = audit_file(&cli.input, &thresholds, &catalog, &config).context("Audit failed")?;

    if let Some(ref output_path) = cli.output {
        report
            .write_to(output_path, cli.json)
            .context("Failed to write report")?;
    } else {
        let body = if cli.json {
            report.to_json().context("Failed to serialise report")?
        } else {
            report.to_text()
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(body.as_bytes())
            .context("Failed to write to stdout")?;
        if !body.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        print_summary(&report, &cli, start);
    }

    Ok(if report.is_eligible() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// One status line on stderr.
fn print_summary(report: &AuditReport, cli: &Cli, start: Instant) {
    let verdict = if report.is_eligible() {
        green("✔ eligible")
    } else {
        red("✘ not eligible")
    };
    let strategy = report
        .extraction
        .strategy
        .clone()
        .unwrap_or_else(|| "none".to_string());
    let target = cli
        .output
        .as_ref()
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{verdict}  {} records via {}  {} gaps  {}{target}",
        report.extraction.record_count,
        strategy,
        report.gaps.len(),
        dim(&format!("{}ms", start.elapsed().as_millis())),
    );
}

/// Map the requirements file and CLI args to `AuditConfig`.
fn build_config(cli: &Cli, requirements: &RequirementsFile) -> Result<AuditConfig> {
    let mut builder = requirements
        .apply(AuditConfig::builder())
        .ocr_backend(cli.ocr.into())
        .force_ocr(cli.force_ocr);

    if let Some(policy) = elective_policy(cli)? {
        builder = builder.elective_policy(policy);
    }
    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Per-engine settings without builder setters of their own.
    if let Some(ref lang) = cli.ocr_language {
        config.tesseract.language = lang.clone();
    }
    if let Some(ref bin) = cli.tesseract_bin {
        config.tesseract.binary = bin.clone();
    }
    config.vision.model = cli.model.clone();
    config.vision.provider_name = cli.provider.clone();

    Ok(config)
}

/// Parse `--elective-policy` / `--elective-prefix` into a policy override.
fn elective_policy(cli: &Cli) -> Result<Option<ProfessionalElectivePolicy>> {
    let prefixes: Vec<String> = cli
        .elective_prefixes
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    match cli.elective_policy {
        None if prefixes.is_empty() => Ok(None),
        None | Some(PolicyArg::Prefix) => {
            if prefixes.is_empty() {
                bail!("--elective-policy prefix needs at least one --elective-prefix");
            }
            Ok(Some(ProfessionalElectivePolicy::CodePrefix(prefixes)))
        }
        Some(PolicyArg::Exact) => Ok(Some(ProfessionalElectivePolicy::ExactCategory)),
        Some(PolicyArg::Permissive) => Ok(Some(ProfessionalElectivePolicy::NotMandatoryOrElective)),
    }
}
