//! # edgequake-gradcheck
//!
//! Read a university transcript PDF, recover the course list, and check it
//! against graduation requirements.
//!
//! ## Why a cascade?
//!
//! Transcripts come in three qualities: PDFs whose text runs line up in a
//! proper table, PDFs whose text only survives as lines, and scans with no
//! text layer at all. Each quality has a strategy, and the strategies are
//! tried from the most structured to the most tolerant. The first one that
//! produces records wins.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path and %PDF magic
//!  ├─ 2. Open      pdfium text layer (segments with bounding boxes)
//!  ├─ 3. Extract   table ─▶ line pattern ─▶ OCR (tesseract | vision model)
//!  ├─ 4. Evaluate  passed/failed, four credit aggregates, gap report
//!  ├─ 5. Resolve   catalog substitutes for failed courses
//!  └─ 6. Report    AuditReport (text or JSON)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_gradcheck::{audit_file, AuditConfig, Catalog, ReferenceColumns, RequirementsFile};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let requirements = RequirementsFile::load(Path::new("requirements.toml"))?;
//!     let catalog = Catalog::from_workbooks(
//!         Path::new("required.xlsx"),
//!         Path::new("substitutions.xlsx"),
//!         &requirements.reference_columns(),
//!     )?;
//!     let config = requirements.apply(AuditConfig::builder()).build()?;
//!     let thresholds = requirements.thresholds()?;
//!
//!     let report = audit_file("transcript.pdf", &thresholds, &catalog, &config)?;
//!     for gap in &report.gap_report {
//!         println!("{gap}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gradcheck` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod config;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod reference;
pub mod substitution;
pub mod thresholds;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{audit_bytes, audit_document, audit_file, audit_with, inspect, ocr_engine};
pub use config::{
    AuditConfig, AuditConfigBuilder, CategoryRole, OcrBackendKind, ProfessionalElectivePolicy,
    TableLayout, TesseractSettings, VisionSettings, Vocabulary,
};
pub use config_file::RequirementsFile;
pub use engine::{Aggregates, Evaluation, FailedCourse, GapEntry, RuleEngine, Tally, Unit};
pub use error::{GradError, PageError};
pub use extract::{
    Cascade, CascadeOutcome, ExtractionStrategy, LinePatternStrategy, OcrStrategy, RowRejection,
    StrategyAttempt, StrategyYield, TableStrategy,
};
pub use output::{AuditReport, DocumentMetadata, ExtractionSummary};
pub use pipeline::ocr::{OcrEngine, TesseractOcr};
pub use pipeline::llm::VisionOcr;
pub use pipeline::render::{PageText, PdfTranscript, TextFragment, TextTranscript, TranscriptSource};
pub use record::{parse_credit, CourseRecord, Language};
pub use reference::{Catalog, CatalogEntry, ReferenceColumns, ReferenceData, Substitute};
pub use substitution::resolve;
pub use thresholds::{Metric, Minimum, Requirement, Thresholds};
