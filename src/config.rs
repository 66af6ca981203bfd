//! Configuration types for transcript extraction and graduation audits.
//!
//! All audit behaviour is controlled through [`AuditConfig`], built via its
//! [`AuditConfigBuilder`]. The vocabulary (grade and category codes, language
//! markers) lives here rather than in the engine: transcripts from different
//! faculties spell the same curricular role differently, and the engine only
//! ever asks "is this code a failing grade?" or "which role does this
//! category code play?".
//!
//! Thresholds are deliberately *not* part of this struct. They are reference
//! data and come from the requirements file, see [`crate::config_file`].

use crate::error::GradError;
use crate::record::Language;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a transcript audit.
///
/// Built via [`AuditConfig::builder()`] or using [`AuditConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_gradcheck::{AuditConfig, ProfessionalElectivePolicy};
///
/// let config = AuditConfig::builder()
///     .elective_policy(ProfessionalElectivePolicy::NotMandatoryOrElective)
///     .max_rendered_pixels(2480)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AuditConfig {
    /// Grade, category and language-marker vocabulary.
    pub vocabulary: Vocabulary,

    /// Column mapping for the structured-table strategy.
    pub table: TableLayout,

    /// How professional-elective credits are recognised. Default: exact category.
    pub elective_policy: ProfessionalElectivePolicy,

    /// Longest edge, in pixels, of a page rasterised for OCR. Default: 2480.
    ///
    /// 2480 px is an A4 page at 300 DPI, the resolution Tesseract is tuned
    /// for. Vision models do fine with less; lower it to 1600 to cut tokens.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted transcripts.
    pub password: Option<String>,

    /// Run OCR even when the document has a text layer. Default: false.
    pub force_ocr: bool,

    /// Which OCR engine backs the last cascade strategy. Default: Tesseract.
    pub ocr_backend: OcrBackendKind,

    /// Settings for the Tesseract engine.
    pub tesseract: TesseractSettings,

    /// Settings for the vision-model engine.
    pub vision: VisionSettings,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            table: TableLayout::default(),
            elective_policy: ProfessionalElectivePolicy::default(),
            max_rendered_pixels: 2480,
            password: None,
            force_ocr: false,
            ocr_backend: OcrBackendKind::default(),
            tesseract: TesseractSettings::default(),
            vision: VisionSettings::default(),
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("vocabulary", &self.vocabulary)
            .field("table", &self.table)
            .field("elective_policy", &self.elective_policy)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("force_ocr", &self.force_ocr)
            .field("ocr_backend", &self.ocr_backend)
            .field("tesseract", &self.tesseract)
            .field("vision", &self.vision)
            .finish()
    }
}

impl AuditConfig {
    /// Create a new builder for `AuditConfig`.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AuditConfig`].
#[derive(Debug)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.config.vocabulary = vocabulary;
        self
    }

    pub fn table(mut self, layout: TableLayout) -> Self {
        self.config.table = layout;
        self
    }

    pub fn elective_policy(mut self, policy: ProfessionalElectivePolicy) -> Self {
        self.config.elective_policy = policy;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn force_ocr(mut self, v: bool) -> Self {
        self.config.force_ocr = v;
        self
    }

    pub fn ocr_backend(mut self, kind: OcrBackendKind) -> Self {
        self.config.ocr_backend = kind;
        self
    }

    pub fn tesseract(mut self, settings: TesseractSettings) -> Self {
        self.config.tesseract = settings;
        self
    }

    pub fn vision(mut self, settings: VisionSettings) -> Self {
        self.config.vision = settings;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditConfig, GradError> {
        let c = &self.config;
        if c.vocabulary.failing_grades.is_empty() {
            return Err(GradError::InvalidConfig(
                "at least one failing grade must be configured".into(),
            ));
        }
        if c.table.min_columns == 0 {
            return Err(GradError::InvalidConfig(
                "table min_columns must be ≥ 1".into(),
            ));
        }
        let widest = c.table.widest_required_column();
        if widest >= c.table.min_columns {
            return Err(GradError::InvalidConfig(format!(
                "table min_columns ({}) must exceed the highest mandatory column index ({})",
                c.table.min_columns, widest
            )));
        }
        if let ProfessionalElectivePolicy::CodePrefix(prefixes) = &c.elective_policy {
            if prefixes.iter().all(|p| p.trim().is_empty()) {
                return Err(GradError::InvalidConfig(
                    "code-prefix elective policy needs at least one prefix".into(),
                ));
            }
        }
        if c.vision.temperature.is_nan() {
            return Err(GradError::InvalidConfig("temperature must be a number".into()));
        }
        Ok(self.config)
    }
}

// ── Vocabulary ───────────────────────────────────────────────────────────

/// Curricular role of a category code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryRole {
    Mandatory,
    Elective,
    ProfessionalElective,
    Unclassified,
}

/// Closed vocabularies for grades and categories, plus language markers.
///
/// Codes are compared after trimming and upper-casing, so `"ms"` and `"MS"`
/// are the same category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Every passing grade code a transcript may carry.
    pub grades: Vec<String>,
    /// Grade codes that denote failure. Always accepted as grades.
    pub failing_grades: Vec<String>,
    pub mandatory: Vec<String>,
    pub elective: Vec<String>,
    pub professional_elective: Vec<String>,
    pub unclassified: Vec<String>,
    /// Title substrings that mark a foreign-language course.
    pub language_markers: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        fn owned(xs: &[&str]) -> Vec<String> {
            xs.iter().map(|s| s.to_string()).collect()
        }
        Self {
            grades: owned(&[
                "AA", "BA", "BB", "CB", "CC", "DC", "DD", "FD", "YT", "G", "M", "EX", "P",
            ]),
            failing_grades: owned(&["FF", "DZ"]),
            mandatory: owned(&["Z", "MANDATORY"]),
            elective: owned(&["S", "ELECTIVE"]),
            professional_elective: owned(&["MS", "PROFESSIONAL-ELECTIVE"]),
            unclassified: owned(&["ÜS", "US", "UNCLASSIFIED"]),
            language_markers: owned(&["(İng)", "(İNG)", "(Ing)", "(ING)", "(Eng)", "(ENG)", "(EN)"]),
        }
    }
}

fn normalise_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn contains_code(list: &[String], code: &str) -> bool {
    list.iter().any(|c| normalise_code(c) == code)
}

impl Vocabulary {
    /// Normalised grade code if it belongs to the vocabulary.
    pub fn grade(&self, raw: &str) -> Option<String> {
        let code = normalise_code(raw);
        (contains_code(&self.grades, &code) || contains_code(&self.failing_grades, &code))
            .then_some(code)
    }

    /// Normalised category code if it belongs to the vocabulary.
    pub fn category(&self, raw: &str) -> Option<String> {
        let code = normalise_code(raw);
        self.role_of(&code).map(|_| code)
    }

    pub fn is_failing(&self, grade: &str) -> bool {
        contains_code(&self.failing_grades, &normalise_code(grade))
    }

    pub fn role_of(&self, category: &str) -> Option<CategoryRole> {
        let code = normalise_code(category);
        if contains_code(&self.mandatory, &code) {
            Some(CategoryRole::Mandatory)
        } else if contains_code(&self.elective, &code) {
            Some(CategoryRole::Elective)
        } else if contains_code(&self.professional_elective, &code) {
            Some(CategoryRole::ProfessionalElective)
        } else if contains_code(&self.unclassified, &code) {
            Some(CategoryRole::Unclassified)
        } else {
            None
        }
    }

    pub fn language_of(&self, title: &str) -> Language {
        Language::from_title(title, &self.language_markers)
    }
}

// ── Classification policy ────────────────────────────────────────────────

/// Which records count towards the professional-elective aggregate.
///
/// Transcripts in the wild disagree on this, so the rule is a policy rather
/// than a constant:
///
/// | Policy | Counts a passed record when… |
/// |--------|------------------------------|
/// | `ExactCategory` | its category role is professional elective (default) |
/// | `NotMandatoryOrElective` | its role is neither mandatory nor elective |
/// | `CodePrefix` | its code starts with a listed prefix and it is not mandatory |
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfessionalElectivePolicy {
    #[default]
    ExactCategory,
    NotMandatoryOrElective,
    CodePrefix(Vec<String>),
}

// ── Table layout ─────────────────────────────────────────────────────────

/// Fixed column positions (0-indexed) of a transcript table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub code: usize,
    pub title: usize,
    pub credit: usize,
    pub grade: usize,
    pub category: usize,
    /// Optional columns naming the course(s) that superseded this one.
    pub substitutes: Vec<usize>,
    /// Rows with fewer cells are not course rows.
    pub min_columns: usize,
    /// Max vertical distance (points) between segment centres on one row.
    pub row_tolerance: f32,
    /// Min horizontal gap (points) that separates two cells.
    pub column_gap: f32,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            code: 0,
            title: 1,
            credit: 2,
            grade: 3,
            category: 4,
            substitutes: vec![5, 6],
            min_columns: 5,
            row_tolerance: 3.0,
            column_gap: 8.0,
        }
    }
}

impl TableLayout {
    pub(crate) fn widest_required_column(&self) -> usize {
        [self.code, self.title, self.credit, self.grade, self.category]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

// ── OCR settings ─────────────────────────────────────────────────────────

/// OCR backend for the last cascade strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrBackendKind {
    /// Local `tesseract` binary. (default)
    #[default]
    Tesseract,
    /// Vision language model through edgequake-llm.
    Vision,
    /// Skip OCR; scanned transcripts yield nothing.
    Disabled,
}

/// Settings for the Tesseract engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractSettings {
    /// Binary name or absolute path. Default: `tesseract`.
    pub binary: String,
    /// Tesseract language pack(s). Default: `tur+eng`.
    pub language: String,
    /// Page segmentation mode. Default: 6 (single uniform block of text),
    /// which keeps table rows on one line.
    pub psm: u8,
}

impl Default for TesseractSettings {
    fn default() -> Self {
        Self {
            binary: "tesseract".into(),
            language: "tur+eng".into(),
            psm: 6,
        }
    }
}

/// Settings for the vision-model engine.
#[derive(Clone)]
pub struct VisionSettings {
    /// LLM model identifier. If None, uses `gpt-4.1-nano`.
    pub model: Option<String>,
    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,
    /// Sampling temperature. Default: 0.0; transcription wants no creativity.
    pub temperature: f32,
    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,
    /// Retries on a transient provider failure. Default: 3.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,
    /// Custom transcription prompt. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for VisionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionSettings")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_normalises_codes() {
        let v = Vocabulary::default();
        assert_eq!(v.grade(" aa "), Some("AA".into()));
        assert_eq!(v.grade("ff"), Some("FF".into()));
        assert_eq!(v.grade("Q+"), None);
        assert_eq!(v.category("ms"), Some("MS".into()));
        assert_eq!(v.category("XX"), None);
        assert_eq!(v.role_of("mandatory"), Some(CategoryRole::Mandatory));
        assert!(v.is_failing("DZ"));
        assert!(!v.is_failing("DD"));
    }

    #[test]
    fn failing_grades_are_accepted_even_if_not_listed_as_grades() {
        let v = Vocabulary {
            grades: vec!["AA".into()],
            ..Vocabulary::default()
        };
        assert_eq!(v.grade("DZ"), Some("DZ".into()));
    }

    #[test]
    fn builder_rejects_empty_failure_set() {
        let vocab = Vocabulary {
            failing_grades: vec![],
            ..Vocabulary::default()
        };
        let err = AuditConfig::builder().vocabulary(vocab).build().unwrap_err();
        assert!(err.to_string().contains("failing grade"));
    }

    #[test]
    fn builder_rejects_layout_narrower_than_its_columns() {
        let layout = TableLayout {
            category: 6,
            min_columns: 5,
            ..TableLayout::default()
        };
        assert!(AuditConfig::builder().table(layout).build().is_err());
    }

    #[test]
    fn builder_rejects_blank_prefix_policy() {
        let policy = ProfessionalElectivePolicy::CodePrefix(vec![" ".into()]);
        assert!(AuditConfig::builder().elective_policy(policy).build().is_err());
    }

    #[test]
    fn builder_clamps_pixels() {
        let c = AuditConfig::builder().max_rendered_pixels(3).build().unwrap();
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn debug_redacts_password() {
        let c = AuditConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }
}
