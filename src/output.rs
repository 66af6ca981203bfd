//! Output types returned by the audit entry points.

use crate::engine::{Aggregates, Evaluation, FailedCourse, GapEntry};
use crate::error::GradError;
use crate::extract::{CascadeOutcome, StrategyAttempt};
use crate::record::CourseRecord;
use crate::reference::Substitute;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// PDF metadata, read without evaluating anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// True when at least one page has extractable text; false means only
    /// OCR can read it.
    pub has_text_layer: bool,
}

/// How the records were obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Strategy that produced the records.
    pub strategy: Option<String>,
    /// Every strategy ran and none produced a record. Distinguishes an
    /// unreadable document from a transcript that lists no courses.
    pub exhausted: bool,
    pub record_count: usize,
    pub attempts: Vec<StrategyAttempt>,
}

impl From<&CascadeOutcome> for ExtractionSummary {
    fn from(outcome: &CascadeOutcome) -> Self {
        Self {
            strategy: outcome.strategy.map(str::to_string),
            exhausted: outcome.is_exhausted(),
            record_count: outcome.records.len(),
            attempts: outcome.attempts.clone(),
        }
    }
}

/// The full result of auditing one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub extraction: ExtractionSummary,
    pub records: Vec<CourseRecord>,
    pub aggregates: Aggregates,
    /// Structured Gap Report entries, in requirement order.
    pub gaps: Vec<GapEntry>,
    /// The same entries rendered as sentences.
    pub gap_report: Vec<String>,
    pub failed_courses: Vec<FailedCourse>,
    /// Required codes with no passing record, sorted.
    pub missing_required: Vec<String>,
    /// Failed code → catalog alternatives. Codes without alternatives are absent.
    pub substitutions: BTreeMap<String, Vec<Substitute>>,
}

impl AuditReport {
    pub fn new(
        outcome: CascadeOutcome,
        evaluation: Evaluation,
        missing_required: Vec<String>,
        substitutions: BTreeMap<String, Vec<Substitute>>,
    ) -> Self {
        let extraction = ExtractionSummary::from(&outcome);
        let gap_report = evaluation.gap_messages();
        Self {
            extraction,
            records: outcome.records,
            aggregates: evaluation.aggregates,
            gaps: evaluation.gaps,
            gap_report,
            failed_courses: evaluation.failed,
            missing_required,
            substitutions,
        }
    }

    /// Every threshold met and no required course missing.
    pub fn is_eligible(&self) -> bool {
        self.gaps.is_empty() && self.missing_required.is_empty()
    }

    pub fn to_json(&self) -> Result<String, GradError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GradError::Internal(format!("JSON serialisation failed: {e}")))
    }

    /// Plain-text summary for terminals.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let a = &self.aggregates;
        let _ = writeln!(
            s,
            "Extraction: {} ({} records)",
            self.extraction.strategy.as_deref().unwrap_or("exhausted"),
            self.extraction.record_count
        );
        let _ = writeln!(s, "\nCredits");
        for (label, tally) in [
            ("total", a.total),
            ("foreign-language", a.foreign_language),
            ("elective", a.elective),
            ("professional-elective", a.professional_elective),
        ] {
            let _ = writeln!(
                s,
                "  {label:<22} {:>7} ({} courses)",
                tally.credits, tally.courses
            );
        }

        let _ = writeln!(s, "\nGaps");
        if self.gap_report.is_empty() {
            let _ = writeln!(s, "  none");
        }
        for gap in &self.gap_report {
            let _ = writeln!(s, "  - {gap}");
        }

        if !self.missing_required.is_empty() {
            let _ = writeln!(s, "\nMissing required courses");
            let _ = writeln!(s, "  {}", self.missing_required.join(", "));
        }

        if !self.failed_courses.is_empty() {
            let _ = writeln!(s, "\nFailed courses");
            for f in &self.failed_courses {
                let _ = writeln!(s, "  {} {} ({})", f.code, f.title, f.grade);
                if let Some(subs) = self.substitutions.get(&f.code) {
                    for sub in subs {
                        let _ = writeln!(s, "      alternative: {} {}", sub.code, sub.title);
                    }
                }
            }
        }

        let _ = writeln!(
            s,
            "\nResult: {}",
            if self.is_eligible() {
                "eligible to graduate"
            } else {
                "not eligible"
            }
        );
        s
    }

    /// Write the report (JSON or text) using an atomic temp-file + rename.
    pub fn write_to(&self, path: &Path, json: bool) -> Result<(), GradError> {
        let body = if json { self.to_json()? } else { self.to_text() };
        let write_err = |source| GradError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, body).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;
        Ok(())
    }
}
