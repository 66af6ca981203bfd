//! Audit entry points: transcript in, [`AuditReport`] out.
//!
//! ```text
//! bytes ─▶ PdfTranscript ─▶ Cascade ─▶ records ─▶ RuleEngine ─▶ gaps, failed
//!                                                     │              │
//!                                         required codes      substitution::resolve
//! ```
//!
//! Everything here is synchronous. Reference data and thresholds are passed
//! in already loaded; a missing dataset has failed before an audit starts.

use crate::config::{AuditConfig, OcrBackendKind};
use crate::engine::RuleEngine;
use crate::error::GradError;
use crate::extract::Cascade;
use crate::output::{AuditReport, DocumentMetadata};
use crate::pipeline::input;
use crate::pipeline::llm::VisionOcr;
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::render::{PdfTranscript, TranscriptSource};
use crate::reference::ReferenceData;
use crate::substitution;
use crate::thresholds::Thresholds;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Audit a transcript PDF on disk.
///
/// # Errors
/// Only for fatal conditions: unreadable or non-PDF input, a wrong or
/// missing password, pdfium unavailable, empty thresholds, or a vision
/// provider that cannot be configured. An unreadable *layout* is not an
/// error; it yields a report whose extraction summary is exhausted.
pub fn audit_file(
    path: impl AsRef<Path>,
    thresholds: &Thresholds,
    reference: &dyn ReferenceData,
    config: &AuditConfig,
) -> Result<AuditReport, GradError> {
    let path = path.as_ref();
    info!("Auditing transcript: {}", path.display());
    let bytes = input::read_transcript(path)?;
    let doc = PdfTranscript::open(bytes, path, config.password.as_deref())?;
    audit_document(&doc, thresholds, reference, config)
}

/// Audit a transcript PDF held in memory.
pub fn audit_bytes(
    bytes: Vec<u8>,
    thresholds: &Thresholds,
    reference: &dyn ReferenceData,
    config: &AuditConfig,
) -> Result<AuditReport, GradError> {
    let label = Path::new("<memory>");
    input::check_pdf_bytes(&bytes, label)?;
    let doc = PdfTranscript::open(bytes, label, config.password.as_deref())?;
    audit_document(&doc, thresholds, reference, config)
}

/// Audit any [`TranscriptSource`] with the standard cascade.
pub fn audit_document(
    doc: &dyn TranscriptSource,
    thresholds: &Thresholds,
    reference: &dyn ReferenceData,
    config: &AuditConfig,
) -> Result<AuditReport, GradError> {
    let cascade = Cascade::standard(config, ocr_engine(config)?);
    audit_with(doc, &cascade, thresholds, reference, config)
}

/// Audit with a caller-assembled cascade.
pub fn audit_with(
    doc: &dyn TranscriptSource,
    cascade: &Cascade,
    thresholds: &Thresholds,
    reference: &dyn ReferenceData,
    config: &AuditConfig,
) -> Result<AuditReport, GradError> {
    if thresholds.is_empty() {
        return Err(GradError::InvalidConfig(
            "no graduation thresholds; refusing to evaluate".into(),
        ));
    }
    let start = Instant::now();

    let outcome = cascade.extract(doc);

    let engine = RuleEngine::from_config(config);
    let evaluation = engine.evaluate(&outcome.records, thresholds);
    let missing = if outcome.records.is_empty() {
        Vec::new()
    } else {
        engine.missing_required(&outcome.records, reference.required_course_codes())
    };
    let substitutions = substitution::resolve(&evaluation.failed, reference);

    info!(
        "Audit finished in {:?}: {} records, {} gaps, {} failed, {} missing required",
        start.elapsed(),
        outcome.records.len(),
        evaluation.gaps.len(),
        evaluation.failed.len(),
        missing.len()
    );

    Ok(AuditReport::new(outcome, evaluation, missing, substitutions))
}

/// The OCR engine `config` asks for, or `None` when OCR is disabled.
pub fn ocr_engine(config: &AuditConfig) -> Result<Option<Arc<dyn OcrEngine>>, GradError> {
    let engine: Arc<dyn OcrEngine> = match config.ocr_backend {
        OcrBackendKind::Disabled => return Ok(None),
        OcrBackendKind::Tesseract => Arc::new(TesseractOcr::new(config.tesseract.clone())),
        OcrBackendKind::Vision => Arc::new(VisionOcr::from_settings(&config.vision)?),
    };
    Ok(Some(engine))
}

/// Read PDF metadata and text-layer presence without auditing.
pub fn inspect(path: impl AsRef<Path>, password: Option<&str>) -> Result<DocumentMetadata, GradError> {
    let path = path.as_ref();
    let bytes = input::read_transcript(path)?;
    let doc = PdfTranscript::open(bytes, path, password)?;
    Ok(doc.metadata().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::TextTranscript;
    use crate::reference::Catalog;
    use crate::thresholds::{Metric, Requirement};

    #[test]
    fn empty_thresholds_are_refused() {
        let doc = TextTranscript::from_text(["MAT101 Calculus 6,0 AA Z"]);
        let err = audit_document(
            &doc,
            &Thresholds::default(),
            &Catalog::default(),
            &AuditConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GradError::InvalidConfig(_)));
    }

    #[test]
    fn disabled_ocr_has_no_engine() {
        let config = AuditConfig::builder()
            .ocr_backend(OcrBackendKind::Disabled)
            .build()
            .unwrap();
        assert!(ocr_engine(&config).unwrap().is_none());
    }

    #[test]
    fn exhausted_extraction_reports_single_diagnostic() {
        let config = AuditConfig::builder()
            .ocr_backend(OcrBackendKind::Disabled)
            .build()
            .unwrap();
        let thresholds = Thresholds::new(vec![Requirement::credits(Metric::Total, 240.0)]);
        let catalog = Catalog::new(vec!["MAT101".to_string()], vec![]);
        let report = audit_document(
            &TextTranscript::from_text(["Transcript of records"]),
            &thresholds,
            &catalog,
            &config,
        )
        .unwrap();

        assert!(report.extraction.exhausted);
        assert_eq!(report.gap_report.len(), 1);
        assert!(report.missing_required.is_empty());
        assert!(!report.is_eligible());
    }
}
