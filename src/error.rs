//! Error types for the edgequake-gradcheck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`GradError`] is **fatal**: the audit cannot proceed at all (bad input
//!   file, wrong password, reference data absent, requirements file broken).
//!   Returned as `Err(GradError)` from the top-level `audit*` functions.
//!
//! * [`PageError`] is **non-fatal**: a single page could not be rendered or
//!   recognised, but the rest of the document is fine. Collected into the
//!   extraction diagnostics so callers can see why the yield is small.
//!
//! Row-level parse failures are cheaper still: they are
//! [`crate::extract::RowRejection`] values, logged and skipped.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-gradcheck library.
#[derive(Debug, Error)]
pub enum GradError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Transcript file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Reference data errors ─────────────────────────────────────────────
    /// A reference dataset (required courses, substitution catalog) is absent.
    #[error("Reference data '{what}' not found at '{path}'")]
    ReferenceDataMissing { what: &'static str, path: PathBuf },

    /// A reference dataset was found but could not be read.
    #[error("Reference data '{path}' is unreadable: {detail}")]
    ReferenceDataInvalid { path: PathBuf, detail: String },

    /// The requirements (thresholds) file is absent or malformed.
    #[error("Requirements file '{path}' is invalid: {detail}")]
    InvalidRequirements { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The configured OCR engine cannot run on this machine.
    #[error("OCR engine '{engine}' is unavailable.\n{hint}")]
    OcrUnavailable { engine: String, hint: String },

    /// The configured vision provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Text layer could not be read.
    #[error("Page {page}: text layer unreadable: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// OCR engine failed on the page (after retries, where the engine retries).
    #[error("Page {page}: OCR failed after {retries} retries: {detail}")]
    OcrFailed {
        page: usize,
        retries: u8,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_missing_names_dataset() {
        let e = GradError::ReferenceDataMissing {
            what: "substitution catalog",
            path: PathBuf::from("/data/subs.xlsx"),
        };
        let msg = e.to_string();
        assert!(msg.contains("substitution catalog"), "got: {msg}");
        assert!(msg.contains("subs.xlsx"), "got: {msg}");
    }

    #[test]
    fn ocr_failed_display() {
        let e = PageError::OcrFailed {
            page: 3,
            retries: 2,
            detail: "timeout".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn render_failure_is_page_level() {
        let e = PageError::RenderFailed {
            page: 4,
            detail: "bitmap allocation failed".into(),
        };
        assert_eq!(
            e.to_string(),
            "Page 4: rasterisation failed: bitmap allocation failed"
        );
    }

    #[test]
    fn ocr_unavailable_carries_hint() {
        let e = GradError::OcrUnavailable {
            engine: "tesseract".into(),
            hint: "install tesseract-ocr".into(),
        };
        assert!(e.to_string().contains("install tesseract-ocr"));
    }
}
