//! OCR engines: turn a rasterised page into plain text.
//!
//! The OCR strategy only knows the [`OcrEngine`] trait. Two engines ship:
//!
//! * [`TesseractOcr`], the default: shells out to a local `tesseract`
//!   binary. No network, deterministic for a given binary and language pack.
//! * [`crate::pipeline::llm::VisionOcr`]: a vision model through
//!   edgequake-llm, for transcripts Tesseract reads poorly.
//!
//! Engines return raw text. Cleanup happens in
//! [`crate::pipeline::postprocess`], row parsing in the line-pattern strategy.

use crate::config::TesseractSettings;
use crate::error::{GradError, PageError};
use crate::pipeline::encode::{for_tesseract, png_bytes};
use image::DynamicImage;
use std::process::{Command, Stdio};
use tracing::debug;

/// Recognises the text on one page image.
pub trait OcrEngine: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Fail fast when the engine cannot run at all. Called once per
    /// document, before any page is rasterised.
    fn check(&self) -> Result<(), GradError> {
        Ok(())
    }

    /// Recognise `image`, which is page `page_num` (1-indexed).
    fn recognise(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError>;
}

/// Tesseract invoked as `tesseract <png> stdout -l <lang> --psm <n>`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    settings: TesseractSettings,
}

impl TesseractOcr {
    pub fn new(settings: TesseractSettings) -> Self {
        Self { settings }
    }

    fn failed(page: usize, detail: impl Into<String>) -> PageError {
        PageError::OcrFailed {
            page,
            retries: 0,
            detail: detail.into(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn check(&self) -> Result<(), GradError> {
        if command_available(&self.settings.binary) {
            return Ok(());
        }
        Err(GradError::OcrUnavailable {
            engine: "tesseract".into(),
            hint: format!(
                "'{}' was not found or did not run. Install Tesseract with the '{}' \
                 language data, or pass --ocr none.",
                self.settings.binary, self.settings.language
            ),
        })
    }

    fn recognise(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        let png = png_bytes(&for_tesseract(image))
            .map_err(|e| Self::failed(page_num, format!("PNG encoding failed: {e}")))?;

        let dir = tempfile::tempdir()
            .map_err(|e| Self::failed(page_num, format!("temp dir: {e}")))?;
        let path = dir.path().join(format!("page-{page_num}.png"));
        std::fs::write(&path, &png)
            .map_err(|e| Self::failed(page_num, format!("temp file: {e}")))?;

        let psm = self.settings.psm.to_string();
        let output = Command::new(&self.settings.binary)
            .arg(&path)
            .arg("stdout")
            .args(["-l", self.settings.language.as_str()])
            .args(["--psm", psm.as_str()])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::failed(page_num, format!("could not run tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::failed(
                page_num,
                format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: tesseract returned {} chars", page_num, text.len());
        Ok(text)
    }
}

fn command_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
