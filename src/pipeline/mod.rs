//! Pipeline stages that turn a transcript PDF into text the extraction
//! strategies can parse.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──┬──▶ text layer ─────────────────────────▶ table / line strategies
//! (path)   (pdfium)  └──▶ rasterise ──▶ ocr | encode+llm ──▶ postprocess ──▶ OCR strategy
//! ```
//!
//! 1. [`input`]: validate the path and the `%PDF` magic bytes
//! 2. [`render`]: read the text layer at open time; rasterise pages only
//!    when OCR is reached
//! 3. [`ocr`]: the [`ocr::OcrEngine`] seam and the Tesseract engine
//! 4. [`encode`]: PNG (and base64 for the vision engine)
//! 5. [`llm`]: vision-model engine with retry/backoff; the only stage
//!    with network I/O
//! 6. [`postprocess`]: deterministic cleanup of OCR text

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod render;
