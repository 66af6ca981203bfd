//! Optical-recognition strategy: rasterise, recognise, clean, then apply the
//! line pattern.
//!
//! Runs only on documents without a text layer (unless forced). Page-level
//! failures shrink the yield but never fail the strategy; only an engine
//! that cannot run at all, or a document that cannot be rasterised, is an
//! error.

use super::{ExtractionStrategy, LinePatternStrategy, StrategyYield};
use crate::error::GradError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::render::TranscriptSource;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct OcrStrategy {
    engine: Arc<dyn OcrEngine>,
    lines: LinePatternStrategy,
    max_rendered_pixels: u32,
    force: bool,
}

impl OcrStrategy {
    pub fn new(engine: Arc<dyn OcrEngine>, lines: LinePatternStrategy) -> Self {
        Self {
            engine,
            lines,
            max_rendered_pixels: 2480,
            force: false,
        }
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.max_rendered_pixels = px;
        self
    }

    /// Run even when the document has a text layer.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl ExtractionStrategy for OcrStrategy {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract(&self, doc: &dyn TranscriptSource) -> Result<StrategyYield, GradError> {
        if doc.has_text_layer() && !self.force {
            return Ok(StrategyYield::skipped("document has a text layer"));
        }

        self.engine.check()?;
        info!(
            "Running OCR ({}) on {} pages",
            self.engine.name(),
            doc.page_count()
        );

        let mut out = StrategyYield::default();
        for rendered in doc.render_pages(self.max_rendered_pixels)? {
            let (page_num, image) = match rendered {
                Ok(page) => page,
                Err(e) => {
                    out.page_errors.push(e);
                    continue;
                }
            };

            match self.engine.recognise(page_num, &image) {
                Ok(raw) => {
                    let text = clean_ocr_text(&raw);
                    let (records, missed) = self.lines.records_from_text(&text);
                    debug!(
                        "Page {}: OCR gave {} course lines, {} other lines",
                        page_num,
                        records.len(),
                        missed
                    );
                    out.records.extend(records);
                    out.rejected += missed;
                }
                Err(e) => {
                    warn!("{}", e);
                    out.page_errors.push(e);
                }
            }
        }
        Ok(out)
    }
}
