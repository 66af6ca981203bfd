//! Document access: the text layer and page rasterisation, via pdfium.
//!
//! Extraction strategies never touch pdfium directly. They see a
//! [`TranscriptSource`], which offers the text layer (page text plus
//! positioned fragments) and, on demand, rasterised pages for OCR.
//! [`PdfTranscript`] is the pdfium-backed source; [`TextTranscript`] holds
//! pre-extracted pages and is what tests and callers with their own text
//! extraction use.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use crate::error::{GradError, PageError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A run of text with its bounding box, in PDF points.
///
/// PDF coordinates grow upwards: `top > bottom` for a well-formed box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn centre_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Text layer of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Plain text in reading order, one line per visual line.
    pub text: String,
    /// Positioned runs; empty when the source has no geometry.
    pub fragments: Vec<TextFragment>,
}

impl PageText {
    pub fn new(page_num: usize, text: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
            fragments: Vec::new(),
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<TextFragment>) -> Self {
        self.fragments = fragments;
        self
    }
}

/// One rasterised page, or the reason it could not be rasterised.
pub type RenderedPage = Result<(usize, DynamicImage), PageError>;

/// What extraction strategies can ask of a document.
pub trait TranscriptSource {
    fn page_count(&self) -> usize;

    /// Text layer per page, in page order.
    fn text_pages(&self) -> &[PageText];

    /// Pages whose text layer could not be read.
    fn page_errors(&self) -> &[PageError] {
        &[]
    }

    /// True when any page carries non-blank text.
    fn has_text_layer(&self) -> bool {
        self.text_pages().iter().any(|p| !p.text.trim().is_empty())
    }

    /// Rasterise every page, longest edge capped at `max_pixels`.
    ///
    /// Returns `Err` only when rasterisation cannot start at all; single-page
    /// failures are reported inline.
    fn render_pages(&self, max_pixels: u32) -> Result<Vec<RenderedPage>, GradError>;
}

// ── pdfium binding ───────────────────────────────────────────────────────

/// Bind to pdfium: `PDFIUM_LIB_PATH` (a file or a directory) first, then the
/// system library.
pub fn bind_pdfium() -> Result<Pdfium, GradError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        let lib = if Path::new(&path).is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            PathBuf::from(&path)
        };
        debug!("Binding pdfium from {}", lib.display());
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| GradError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| GradError::PdfiumBindingFailed(format!("{:?}", e)))
}

fn map_load_error(e: PdfiumError, path: &Path, password: Option<&str>) -> GradError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            GradError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            GradError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        GradError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

// ── PdfTranscript ────────────────────────────────────────────────────────

/// A PDF transcript opened through pdfium.
///
/// The text layer and metadata are read once at open time. Page images are
/// produced only when [`TranscriptSource::render_pages`] is called, which
/// the cascade does only if the text-based strategies came up empty.
pub struct PdfTranscript {
    label: PathBuf,
    bytes: Vec<u8>,
    password: Option<String>,
    pages: Vec<PageText>,
    page_errors: Vec<PageError>,
    metadata: DocumentMetadata,
}

impl PdfTranscript {
    /// Open a PDF held in memory. `label` names the document in errors.
    pub fn open(
        bytes: Vec<u8>,
        label: impl Into<PathBuf>,
        password: Option<&str>,
    ) -> Result<Self, GradError> {
        let label = label.into();
        let pdfium = bind_pdfium()?;
        let (metadata, pages, page_errors) = read_text_layer(&pdfium, &bytes, &label, password)?;

        info!(
            "PDF loaded: {} pages, text layer: {}",
            pages.len(),
            metadata.has_text_layer
        );

        Ok(Self {
            label,
            bytes,
            password: password.map(str::to_string),
            pages,
            page_errors,
            metadata,
        })
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

impl TranscriptSource for PdfTranscript {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn text_pages(&self) -> &[PageText] {
        &self.pages
    }

    fn page_errors(&self) -> &[PageError] {
        &self.page_errors
    }

    fn render_pages(&self, max_pixels: u32) -> Result<Vec<RenderedPage>, GradError> {
        let pdfium = bind_pdfium()?;
        let password = self.password.as_deref();
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, password)
            .map_err(|e| map_load_error(e, &self.label, password))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let mut results = Vec::with_capacity(total_pages);

        for idx in 0..total_pages {
            let page_num = idx + 1;
            let rendered = render_one(&pages, idx as u16, &render_config).map_err(|e| {
                PageError::RenderFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            });

            match &rendered {
                Ok(image) => debug!(
                    "Rendered page {} → {}x{} px",
                    page_num,
                    image.width(),
                    image.height()
                ),
                Err(e) => warn!("{}", e),
            }
            results.push(rendered.map(|image| (page_num, image)));
        }

        Ok(results)
    }
}

fn render_one(
    pages: &PdfPages<'_>,
    idx: u16,
    config: &PdfRenderConfig,
) -> Result<DynamicImage, PdfiumError> {
    let page = pages.get(idx)?;
    let bitmap = page.render_with_config(config)?;
    Ok(bitmap.as_image())
}

type TextLayer = (DocumentMetadata, Vec<PageText>, Vec<PageError>);

fn read_text_layer(
    pdfium: &Pdfium,
    bytes: &[u8],
    label: &Path,
    password: Option<&str>,
) -> Result<TextLayer, GradError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(e, label, password))?;

    let mut metadata = read_metadata(&document);
    let mut pages = Vec::with_capacity(metadata.page_count);
    let mut page_errors = Vec::new();

    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        match page.text() {
            Ok(text) => {
                let fragments = text
                    .segments()
                    .iter()
                    .map(|seg| {
                        let b = seg.bounds();
                        TextFragment::new(
                            seg.text(),
                            b.left().value,
                            b.top().value,
                            b.right().value,
                            b.bottom().value,
                        )
                    })
                    .filter(|f| !f.text.trim().is_empty())
                    .collect();
                pages.push(PageText {
                    page_num,
                    text: text.all(),
                    fragments,
                });
            }
            Err(e) => {
                warn!("Page {}: text layer unreadable: {:?}", page_num, e);
                page_errors.push(PageError::TextLayerFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                });
                pages.push(PageText::new(page_num, ""));
            }
        }
    }

    metadata.has_text_layer = pages.iter().any(|p| !p.text.trim().is_empty());
    Ok((metadata, pages, page_errors))
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
        has_text_layer: false,
    }
}

// ── TextTranscript ───────────────────────────────────────────────────────

/// A transcript whose text (and optionally page images) is already in memory.
#[derive(Debug, Clone, Default)]
pub struct TextTranscript {
    pages: Vec<PageText>,
    images: Vec<(usize, DynamicImage)>,
}

impl TextTranscript {
    pub fn from_pages(pages: Vec<PageText>) -> Self {
        Self {
            pages,
            images: Vec::new(),
        }
    }

    /// One page per string, numbered from 1, with no geometry.
    pub fn from_text<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_pages(
            pages
                .into_iter()
                .enumerate()
                .map(|(i, t)| PageText::new(i + 1, t))
                .collect(),
        )
    }

    /// A scanned document: page images and no text layer.
    pub fn scanned(images: Vec<DynamicImage>) -> Self {
        let pages = (1..=images.len()).map(|n| PageText::new(n, "")).collect();
        let images = images
            .into_iter()
            .enumerate()
            .map(|(i, img)| (i + 1, img))
            .collect();
        Self { pages, images }
    }
}

impl TranscriptSource for TextTranscript {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn text_pages(&self) -> &[PageText] {
        &self.pages
    }

    fn render_pages(&self, _max_pixels: u32) -> Result<Vec<RenderedPage>, GradError> {
        Ok(self.images.iter().cloned().map(Ok).collect())
    }
}
