//! PDF access: the digital text layer and page rasterisation via pdfium.
//!
//! Everything here is blocking. The orchestrator calls it from
//! `tokio::task::spawn_blocking` because pdfium uses thread-local state and
//! is not safe to drive from async worker threads.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would produce a
//! 10,000 × 14,000 px bitmap. `max_pixels` caps the longest edge regardless
//! of physical size, keeping memory bounded while A4/Letter pages still
//! render at the full OCR resolution.

use super::postprocess::{clean_text, trimmed_char_count};
use super::Extraction;
use crate::error::PageError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Characters per page at which a digital extraction counts as fully confident.
pub const DIGITAL_CHARS_PER_PAGE: f32 = 200.0;

/// How pages are rasterised for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_pixels: u32,
}

impl RenderSettings {
    /// `max_pixels` as pdfium's signed bitmap dimension, saturating.
    pub fn max_pixel_side(&self) -> i32 {
        i32::try_from(self.max_pixels).unwrap_or(i32::MAX)
    }
}

/// Source of per-page text and page images.
///
/// An `Err` from either method means the document itself could not be
/// opened; per-page failures are reported inside the `Ok` value.
pub trait PdfBackend: Send + Sync {
    /// Text layer of every page, in page order.
    fn page_texts(&self, path: &Path) -> Result<Vec<Result<String, String>>, String>;

    /// Rasterise every page in order, handing each to `visit` as soon as it
    /// is rendered. Returns the document's page count.
    fn render_pages(
        &self,
        path: &Path,
        settings: &RenderSettings,
        visit: &mut dyn FnMut(usize, Result<DynamicImage, String>),
    ) -> Result<usize, String>;
}

/// [`PdfBackend`] backed by the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Bind to the system pdfium library on each use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the pdfium library found in `dir`.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("pdfium library unavailable: {:?}", e))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfBackend for PdfiumBackend {
    fn page_texts(&self, path: &Path) -> Result<Vec<Result<String, String>>, String> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| format!("cannot open PDF: {:?}", e))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        Ok(pages
            .iter()
            .map(|page| {
                page.text()
                    .map(|t| t.all())
                    .map_err(|e| format!("{:?}", e))
            })
            .collect())
    }

    fn render_pages(
        &self,
        path: &Path,
        settings: &RenderSettings,
        visit: &mut dyn FnMut(usize, Result<DynamicImage, String>),
    ) -> Result<usize, String> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| format!("cannot open PDF: {:?}", e))?;

        let max_pixels = settings.max_pixel_side();
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(settings.dpi as f32 / 72.0)
            .set_maximum_width(max_pixels)
            .set_maximum_height(max_pixels);

        let pages = document.pages();
        let total = pages.len() as usize;
        for (idx, page) in pages.iter().enumerate() {
            let image = page
                .render_with_config(&render_config)
                .map(|bitmap| bitmap.as_image())
                .map_err(|e| format!("{:?}", e));
            if let Ok(ref img) = image {
                debug!("Rendered page {} → {}x{} px", idx + 1, img.width(), img.height());
            }
            visit(idx, image);
        }
        Ok(total)
    }
}

/// Read the digital text layer, skipping pages that fail.
///
/// Confidence is `min(1.0, chars / (pages × 200))`. A document with no pages
/// is an error.
pub fn extract_digital(backend: &dyn PdfBackend, path: &Path) -> Result<Extraction, String> {
    let pages = backend.page_texts(path)?;
    if pages.is_empty() {
        return Err("PDF has no pages".to_string());
    }

    let page_count = pages.len();
    let mut raw = String::new();
    let mut page_errors = Vec::new();

    for (idx, page) in pages.into_iter().enumerate() {
        match page {
            Ok(text) => {
                debug!("Page {}: {} chars of digital text", idx + 1, text.len());
                if !text.is_empty() {
                    raw.push_str(&text);
                    raw.push('\n');
                }
            }
            Err(detail) => {
                let err = PageError::TextLayerFailed {
                    page: idx + 1,
                    detail,
                };
                warn!("{}", err);
                page_errors.push(err);
            }
        }
    }

    let text = clean_text(&raw);
    let chars = trimmed_char_count(&text);
    let confidence = (chars as f32 / (page_count as f32 * DIGITAL_CHARS_PER_PAGE)).min(1.0);

    info!(
        "Digital text layer: {} pages, {} chars, confidence {:.2}",
        page_count, chars, confidence
    );
    Ok(Extraction {
        text,
        confidence,
        page_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_cap_saturates_instead_of_wrapping() {
        let settings = RenderSettings {
            dpi: 300,
            max_pixels: u32::MAX,
        };
        assert_eq!(settings.max_pixel_side(), i32::MAX);
        let settings = RenderSettings {
            dpi: 300,
            max_pixels: 5000,
        };
        assert_eq!(settings.max_pixel_side(), 5000);
    }

    struct FakePdf(Vec<Result<String, String>>);

    impl PdfBackend for FakePdf {
        fn page_texts(&self, _path: &Path) -> Result<Vec<Result<String, String>>, String> {
            Ok(self.0.clone())
        }

        fn render_pages(
            &self,
            _path: &Path,
            _settings: &RenderSettings,
            _visit: &mut dyn FnMut(usize, Result<DynamicImage, String>),
        ) -> Result<usize, String> {
            Ok(self.0.len())
        }
    }

    #[test]
    fn confidence_scales_with_page_count() {
        let backend = FakePdf(vec![Ok("x".repeat(100)), Ok("y".repeat(100))]);
        let out = extract_digital(&backend, Path::new("a.pdf")).unwrap();
        // 200 chars + 1 newline between pages over 2 × 200
        assert!((out.confidence - 201.0 / 400.0).abs() < 1e-6);
    }

    #[test]
    fn confidence_capped_at_one() {
        let backend = FakePdf(vec![Ok("z".repeat(900))]);
        let out = extract_digital(&backend, Path::new("a.pdf")).unwrap();
        assert_eq!(out.confidence, 1.0);
    }

    #[test]
    fn failing_page_is_skipped() {
        let backend = FakePdf(vec![
            Ok("first page".into()),
            Err("broken text layer".into()),
            Ok("third page".into()),
        ]);
        let out = extract_digital(&backend, Path::new("a.pdf")).unwrap();
        assert_eq!(out.text, "first page\nthird page");
        assert_eq!(out.page_errors.len(), 1);
        assert!(matches!(
            out.page_errors[0],
            PageError::TextLayerFailed { page: 2, .. }
        ));
    }

    #[test]
    fn zero_pages_is_an_error() {
        let backend = FakePdf(vec![]);
        assert!(extract_digital(&backend, Path::new("a.pdf")).is_err());
    }
}
