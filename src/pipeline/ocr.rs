//! OCR of scanned PDFs: rasterise each page, recognise it with tesseract.
//!
//! The engine is a trait so deployments can swap the recogniser and tests
//! can count calls. The built-in [`TesseractCli`] shells out to the
//! `tesseract` binary with a PNG written to a private temp file.

use super::encode::encode_png;
use super::pdf::{PdfBackend, RenderSettings};
use super::postprocess::{clean_text, trimmed_char_count};
use super::Extraction;
use crate::error::PageError;
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Characters per page at which OCR output reaches its confidence ceiling.
pub const OCR_CHARS_PER_PAGE: f32 = 150.0;

/// OCR output is never trusted above this.
pub const OCR_MAX_CONFIDENCE: f32 = 0.8;

/// Recogniser parameters, fixed for the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSettings {
    /// Tesseract `--psm` value.
    pub page_seg_mode: u8,
    /// Tesseract `-l` value.
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            page_seg_mode: 6,
            language: "eng".to_string(),
        }
    }
}

/// Turns one page image into text.
pub trait OcrEngine: Send + Sync {
    fn recognise(&self, image: &DynamicImage, settings: &OcrSettings) -> Result<String, String>;
}

/// [`OcrEngine`] that runs the tesseract command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// True if the binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractCli {
    fn recognise(&self, image: &DynamicImage, settings: &OcrSettings) -> Result<String, String> {
        let png = encode_png(image).map_err(|e| format!("PNG encoding failed: {e}"))?;

        let mut tmp = tempfile::Builder::new()
            .prefix("resume-lens-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| format!("tempfile: {e}"))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| format!("tempfile write: {e}"))?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("--psm")
            .arg(settings.page_seg_mode.to_string())
            .arg("-l")
            .arg(&settings.language)
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("tesseract exited with {}: {}", output.status, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// OCR every page, skipping pages that fail to render or recognise.
///
/// Confidence is `min(0.8, chars / (pages × 150))`. A document with no
/// pages is an error.
pub fn extract_ocr(
    backend: &dyn PdfBackend,
    engine: &dyn OcrEngine,
    path: &Path,
    render: &RenderSettings,
    settings: &OcrSettings,
) -> Result<Extraction, String> {
    let mut raw = String::new();
    let mut page_errors = Vec::new();

    let page_count = backend.render_pages(path, render, &mut |idx, image| {
        let page = idx + 1;
        let result = image
            .map_err(|detail| PageError::RenderFailed { page, detail })
            .and_then(|img| {
                engine
                    .recognise(&img, settings)
                    .map_err(|detail| PageError::OcrFailed { page, detail })
            });
        match result {
            Ok(text) => {
                debug!("Page {}: OCR produced {} chars", page, text.len());
                if !text.trim().is_empty() {
                    raw.push_str(&text);
                    raw.push('\n');
                }
            }
            Err(err) => {
                warn!("{}", err);
                page_errors.push(err);
            }
        }
    })?;

    if page_count == 0 {
        return Err("PDF has no pages".to_string());
    }

    let text = clean_text(&raw);
    let chars = trimmed_char_count(&text);
    let confidence =
        (chars as f32 / (page_count as f32 * OCR_CHARS_PER_PAGE)).min(OCR_MAX_CONFIDENCE);

    info!(
        "OCR: {} pages, {} failed, {} chars, confidence {:.2}",
        page_count,
        page_errors.len(),
        chars,
        confidence
    );
    Ok(Extraction {
        text,
        confidence,
        page_errors,
    })
}
