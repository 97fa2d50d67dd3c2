//! Pipeline stages for turning an upload into text.
//!
//! Each submodule implements one extraction strategy or helper; the
//! orchestrator composes them into per-format chains.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ [ pdf ──(short text)──▶ ocr ] | docx | text ──▶ postprocess
//! (staged)    (pdfium)               (tesseract)              (cleanup)
//! ```
//!
//! 1. [`input`]: stage the upload bytes in a private temp file
//! 2. [`pdf`]: digital text layer; falls through to OCR when too short
//! 3. [`ocr`]: rasterise and recognise each page
//! 4. [`docx`]: WordprocessingML paragraphs and tables
//! 5. [`text`]: encoding detection and decoding
//! 6. [`postprocess`]: deterministic whitespace and Unicode cleanup
//!
//! ## Chain contract
//!
//! An [`ExtractorChain`] runs its extractors in order:
//!
//! * the first extractor to succeed wins;
//! * a failing extractor is logged and its error remembered;
//! * a digital-PDF result whose trimmed text is shorter than the configured
//!   minimum is discarded and the chain moves on (scanned-document signal);
//! * when no extractor wins, the most recent error is returned, or a
//!   `processor_selection` error if none was recorded.

pub mod docx;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
pub mod text;

use crate::config::{DocumentFormat, PipelineConfig};
use crate::error::{DocumentStage, PageError, PipelineError};
use crate::output::{ProcessedDocument, ProcessingMethod};
use ocr::{OcrEngine, OcrSettings};
use pdf::{PdfBackend, RenderSettings};
use postprocess::trimmed_char_count;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Text produced by one extractor, before it becomes a [`ProcessedDocument`].
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub confidence: f32,
    /// Pages that were skipped. Informational only.
    pub page_errors: Vec<PageError>,
}

/// One extraction strategy.
#[derive(Clone)]
pub enum Extractor {
    DigitalPdf {
        backend: Arc<dyn PdfBackend>,
    },
    Ocr {
        backend: Arc<dyn PdfBackend>,
        engine: Arc<dyn OcrEngine>,
        render: RenderSettings,
        settings: OcrSettings,
    },
    Docx,
    PlainText,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Extractor::DigitalPdf { .. } => "DigitalPdf",
            Extractor::Ocr { .. } => "Ocr",
            Extractor::Docx => "Docx",
            Extractor::PlainText => "PlainText",
        }
    }

    pub fn method(&self) -> ProcessingMethod {
        match self {
            Extractor::DigitalPdf { .. } => ProcessingMethod::DigitalPdf,
            Extractor::Ocr { .. } => ProcessingMethod::Ocr,
            Extractor::Docx => ProcessingMethod::Docx,
            Extractor::PlainText => ProcessingMethod::PlainText,
        }
    }

    /// Error stage reported when this extractor fails.
    pub fn stage(&self) -> DocumentStage {
        match self {
            Extractor::DigitalPdf { .. } => DocumentStage::PdfExtraction,
            Extractor::Ocr { .. } => DocumentStage::OcrExtraction,
            Extractor::Docx => DocumentStage::DocxExtraction,
            Extractor::PlainText => DocumentStage::TextExtraction,
        }
    }

    /// Run the extractor. Blocking.
    pub fn extract(&self, path: &Path) -> Result<Extraction, String> {
        match self {
            Extractor::DigitalPdf { backend } => pdf::extract_digital(backend.as_ref(), path),
            Extractor::Ocr {
                backend,
                engine,
                render,
                settings,
            } => ocr::extract_ocr(backend.as_ref(), engine.as_ref(), path, render, settings),
            Extractor::Docx => docx::extract_docx(path),
            Extractor::PlainText => text::extract_plain_text(path),
        }
    }
}

/// Ordered extractors for one format. See the module docs for the contract.
#[derive(Debug, Clone, Default)]
pub struct ExtractorChain {
    extractors: Vec<Extractor>,
    ocr_fallback_min_chars: usize,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Extractor>, ocr_fallback_min_chars: usize) -> Self {
        Self {
            extractors,
            ocr_fallback_min_chars,
        }
    }

    pub fn extractors(&self) -> &[Extractor] {
        &self.extractors
    }

    /// Run the chain against a staged file. Blocking.
    pub fn run(
        &self,
        path: &Path,
        file_name: &str,
        file_size: u64,
    ) -> Result<ProcessedDocument, PipelineError> {
        let mut last_error = None;

        for extractor in &self.extractors {
            info!("Trying {} extractor on '{}'", extractor.name(), file_name);

            let extraction = match extractor.extract(path) {
                Ok(extraction) => extraction,
                Err(detail) => {
                    warn!("{} extractor failed on '{}': {}", extractor.name(), file_name, detail);
                    last_error = Some(PipelineError::document(file_name, extractor.stage(), detail));
                    continue;
                }
            };

            let chars = trimmed_char_count(&extraction.text);
            if matches!(extractor, Extractor::DigitalPdf { .. })
                && chars < self.ocr_fallback_min_chars
            {
                info!(
                    "OCR fallback triggered for '{}': {} chars of digital text (< {})",
                    file_name, chars, self.ocr_fallback_min_chars
                );
                continue;
            }

            info!(
                "'{}' extracted by {}: {} chars, {} skipped pages, confidence {:.2}",
                file_name,
                extractor.name(),
                chars,
                extraction.page_errors.len(),
                extraction.confidence
            );
            return Ok(ProcessedDocument::new(
                extraction.text,
                file_name,
                file_size,
                extractor.method(),
                extraction.confidence,
            ));
        }

        Err(last_error.unwrap_or_else(|| {
            PipelineError::document(
                file_name,
                DocumentStage::ProcessorSelection,
                "No suitable processor found",
            )
        }))
    }
}

/// Extractor chains keyed by document format.
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    chains: HashMap<DocumentFormat, ExtractorChain>,
}

impl ExtractorRegistry {
    /// An empty registry. Every format resolves to `processor_selection`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard chains: PDF = [DigitalPdf, Ocr], DOCX = [Docx],
    /// text = [PlainText].
    pub fn standard(
        config: &PipelineConfig,
        pdf_backend: Arc<dyn PdfBackend>,
        ocr_engine: Arc<dyn OcrEngine>,
    ) -> Self {
        let min_chars = config.ocr_fallback_min_chars;
        let render = RenderSettings {
            dpi: config.ocr_dpi,
            max_pixels: config.max_rendered_pixels,
        };
        let settings = OcrSettings {
            page_seg_mode: config.ocr_page_seg_mode,
            language: config.ocr_language.clone(),
        };

        Self::empty()
            .with_chain(
                DocumentFormat::Pdf,
                ExtractorChain::new(
                    vec![
                        Extractor::DigitalPdf {
                            backend: Arc::clone(&pdf_backend),
                        },
                        Extractor::Ocr {
                            backend: pdf_backend,
                            engine: ocr_engine,
                            render,
                            settings,
                        },
                    ],
                    min_chars,
                ),
            )
            .with_chain(
                DocumentFormat::Docx,
                ExtractorChain::new(vec![Extractor::Docx], min_chars),
            )
            .with_chain(
                DocumentFormat::PlainText,
                ExtractorChain::new(vec![Extractor::PlainText], min_chars),
            )
    }

    /// Register (or replace) the chain for `format`.
    pub fn with_chain(mut self, format: DocumentFormat, chain: ExtractorChain) -> Self {
        self.chains.insert(format, chain);
        self
    }

    pub fn chain(&self, format: DocumentFormat) -> Option<&ExtractorChain> {
        self.chains.get(&format)
    }
}
