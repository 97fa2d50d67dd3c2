//! Error types for the resume-lens library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`]: **Fatal** for the request: no extractor produced a
//!   document, the format is unsupported, or both entity-extraction strategies
//!   failed. Returned as `Err(PipelineError)` from the orchestrator and the
//!   entity reconciler.
//!
//! * [`PageError`]: **Non-fatal**: a single PDF page failed (broken text
//!   layer, render glitch, OCR crash) but the remaining pages still produce
//!   text. These are logged and counted, never surfaced to the caller as a
//!   failure.
//!
//! Every variant carries enough context (file name, stage, model name) for a
//! hosting service to render an actionable message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage of document extraction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStage {
    PdfExtraction,
    OcrExtraction,
    DocxExtraction,
    TextExtraction,
    /// No extractor is registered for an otherwise valid format, or the chain
    /// ended without a result and without an error.
    ProcessorSelection,
}

impl DocumentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStage::PdfExtraction => "pdf_extraction",
            DocumentStage::OcrExtraction => "ocr_extraction",
            DocumentStage::DocxExtraction => "docx_extraction",
            DocumentStage::TextExtraction => "text_extraction",
            DocumentStage::ProcessorSelection => "processor_selection",
        }
    }
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of entity extraction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluStage {
    /// The NER model is unavailable or inference raised.
    EntityExtraction,
    /// Raw model output could not be turned into a profile.
    PostProcessing,
    /// The rule-based extractor failed unexpectedly.
    FallbackExtraction,
    /// Both the statistical and the rule-based path failed.
    NluService,
}

impl NluStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NluStage::EntityExtraction => "entity_extraction",
            NluStage::PostProcessing => "post_processing",
            NluStage::FallbackExtraction => "fallback_extraction",
            NluStage::NluService => "nlu_service",
        }
    }
}

impl fmt::Display for NluStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All fatal errors returned by the resume-lens library.
///
/// Page-level failures use [`PageError`] and are absorbed by the extractor
/// that hit them.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The MIME type has no registered extractor. Never retried.
    #[error("Unsupported file format: {mime_type}. Supported formats: {}", .supported.join(", "))]
    UnsupportedFormat {
        mime_type: String,
        supported: Vec<String>,
    },

    /// The upload exceeds the configured size limit.
    #[error("File size {size} bytes exceeds maximum allowed size of {max} bytes")]
    FileSize { size: u64, max: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// A specific extractor failed; `stage` says which.
    #[error("Failed to process '{file_name}' during {stage}: {detail}")]
    DocumentProcessing {
        file_name: String,
        stage: DocumentStage,
        detail: String,
    },

    // ── Entity extraction errors ──────────────────────────────────────────
    /// The statistical model, post-processing or rule-based path failed.
    #[error("Entity extraction failed during {stage}{}: {detail}", model_suffix(.model))]
    NluProcessing {
        stage: NluStage,
        model: Option<String>,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp file creation, task join failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn model_suffix(model: &Option<String>) -> String {
    match model {
        Some(m) => format!(" (model '{m}')"),
        None => String::new(),
    }
}

impl PipelineError {
    pub(crate) fn document(
        file_name: impl Into<String>,
        stage: DocumentStage,
        detail: impl Into<String>,
    ) -> Self {
        PipelineError::DocumentProcessing {
            file_name: file_name.into(),
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn nlu(stage: NluStage, model: Option<&str>, detail: impl Into<String>) -> Self {
        PipelineError::NluProcessing {
            stage,
            model: model.map(str::to_string),
            detail: detail.into(),
        }
    }

    /// Processing stage tag, if the error carries one.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            PipelineError::DocumentProcessing { stage, .. } => Some(stage.as_str()),
            PipelineError::NluProcessing { stage, .. } => Some(stage.as_str()),
            PipelineError::UnsupportedFormat { .. } => Some("format_validation"),
            PipelineError::FileSize { .. } => Some("size_validation"),
            PipelineError::InvalidConfig(_) | PipelineError::Internal(_) => None,
        }
    }

    /// True for errors caused by the upload itself; retrying cannot help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedFormat { .. } | PipelineError::FileSize { .. }
        )
    }
}

/// A non-fatal error for a single PDF page.
///
/// The extractor skips the page and keeps going; the document is still
/// produced from whatever pages succeeded.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The page's digital text layer could not be read.
    #[error("Page {page}: text layer extraction failed: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// The page could not be rasterised for OCR.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine failed on the rasterised page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },
}
