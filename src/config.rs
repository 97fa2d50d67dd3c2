//! Configuration for the document understanding pipeline.
//!
//! Every tunable threshold lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`].

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MIME type of born-digital or scanned PDFs.
pub const MIME_PDF: &str = "application/pdf";
/// MIME type of Office Open XML word-processing documents.
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// MIME type of plain text.
pub const MIME_TEXT: &str = "text/plain";

/// Configuration for extraction and entity recognition.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use resume_lens::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .ocr_dpi(200)
///     .concurrency(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr_fallback_min_chars, 200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Trimmed character count below which a digital PDF extraction is
    /// treated as a scanned document and replaced by OCR. Default: 200.
    pub ocr_fallback_min_chars: usize,

    /// Rasterisation DPI for OCR. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for ~300 DPI glyphs; lower values lose small print,
    /// higher values mostly cost memory.
    pub ocr_dpi: u32,

    /// Hard cap on either rendered page dimension, in pixels. Default: 5000.
    pub max_rendered_pixels: u32,

    /// Tesseract page-segmentation mode. Default: 6 (single uniform block).
    pub ocr_page_seg_mode: u8,

    /// Tesseract language pack. Default: `eng`.
    pub ocr_language: String,

    /// Path or name of the tesseract executable. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Maximum number of extractions or inferences running at once. Default: 3.
    pub concurrency: usize,

    /// Upload size limit in bytes. `None` disables the check. Default: 10 MiB.
    pub max_file_size: Option<u64>,

    /// Minimum per-entity NER score kept by the statistical extractor. Default: 0.80.
    pub ner_confidence_threshold: f32,

    /// Mean NER score below which the rule-based extractor is merged in. Default: 0.70.
    pub fallback_confidence_threshold: f32,

    /// Characters of preprocessed text handed to the NER model. Default: 5000.
    pub ner_max_chars: usize,

    /// How per-category confidence is computed on the statistical path.
    pub confidence_aggregation: ConfidenceAggregation,

    /// Matches kept per line-based rule category (job titles, education,
    /// companies). Default: 5.
    pub max_rule_matches: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_fallback_min_chars: 200,
            ocr_dpi: 300,
            max_rendered_pixels: 5000,
            ocr_page_seg_mode: 6,
            ocr_language: "eng".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            concurrency: 3,
            max_file_size: Some(10 * 1024 * 1024),
            ner_confidence_threshold: 0.80,
            fallback_confidence_threshold: 0.70,
            ner_max_chars: 5000,
            confidence_aggregation: ConfidenceAggregation::default(),
            max_rule_matches: 5,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr_fallback_min_chars(mut self, n: usize) -> Self {
        self.config.ocr_fallback_min_chars = n;
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn ocr_page_seg_mode(mut self, psm: u8) -> Self {
        self.config.ocr_page_seg_mode = psm;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn ner_confidence_threshold(mut self, t: f32) -> Self {
        self.config.ner_confidence_threshold = t;
        self
    }

    pub fn fallback_confidence_threshold(mut self, t: f32) -> Self {
        self.config.fallback_confidence_threshold = t;
        self
    }

    pub fn ner_max_chars(mut self, n: usize) -> Self {
        self.config.ner_max_chars = n;
        self
    }

    pub fn confidence_aggregation(mut self, mode: ConfidenceAggregation) -> Self {
        self.config.confidence_aggregation = mode;
        self
    }

    pub fn max_rule_matches(mut self, n: usize) -> Self {
        self.config.max_rule_matches = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.ocr_dpi < 72 || c.ocr_dpi > 600 {
            return Err(PipelineError::InvalidConfig(format!(
                "OCR DPI must be 72–600, got {}",
                c.ocr_dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        for (name, value) in [
            ("ner_confidence_threshold", c.ner_confidence_threshold),
            ("fallback_confidence_threshold", c.fallback_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be within 0.0–1.0, got {value}"
                )));
            }
        }
        if c.ner_max_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "ner_max_chars must be ≥ 1".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "ocr_language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the statistical path scores each profile category.
///
/// | Mode | Behaviour |
/// |------|-----------|
/// | `Fixed` | every populated category gets [`FIXED_CATEGORY_CONFIDENCE`] (default) |
/// | `MeanScore` | mean of the grouped entity scores that fed the category |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAggregation {
    #[default]
    Fixed,
    MeanScore,
}

/// Category confidence used by [`ConfidenceAggregation::Fixed`].
pub const FIXED_CATEGORY_CONFIDENCE: f32 = 0.85;

/// Supported document encodings, keyed by declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Every supported format, in registry order.
    pub const ALL: [DocumentFormat; 3] = [
        DocumentFormat::Pdf,
        DocumentFormat::Docx,
        DocumentFormat::PlainText,
    ];

    /// Resolve a MIME type. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Some(DocumentFormat::Pdf),
            MIME_DOCX => Some(DocumentFormat::Docx),
            MIME_TEXT => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    /// Best-effort format guess from a file extension.
    pub fn from_extension(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" | "text" | "md" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => MIME_PDF,
            DocumentFormat::Docx => MIME_DOCX,
            DocumentFormat::PlainText => MIME_TEXT,
        }
    }

    /// MIME types of every supported format.
    pub fn supported_mime_types() -> Vec<String> {
        Self::ALL.iter().map(|f| f.mime_type().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_thresholds() {
        let c = PipelineConfig::default();
        assert_eq!(c.ocr_fallback_min_chars, 200);
        assert_eq!(c.ocr_dpi, 300);
        assert_eq!(c.ocr_page_seg_mode, 6);
        assert_eq!(c.ocr_language, "eng");
        assert_eq!(c.ner_confidence_threshold, 0.80);
        assert_eq!(c.fallback_confidence_threshold, 0.70);
        assert_eq!(c.ner_max_chars, 5000);
        assert_eq!(c.confidence_aggregation, ConfidenceAggregation::Fixed);
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = PipelineConfig::builder()
            .ocr_dpi(10_000)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.ocr_dpi, 600);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_keeps_pixel_cap_within_i32() {
        let c = PipelineConfig::builder()
            .max_rendered_pixels(u32::MAX)
            .build()
            .unwrap();
        assert_eq!(c.max_rendered_pixels, i32::MAX as u32);

        let c = PipelineConfig::builder().max_rendered_pixels(1).build().unwrap();
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        let err = PipelineConfig::builder()
            .fallback_confidence_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn mime_resolution_ignores_parameters_and_case() {
        assert_eq!(
            DocumentFormat::from_mime("Text/Plain; charset=utf-8"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::from_mime(MIME_DOCX), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_mime("image/png"), None);
    }

    #[test]
    fn extension_guess() {
        assert_eq!(DocumentFormat::from_extension("CV.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("cv.docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("cv"), None);
    }
}
