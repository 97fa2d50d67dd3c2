//! # resume-lens
//!
//! Read an uploaded résumé of unknown quality (born-digital PDF, scanned PDF,
//! DOCX or plain text) and produce its text plus a structured candidate
//! profile.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (bytes + file name + MIME type)
//!  │
//!  ├─ 1. Validate   MIME type and size
//!  ├─ 2. Stage      bytes → temp file (owned by the blocking task)
//!  ├─ 3. Extract    format chain: PDF = digital text → OCR fallback,
//!  │                DOCX, plain text (encoding detection)
//!  ├─ 4. Clean      line endings, invisible characters, blank lines
//!  ├─ 5. NER        injected model, entities scoring ≥ 0.80
//!  ├─ 6. Rules      regexes + keyword lines + skills dictionary
//!  └─ 7. Reconcile  statistical alone, merged with rules, or rules alone
//! ```
//!
//! A PDF whose text layer yields fewer than 200 characters is treated as a
//! scan: its digital text is discarded and every page is rendered and OCRed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_lens::{ModelCache, PipelineConfig, ResumePipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // No NER model bundled: every document takes the rule-based path.
//!     let models = ModelCache::rules_only()?;
//!     let pipeline = ResumePipeline::new(PipelineConfig::default(), &models);
//!
//!     let bytes = std::fs::read("cv.pdf")?;
//!     let analysis = pipeline.analyse(&bytes, "cv.pdf", "application/pdf").await?;
//!     println!("{} ({:.2})", analysis.document.processing_method(),
//!         analysis.document.confidence_score());
//!     println!("skills: {:?}", analysis.entities.skills);
//!     Ok(())
//! }
//! ```
//!
//! ## Plugging in a NER model
//!
//! Implement [`NerBackend`] over your inference runtime and build the cache
//! with [`ModelCache::with_builtin_skills`]. Inference calls run on Tokio's
//! blocking pool.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-lens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-lens = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native requirements
//!
//! - PDF support binds the pdfium shared library at runtime (system path or
//!   [`PdfiumBackend::with_library_dir`]).
//! - OCR shells out to the `tesseract` binary ([`PipelineConfig::tesseract_path`]).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod nlu;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::ResumePipeline;
pub use config::{
    ConfidenceAggregation, DocumentFormat, PipelineConfig, PipelineConfigBuilder, MIME_DOCX,
    MIME_PDF, MIME_TEXT,
};
pub use error::{DocumentStage, NluStage, PageError, PipelineError};
pub use extract::ExtractionOrchestrator;
pub use nlu::{
    EntityPostProcessor, EntityReconciler, HealthStatus, InferenceError, ModelCache, NerBackend,
    RawEntity, RuleBasedFallbackExtractor, SkillsDictionary, StatisticalEntityExtractor,
    UnavailableNer,
};
pub use output::{
    Category, ContactField, ExtractionMethod, ProcessedDocument, ProcessingMethod,
    ResumeAnalysis, ResumeEntities,
};
pub use pipeline::ocr::{OcrEngine, OcrSettings, TesseractCli};
pub use pipeline::pdf::{PdfBackend, PdfiumBackend, RenderSettings};
pub use pipeline::{Extractor, ExtractorChain, ExtractorRegistry};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_stream, BatchItem, DocumentStream, Upload};
