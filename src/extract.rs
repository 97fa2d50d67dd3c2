//! Document extraction entry point.
//!
//! [`ExtractionOrchestrator::extract`] validates the declared MIME type,
//! stages the bytes in a temp file, and runs the format's
//! [`ExtractorChain`](crate::pipeline::ExtractorChain) on Tokio's blocking
//! pool.
//!
//! ## Cancellation
//!
//! The staged file and the concurrency permit are moved into the blocking
//! task. If the caller's future is dropped (timeout, client disconnect) the
//! task still finishes, then releases both. Neither the temp file nor the
//! concurrency cap can leak.

use crate::config::{DocumentFormat, PipelineConfig};
use crate::error::{DocumentStage, PipelineError};
use crate::output::ProcessedDocument;
use crate::pipeline::input::StagedUpload;
use crate::pipeline::ocr::{OcrEngine, TesseractCli};
use crate::pipeline::pdf::{PdfBackend, PdfiumBackend};
use crate::pipeline::ExtractorRegistry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Selects and runs extractors for uploaded documents.
///
/// Cheap to clone; clones share the registry and the concurrency limit.
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    registry: Arc<ExtractorRegistry>,
    config: Arc<PipelineConfig>,
    permits: Arc<Semaphore>,
}

impl ExtractionOrchestrator {
    /// Orchestrator with the standard chains, pdfium and the tesseract CLI.
    pub fn new(config: PipelineConfig) -> Self {
        let engine = TesseractCli::new(config.tesseract_path.clone());
        Self::with_backends(config, Arc::new(PdfiumBackend::new()), Arc::new(engine))
    }

    /// Orchestrator with the standard chains over the given PDF and OCR backends.
    pub fn with_backends(
        config: PipelineConfig,
        pdf_backend: Arc<dyn PdfBackend>,
        ocr_engine: Arc<dyn OcrEngine>,
    ) -> Self {
        let registry = ExtractorRegistry::standard(&config, pdf_backend, ocr_engine);
        Self::with_registry(config, registry)
    }

    /// Orchestrator over a custom registry.
    pub fn with_registry(config: PipelineConfig, registry: ExtractorRegistry) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            permits,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract text from one upload.
    ///
    /// # Errors
    /// - [`PipelineError::UnsupportedFormat`] for a MIME type outside the
    ///   supported set
    /// - [`PipelineError::FileSize`] when `max_file_size` is exceeded
    /// - [`PipelineError::DocumentProcessing`] when every extractor failed,
    ///   carrying the stage of the last one
    pub async fn extract(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<ProcessedDocument, PipelineError> {
        let start = Instant::now();

        let format =
            DocumentFormat::from_mime(mime_type).ok_or_else(|| PipelineError::UnsupportedFormat {
                mime_type: mime_type.to_string(),
                supported: DocumentFormat::supported_mime_types(),
            })?;

        let size = bytes.len() as u64;
        if let Some(max) = self.config.max_file_size {
            if size > max {
                return Err(PipelineError::FileSize { size, max });
            }
        }

        let Some(chain) = self.registry.chain(format).cloned() else {
            return Err(PipelineError::document(
                file_name,
                DocumentStage::ProcessorSelection,
                format!("No extractor registered for {}", format.mime_type()),
            ));
        };

        info!("Extracting '{}' ({} bytes, {})", file_name, size, format.mime_type());

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Internal(format!("semaphore closed: {e}")))?;
        let staged = StagedUpload::stage(bytes, file_name)?;
        let name = file_name.to_string();

        let document = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = chain.run(staged.path(), &name, staged.size());
            drop(staged);
            result
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {e}")))??;

        debug!(
            "'{}' done in {}ms via {}",
            file_name,
            start.elapsed().as_millis(),
            document.processing_method()
        );
        Ok(document)
    }
}
