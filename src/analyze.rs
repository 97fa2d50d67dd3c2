//! Upload to profile in one call.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::ExtractionOrchestrator;
use crate::nlu::{EntityReconciler, ModelCache};
use crate::output::ResumeAnalysis;
use std::time::Instant;
use tracing::info;

/// Text extraction followed by entity extraction.
#[derive(Debug, Clone)]
pub struct ResumePipeline {
    orchestrator: ExtractionOrchestrator,
    reconciler: EntityReconciler,
}

impl ResumePipeline {
    /// Pipeline with the standard extractors over pdfium and tesseract.
    pub fn new(config: PipelineConfig, models: &ModelCache) -> Self {
        let reconciler = EntityReconciler::new(models, &config);
        Self {
            orchestrator: ExtractionOrchestrator::new(config),
            reconciler,
        }
    }

    pub fn from_parts(orchestrator: ExtractionOrchestrator, reconciler: EntityReconciler) -> Self {
        Self {
            orchestrator,
            reconciler,
        }
    }

    pub fn orchestrator(&self) -> &ExtractionOrchestrator {
        &self.orchestrator
    }

    pub fn reconciler(&self) -> &EntityReconciler {
        &self.reconciler
    }

    /// Extract text from an upload, then the candidate profile from the text.
    ///
    /// # Errors
    /// Any error of [`ExtractionOrchestrator::extract`] or
    /// [`EntityReconciler::extract`].
    pub async fn analyse(
        &self,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<ResumeAnalysis, PipelineError> {
        let started = Instant::now();
        let document = self.orchestrator.extract(bytes, file_name, mime_type).await?;
        let entities = self.reconciler.extract(document.text()).await?;
        info!(
            "Analysed '{}' in {:?}: {} via {}, entities via {:?}",
            file_name,
            started.elapsed(),
            document.text().len(),
            document.processing_method(),
            entities.extraction_method
        );
        Ok(ResumeAnalysis { document, entities })
    }
}
