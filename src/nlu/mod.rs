//! Entity extraction from résumé text.
//!
//! Two paths produce a [`ResumeEntities`](crate::output::ResumeEntities):
//!
//! - **statistical**: an injected [`NerBackend`] tags spans, which
//!   [`EntityPostProcessor`] groups and categorises
//! - **rule-based**: [`RuleBasedFallbackExtractor`] matches regexes, keyword
//!   lines and the [`SkillsDictionary`]; it never fails
//!
//! [`EntityReconciler`] chooses between them, or merges them, per document.
//! Shared read-only state lives in a [`ModelCache`] built once at startup.

pub mod ner;
pub mod postprocess;
pub mod reconcile;
pub mod rules;
pub mod skills;

pub use ner::{RawEntity, StatisticalEntityExtractor};
pub use postprocess::EntityPostProcessor;
pub use reconcile::EntityReconciler;
pub use rules::RuleBasedFallbackExtractor;
pub use skills::SkillsDictionary;

use crate::error::PipelineError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Model the statistical path is trained for.
pub const DEFAULT_MODEL_NAME: &str = "yashpwr/resume-ner-bert-v2";

/// Sentence used to check that a backend answers.
pub const HEALTH_PROBE: &str = "John Doe is a software engineer";

/// Failure of a [`NerBackend`].
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The model is not loaded in this process.
    #[error("NER model not available")]
    Unavailable,

    #[error("inference failed: {0}")]
    Failed(String),
}

/// Token-classification inference.
///
/// Implementations return spans with character offsets into the text they
/// were given. Calls are blocking; callers run them on the blocking pool.
pub trait NerBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn infer(&self, text: &str) -> Result<Vec<RawEntity>, InferenceError>;
}

/// Backend for deployments without a loaded model. Every call fails with
/// [`InferenceError::Unavailable`], which routes documents to the
/// rule-based path.
#[derive(Debug, Clone)]
pub struct UnavailableNer {
    model: String,
}

impl UnavailableNer {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for UnavailableNer {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME)
    }
}

impl NerBackend for UnavailableNer {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn infer(&self, _text: &str) -> Result<Vec<RawEntity>, InferenceError> {
        Err(InferenceError::Unavailable)
    }
}

/// Result of [`ModelCache::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub model: String,
    pub ner_available: bool,
    pub skills_loaded: usize,
    /// Backend error when `ner_available` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// NER backend and skills dictionary, loaded once and shared by `Arc`.
#[derive(Clone)]
pub struct ModelCache {
    ner: Arc<dyn NerBackend>,
    skills: Arc<SkillsDictionary>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("model", &self.ner.model_name())
            .field("skills", &self.skills)
            .finish()
    }
}

impl ModelCache {
    pub fn new(ner: Arc<dyn NerBackend>, skills: Arc<SkillsDictionary>) -> Self {
        info!("Model cache ready: {} ({} skills)", ner.model_name(), skills.len());
        Self { ner, skills }
    }

    /// Cache over `ner` and the embedded skills dictionary.
    pub fn with_builtin_skills(ner: Arc<dyn NerBackend>) -> Result<Self, PipelineError> {
        let skills = SkillsDictionary::builtin()?;
        Ok(Self::new(ner, Arc::new(skills)))
    }

    /// Cache without a NER model; every document takes the rule-based path.
    pub fn rules_only() -> Result<Self, PipelineError> {
        Self::with_builtin_skills(Arc::new(UnavailableNer::default()))
    }

    pub fn ner(&self) -> Arc<dyn NerBackend> {
        Arc::clone(&self.ner)
    }

    pub fn skills(&self) -> Arc<SkillsDictionary> {
        Arc::clone(&self.skills)
    }

    /// Run [`HEALTH_PROBE`] through the backend.
    pub async fn health_check(&self) -> HealthStatus {
        let ner = self.ner();
        let model = ner.model_name().to_string();
        let probe = tokio::task::spawn_blocking(move || ner.infer(HEALTH_PROBE)).await;

        let detail = match probe {
            Ok(Ok(entities)) => {
                info!("NER health probe returned {} entities", entities.len());
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("health probe task failed: {e}")),
        };
        if let Some(ref d) = detail {
            warn!("NER model {} unhealthy: {}", model, d);
        }

        HealthStatus {
            model,
            ner_available: detail.is_none(),
            skills_loaded: self.skills.len(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl NerBackend for Probe {
        fn model_name(&self) -> &str {
            "probe"
        }

        fn infer(&self, text: &str) -> Result<Vec<RawEntity>, InferenceError> {
            assert_eq!(text, HEALTH_PROBE);
            Ok(vec![RawEntity::new("PERSON", "John Doe", 0, 8, 0.99)])
        }
    }

    #[tokio::test]
    async fn healthy_backend() {
        let cache = ModelCache::with_builtin_skills(Arc::new(Probe)).unwrap();
        let status = cache.health_check().await;
        assert!(status.ner_available);
        assert_eq!(status.model, "probe");
        assert!(status.skills_loaded > 0);
        assert!(status.detail.is_none());
    }

    #[tokio::test]
    async fn rules_only_cache_reports_unavailable() {
        let cache = ModelCache::rules_only().unwrap();
        let status = cache.health_check().await;
        assert!(!status.ner_available);
        assert_eq!(status.model, DEFAULT_MODEL_NAME);
        assert_eq!(status.detail.as_deref(), Some("NER model not available"));
    }
}
