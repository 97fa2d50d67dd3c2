//! Statistical entity extraction over an injected NER backend.

use super::NerBackend;
use crate::config::PipelineConfig;
use crate::error::{NluStage, PipelineError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// One span tagged by the NER model.
///
/// Deserialises from `{label, text, start, end, score}` and from the
/// token-classification shape `{entity_group, word, start, end, score}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(alias = "entity_group", alias = "entity")]
    pub label: String,
    #[serde(alias = "word")]
    pub text: String,
    /// Character offset of the first character.
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    pub score: f32,
}

impl RawEntity {
    pub fn new(label: impl Into<String>, text: impl Into<String>, start: usize, end: usize, score: f32) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            start,
            end,
            score,
        }
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.@()+]").unwrap());

/// Normalise text before inference.
///
/// Whitespace runs become one space, characters other than word characters,
/// whitespace and `- . @ ( ) +` become a space, the result is cut to
/// `max_chars` characters and trimmed.
pub fn preprocess(text: &str, max_chars: usize) -> String {
    let collapsed = RE_WHITESPACE.replace_all(text, " ");
    let cleaned = RE_UNSAFE_CHARS.replace_all(&collapsed, " ");

    let truncated = match cleaned.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            warn!(
                "Text truncated for NER from {} to {} chars",
                cleaned.chars().count(),
                max_chars
            );
            &cleaned[..byte_idx]
        }
        None => &cleaned[..],
    };
    truncated.trim().to_string()
}

/// Runs the NER model and keeps confident entities.
#[derive(Clone)]
pub struct StatisticalEntityExtractor {
    backend: Arc<dyn NerBackend>,
    threshold: f32,
    max_chars: usize,
}

impl std::fmt::Debug for StatisticalEntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticalEntityExtractor")
            .field("model", &self.model_name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl StatisticalEntityExtractor {
    pub fn new(backend: Arc<dyn NerBackend>, config: &PipelineConfig) -> Self {
        Self {
            backend,
            threshold: config.ner_confidence_threshold,
            max_chars: config.ner_max_chars,
        }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Preprocess, infer, and keep entities scoring at least the threshold.
    /// Blocking.
    ///
    /// # Errors
    /// `NluProcessing { stage: entity_extraction }` when the model is not
    /// loaded or inference fails.
    pub fn extract(&self, text: &str) -> Result<Vec<RawEntity>, PipelineError> {
        let cleaned = preprocess(text, self.max_chars);
        info!(
            "Running NER inference with {} on {} chars",
            self.model_name(),
            cleaned.chars().count()
        );

        let raw = self.backend.infer(&cleaned).map_err(|e| {
            PipelineError::nlu(
                NluStage::EntityExtraction,
                Some(self.model_name()),
                e.to_string(),
            )
        })?;

        let total = raw.len();
        let kept: Vec<RawEntity> = raw
            .into_iter()
            .filter(|e| e.score >= self.threshold)
            .collect();
        info!(
            "NER kept {}/{} entities (threshold {:.2})",
            kept.len(),
            total,
            self.threshold
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::{InferenceError, UnavailableNer};

    struct Fixed(Vec<RawEntity>);

    impl NerBackend for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn infer(&self, _text: &str) -> Result<Vec<RawEntity>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn preprocess_collapses_whitespace() {
        assert_eq!(
            preprocess("John    Smith\n\n\nSoftware   Engineer", 5000),
            "John Smith Software Engineer"
        );
    }

    #[test]
    fn preprocess_keeps_contact_punctuation() {
        let out = preprocess("John Smith! @#$% (555) +1 a.b-c", 5000);
        assert!(!out.contains('!'));
        assert!(!out.contains('#'));
        assert!(out.contains('@'));
        assert!(out.contains("(555) +1 a.b-c"));
    }

    #[test]
    fn preprocess_truncates_silently() {
        assert_eq!(preprocess(&"x".repeat(6000), 5000).len(), 5000);
        assert_eq!(preprocess(&"é".repeat(10), 4), "éééé");
    }

    #[test]
    fn keeps_entities_at_or_above_threshold() {
        let backend = Fixed(vec![
            RawEntity::new("SKILLS", "Python", 0, 6, 0.95),
            RawEntity::new("COMPANY", "TechCorp", 10, 18, 0.80),
            RawEntity::new("SKILLS", "SomeSkill", 20, 29, 0.79),
        ]);
        let extractor = StatisticalEntityExtractor::new(Arc::new(backend), &PipelineConfig::default());
        let kept = extractor.extract("Python at TechCorp SomeSkill").unwrap();
        let words: Vec<_> = kept.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(words, ["Python", "TechCorp"]);
    }

    #[test]
    fn unavailable_model_is_entity_extraction_error() {
        let extractor =
            StatisticalEntityExtractor::new(Arc::new(UnavailableNer::default()), &PipelineConfig::default());
        let err = extractor.extract("anything").unwrap_err();
        assert_eq!(err.stage(), Some("entity_extraction"));
        assert!(err.to_string().contains("not available"), "got: {err}");
    }

    #[test]
    fn deserialises_pipeline_shape() {
        let json = r#"[{"entity_group":"JOB_TITLE","word":"Engineer","start":4,"end":12,"score":0.9}]"#;
        let parsed: Vec<RawEntity> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0], RawEntity::new("JOB_TITLE", "Engineer", 4, 12, 0.9));
    }
}
