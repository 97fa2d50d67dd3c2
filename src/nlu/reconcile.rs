//! Choose between, or merge, the statistical and rule-based profiles.
//!
//! 1. Run NER. If its confident entities look trustworthy (mean score at or
//!    above the fallback threshold) the post-processed result is returned
//!    alone.
//! 2. Otherwise the statistical result is merged with the rule-based one.
//! 3. Any failure on the statistical path (model missing, inference error,
//!    malformed output, task panic) returns the rule-based profile alone.
//!
//! Only when the rule-based path also fails does the caller see an error.

use super::ner::StatisticalEntityExtractor;
use super::postprocess::EntityPostProcessor;
use super::rules::RuleBasedFallbackExtractor;
use super::ModelCache;
use crate::config::PipelineConfig;
use crate::error::{NluStage, PipelineError};
use crate::output::{dedup_case_insensitive, ExtractionMethod, ResumeEntities};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Entity extraction entry point.
///
/// Cheap to clone; clones share the model cache and the concurrency limit.
#[derive(Debug, Clone)]
pub struct EntityReconciler {
    statistical: StatisticalEntityExtractor,
    postprocessor: EntityPostProcessor,
    fallback: RuleBasedFallbackExtractor,
    permits: Arc<Semaphore>,
}

impl EntityReconciler {
    pub fn new(cache: &ModelCache, config: &PipelineConfig) -> Self {
        Self {
            statistical: StatisticalEntityExtractor::new(cache.ner(), config),
            postprocessor: EntityPostProcessor::new(config.confidence_aggregation),
            fallback: RuleBasedFallbackExtractor::new(cache.skills(), config),
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
        }
    }

    /// Extract a profile from document text.
    ///
    /// # Errors
    /// `NluProcessing { stage: nlu_service }` when both paths failed.
    pub async fn extract(&self, text: &str) -> Result<ResumeEntities, PipelineError> {
        let started = Instant::now();

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Internal(format!("NLU semaphore closed: {e}")))?;

        let this = self.clone();
        let owned = text.to_string();
        let statistical = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            this.statistical_path(&owned)
        })
        .await;

        let failure = match statistical {
            Ok(Ok(entities)) => {
                info!(
                    "Entity extraction via {:?} in {:?}",
                    entities.extraction_method,
                    started.elapsed()
                );
                return Ok(entities);
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("statistical task failed: {e}"),
        };
        warn!("Statistical extraction failed, using rule-based only: {}", failure);

        let rules = self
            .rule_based(text)
            .await
            .map_err(|e| both_failed(self.statistical.model_name(), &failure, &e))?;

        info!("Entity extraction via RuleBased in {:?}", started.elapsed());
        Ok(rules)
    }

    /// Rule-based profile alone, on the blocking pool.
    ///
    /// # Errors
    /// `NluProcessing { stage: fallback_extraction }` if the extractor task
    /// did not complete.
    pub async fn rule_based(&self, text: &str) -> Result<ResumeEntities, PipelineError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Internal(format!("NLU semaphore closed: {e}")))?;
        let fallback = self.fallback.clone();
        let owned = text.to_string();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            fallback.extract(&owned)
        })
        .await
        .map_err(|e| {
            PipelineError::nlu(
                NluStage::FallbackExtraction,
                None,
                format!("rule-based task failed: {e}"),
            )
        })
    }

    /// NER, post-processing and, when the NER output looks weak, a merge
    /// with the rule-based profile. Blocking.
    fn statistical_path(&self, text: &str) -> Result<ResumeEntities, PipelineError> {
        let raw = self.statistical.extract(text)?;
        let processed = self.postprocessor.process(&raw)?;
        if self.fallback.should_use_fallback(&raw) {
            debug!("Merging statistical result with rule-based extraction");
            let rules = self.fallback.extract(text);
            Ok(merge(&processed, &rules))
        } else {
            Ok(processed)
        }
    }
}

/// Terminal error once the statistical path and the rule-based path have
/// both failed.
fn both_failed(model: &str, statistical: &str, rules: &PipelineError) -> PipelineError {
    PipelineError::nlu(
        NluStage::NluService,
        Some(model),
        format!("statistical path: {statistical}; rule-based path: {rules}"),
    )
}

/// Combine a statistical and a rule-based profile.
///
/// - skills: union, statistical first, case-insensitive dedup
/// - job titles, companies, education: statistical when non-empty, else
///   rule-based
/// - contact info: rule-based, overwritten key by key by statistical
/// - experience years: statistical
/// - confidence per category: mean when both sides are non-zero, else the
///   non-zero side
pub fn merge(statistical: &ResumeEntities, rules: &ResumeEntities) -> ResumeEntities {
    let prefer = |s: &Vec<String>, r: &Vec<String>| if s.is_empty() { r.clone() } else { s.clone() };

    let mut contact_info = rules.contact_info.clone();
    contact_info.extend(statistical.contact_info.clone());

    let categories: BTreeSet<_> = statistical
        .confidence_scores
        .keys()
        .chain(rules.confidence_scores.keys())
        .copied()
        .collect();
    let confidence_scores = categories
        .into_iter()
        .map(|cat| {
            let s = statistical.confidence(cat);
            let r = rules.confidence(cat);
            let merged = if s > 0.0 && r > 0.0 { (s + r) / 2.0 } else { s.max(r) };
            (cat, merged)
        })
        .collect();

    ResumeEntities {
        skills: dedup_case_insensitive(statistical.skills.iter().chain(&rules.skills)),
        job_titles: prefer(&statistical.job_titles, &rules.job_titles),
        companies: prefer(&statistical.companies, &rules.companies),
        education: prefer(&statistical.education, &rules.education),
        contact_info,
        experience_years: statistical.experience_years,
        confidence_scores,
        extraction_method: ExtractionMethod::Merged,
    }
}
