//! Deterministic entity extraction: regexes, keyword lines and the skills
//! dictionary.

use super::ner::RawEntity;
use super::skills::{display_skill, SkillsDictionary};
use crate::config::PipelineConfig;
use crate::output::{
    dedup_case_insensitive, Category, ContactField, ExtractionMethod, ResumeEntities,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static RE_LINKEDIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/in/[A-Za-z0-9-]+/?").unwrap()
});
static RE_PHONE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d+]").unwrap());
static RE_TITLE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static RE_ORG_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.]").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const JOB_TITLE_KEYWORDS: &[&str] = &[
    "engineer", "developer", "programmer", "analyst", "manager", "director", "lead", "senior",
    "junior", "principal", "architect", "consultant", "specialist", "coordinator",
    "administrator", "technician", "designer", "scientist", "researcher", "intern", "associate",
    "executive", "officer",
];

const EDUCATION_KEYWORDS: &[&str] = &[
    "university", "college", "school", "institute", "academy", "bachelor", "master", "phd",
    "doctorate", "degree", "diploma", "certificate", "bs", "ba", "ms", "ma", "mba", "bsc", "msc",
    "beng", "meng",
];

const COMPANY_INDICATORS: &[&str] = &[
    "inc", "corp", "ltd", "llc", "company", "technologies", "systems", "solutions",
];

const SKILLS_CONFIDENCE: f32 = 0.75;
const JOB_TITLES_CONFIDENCE: f32 = 0.70;
const COMPANIES_CONFIDENCE: f32 = 0.65;
const EDUCATION_CONFIDENCE: f32 = 0.70;
const CONTACT_CONFIDENCE: f32 = 0.80;

/// Keyword-line rule: lines with a word starting with one of `keywords` are
/// cleaned with `punct` and kept when their length lies strictly between
/// `min_len` and `max_len`.
struct LineRule {
    keywords: &'static [&'static str],
    punct: &'static Lazy<Regex>,
    min_len: usize,
    max_len: usize,
}

static JOB_TITLE_RULE: LineRule = LineRule {
    keywords: JOB_TITLE_KEYWORDS,
    punct: &RE_TITLE_PUNCT,
    min_len: 5,
    max_len: 100,
};

static EDUCATION_RULE: LineRule = LineRule {
    keywords: EDUCATION_KEYWORDS,
    punct: &RE_ORG_PUNCT,
    min_len: 5,
    max_len: 150,
};

static COMPANY_RULE: LineRule = LineRule {
    keywords: COMPANY_INDICATORS,
    punct: &RE_ORG_PUNCT,
    min_len: 3,
    max_len: 100,
};

impl LineRule {
    fn matches(&self, text: &str, limit: usize) -> Vec<String> {
        let found = text.lines().filter(|line| has_keyword(line, self.keywords)).filter_map(|line| {
            let cleaned = self.punct.replace_all(line, " ");
            let cleaned = RE_SPACES.replace_all(cleaned.trim(), " ").into_owned();
            let len = cleaned.chars().count();
            (len > self.min_len && len < self.max_len).then_some(cleaned)
        });
        let mut unique = dedup_case_insensitive(found);
        unique.truncate(limit);
        unique
    }
}

/// Keywords shorter than this (degree abbreviations such as `ms`) must match
/// a whole word; longer ones match any word they start.
const MIN_PREFIX_KEYWORD_LEN: usize = 3;

/// Whether a lowercase word of `line` starts with one of `keywords`, so
/// "Corporation" hits `corp` and "Masters" hits `master`.
fn has_keyword(line: &str, keywords: &[&str]) -> bool {
    line.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            keywords.iter().any(|kw| {
                if kw.len() < MIN_PREFIX_KEYWORD_LEN {
                    word == *kw
                } else {
                    word.starts_with(kw)
                }
            })
        })
}

/// Always-available extractor used when the NER model is missing or unsure.
#[derive(Debug, Clone)]
pub struct RuleBasedFallbackExtractor {
    skills: Arc<SkillsDictionary>,
    threshold: f32,
    max_matches: usize,
}

impl RuleBasedFallbackExtractor {
    pub fn new(skills: Arc<SkillsDictionary>, config: &PipelineConfig) -> Self {
        Self {
            skills,
            threshold: config.fallback_confidence_threshold,
            max_matches: config.max_rule_matches,
        }
    }

    /// True when there are no entities or their mean score is below the
    /// fallback threshold.
    pub fn should_use_fallback(&self, entities: &[RawEntity]) -> bool {
        if entities.is_empty() {
            info!("Fallback decision: no NER entities");
            return true;
        }
        let total: f64 = entities.iter().map(|e| f64::from(e.score)).sum();
        let mean = (total / entities.len() as f64) as f32;
        let use_fallback = mean < self.threshold;
        info!(
            "Fallback decision: mean score {:.3}, threshold {:.2}, fallback {}",
            mean, self.threshold, use_fallback
        );
        use_fallback
    }

    /// Extract a profile from `text` without the model.
    pub fn extract(&self, text: &str) -> ResumeEntities {
        let contact_info = extract_contacts(text);
        let skills = self.extract_skills(text);
        let job_titles = JOB_TITLE_RULE.matches(text, self.max_matches);
        let education = EDUCATION_RULE.matches(text, self.max_matches);
        let companies = COMPANY_RULE.matches(text, self.max_matches);

        info!(
            "Rule-based extraction: {} skills, {} titles, {} companies, {} education, {} contacts",
            skills.len(),
            job_titles.len(),
            companies.len(),
            education.len(),
            contact_info.len()
        );

        let confidence_scores = BTreeMap::from([
            (Category::Skills, SKILLS_CONFIDENCE),
            (Category::JobTitles, JOB_TITLES_CONFIDENCE),
            (Category::Companies, COMPANIES_CONFIDENCE),
            (Category::Education, EDUCATION_CONFIDENCE),
            (Category::ContactInfo, CONTACT_CONFIDENCE),
        ]);

        ResumeEntities {
            skills,
            job_titles,
            companies,
            education,
            contact_info,
            experience_years: None,
            confidence_scores,
            extraction_method: ExtractionMethod::RuleBased,
        }
    }

    /// Dictionary skills found in `text`, in display form, sorted
    /// alphabetically ignoring case.
    fn extract_skills(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut skills =
            dedup_case_insensitive(self.skills.find_in(&lower).into_iter().map(display_skill));
        skills.sort_by_key(|s| s.to_lowercase());
        skills
    }
}

fn extract_contacts(text: &str) -> BTreeMap<ContactField, String> {
    let mut contact = BTreeMap::new();
    if let Some(m) = RE_EMAIL.find(text) {
        contact.insert(ContactField::Email, m.as_str().to_string());
    }
    if let Some(m) = RE_PHONE.find(text) {
        if RE_PHONE_NOISE.replace_all(m.as_str(), "").len() >= 10 {
            contact.insert(ContactField::Phone, m.as_str().trim().to_string());
        }
    }
    if let Some(m) = RE_LINKEDIN.find(text) {
        contact.insert(ContactField::Linkedin, m.as_str().to_string());
    }
    contact
}
