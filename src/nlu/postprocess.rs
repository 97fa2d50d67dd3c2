//! Turn raw NER spans into a structured profile.
//!
//! Steps, in order:
//!
//! 1. **Group** adjacent sub-word tokens of the same label (`Tech` + `##Corp`)
//! 2. **Categorise** labels into profile fields, dropping unknown labels
//! 3. **Deduplicate** each field case-insensitively
//! 4. **Structure** contact strings into email / phone / linkedin / name
//! 5. **Score** each populated category
//! 6. **Experience years** from the first raw span mentioning a year count

use super::ner::RawEntity;
use crate::config::{ConfidenceAggregation, FIXED_CATEGORY_CONFIDENCE};
use crate::error::{NluStage, PipelineError};
use crate::output::{Category, ContactField, ExtractionMethod, ResumeEntities};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Maximum gap, in characters, between two spans that still belong together.
pub const MAX_GROUP_GAP: usize = 2;

static RE_CONTACT_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").unwrap());
static RE_CONTACT_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+\-()\s\d]{10,}$").unwrap());
static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Profile field a raw label feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Contact,
    Category(Category),
}

/// Uppercase label without a `B-` / `I-` tagging prefix.
fn bare_label(label: &str) -> String {
    let upper = label.trim().to_ascii_uppercase();
    match upper.strip_prefix("B-").or_else(|| upper.strip_prefix("I-")) {
        Some(rest) => rest.to_string(),
        None => upper,
    }
}

fn field_for_label(label: &str) -> Option<Field> {
    match bare_label(label).as_str() {
        "PERSON" | "EMAIL" | "PHONE" | "LINKEDIN" => Some(Field::Contact),
        "SKILLS" => Some(Field::Category(Category::Skills)),
        "JOB_TITLE" => Some(Field::Category(Category::JobTitles)),
        "COMPANY" => Some(Field::Category(Category::Companies)),
        "EDUCATION" | "DEGREE" | "UNIVERSITY" => Some(Field::Category(Category::Education)),
        _ => None,
    }
}

/// Spans after grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedEntity {
    pub label: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// Merge consecutive same-label spans whose gap is at most [`MAX_GROUP_GAP`].
///
/// Input is sorted by start offset first. Overlapping spans count as gap 0.
/// `##` word-piece markers are stripped and the merged score is the max.
pub fn group_adjacent(entities: &[RawEntity]) -> Vec<GroupedEntity> {
    let mut sorted: Vec<&RawEntity> = entities.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut grouped: Vec<GroupedEntity> = Vec::new();
    for entity in sorted {
        let piece = entity.text.replace("##", "");
        if let Some(current) = grouped.last_mut() {
            if bare_label(&current.label) == bare_label(&entity.label)
                && entity.start.saturating_sub(current.end) <= MAX_GROUP_GAP
            {
                current.text.push(' ');
                current.text.push_str(&piece);
                current.end = current.end.max(entity.end);
                current.score = current.score.max(entity.score);
                continue;
            }
        }
        grouped.push(GroupedEntity {
            label: entity.label.clone(),
            text: piece,
            start: entity.start,
            end: entity.end,
            score: entity.score,
        });
    }
    grouped
}

/// Structure contact strings. The first value for each key wins.
pub fn structure_contacts(candidates: &[String]) -> BTreeMap<ContactField, String> {
    let mut contact = BTreeMap::new();
    for raw in candidates {
        let value = raw.trim();
        let field = if value.contains('@') && RE_CONTACT_EMAIL.is_match(value) {
            ContactField::Email
        } else if RE_CONTACT_PHONE.is_match(value) {
            ContactField::Phone
        } else if value.to_lowercase().contains("linkedin.com") {
            ContactField::Linkedin
        } else if value.split_whitespace().count() >= 2 {
            ContactField::Name
        } else {
            continue;
        };
        contact.entry(field).or_insert_with(|| value.to_string());
    }
    contact
}

/// First integer in the first span whose lowercase text mentions "year" and
/// a digit.
pub fn experience_years(entities: &[RawEntity]) -> Option<u32> {
    entities.iter().find_map(|e| {
        let lower = e.text.to_lowercase();
        if lower.contains("year") && lower.chars().any(|c| c.is_ascii_digit()) {
            RE_DIGITS.find(&lower).and_then(|m| m.as_str().parse().ok())
        } else {
            None
        }
    })
}

/// Builds a [`ResumeEntities`] from filtered NER output.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityPostProcessor {
    aggregation: ConfidenceAggregation,
}

impl EntityPostProcessor {
    pub fn new(aggregation: ConfidenceAggregation) -> Self {
        Self { aggregation }
    }

    /// # Errors
    /// `NluProcessing { stage: post_processing }` for spans with
    /// `end < start` or a non-finite score.
    pub fn process(&self, entities: &[RawEntity]) -> Result<ResumeEntities, PipelineError> {
        if let Some(bad) = entities
            .iter()
            .find(|e| e.end < e.start || !e.score.is_finite())
        {
            return Err(PipelineError::nlu(
                NluStage::PostProcessing,
                None,
                format!(
                    "malformed entity '{}' ({}..{}, score {})",
                    bad.text, bad.start, bad.end, bad.score
                ),
            ));
        }

        let grouped = group_adjacent(entities);

        let mut contacts: Vec<(String, f32)> = Vec::new();
        let mut lists: BTreeMap<Category, Vec<(String, f32)>> = BTreeMap::new();
        for g in &grouped {
            let text = g.text.trim();
            if text.is_empty() {
                continue;
            }
            match field_for_label(&g.label) {
                Some(Field::Contact) => contacts.push((text.to_string(), g.score)),
                Some(Field::Category(cat)) => {
                    lists.entry(cat).or_default().push((text.to_string(), g.score))
                }
                None => debug!("Dropping entity with unmapped label {}", g.label),
            }
        }

        let contacts = dedup_scored(contacts);
        let lists: BTreeMap<Category, Vec<(String, f32)>> = lists
            .into_iter()
            .map(|(cat, items)| (cat, dedup_scored(items)))
            .collect();

        let mut confidence_scores = BTreeMap::new();
        for (cat, items) in lists.iter().filter(|(_, items)| !items.is_empty()) {
            confidence_scores.insert(*cat, self.category_confidence(items));
        }
        if !contacts.is_empty() {
            confidence_scores.insert(Category::ContactInfo, self.category_confidence(&contacts));
        }

        let take = |cat: Category| -> Vec<String> {
            lists
                .get(&cat)
                .map(|items| items.iter().map(|(t, _)| t.clone()).collect())
                .unwrap_or_default()
        };
        let contact_texts: Vec<String> = contacts.into_iter().map(|(t, _)| t).collect();

        Ok(ResumeEntities {
            skills: take(Category::Skills),
            job_titles: take(Category::JobTitles),
            companies: take(Category::Companies),
            education: take(Category::Education),
            contact_info: structure_contacts(&contact_texts),
            experience_years: experience_years(entities),
            confidence_scores,
            extraction_method: ExtractionMethod::Statistical,
        })
    }

    fn category_confidence(&self, items: &[(String, f32)]) -> f32 {
        match self.aggregation {
            ConfidenceAggregation::Fixed => FIXED_CATEGORY_CONFIDENCE,
            ConfidenceAggregation::MeanScore => {
                if items.is_empty() {
                    0.0
                } else {
                    items.iter().map(|(_, s)| *s).sum::<f32>() / items.len() as f32
                }
            }
        }
    }
}

/// Case-insensitive dedup that also drops entries shorter than 2 characters.
/// The first spelling and its score win.
fn dedup_scored(items: Vec<(String, f32)>) -> Vec<(String, f32)> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|(text, score)| {
            let text = text.trim().to_string();
            if text.chars().count() < 2 || !seen.insert(text.to_lowercase()) {
                return None;
            }
            Some((text, score))
        })
        .collect()
}
