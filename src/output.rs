//! Output types: the processed document and the structured candidate profile.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Which extractor produced a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    DigitalPdf,
    Ocr,
    Docx,
    PlainText,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::DigitalPdf => "digital_pdf",
            ProcessingMethod::Ocr => "ocr",
            ProcessingMethod::Docx => "docx",
            ProcessingMethod::PlainText => "plain_text",
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text extracted from one upload, tagged with how it was obtained.
///
/// Created once by the orchestrator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedDocument {
    text: String,
    file_name: String,
    file_size: u64,
    processing_method: ProcessingMethod,
    confidence_score: f32,
}

impl ProcessedDocument {
    /// The confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(
        text: String,
        file_name: impl Into<String>,
        file_size: u64,
        processing_method: ProcessingMethod,
        confidence_score: f32,
    ) -> Self {
        let confidence_score = if confidence_score.is_nan() {
            0.0
        } else {
            confidence_score.clamp(0.0, 1.0)
        };
        Self {
            text,
            file_name: file_name.into(),
            file_size,
            processing_method,
            confidence_score,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Upload size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn processing_method(&self) -> ProcessingMethod {
        self.processing_method
    }

    pub fn confidence_score(&self) -> f32 {
        self.confidence_score
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Which entity-extraction path produced a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    #[default]
    Statistical,
    RuleBased,
    Merged,
}

/// Profile categories that carry a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Skills,
    JobTitles,
    Companies,
    Education,
    ContactInfo,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Skills,
        Category::JobTitles,
        Category::Companies,
        Category::Education,
        Category::ContactInfo,
    ];
}

/// Keys of the contact map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Email,
    Phone,
    Linkedin,
    Name,
}

/// Structured candidate profile.
///
/// List fields never hold two entries that compare equal after trimming and
/// lowercasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeEntities {
    pub skills: Vec<String>,
    pub job_titles: Vec<String>,
    pub companies: Vec<String>,
    pub education: Vec<String>,
    pub contact_info: BTreeMap<ContactField, String>,
    pub experience_years: Option<u32>,
    pub confidence_scores: BTreeMap<Category, f32>,
    pub extraction_method: ExtractionMethod,
}

impl ResumeEntities {
    /// Confidence for `category`, 0.0 when absent.
    pub fn confidence(&self, category: Category) -> f32 {
        self.confidence_scores.get(&category).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.job_titles.is_empty()
            && self.companies.is_empty()
            && self.education.is_empty()
            && self.contact_info.is_empty()
            && self.experience_years.is_none()
    }
}

/// Result of the full pipeline: the document and the profile read from it.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeAnalysis {
    pub document: ProcessedDocument,
    pub entities: ResumeEntities,
}

/// Drop duplicates under trimmed, case-insensitive comparison.
///
/// The first-seen spelling survives and order is preserved. Entries are
/// stored trimmed; empty entries are dropped.
pub(crate) fn dedup_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}
