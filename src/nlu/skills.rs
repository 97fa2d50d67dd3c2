//! Technical skills dictionary and skill-name normalisation.
//!
//! The dictionary maps a category (e.g. `databases`) to lowercase skill
//! names. A copy ships inside the binary (`src/data/technical_skills.json`);
//! deployments can load their own with [`SkillsDictionary::from_json`].
//! Match patterns are compiled once at load time.

use crate::error::PipelineError;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

const BUILTIN_SKILLS_JSON: &str = include_str!("../data/technical_skills.json");

struct SkillPattern {
    skill: String,
    pattern: Regex,
}

/// Lowercase skill names grouped by category, with precompiled matchers.
pub struct SkillsDictionary {
    categories: BTreeMap<String, BTreeSet<String>>,
    patterns: Vec<SkillPattern>,
}

impl std::fmt::Debug for SkillsDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillsDictionary")
            .field("categories", &self.categories.len())
            .field("skills", &self.patterns.len())
            .finish()
    }
}

impl SkillsDictionary {
    /// The dictionary embedded in the crate.
    pub fn builtin() -> Result<Self, PipelineError> {
        Self::from_json(BUILTIN_SKILLS_JSON)
    }

    /// Parse a JSON object of `category → [skill, ...]`.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidConfig(format!("skills dictionary: {e}")))?;
        Self::from_categories(raw)
    }

    pub fn from_categories(raw: BTreeMap<String, Vec<String>>) -> Result<Self, PipelineError> {
        let mut categories = BTreeMap::new();
        let mut all = BTreeSet::new();
        for (category, skills) in raw {
            let normalised: BTreeSet<String> = skills
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            all.extend(normalised.iter().cloned());
            categories.insert(category, normalised);
        }

        let patterns = all
            .into_iter()
            .map(|skill| {
                let pattern = Regex::new(&format!(r"(?:^|\W){}(?:\W|$)", regex::escape(&skill)))
                    .map_err(|e| {
                        PipelineError::InvalidConfig(format!("skill pattern '{skill}': {e}"))
                    })?;
                Ok(SkillPattern { skill, pattern })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        info!(
            "Skills dictionary loaded: {} categories, {} skills",
            categories.len(),
            patterns.len()
        );
        Ok(Self {
            categories,
            patterns,
        })
    }

    /// Number of distinct skills across all categories.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Lowercase dictionary skills that occur as whole words in `text_lower`.
    pub fn find_in(&self, text_lower: &str) -> Vec<&str> {
        self.patterns
            .iter()
            .filter(|p| p.pattern.is_match(text_lower))
            .map(|p| p.skill.as_str())
            .collect()
    }
}

/// Capitalise the first letter of every alphabetic run, lowercase the rest.
///
/// `"machine learning"` → `"Machine Learning"`, `"html5"` → `"Html5"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Canonical spelling for well-known skills whose title case reads wrong.
pub fn canonical_skill(lower: &str) -> Option<&'static str> {
    let canonical = match lower {
        "javascript" => "JavaScript",
        "typescript" => "TypeScript",
        "nodejs" | "node.js" => "Node.js",
        "reactjs" => "React",
        "vuejs" => "Vue.js",
        "angularjs" => "Angular",
        "css3" | "css" => "CSS",
        "html5" | "html" => "HTML",
        "postgresql" | "postgres" => "PostgreSQL",
        "mysql" => "MySQL",
        "mongodb" => "MongoDB",
        "aws" => "AWS",
        "gcp" => "Google Cloud",
        "azure" => "Azure",
        "golang" => "Go",
        "next.js" => "Next.js",
        "graphql" => "GraphQL",
        "grpc" => "gRPC",
        "sql" => "SQL",
        "sql server" => "SQL Server",
        "sqlite" => "SQLite",
        "mariadb" => "MariaDB",
        "dynamodb" => "DynamoDB",
        "bigquery" => "BigQuery",
        "clickhouse" => "ClickHouse",
        "influxdb" => "InfluxDB",
        "couchdb" => "CouchDB",
        "php" => "PHP",
        "ios" => "iOS",
        "nlp" => "NLP",
        "llm" => "LLM",
        "oop" => "OOP",
        "tdd" => "TDD",
        "ci/cd" => "CI/CD",
        "ec2" => "EC2",
        "s3" => "S3",
        "asp.net" => "ASP.NET",
        ".net" => ".NET",
        "fastapi" => "FastAPI",
        "nestjs" => "NestJS",
        "pytorch" => "PyTorch",
        "tensorflow" => "TensorFlow",
        "numpy" => "NumPy",
        "scikit-learn" => "scikit-learn",
        "powershell" => "PowerShell",
        "github actions" => "GitHub Actions",
        "gitlab ci" => "GitLab CI",
        "vs code" => "VS Code",
        "intellij" => "IntelliJ",
        "websockets" => "WebSockets",
        "swiftui" => "SwiftUI",
        _ => return None,
    };
    Some(canonical)
}

/// Display form of a dictionary skill: canonical spelling if known, else
/// title case.
pub fn display_skill(lower: &str) -> String {
    canonical_skill(lower)
        .map(str::to_string)
        .unwrap_or_else(|| title_case(lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dictionary_loads() {
        let dict = SkillsDictionary::builtin().unwrap();
        assert!(dict.len() > 100);
        assert!(dict.categories().any(|(name, _)| name == "databases"));
    }

    #[test]
    fn whole_word_matching() {
        let dict = SkillsDictionary::from_json(r#"{"langs": ["Java", "C++", "rust"]}"#).unwrap();
        let found = dict.find_in("javascript and c++, trusted");
        assert_eq!(found, vec!["c++"]);
        let found = dict.find_in("java/rust");
        assert_eq!(found, vec!["java", "rust"]);
    }

    #[test]
    fn title_case_matches_word_starts() {
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("html5"), "Html5");
        assert_eq!(title_case("c++"), "C++");
        assert_eq!(title_case("ruby on rails"), "Ruby On Rails");
    }

    #[test]
    fn canonical_spellings() {
        assert_eq!(display_skill("javascript"), "JavaScript");
        assert_eq!(display_skill("nodejs"), "Node.js");
        assert_eq!(display_skill("aws"), "AWS");
        assert_eq!(display_skill("docker"), "Docker");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let err = SkillsDictionary::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
