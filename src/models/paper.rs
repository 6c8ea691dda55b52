use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// A single academic reference in the catalog.
///
/// `id`, `created_at` and `updated_at` are assigned by the store; a paper
/// built in memory has all three set to `None` until it is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: Option<i64>,
    pub title: String,
    /// Free-form delimited list of names, stored as-is.
    pub authors: String,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub r#abstract: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub pdf_path: Option<String>,
    pub keywords: Option<String>,
    pub notes: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Paper {
    pub fn new(title: impl Into<String>, authors: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: authors.into(),
            ..Default::default()
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Individual author names, split on commas and semicolons.
    pub fn author_list(&self) -> Vec<&str> {
        split_list(&self.authors)
    }

    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords.as_deref().map(split_list).unwrap_or_default()
    }
}

fn split_list(s: &str) -> Vec<&str> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
