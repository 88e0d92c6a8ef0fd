use serde::{Deserialize, Serialize};

use crate::taxonomy::{Duration, Era};

/// Structured preferences derived from one request.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FilterSet {
    pub genre: String,
    /// `None` when the duration label was not recognised.
    pub duration: Option<Duration>,
    /// ISO 639-1 code.
    pub language: String,
    /// `None` when the era label was not recognised.
    pub era: Option<Era>,
    pub platform: Option<String>,
}

impl FilterSet {
    /// Builds a filter set from raw labels, normalising duration and era.
    pub fn from_labels(genre: &str, duration: &str, language: &str, era: &str) -> Self {
        Self {
            genre: genre.trim().to_string(),
            duration: Duration::from_label(duration),
            language: language.trim().to_string(),
            era: Era::from_label(era),
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }
}

/// A discovered movie plus the credits attached during enrichment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Candidate {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub popularity: f32,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
}
