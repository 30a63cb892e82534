use serde::{Deserialize, Serialize};

pub const UNKNOWN_USERNAME: &str = "N/A";
pub const UNRATED: &str = "0";

/// One scraped review. Column names match the persisted CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "Username", default = "unknown_username")]
    pub username: String,
    #[serde(rename = "Review")]
    pub text: String,
    #[serde(rename = "Rating", default = "unrated")]
    pub rating: String,
}

fn unknown_username() -> String {
    UNKNOWN_USERNAME.to_string()
}

fn unrated() -> String {
    UNRATED.to_string()
}

impl ReviewRecord {
    pub fn new(username: impl Into<String>, text: impl Into<String>, rating: impl Into<String>) -> Self {
        ReviewRecord {
            username: username.into(),
            text: text.into(),
            rating: rating.into(),
        }
    }

    /// Identity used for deduplication. Rating is deliberately not part of it.
    pub fn key(&self) -> (&str, &str) {
        (&self.username, &self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Success,
    NoData,
    Error,
}

impl Default for ScrapeStatus {
    fn default() -> Self {
        ScrapeStatus::NoData
    }
}

#[derive(Debug, Clone)]
pub struct UrlReport {
    pub url: String,
    pub status: ScrapeStatus,
    pub records: usize,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<ReviewRecord>,
    pub reports: Vec<UrlReport>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
