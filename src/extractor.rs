use regex::Regex;
use scraper::{ElementRef, Selector};
use thiserror::Error;

use crate::config::{ConfigError, Selectors};
use crate::models::{ReviewRecord, UNKNOWN_USERNAME, UNRATED};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("element group has no review body")]
    MissingBody,

    #[error("review body is empty")]
    EmptyBody,
}

pub struct Extractor {
    username: Selector,
    body: Selector,
    rating: Selector,
    rating_label_attr: String,
    rating_regex: Regex,
}

impl Extractor {
    pub fn new(selectors: &Selectors) -> Result<Self, ConfigError> {
        Ok(Extractor {
            username: compile(&selectors.username)?,
            body: compile(&selectors.body)?,
            rating: compile(&selectors.rating)?,
            rating_label_attr: selectors.rating_label_attr.clone(),
            // First number in labels like "bintang 4 dari 5" or "rated 4.5 out of 5"
            rating_regex: Regex::new(r"\d+(?:[.,]\d+)?").expect("static regex"),
        })
    }

    pub fn extract(&self, group: ElementRef<'_>) -> Result<ReviewRecord, ExtractionError> {
        let body = group
            .select(&self.body)
            .next()
            .ok_or(ExtractionError::MissingBody)?;
        let text = clean_text(&element_text(body));
        if text.is_empty() {
            return Err(ExtractionError::EmptyBody);
        }

        let username = group
            .select(&self.username)
            .next()
            .map(|e| clean_text(&element_text(e)))
            .unwrap_or_else(|| UNKNOWN_USERNAME.to_string());

        let rating = group
            .select(&self.rating)
            .next()
            .and_then(|e| e.value().attr(&self.rating_label_attr))
            .and_then(|label| self.parse_rating(label))
            .unwrap_or_else(|| UNRATED.to_string());

        Ok(ReviewRecord { username, text, rating })
    }

    pub fn parse_rating(&self, label: &str) -> Option<String> {
        self.rating_regex
            .find(label)
            .map(|m| m.as_str().replace(',', "."))
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("")
}

/// Newlines become spaces, then the ends are trimmed. Inner runs of spaces are
/// kept so keys match rows already stored in the CSV.
pub fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}
