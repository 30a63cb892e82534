use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::delay_manager::RetryPolicy;

pub const DEFAULT_OUTPUT: &str = "tokopedia_reviews.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid CSS selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Selectors {
    /// `id` of the `<section>` holding the review feed.
    pub review_section_id: String,
    /// Tag of one element group inside the section.
    pub element_tag: String,
    pub username: String,
    pub body: String,
    pub rating: String,
    /// Attribute of the rating element carrying the textual label.
    pub rating_label_attr: String,
    pub next_page: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            review_section_id: "review-feed".to_string(),
            element_tag: "article".to_string(),
            username: "span.name".to_string(),
            body: r#"span[data-testid="lblItemUlasan"]"#.to_string(),
            rating: r#"div[data-testid="icnStarRating"]"#.to_string(),
            rating_label_attr: "aria-label".to_string(),
            next_page: r#"button[aria-label^="Laman berikutnya"]"#.to_string(),
        }
    }
}

impl Selectors {
    /// Selector matching the review section itself, for presence waits.
    pub fn review_section(&self) -> String {
        format!(r#"section[id="{}"]"#, self.review_section_id)
    }
}

#[derive(Debug, Clone)]
pub struct Timings {
    /// After opening a URL, before the first reveal.
    pub initial_render: Duration,
    /// After the review feed appears, before taking the snapshot.
    pub snapshot_settle: Duration,
    /// After scrolling to the bottom, before looking for the next control.
    pub bottom_settle: Duration,
    /// After clicking next, before revealing the new page.
    pub navigation_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            initial_render: Duration::from_secs(3),
            snapshot_settle: Duration::from_secs(2),
            bottom_settle: Duration::from_secs(1),
            navigation_settle: Duration::from_secs(3),
        }
    }
}

impl Timings {
    pub fn zero() -> Self {
        Timings {
            initial_render: Duration::ZERO,
            snapshot_settle: Duration::ZERO,
            bottom_settle: Duration::ZERO,
            navigation_settle: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_path: PathBuf,
    pub input_path: Option<PathBuf>,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub selectors: Selectors,
    pub timings: Timings,
    pub reveal_retry: RetryPolicy,
    pub advance_retry: RetryPolicy,
    /// Pages with fewer element groups than this end the listing.
    pub low_volume_threshold: usize,
    pub max_pages: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            input_path: None,
            chrome_path: None,
            headless: false,
            selectors: Selectors::default(),
            timings: Timings::default(),
            reveal_retry: RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(2)),
            advance_retry: RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(2)),
            low_volume_threshold: 10,
            max_pages: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = get("REVIEWS_OUTPUT") {
            cfg.output_path = PathBuf::from(path);
        }
        cfg.input_path = get("REVIEWS_INPUT").map(PathBuf::from);
        cfg.chrome_path = get("CHROME_PATH").map(PathBuf::from);

        if let Some(raw) = get("SCRAPER_HEADLESS") {
            cfg.headless = parse_bool("SCRAPER_HEADLESS", &raw)?;
        }
        if let Some(raw) = get("SCRAPER_MAX_PAGES") {
            let pages = raw
                .parse::<usize>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or(ConfigError::InvalidValue { key: "SCRAPER_MAX_PAGES", value: raw })?;
            cfg.max_pages = Some(pages);
        }
        if let Some(raw) = get("SCRAPER_WAIT_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { key: "SCRAPER_WAIT_TIMEOUT_SECS", value: raw })?;
            cfg.reveal_retry.timeout = Duration::from_secs(secs);
            cfg.advance_retry.timeout = Duration::from_secs(secs);
        }

        Ok(cfg)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw.to_string() }),
    }
}
