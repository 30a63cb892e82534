use std::fs::File;
use std::path::Path;
use calamine::{open_workbook_auto, Reader};
use log::{info, warn};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid input: count must be a whole number from 1 to 1000 (got {0:?})")]
    InvalidCount(String),

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("{0} has no url column (expected a header named url, URL, link or Link)")]
    MissingUrlColumn(String),

    #[error("no usable product URLs")]
    NoUrls,
}

pub fn validate_url(raw: &str) -> Result<String, InputError> {
    let candidate = raw.trim();
    let invalid = |reason: &str| InputError::InvalidUrl {
        url: candidate.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(candidate).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(candidate.to_string()),
        "http" | "https" => Err(invalid("missing host")),
        other => Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
}

/// Loads product URLs from a CSV or Excel sheet with a url/link column.
/// Invalid rows are skipped with a warning.
pub fn load_urls<P: AsRef<Path>>(filename: P) -> Result<Vec<String>, InputError> {
    let path = filename.as_ref();
    let is_excel = path
        .extension()
        .map_or(false, |ext| ext == "xlsx" || ext == "xls");

    let raw = if is_excel { load_excel(path)? } else { load_csv(path)? };

    let urls: Vec<String> = raw
        .into_iter()
        .filter(|u| !u.trim().is_empty())
        .filter_map(|u| match validate_url(&u) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("{}. Skipped.", e);
                None
            }
        })
        .collect();

    info!("Loaded {} product URLs from {:?}", urls.len(), path);
    if urls.is_empty() {
        return Err(InputError::NoUrls);
    }
    Ok(urls)
}

fn is_url_header(header: &str) -> bool {
    matches!(header.trim().to_lowercase().as_str(), "url" | "link" | "product url" | "website")
}

fn unreadable(path: &Path, e: impl std::fmt::Display) -> InputError {
    InputError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn load_csv(path: &Path) -> Result<Vec<String>, InputError> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = rdr.headers().map_err(|e| unreadable(path, e))?.clone();
    let column = headers
        .iter()
        .position(is_url_header)
        .ok_or_else(|| InputError::MissingUrlColumn(path.display().to_string()))?;

    let mut urls = Vec::new();
    for result in rdr.records() {
        match result {
            Ok(record) => {
                if let Some(value) = record.get(column) {
                    urls.push(value.to_string());
                }
            }
            Err(e) => warn!("Error parsing CSV row: {}", e),
        }
    }
    Ok(urls)
}

fn load_excel(path: &Path) -> Result<Vec<String>, InputError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unreadable(path, "workbook has no sheets"))?
        .map_err(|e| unreadable(path, e))?;

    let mut rows = range.rows();
    let column = rows
        .next()
        .and_then(|header| header.iter().position(|cell| is_url_header(&cell.to_string())))
        .ok_or_else(|| InputError::MissingUrlColumn(path.display().to_string()))?;

    Ok(rows
        .filter_map(|row| row.get(column).map(|cell| cell.to_string()))
        .collect())
}
