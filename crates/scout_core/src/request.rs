use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

/// Per (channel, keyword) cap used when the form omits `limit`.
pub const DEFAULT_LIMIT: u32 = 100;

const LINK_PREFIXES: &[&str] = &[
    "https://t.me/s/",
    "http://t.me/s/",
    "t.me/s/",
    "https://t.me/",
    "http://t.me/",
    "t.me/",
];

/// One scrape: every active channel is searched for every active keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// Channel handles in input order. Blank entries are kept and skipped later.
    pub channels: Vec<String>,
    /// Keywords in input order. Blank entries are kept and skipped later.
    pub keywords: Vec<String>,
    /// Maximum number of messages returned per (channel, keyword) pair.
    pub limit: u32,
}

impl ScrapeRequest {
    pub fn new(channels: Vec<String>, keywords: Vec<String>, limit: u32) -> Self {
        Self {
            channels,
            keywords,
            limit,
        }
    }

    /// Normalized channel handles, without blanks or repeats, in input order.
    pub fn active_channels(&self) -> Vec<&str> {
        first_occurrences(self.channels.iter().map(|raw| normalize_channel(raw)))
    }

    /// Trimmed keywords, without blanks or repeats, in input order.
    pub fn active_keywords(&self) -> Vec<&str> {
        first_occurrences(self.keywords.iter().map(|raw| raw.trim()))
    }
}

fn first_occurrences<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(*item))
        .collect()
}

/// Reduces `@name`, `t.me/name` and links such as `https://t.me/name/123`
/// to `name`. Anything after the first path segment is dropped.
pub fn normalize_channel(raw: &str) -> &str {
    let mut handle = raw.trim();
    for prefix in LINK_PREFIXES {
        if let Some(rest) = handle.strip_prefix(prefix) {
            handle = rest;
            break;
        }
    }
    let handle = handle.split(['/', '?', '#']).next().unwrap_or_default();
    handle.strip_prefix('@').unwrap_or(handle).trim()
}

/// Splits a newline-separated text area into trimmed lines, blanks included.
pub fn parse_lines(raw: &str) -> Vec<String> {
    raw.split('\n').map(|line| line.trim().to_owned()).collect()
}

/// `limit` arrives either as a JSON number or as the text of an input box.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LimitField {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("limit '{0}' is not a whole number")]
    InvalidLimit(String),
    #[error("limit must be a positive number, got {0}")]
    NonPositiveLimit(i64),
}

/// JSON body of `POST /scrape`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScrapeForm {
    #[serde(default)]
    pub limit: Option<LimitField>,
    #[serde(default)]
    pub channels: String,
    #[serde(default)]
    pub keywords: String,
}

impl ScrapeForm {
    pub fn into_request(self) -> Result<ScrapeRequest, RequestError> {
        let limit = match self.limit {
            None => DEFAULT_LIMIT,
            Some(field) => parse_limit(field)?,
        };
        Ok(ScrapeRequest::new(
            parse_lines(&self.channels),
            parse_lines(&self.keywords),
            limit,
        ))
    }
}

fn parse_limit(field: LimitField) -> Result<u32, RequestError> {
    let value = match field {
        LimitField::Number(value) => value,
        LimitField::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(DEFAULT_LIMIT);
            }
            trimmed
                .parse::<i64>()
                .map_err(|_| RequestError::InvalidLimit(text.clone()))?
        }
    };
    if value <= 0 {
        return Err(RequestError::NonPositiveLimit(value));
    }
    u32::try_from(value).map_err(|_| RequestError::InvalidLimit(value.to_string()))
}
