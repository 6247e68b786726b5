use chrono::{DateTime, Utc};

/// Text shown for scraped messages without a body (photos, stickers, ...).
pub const MEDIA_PLACEHOLDER: &str = "[Media Message]";

/// Snippet used in discovery reports for messages without a body.
pub const DISCOVERY_PLACEHOLDER: &str = "[Media Message - No Text]";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.format(TIMESTAMP_FORMAT).to_string()
}

/// Message body as a single line, or [`MEDIA_PLACEHOLDER`] when there is none.
pub fn message_text(text: Option<&str>) -> String {
    match text {
        Some(body) if !body.is_empty() => flatten(body),
        _ => MEDIA_PLACEHOLDER.to_string(),
    }
}

/// First `max_chars` characters of a body, flattened to one line.
pub fn clean_snippet(text: Option<&str>, max_chars: usize) -> String {
    match text {
        Some(body) if !body.is_empty() => {
            let head: String = body.chars().take(max_chars).collect();
            flatten(&head)
        }
        _ => DISCOVERY_PLACEHOLDER.to_string(),
    }
}

pub fn deep_link(channel: &str, message_id: i64) -> String {
    format!("https://t.me/{channel}/{message_id}")
}

fn flatten(body: &str) -> String {
    body.replace(['\r', '\n'], " ")
}
