//! Scout core: pure request parsing, scrape events and their wire encoding.
mod event;
mod message;
mod request;

pub use event::{DataEvent, ScrapeEvent, WireError};
pub use message::{
    clean_snippet, deep_link, format_timestamp, message_text, DISCOVERY_PLACEHOLDER,
    MEDIA_PLACEHOLDER, TIMESTAMP_FORMAT,
};
pub use request::{
    normalize_channel, parse_lines, LimitField, RequestError, ScrapeForm, ScrapeRequest,
    DEFAULT_LIMIT,
};
