use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{deep_link, format_timestamp, message_text};

/// One matched message, as sent to the browser in a `data:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent {
    pub channel: String,
    pub keyword: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub date: String,
    pub text: String,
    pub link: String,
}

impl DataEvent {
    pub fn new(
        channel: &str,
        keyword: &str,
        message_id: i64,
        date: &DateTime<Utc>,
        text: Option<&str>,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            keyword: keyword.to_string(),
            date: format_timestamp(date),
            text: message_text(text),
            link: deep_link(channel, message_id),
        }
    }
}

/// Progress, data and completion events of a single scrape, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    Log { message: String },
    Data(DataEvent),
    /// Terminal marker; exactly one per scrape and always last.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unknown line prefix in {0:?}")]
    UnknownPrefix(String),
    #[error("malformed data payload: {0}")]
    Data(String),
}

impl ScrapeEvent {
    pub fn log(message: impl Into<String>) -> Self {
        ScrapeEvent::Log {
            message: message.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ScrapeEvent::Done)
    }

    /// Encodes the event as one newline-terminated `text/event-stream` line.
    ///
    /// Log text is flattened so a single event never spans two lines.
    pub fn to_wire(&self) -> String {
        match self {
            ScrapeEvent::Log { message } => {
                format!("log:{}\n", message.replace(['\r', '\n'], " "))
            }
            ScrapeEvent::Data(data) => match serde_json::to_string(data) {
                Ok(json) => format!("data:{json}\n"),
                Err(err) => format!("log:Could not encode message {}: {err}\n", data.link),
            },
            ScrapeEvent::Done => "done:true\n".to_string(),
        }
    }

    /// Decodes a single line produced by [`ScrapeEvent::to_wire`].
    pub fn from_wire(line: &str) -> Result<Self, WireError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(message) = line.strip_prefix("log:") {
            return Ok(ScrapeEvent::log(message));
        }
        if let Some(payload) = line.strip_prefix("data:") {
            return serde_json::from_str(payload)
                .map(ScrapeEvent::Data)
                .map_err(|err| WireError::Data(err.to_string()));
        }
        if line == "done:true" {
            return Ok(ScrapeEvent::Done);
        }
        Err(WireError::UnknownPrefix(line.to_string()))
    }
}
