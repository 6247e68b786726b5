use std::path::{Path, PathBuf};

use scout_core::format_timestamp;

use crate::discovery::DiscoveryRecord;
use crate::persist::{write_atomically, PersistError};

/// Excel needs the BOM to open UTF-8 files with non-Latin text correctly.
const UTF8_BOM: &str = "\u{feff}";

pub const REPORT_COLUMNS: [&str; 7] = [
    "message_date",
    "channel_username",
    "channel_title",
    "keyword_found",
    "message_snippet",
    "message_link",
    "channel_id",
];

const NO_USERNAME: &str = "N/A";
const NO_LINK: &str = "N/A (Private/Unknown)";

pub type ReportError = PersistError;

/// Discovery results, newest message first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    records: Vec<DiscoveryRecord>,
}

impl DiscoveryReport {
    pub fn new(mut records: Vec<DiscoveryRecord>) -> Self {
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Self { records }
    }

    pub fn records(&self) -> &[DiscoveryRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut buffer = String::from(UTF8_BOM);
        push_row(&mut buffer, REPORT_COLUMNS.iter().copied());
        for record in &self.records {
            let username = record
                .channel_username
                .as_deref()
                .map(|name| format!("@{name}"))
                .unwrap_or_else(|| NO_USERNAME.to_string());
            let date = format_timestamp(&record.date);
            let channel_id = record.channel_id.to_string();
            push_row(
                &mut buffer,
                [
                    date.as_str(),
                    username.as_str(),
                    record.channel_title.as_str(),
                    record.keyword.as_str(),
                    record.snippet.as_str(),
                    record.link.as_deref().unwrap_or(NO_LINK),
                    channel_id.as_str(),
                ],
            );
        }
        buffer
    }

    pub fn write(&self, path: &Path) -> Result<PathBuf, ReportError> {
        write_atomically(path, self.to_csv().as_bytes())
    }
}

fn push_row<'a>(buffer: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            buffer.push(',');
        }
        push_field(buffer, field);
    }
    buffer.push_str("\r\n");
}

fn push_field(buffer: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        buffer.push('"');
        buffer.push_str(&field.replace('"', "\"\""));
        buffer.push('"');
    } else {
        buffer.push_str(field);
    }
}
