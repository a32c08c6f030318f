use crate::journal::error::ParseError;
use crate::journal::priority::Priority;
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;

/// Display format of entry timestamps; search matches against this text too.
pub const TIME_FORMAT: &str = "%b %d %H:%M:%S";

/// One journal entry, reduced to the fields the browser shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub process_name: String,
    pub message: String,
    pub priority: Option<Priority>,
}

impl LogEntry {
    /// Timestamp in local time, formatted with [`TIME_FORMAT`].
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format(TIME_FORMAT)
            .to_string()
    }

    /// Parse one line of `journalctl --output=json`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let record: RawRecord = serde_json::from_str(raw)?;

        let realtime = record
            .realtime
            .map(FieldValue::into_text)
            .ok_or(ParseError::MissingTimestamp)?;
        let timestamp = realtime
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_micros)
            .ok_or_else(|| ParseError::InvalidTimestamp(realtime.clone()))?;

        let process_name = record
            .identifier
            .or(record.comm)
            .map(FieldValue::into_text)
            .unwrap_or_default();

        let message = record
            .message
            .map(|m| collapse_lines(&m.into_text()))
            .unwrap_or_default();

        let priority = record
            .priority
            .and_then(|p| p.into_text().trim().parse::<u8>().ok())
            .and_then(Priority::from_level);

        Ok(Self {
            timestamp,
            process_name,
            message,
            priority,
        })
    }
}

/// Parse a batch of raw records, dropping the ones that fail.
///
/// Output order follows input order. Blank lines are not records.
pub fn parse_batch<I, S>(lines: I) -> Vec<LogEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match LogEntry::parse(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                skipped += 1;
                tracing::warn!(record = idx + 1, "Skipping journal record: {}", e);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(parsed = entries.len(), skipped, "Parsed journal batch");
    }
    entries
}

fn collapse_lines(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "__REALTIME_TIMESTAMP")]
    realtime: Option<FieldValue>,
    #[serde(rename = "SYSLOG_IDENTIFIER")]
    identifier: Option<FieldValue>,
    #[serde(rename = "_COMM")]
    comm: Option<FieldValue>,
    #[serde(rename = "MESSAGE")]
    message: Option<FieldValue>,
    #[serde(rename = "PRIORITY")]
    priority: Option<FieldValue>,
}

/// journalctl emits plain strings, byte arrays for non-UTF-8 data, and
/// arrays of either when a field occurs more than once.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Text(String),
    Bytes(Vec<u8>),
    Repeated(Vec<FieldValue>),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
            FieldValue::Repeated(values) => values
                .into_iter()
                .map(FieldValue::into_text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
