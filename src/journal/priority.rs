use crate::journal::error::QueryError;
use std::fmt;
use std::str::FromStr;

/// syslog priority levels as used by the journal (`PRIORITY=` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Err = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Priority {
    pub const ALL: [Priority; 8] = [
        Priority::Emerg,
        Priority::Alert,
        Priority::Crit,
        Priority::Err,
        Priority::Warning,
        Priority::Notice,
        Priority::Info,
        Priority::Debug,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Name understood by `journalctl --priority`.
    pub fn name(self) -> &'static str {
        match self {
            Priority::Emerg => "emerg",
            Priority::Alert => "alert",
            Priority::Crit => "crit",
            Priority::Err => "err",
            Priority::Warning => "warning",
            Priority::Notice => "notice",
            Priority::Info => "info",
            Priority::Debug => "debug",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Priority {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, QueryError> {
        let text = s.trim().to_ascii_lowercase();
        if let Ok(level) = text.parse::<u8>() {
            return Self::from_level(level).ok_or_else(|| QueryError::InvalidPriority(s.to_string()));
        }
        let priority = match text.as_str() {
            "emerg" | "emergency" | "panic" => Priority::Emerg,
            "alert" => Priority::Alert,
            "crit" | "critical" => Priority::Crit,
            "err" | "error" => Priority::Err,
            "warning" | "warn" => Priority::Warning,
            "notice" => Priority::Notice,
            "info" => Priority::Info,
            "debug" => Priority::Debug,
            _ => return Err(QueryError::InvalidPriority(s.to_string())),
        };
        Ok(priority)
    }
}

/// Validate a `--priority` value and normalize it to journalctl names.
///
/// Accepts a single level (`err`, `3`) or a range (`err..warning`).
pub fn normalize_priority_filter(value: &str) -> Result<String, QueryError> {
    match value.split_once("..") {
        Some((from, to)) => {
            let from: Priority = from.parse().map_err(|_| QueryError::InvalidPriority(value.to_string()))?;
            let to: Priority = to.parse().map_err(|_| QueryError::InvalidPriority(value.to_string()))?;
            Ok(format!("{from}..{to}"))
        }
        None => Ok(value.parse::<Priority>()?.to_string()),
    }
}
