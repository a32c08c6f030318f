use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// A single raw record that could not be turned into a `LogEntry`.
///
/// Recoverable: the record is dropped and the rest of the batch continues.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("record is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no __REALTIME_TIMESTAMP field")]
    MissingTimestamp,

    #[error("invalid realtime timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// The provider could not produce output for a query.
///
/// Every variant carries the argument list that was attempted so the failure
/// can be reproduced from the log.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to launch {program} {}: {source}", args.join(" "))]
    Launch {
        program: String,
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {} exited with {status}: {stderr}", args.join(" "))]
    Failed {
        program: String,
        args: Vec<String>,
        status: ExitStatus,
        stderr: String,
    },

    /// Exit status was 0 but the provider complained on stderr.
    #[error("{program} {} reported: {stderr}", args.join(" "))]
    Stderr {
        program: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("{program} {} did not finish within {}s and was killed", args.join(" "), timeout.as_secs_f32())]
    Timeout {
        program: String,
        args: Vec<String>,
        timeout: Duration,
    },

    #[error("query {} was cancelled", args.join(" "))]
    Cancelled { args: Vec<String> },

    #[error("error reading output of {program}: {source}")]
    Io {
        program: String,
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// The provider was killed because it ran past its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled { .. })
    }

    /// Arguments of the failed invocation.
    pub fn args(&self) -> &[String] {
        match self {
            ExecutionError::Launch { args, .. }
            | ExecutionError::Failed { args, .. }
            | ExecutionError::Stderr { args, .. }
            | ExecutionError::Timeout { args, .. }
            | ExecutionError::Cancelled { args }
            | ExecutionError::Io { args, .. } => args,
        }
    }
}

/// The live search text is not a valid pattern.
#[derive(Debug, Clone, Error)]
#[error("invalid search pattern '{pattern}': {source}")]
pub struct FilterError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Anything the controller reports to its observer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("invalid priority '{0}' (expected emerg..debug, 0-7 or a range like err..warning)")]
    InvalidPriority(String),

    #[error("invalid time bound '{0}' (expected YYYY-MM-DD[ HH:MM[:SS]] or a journalctl relative time)")]
    InvalidTimeBound(String),
}
