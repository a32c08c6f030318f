use anyhow::{Context as _, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the global subscriber.
///
/// Level: `RUST_LOG` > `--debug` > warn. Output goes to `log_file` when given,
/// otherwise to stderr, except in interactive mode where the terminal belongs
/// to the UI and logs without a file are discarded.
pub fn init(debug: bool, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if interactive => builder.with_writer(std::io::sink).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging initialised");
    Ok(())
}
