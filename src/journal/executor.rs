use crate::journal::error::ExecutionError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// How long a provider may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that turns query arguments into raw journal records.
///
/// At most one `fetch` runs per controller at a time.
// Futures are awaited on the controller's task and never spawned, so no
// `Send` bound is promised.
#[allow(async_fn_in_trait)]
pub trait LogProvider {
    /// Run one query. Each returned string is one raw record.
    async fn fetch(
        &self,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExecutionError>;
}

/// Runs `journalctl --output=json` as a subprocess.
#[derive(Debug, Clone)]
pub struct Journalctl {
    program: PathBuf,
    user: bool,
    max_lines: Option<usize>,
    timeout: Duration,
}

impl Default for Journalctl {
    fn default() -> Self {
        Self::new("journalctl")
    }
}

impl Journalctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            user: false,
            max_lines: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the calling user's journal instead of the system one.
    pub fn user(mut self, user: bool) -> Self {
        self.user = user;
        self
    }

    /// Only return the newest `n` entries of each query.
    pub fn max_lines(mut self, n: Option<usize>) -> Self {
        self.max_lines = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list: fixed output options, then the query's own arguments.
    pub fn command_args(&self, query_args: &[String]) -> Vec<String> {
        let mut args = vec![
            "--no-pager".to_string(),
            "--quiet".to_string(),
            "--output=json".to_string(),
        ];
        if self.user {
            args.push("--user".to_string());
        }
        if let Some(n) = self.max_lines {
            args.push(format!("--lines={n}"));
        }
        args.extend(query_args.iter().cloned());
        args
    }
}

impl LogProvider for Journalctl {
    async fn fetch(
        &self,
        query_args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExecutionError> {
        let program = self.program.display().to_string();
        let args = self.command_args(query_args);

        // kill_on_drop: the child dies with the future on timeout, cancel or panic
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutionError::Launch {
                program: program.clone(),
                args: args.clone(),
                source,
            })?;

        tracing::debug!(pid = child.id(), "Started {} {}", program, args.join(" "));

        let output = tokio::select! {
            res = tokio::time::timeout(self.timeout, child.wait_with_output()) => match res {
                Ok(Ok(output)) => output,
                Ok(Err(source)) => return Err(ExecutionError::Io { program, args, source }),
                Err(_) => {
                    return Err(ExecutionError::Timeout {
                        program,
                        args,
                        timeout: self.timeout,
                    });
                }
            },
            _ = cancel.cancelled() => return Err(ExecutionError::Cancelled { args }),
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ExecutionError::Failed {
                program,
                args,
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            return Err(ExecutionError::Stderr {
                program,
                args,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_put_output_options_first() {
        let provider = Journalctl::new("journalctl").user(true).max_lines(Some(50));
        let args = provider.command_args(&["--unit=sshd.service".to_string()]);
        assert_eq!(
            args,
            vec![
                "--no-pager",
                "--quiet",
                "--output=json",
                "--user",
                "--lines=50",
                "--unit=sshd.service",
            ]
        );
    }

    #[tokio::test]
    async fn launch_failure_carries_arguments() {
        let provider = Journalctl::new("/nonexistent/journalctl");
        let err = provider
            .fetch(&["--boot=0".to_string()], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Launch { .. }));
        assert!(err.args().contains(&"--boot=0".to_string()));
        assert!(!err.is_timeout());
    }
}
