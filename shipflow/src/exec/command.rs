//! External command execution with timeout and cancellation.

use crate::cancellation::CancelToken;
use crate::errors::StageError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

/// A structured external command.
///
/// Environment values may contain secrets, so `Debug` prints keys only.
#[derive(Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a command for a program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env_keys", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// The classified result of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The process ran to completion.
    Completed {
        /// The process exit code (`-1` when terminated by a signal).
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The process was killed because the time bound fired.
    ///
    /// Partial output is discarded.
    TimedOut {
        /// Elapsed time when the bound fired, in milliseconds.
        elapsed_ms: u64,
    },
    /// The process was killed by run cancellation.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl CommandOutcome {
    /// Returns true if the command completed with a zero exit code.
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: 0, .. })
    }
}

/// Runs an external command, racing it against the timeout and the
/// cancellation token.
///
/// The child is spawned with kill-on-drop, so abandoning the wait on
/// timeout or cancellation forcibly terminates the in-flight process.
/// At most one attempt is made; there are no retries here.
pub async fn run_command(
    spec: &CommandSpec,
    limit: Option<Duration>,
    cancel: &CancelToken,
) -> Result<CommandOutcome, StageError> {
    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let child = cmd
        .spawn()
        .map_err(|e| StageError::action(format!("failed to spawn '{}': {e}", spec.program)))?;

    let started = Instant::now();
    let wait = child.wait_with_output();
    tokio::pin!(wait);

    let outcome = match limit {
        Some(duration) => {
            tokio::select! {
                biased;
                () = cancel.cancelled() => CommandOutcome::Cancelled {
                    reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                },
                waited = tokio::time::timeout(duration, &mut wait) => match waited {
                    Ok(result) => completed(&spec.program, result)?,
                    Err(_) => CommandOutcome::TimedOut {
                        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    },
                },
            }
        }
        None => {
            tokio::select! {
                biased;
                () = cancel.cancelled() => CommandOutcome::Cancelled {
                    reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                },
                result = &mut wait => completed(&spec.program, result)?,
            }
        }
    };

    Ok(outcome)
}

fn completed(
    program: &str,
    result: std::io::Result<std::process::Output>,
) -> Result<CommandOutcome, StageError> {
    let output =
        result.map_err(|e| StageError::action(format!("failed to wait for '{program}': {e}")))?;

    Ok(CommandOutcome::Completed {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo out; echo err >&2");
        let cancel = CancelToken::new();

        let outcome = run_command(&spec, None, &cancel).await.unwrap();
        match outcome {
            CommandOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(exit_code, 0);
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let spec = CommandSpec::new("sh").arg("-c").arg("exit 3");
        let cancel = CancelToken::new();

        let outcome = run_command(&spec, None, &cancel).await.unwrap();
        assert!(!outcome.success());
        assert!(matches!(
            outcome,
            CommandOutcome::Completed { exit_code: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_run_command_timeout_kills_child() {
        let spec = CommandSpec::new("sh").arg("-c").arg("sleep 30");
        let cancel = CancelToken::new();

        let started = Instant::now();
        let outcome = run_command(&spec, Some(Duration::from_millis(50)), &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome, CommandOutcome::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_command_cancelled() {
        let spec = CommandSpec::new("sh").arg("-c").arg("sleep 30");
        let cancel = CancelToken::new();

        let task = {
            let cancel = cancel.clone();
            let spec = spec.clone();
            tokio::spawn(async move { run_command(&spec, None, &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel("operator abort");

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Cancelled {
                reason: "operator abort".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_run_command_spawn_error() {
        let spec = CommandSpec::new("definitely-not-a-real-binary-6af2");
        let cancel = CancelToken::new();

        let err = run_command(&spec, None, &cancel).await.unwrap_err();
        assert_eq!(err.kind(), "action_failed");
    }

    #[tokio::test]
    async fn test_command_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo $GREETING; pwd")
            .env("GREETING", "hello")
            .current_dir(dir.path());
        let cancel = CancelToken::new();

        let outcome = run_command(&spec, None, &cancel).await.unwrap();
        match outcome {
            CommandOutcome::Completed { stdout, .. } => {
                assert!(stdout.contains("hello"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_command_spec_debug_hides_env_values() {
        let spec = CommandSpec::new("docker")
            .args(["login", "-u", "ci"])
            .env("REGISTRY_TOKEN", "s3cret");

        let printed = format!("{spec:?}");
        assert!(printed.contains("REGISTRY_TOKEN"));
        assert!(!printed.contains("s3cret"));
    }
}
