//! Runs free-form learner code in an external interpreter.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::SandboxError;

/// When a sandbox exercise counts as completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRule {
    /// Pressing run is enough, whatever the program does.
    #[default]
    OnRun,
    /// The program must finish without an error.
    OnSuccess,
}

/// What the output area shows after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    Printed(String),
    Silent,
    Failed(String),
}

impl RunOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !matches!(self, RunOutput::Failed(_))
    }

    #[must_use]
    pub fn display(&self) -> String {
        match self {
            RunOutput::Printed(text) => text.trim().to_owned(),
            RunOutput::Silent => "Code ran with no output.".to_owned(),
            RunOutput::Failed(message) => format!("Error: {message}"),
        }
    }
}

#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Execute `code`, feeding `stdin` lines to any `input()` calls.
    ///
    /// Faults inside the program are reported as `RunOutput::Failed`.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::Busy` while another run is in flight.
    async fn run(&self, code: &str, stdin: &[String]) -> Result<RunOutput, SandboxError>;
}

/// Runs code with a local Python interpreter, one program at a time.
#[derive(Debug)]
pub struct PythonProcessRunner {
    interpreter: String,
    timeout: Duration,
    running: AtomicBool,
}

impl PythonProcessRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            running: AtomicBool::new(false),
        }
    }

    async fn execute(&self, code: &str, stdin: &[String]) -> RunOutput {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(code)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(interpreter = %self.interpreter, %err, "failed to start interpreter");
                return RunOutput::Failed(format!("cannot start {}: {err}", self.interpreter));
            }
        };

        if let Some(mut pipe) = child.stdin.take() {
            let mut input = stdin.join("\n");
            input.push('\n');
            // A program that never reads its input closes the pipe early.
            if let Err(err) = pipe.write_all(input.as_bytes()).await {
                debug!(%err, "stdin closed before all input was written");
            }
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return RunOutput::Failed(err.to_string()),
            Err(_) => {
                return RunOutput::Failed(format!(
                    "program did not finish within {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("program exited with an error")
                .trim()
                .to_owned();
            return RunOutput::Failed(message);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            RunOutput::Silent
        } else {
            RunOutput::Printed(stdout.into_owned())
        }
    }
}

impl Default for PythonProcessRunner {
    fn default() -> Self {
        Self::new("python3", Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CodeRunner for PythonProcessRunner {
    async fn run(&self, code: &str, stdin: &[String]) -> Result<RunOutput, SandboxError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SandboxError::Busy);
        }
        let _guard = Running(&self.running);
        Ok(self.execute(code, stdin).await)
    }
}

/// Frees the runner when a run ends, including when its future is dropped.
struct Running<'a>(&'a AtomicBool);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runner that answers every program with a canned output.
#[derive(Debug, Clone)]
pub struct FixedRunner {
    output: RunOutput,
}

impl FixedRunner {
    #[must_use]
    pub fn new(output: RunOutput) -> Self {
        Self { output }
    }
}

#[async_trait]
impl CodeRunner for FixedRunner {
    async fn run(&self, _code: &str, _stdin: &[String]) -> Result<RunOutput, SandboxError> {
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_display_texts() {
        assert_eq!(RunOutput::Printed("45\n".into()).display(), "45");
        assert_eq!(RunOutput::Silent.display(), "Code ran with no output.");
        assert_eq!(
            RunOutput::Failed("NameError: name 'x' is not defined".into()).display(),
            "Error: NameError: name 'x' is not defined"
        );
        assert!(!RunOutput::Failed(String::new()).succeeded());
        assert!(RunOutput::Silent.succeeded());
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_failed_run() {
        let runner = PythonProcessRunner::new(
            "definitely-not-an-interpreter-4821",
            Duration::from_secs(1),
        );
        let output = runner.run("print(1)", &[]).await.unwrap();
        assert!(!output.succeeded());
        // The guard is released after a failed run.
        assert!(runner.run("print(1)", &[]).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_run_frees_the_runner() {
        // `sh -c` stands in for the interpreter so the test needs no Python.
        let runner = PythonProcessRunner::new("sh", Duration::from_secs(30));
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), runner.run("sleep 5", &[])).await;
        assert!(abandoned.is_err());
        assert!(!runner.running.load(Ordering::Acquire));

        let output = runner.run("exit 0", &[]).await.unwrap();
        assert_eq!(output, RunOutput::Silent);
    }
}
