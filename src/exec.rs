// Gateway Telemetry - External Commands
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Deadline-bounded execution of external tools.
//!
//! Every invocation gets a hard deadline. A process that overruns it is
//! killed and reaped, and the complete lines it printed so far are returned
//! with `timed_out` set.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CollectorError, Result};

/// Captured output of a finished (or killed) command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status, `None` when the process was killed on timeout.
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Whether the command ran to completion with a zero exit code.
    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    /// Human-readable exit status for error messages.
    pub fn status_label(&self) -> String {
        match self.status {
            Some(status) => status.to_string(),
            None if self.timed_out => "timeout".to_string(),
            None => "unknown status".to_string(),
        }
    }
}

/// An external tool invocation: program plus arguments placed before the
/// per-call ones (e.g. `sudo -n conntrack`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for one call.
    pub fn args_with(&self, extra: &[&str]) -> Vec<String> {
        self.leading_args
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.to_string()))
            .collect()
    }

    /// Run once with `extra` arguments under a deadline.
    pub async fn run(&self, extra: &[&str], timeout: Duration) -> Result<CommandOutput> {
        run_with_timeout(&self.program, &self.args_with(extra), timeout).await
    }

    /// Spawn a long-running child with piped stdout. The child is killed if dropped.
    pub fn spawn_piped(&self, extra: &[&str]) -> Result<tokio::process::Child> {
        Command::new(&self.program)
            .args(self.args_with(extra))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectorError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }
}

/// Run `program args...` and collect its output, killing it after `timeout`.
pub async fn run_with_timeout(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput> {
    let label = program.display().to_string();
    debug!(program = %label, ?args, "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CollectorError::Spawn {
            program: label.clone(),
            source,
        })?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| CollectorError::Task(format!("{label}: stdout not captured")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| CollectorError::Task(format!("{label}: stderr not captured")))?;

    let mut out = Vec::new();
    let mut err = Vec::new();

    let finished = tokio::time::timeout(timeout, async {
        let (read_out, read_err) =
            tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
        read_out.map_err(|e| CollectorError::io(format!("{label} stdout"), e))?;
        read_err.map_err(|e| CollectorError::io(format!("{label} stderr"), e))?;
        child
            .wait()
            .await
            .map_err(|e| CollectorError::io(format!("waiting for {label}"), e))
    })
    .await;

    match finished {
        Ok(Ok(status)) => Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
            status: Some(status),
            timed_out: false,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!(program = %label, ?timeout, "command timed out, killing it");
            if let Err(e) = child.kill().await {
                warn!(program = %label, error = %e, "failed to kill timed out command");
            }
            truncate_partial_line(&mut out);
            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&out).into_owned(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
                status: None,
                timed_out: true,
            })
        }
    }
}

/// Drop a trailing line the process did not get to finish.
fn truncate_partial_line(buf: &mut Vec<u8>) {
    let keep = buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    buf.truncate(keep);
}

/// Resolve a program name against `PATH`, falling back to a well-known path.
///
/// Names containing a path separator are used as given.
pub fn find_program(name: &str, fallback: &str) -> PathBuf {
    if name.contains('/') {
        return PathBuf::from(name);
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    let fallback = PathBuf::from(fallback);
    if fallback.is_file() {
        fallback
    } else {
        PathBuf::from(name)
    }
}

/// A tool that runs `script` through `sh`; per-call arguments land in `$1..`.
#[cfg(test)]
pub(crate) fn sh_tool(script: &str) -> ToolCommand {
    ToolCommand::new("sh").with_leading_args(["-c", script, "fake-tool"])
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_collects_stdout_and_status() {
        let output =
            run_with_timeout(Path::new("sh"), &sh("echo one; echo two"), Duration::from_secs(5))
                .await
                .unwrap();

        assert!(output.success());
        assert!(!output.timed_out);
        assert_eq!(output.stdout, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_in_status() {
        let output = run_with_timeout(
            Path::new("sh"),
            &sh("echo oops >&2; exit 3"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.and_then(|s| s.code()), Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let started = std::time::Instant::now();
        let output = run_with_timeout(
            Path::new("sh"),
            &sh("echo early; sleep 30; echo late"),
            Duration::from_millis(300),
        )
        .await
        .unwrap();

        assert!(output.timed_out);
        assert!(output.status.is_none());
        assert_eq!(output.stdout, "early\n");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_drops_unfinished_line() {
        let output = run_with_timeout(
            Path::new("sh"),
            &sh("printf 'whole\\nhal'; sleep 30"),
            Duration::from_millis(300),
        )
        .await
        .unwrap();

        assert!(output.timed_out);
        assert_eq!(output.stdout, "whole\n");
    }

    #[test]
    fn test_truncate_partial_line() {
        let mut buf = b"a\nb\ncut".to_vec();
        truncate_partial_line(&mut buf);
        assert_eq!(buf, b"a\nb\n");

        let mut none = b"no newline".to_vec();
        truncate_partial_line(&mut none);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_with_timeout(
            Path::new("/nonexistent/definitely-not-here"),
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CollectorError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_tool_command_passes_leading_and_extra_args() {
        let tool = sh_tool("echo \"$1 $2\"");
        assert_eq!(
            tool.args_with(&["-L", "-C"]),
            vec!["-c", "echo \"$1 $2\"", "fake-tool", "-L", "-C"]
        );

        let output = tool.run(&["-L", "-C"], Duration::from_secs(5)).await.unwrap();
        assert_eq!(output.stdout.trim(), "-L -C");
    }

    #[test]
    fn test_find_program() {
        assert_eq!(find_program("/opt/tool", "/usr/sbin/tool"), PathBuf::from("/opt/tool"));
        assert_eq!(
            find_program("no-such-tool-anywhere", "/nonexistent/no-such-tool"),
            PathBuf::from("no-such-tool-anywhere")
        );
        assert!(find_program("sh", "/bin/sh").is_absolute());
    }
}
