// src/pipeline/tool.rs

//! Adapter for external transformation tools (template compiler, style
//! compiler, minifier, ...).
//!
//! A tool is a shell command that reads its input on stdin and writes the
//! result to stdout. A non-zero exit is a failure carrying the tool's
//! stderr.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    cmd: String,
}

/// Build a shell command appropriate for the platform.
pub(crate) fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

impl ExternalTool {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn command(&self) -> &str {
        &self.cmd
    }

    /// Feed `input` to the tool and collect its stdout.
    pub async fn pipe(&self, input: Vec<u8>, cwd: &Path) -> Result<Vec<u8>> {
        debug!(cmd = %self.cmd, bytes = input.len(), "piping through external tool");

        let mut child = shell(&self.cmd)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning `{}`", self.cmd))?;

        // Write stdin concurrently so a tool that streams output cannot
        // deadlock on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let res = stdin.write_all(&input).await;
                drop(stdin);
                res
            })
        });

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `{}`", self.cmd))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // A tool may legitimately exit before reading all input;
                // its exit status decides.
                Ok(Err(err)) => debug!(cmd = %self.cmd, "stdin write failed: {err}"),
                Err(err) => debug!(cmd = %self.cmd, "stdin writer panicked: {err}"),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
            bail!("`{}` exited with {code}: {}", self.cmd, stderr.trim());
        }

        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdout_is_the_result() {
        let tool = ExternalTool::new("tr a-z A-Z");
        let out = tool.pipe(b"body { color: red; }".to_vec(), Path::new(".")).await.unwrap();
        assert_eq!(out, b"BODY { COLOR: RED; }");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let tool = ExternalTool::new("echo 'Error: Invalid CSS after \"a\"' >&2; exit 3");
        let err = tool.pipe(Vec::new(), Path::new(".")).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("status 3"), "{msg}");
        assert!(msg.contains("Invalid CSS"), "{msg}");
    }
}
