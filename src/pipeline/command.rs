// src/pipeline/command.rs

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::errors::{BuildError, Result};
use crate::pipeline::tool::shell;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Runs an arbitrary shell command from the project root.
///
/// Output lines are forwarded to the log; a non-zero exit fails the task.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: TaskName,
    cmd: String,
    cwd: PathBuf,
}

impl CommandTask {
    pub fn new(name: impl Into<TaskName>, cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    async fn execute(&self) -> Result<()> {
        debug!(task = %self.name, cmd = %self.cmd, "spawning command");

        let mut child = shell(&self.cmd)
            .current_dir(&self.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", self.name))?;

        if let Some(stdout) = child.stdout.take() {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(task = %task_name, "{}", line);
                }
            });
        }

        // Always consume stderr so buffers don't fill.
        if let Some(stderr) = child.stderr.take() {
            let task_name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stderr: {}", line);
                }
            });
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", self.name))?;

        if status.success() {
            Ok(())
        } else {
            let code = status.code().unwrap_or(-1);
            Err(BuildError::transform(
                &self.name,
                &self.cwd,
                format!("`{}` exited with status {code}", self.cmd),
            ))
        }
    }
}

impl Task for CommandTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}
