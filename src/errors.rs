// src/errors.rs

//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("task '{task}' failed on {}: {message}", path.display())]
    Transform {
        task: String,
        path: PathBuf,
        message: String,
    },

    #[error("task '{task}' hit an I/O error on {}: {message}", path.display())]
    Io {
        task: String,
        path: PathBuf,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// Wrap a filesystem failure with the task and path it happened on.
    pub fn io(task: &str, path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        BuildError::Io {
            task: task.to_string(),
            path: path.into(),
            message: format!("{err:#}"),
        }
    }

    /// Wrap a collaborator failure (bad syntax, non-zero tool exit, ...).
    pub fn transform(task: &str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::Transform {
            task: task.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised while wiring the task graph rather than
    /// while running a task.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            BuildError::DuplicateTask(_) | BuildError::UnknownTask(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
