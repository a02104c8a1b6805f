// src/pipeline/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::blocking;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Removes every build artifact by emptying the destination directory.
///
/// The directory itself is kept so a dev server rooted there keeps working.
#[derive(Debug, Clone)]
pub struct CleanTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    dist: PathBuf,
}

impl CleanTask {
    pub fn new(name: impl Into<TaskName>, fs: Arc<dyn FileSystem>, dist: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            fs,
            dist: dist.into(),
        }
    }

    fn execute(&self) -> Result<()> {
        self.fs
            .remove_dir_contents(&self.dist)
            .map_err(|e| BuildError::io(&self.name, &self.dist, e))?;
        info!(task = %self.name, dist = %self.dist.display(), "destination emptied");
        Ok(())
    }
}

impl Task for CleanTask {
    fn run(&self) -> TaskFuture<'_> {
        let this = self.clone();
        Box::pin(blocking(&self.name, move || this.execute()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn empties_dist_but_keeps_sources() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/dist/index.html", b"old".to_vec());
        fs.add_file("/p/dist/assets/css/main-min.css", b"old".to_vec());
        fs.add_file("/p/src/pages/index.pug", b"p hi".to_vec());

        CleanTask::new("clean", fs.clone(), "/p/dist").run().await.unwrap();

        assert_eq!(fs.file_paths(), vec![PathBuf::from("/p/src/pages/index.pug")]);
        assert!(fs.is_dir(std::path::Path::new("/p/dist")));
    }

    #[tokio::test]
    async fn missing_dist_is_not_an_error() {
        let fs = Arc::new(MockFileSystem::new());
        CleanTask::new("clean", fs, "/p/dist").run().await.unwrap();
    }
}
