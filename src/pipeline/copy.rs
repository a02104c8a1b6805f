// src/pipeline/copy.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::blocking;
use crate::pipeline::sources::expand;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Mirrors files matching a glob byte-for-byte under `dest`, keeping their
/// path below the glob's literal base.
#[derive(Debug, Clone)]
pub struct CopyTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    src_dir: PathBuf,
    pattern: String,
    dest: PathBuf,
}

impl CopyTask {
    pub fn new(
        name: impl Into<TaskName>,
        fs: Arc<dyn FileSystem>,
        src_dir: impl Into<PathBuf>,
        pattern: impl Into<String>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            fs,
            src_dir: src_dir.into(),
            pattern: pattern.into(),
            dest: dest.into(),
        }
    }

    fn execute(&self) -> Result<()> {
        let files = expand(self.fs.as_ref(), &self.src_dir, &self.pattern)
            .map_err(|e| BuildError::io(&self.name, &self.src_dir, e))?;

        for file in &files {
            let bytes = self
                .fs
                .read(&file.path)
                .map_err(|e| BuildError::io(&self.name, &file.path, e))?;
            let target = self.dest.join(&file.rel);
            self.fs
                .write(&target, &bytes)
                .map_err(|e| BuildError::io(&self.name, &target, e))?;
        }

        info!(task = %self.name, files = files.len(), dest = %self.dest.display(), "copied");
        Ok(())
    }
}

impl Task for CopyTask {
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
    async fn mirrors_the_tree_below_the_glob_base() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/src/assets/fonts/roboto.woff2", vec![0, 1, 2, 255]);
        fs.add_file("/p/src/assets/fonts/bold/roboto-bold.woff2", vec![9]);

        let task = CopyTask::new(
            "copy:fonts",
            fs.clone(),
            "/p/src",
            "assets/fonts/**/*",
            "/p/dist/assets/fonts",
        );
        task.run().await.unwrap();

        assert_eq!(
            fs.contents("/p/dist/assets/fonts/roboto.woff2"),
            Some(vec![0, 1, 2, 255])
        );
        assert_eq!(
            fs.contents("/p/dist/assets/fonts/bold/roboto-bold.woff2"),
            Some(vec![9])
        );
    }
}
