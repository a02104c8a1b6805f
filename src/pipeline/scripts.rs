// src/pipeline/scripts.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{blocking, write_file};
use crate::pipeline::styles::BundleInputs;
use crate::pipeline::tool::ExternalTool;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Concatenates script libraries and sources in order and pipes the bundle
/// through the script tool (downlevel + minify).
#[derive(Debug, Clone)]
pub struct ScriptsTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    inputs: BundleInputs,
    output: PathBuf,
    tool: Option<ExternalTool>,
}

impl ScriptsTask {
    pub fn new(
        name: impl Into<TaskName>,
        fs: Arc<dyn FileSystem>,
        inputs: BundleInputs,
        output: impl Into<PathBuf>,
        tool: Option<ExternalTool>,
    ) -> Self {
        Self {
            name: name.into(),
            fs,
            inputs,
            output: output.into(),
            tool,
        }
    }

    fn concatenate(&self) -> Result<Vec<u8>> {
        let files = self
            .inputs
            .resolve(self.fs.as_ref())
            .map_err(|e| BuildError::io(&self.name, &self.inputs.src_dir, e))?;

        let mut bundle = Vec::new();
        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                bundle.push(b'\n');
            }
            let bytes = self
                .fs
                .read(file)
                .map_err(|e| BuildError::io(&self.name, file, e))?;
            bundle.extend_from_slice(&bytes);
        }
        Ok(bundle)
    }

    async fn execute(&self) -> Result<()> {
        let this = self.clone();
        let bundle = blocking(&self.name, move || this.concatenate()).await?;

        let js = match &self.tool {
            Some(tool) => tool
                .pipe(bundle, &self.inputs.root)
                .await
                .map_err(|e| BuildError::transform(&self.name, &self.output, format!("{e:#}")))?,
            None => bundle,
        };

        let bytes = js.len();
        write_file(&self.name, &self.fs, &self.output, js).await?;
        info!(task = %self.name, out = %self.output.display(), bytes, "scripts written");
        Ok(())
    }
}

impl Task for ScriptsTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn libs_then_sources_in_order() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/node_modules/jquery/dist/jquery.js", b"var $;".to_vec());
        fs.add_file("/p/src/assets/js/b.js", b"b();".to_vec());
        fs.add_file("/p/src/assets/js/a.js", b"a();".to_vec());
        fs.add_file("/p/src/assets/js/libs/skip.js", b"skip();".to_vec());

        let inputs = BundleInputs {
            root: PathBuf::from("/p"),
            libs: vec!["node_modules/jquery/dist/jquery.js".into()],
            src_dir: PathBuf::from("/p/src"),
            sources: vec!["assets/js/*.js".into()],
        };
        ScriptsTask::new("scripts", fs.clone(), inputs, "/p/dist/assets/js/main-min.js", None)
            .run()
            .await
            .unwrap();

        assert_eq!(
            fs.contents("/p/dist/assets/js/main-min.js"),
            Some(b"var $;\na();\nb();".to_vec())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_is_a_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/src/main.js", b"let = ;".to_vec());

        let inputs = BundleInputs {
            root: dir.path().to_path_buf(),
            libs: vec![],
            src_dir: PathBuf::from("/p/src"),
            sources: vec!["*.js".into()],
        };
        let err = ScriptsTask::new(
            "scripts",
            fs.clone(),
            inputs,
            "/p/dist/main-min.js",
            Some(ExternalTool::new("echo 'SyntaxError: Unexpected token' >&2; exit 1")),
        )
        .run()
        .await
        .unwrap_err();

        assert!(matches!(err, BuildError::Transform { .. }));
        assert!(err.to_string().contains("SyntaxError"));
        assert_eq!(fs.contents("/p/dist/main-min.js"), None);
    }
}
