// src/pipeline/templates.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{blocking, read_file, write_file};
use crate::pipeline::sources::{expand, SourceFile};
use crate::pipeline::tool::ExternalTool;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Renders every page matching a glob through the template tool.
///
/// `cmd` may use `{pretty}` (replaced by `pretty_flag` when `pretty` is set,
/// by nothing otherwise) and `{input}` (the page's path). The page is fed on
/// stdin; stdout is written to `<dest>/<rel-dir>/<stem>.html`.
#[derive(Debug, Clone)]
pub struct TemplatesTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    src_dir: PathBuf,
    pattern: String,
    cmd: String,
    pretty: bool,
    pretty_flag: String,
    dest: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub cmd: String,
    pub pretty: bool,
    pub pretty_flag: String,
}

impl TemplatesTask {
    pub fn new(
        name: impl Into<TaskName>,
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        src_dir: impl Into<PathBuf>,
        pattern: impl Into<String>,
        options: TemplateOptions,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            fs,
            root: root.into(),
            src_dir: src_dir.into(),
            pattern: pattern.into(),
            cmd: options.cmd,
            pretty: options.pretty,
            pretty_flag: options.pretty_flag,
            dest: dest.into(),
        }
    }

    /// Command line for one page. The page path is shell-quoted.
    pub fn command_for(&self, page: &Path) -> Result<String> {
        let pretty = if self.pretty { self.pretty_flag.as_str() } else { "" };
        let path = page.to_string_lossy();
        let input = shlex::try_quote(&path).map_err(|e| {
            BuildError::transform(&self.name, page, format!("cannot quote page path: {e}"))
        })?;
        Ok(self
            .cmd
            .replace("{pretty}", pretty)
            .replace("{input}", &input))
    }

    /// Output path for a page: its relative location with an `.html`
    /// extension.
    pub fn output_for(&self, page: &SourceFile) -> PathBuf {
        self.dest.join(&page.rel).with_extension("html")
    }

    async fn execute(&self) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        let src_dir = self.src_dir.clone();
        let pattern = self.pattern.clone();
        let pages = blocking(&self.name, move || {
            expand(fs.as_ref(), &src_dir, &pattern).map_err(BuildError::from)
        })
        .await
        .map_err(|e| BuildError::io(&self.name, &self.src_dir, e))?;

        for page in &pages {
            let source = read_file(&self.name, &self.fs, &page.path).await?;

            let tool = ExternalTool::new(self.command_for(&page.path)?);
            let rendered = tool
                .pipe(source, &self.root)
                .await
                .map_err(|e| BuildError::transform(&self.name, &page.path, format!("{e:#}")))?;

            let target = self.output_for(page);
            write_file(&self.name, &self.fs, &target, rendered).await?;
            debug!(task = %self.name, page = %page.path.display(), out = %target.display(), "rendered");
        }

        info!(task = %self.name, pages = pages.len(), "templates rendered");
        Ok(())
    }
}

impl Task for TemplatesTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn task(fs: Arc<MockFileSystem>, cmd: &str, pretty: bool) -> TemplatesTask {
        TemplatesTask::new(
            "compile:pug",
            fs,
            "/p",
            "/p/src",
            "pages/*.pug",
            TemplateOptions {
                cmd: cmd.to_string(),
                pretty,
                pretty_flag: "--pretty".to_string(),
            },
            "/p/dist",
        )
    }

    #[test]
    fn pretty_placeholder_follows_the_option() {
        let fs = Arc::new(MockFileSystem::new());
        let input = Path::new("/p/src/pages/index.pug");

        assert_eq!(
            task(fs.clone(), "pug {pretty} --path {input}", true)
                .command_for(input)
                .unwrap(),
            "pug --pretty --path /p/src/pages/index.pug"
        );
        assert_eq!(
            task(fs, "pug {pretty} --path {input}", false)
                .command_for(input)
                .unwrap(),
            "pug  --path /p/src/pages/index.pug"
        );
    }

    #[test]
    fn page_paths_are_quoted_for_the_shell() {
        let fs = Arc::new(MockFileSystem::new());
        let t = task(fs, "pug --path {input}", false);

        for page in [
            "/p/src/pages/about us.pug",
            "/p/src/pages/it's.pug",
            "/p/src/pages/$(touch x);.pug",
        ] {
            let cmd = t.command_for(Path::new(page)).unwrap();
            assert_eq!(
                shlex::split(&cmd),
                Some(vec!["pug".to_string(), "--path".to_string(), page.to_string()]),
                "{cmd}"
            );
        }
    }

    #[test]
    fn output_mirrors_below_the_glob_base() {
        let fs = Arc::new(MockFileSystem::new());
        let page = SourceFile {
            path: PathBuf::from("/p/src/pages/about.pug"),
            rel: PathBuf::from("about.pug"),
        };
        assert_eq!(task(fs, "cat", true).output_for(&page), PathBuf::from("/p/dist/about.html"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn renders_every_page_through_the_tool() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/src/pages/index.pug", b"<h1>home</h1>".to_vec());
        fs.add_file("/p/src/pages/about.pug", b"<h1>about</h1>".to_vec());
        fs.add_file("/p/src/pages/partials/head.pug", b"skip".to_vec());

        let dir = tempfile::tempdir().unwrap();
        let mut t = task(fs.clone(), "cat", true);
        t.root = dir.path().to_path_buf();
        t.run().await.unwrap();

        assert_eq!(fs.contents("/p/dist/index.html"), Some(b"<h1>home</h1>".to_vec()));
        assert_eq!(fs.contents("/p/dist/about.html"), Some(b"<h1>about</h1>".to_vec()));
        assert_eq!(fs.contents("/p/dist/partials/head.html"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_names_the_page() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/p/src/pages/index.pug", b"p(".to_vec());

        let dir = tempfile::tempdir().unwrap();
        let mut t = task(fs, "echo 'unexpected end of input' >&2; exit 1", true);
        t.root = dir.path().to_path_buf();

        let err = t.run().await.unwrap_err();
        match err {
            BuildError::Transform { task, path, message } => {
                assert_eq!(task, "compile:pug");
                assert_eq!(path, PathBuf::from("/p/src/pages/index.pug"));
                assert!(message.contains("unexpected end of input"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
