// src/pipeline/styles.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{blocking, write_file};
use crate::pipeline::sources::expand;
use crate::pipeline::tool::ExternalTool;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

/// Inputs shared by the style and script bundles: third-party libraries
/// (relative to the project root) followed by project sources (globs
/// relative to the source directory).
#[derive(Debug, Clone)]
pub struct BundleInputs {
    pub root: PathBuf,
    pub libs: Vec<String>,
    pub src_dir: PathBuf,
    pub sources: Vec<String>,
}

impl BundleInputs {
    /// Resolve every input file in order; libraries first.
    pub fn resolve(&self, fs: &dyn FileSystem) -> anyhow::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self.libs.iter().map(|lib| self.root.join(lib)).collect();
        for pattern in &self.sources {
            let matched = expand(fs, &self.src_dir, pattern)?;
            if matched.is_empty() {
                debug!(pattern = %pattern, "source pattern matched nothing");
            }
            files.extend(matched.into_iter().map(|f| f.path));
        }
        Ok(files)
    }
}

/// Concatenates style libraries and sources, expands glob imports and pipes
/// the result through the style tool into one output file.
#[derive(Debug, Clone)]
pub struct StylesTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    inputs: BundleInputs,
    output: PathBuf,
    tool: Option<ExternalTool>,
}

impl StylesTask {
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

    fn concatenate(&self) -> Result<String> {
        let files = self
            .inputs
            .resolve(self.fs.as_ref())
            .map_err(|e| BuildError::io(&self.name, &self.inputs.src_dir, e))?;

        let import = glob_import_regex()?;
        let mut parts = Vec::with_capacity(files.len());
        for file in &files {
            let text = self
                .fs
                .read_to_string(file)
                .map_err(|e| BuildError::io(&self.name, file, e))?;
            let expanded = expand_glob_imports(self.fs.as_ref(), &import, file, &text)
                .map_err(|e| BuildError::transform(&self.name, file, format!("{e:#}")))?;
            parts.push(expanded);
        }
        Ok(parts.join("\n"))
    }

    async fn execute(&self) -> Result<()> {
        let this = self.clone();
        let bundle = blocking(&self.name, move || this.concatenate()).await?;

        let css = match &self.tool {
            Some(tool) => tool
                .pipe(bundle.into_bytes(), &self.inputs.root)
                .await
                .map_err(|e| BuildError::transform(&self.name, &self.output, format!("{e:#}")))?,
            None => bundle.into_bytes(),
        };

        let bytes = css.len();
        write_file(&self.name, &self.fs, &self.output, css).await?;
        info!(task = %self.name, out = %self.output.display(), bytes, "styles written");
        Ok(())
    }
}

impl Task for StylesTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}

fn glob_import_regex() -> Result<Regex> {
    Regex::new(r#"@import\s+["']([^"']*[*?\[][^"']*)["']\s*;"#)
        .context("compiling glob import pattern")
        .map_err(BuildError::from)
}

/// Replace every `@import "<glob>";` in `text` with one import per matching
/// file (sorted), relative to the directory of `file`.
pub fn expand_glob_imports(
    fs: &dyn FileSystem,
    import: &Regex,
    file: &Path,
    text: &str,
) -> anyhow::Result<String> {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in import.captures_iter(text) {
        let (Some(whole), Some(glob)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);

        let matched = expand(fs, dir, glob.as_str())?;
        let lines: Vec<String> = matched
            .iter()
            .filter_map(|f| f.path.strip_prefix(dir).ok())
            .filter(|rel| rel != &file.strip_prefix(dir).unwrap_or(file))
            .map(|rel| {
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("@import \"{rel}\";")
            })
            .collect();
        if lines.is_empty() {
            debug!(file = %file.display(), glob = glob.as_str(), "glob import matched nothing");
        }
        out.push_str(&lines.join("\n"));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
