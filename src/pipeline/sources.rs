// src/pipeline/sources.rs

//! Glob expansion over a [`FileSystem`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobBuilder;

use crate::fs::FileSystem;
use crate::watch::path_utils::normalize_rel;

/// A file selected by a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path (the search directory joined with the match).
    pub path: PathBuf,
    /// Path below the glob's literal base, used to mirror the file into an
    /// output directory.
    pub rel: PathBuf,
}

fn is_glob_component(s: &str) -> bool {
    s.contains(&['*', '?', '[', '{'][..])
}

/// Leading directory components of `pattern` that contain no glob syntax.
///
/// `"pages/*.pug"` → `"pages"`, `"assets/img/**/*"` → `"assets/img"`,
/// `"*.svg"` → `""`. For a pattern without any glob syntax the parent
/// directory is returned.
pub fn glob_base(pattern: &str) -> String {
    let pattern = normalize_rel(pattern);
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal = parts
        .iter()
        .take_while(|p| !is_glob_component(p))
        .count()
        .min(parts.len().saturating_sub(1));
    parts[..literal].join("/")
}

/// Files below `dir` whose `dir`-relative path matches `pattern`, sorted by
/// path. `*` does not cross `/`.
pub fn expand(fs: &dyn FileSystem, dir: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    let pattern = normalize_rel(pattern);
    let base = glob_base(&pattern);
    let base_dir = if base.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(&base)
    };

    if !is_glob_component(&pattern) {
        let path = dir.join(&pattern);
        if !fs.is_file(&path) {
            return Ok(Vec::new());
        }
        let rel = path
            .strip_prefix(&base_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&pattern));
        return Ok(vec![SourceFile { path, rel }]);
    }

    let matcher = GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid source glob '{pattern}'"))?
        .compile_matcher();

    let mut files = Vec::new();
    if fs.is_dir(&base_dir) {
        walk(fs, &base_dir, &mut files)?;
    }

    let mut out: Vec<SourceFile> = files
        .into_iter()
        .filter_map(|path| {
            let rel_to_dir = path.strip_prefix(dir).ok()?;
            let candidate = rel_to_dir
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !matcher.is_match(&candidate) {
                return None;
            }
            let rel = path.strip_prefix(&base_dir).ok()?.to_path_buf();
            Some(SourceFile { path, rel })
        })
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

fn walk(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        if fs.is_dir(&entry) {
            walk(fs, &entry, out)?;
        } else {
            out.push(entry);
        }
    }
    Ok(())
}
