// src/pipeline/icons.rs

//! SVG symbol sprite.
//!
//! Every icon becomes a `<symbol id="{prefix}{stem}">` keeping its
//! `viewBox`; attributes whose names match the strip pattern are removed,
//! and ids inside a shape are namespaced with the symbol id so shapes
//! cannot clash once they share a document.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use regex::{Captures, Regex};
use tracing::info;

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::pipeline::blocking;
use crate::pipeline::sources::expand;
use crate::registry::{Task, TaskFuture};
use crate::types::TaskName;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const DOCTYPE: &str = r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#;

#[derive(Debug, Clone)]
pub struct SpriteOptions {
    pub strip_attrs: String,
    pub id_prefix: String,
    pub width: Option<String>,
}

/// Compiled sprite builder.
#[derive(Debug, Clone)]
pub struct SpriteBuilder {
    strip: Regex,
    root: Regex,
    tag: Regex,
    attr: Regex,
    id_prefix: String,
    width: Option<String>,
}

impl SpriteBuilder {
    pub fn new(options: &SpriteOptions) -> Result<Self> {
        let strip = Regex::new(&options.strip_attrs).map_err(|e| {
            BuildError::ConfigError(format!("invalid strip_attrs '{}': {e}", options.strip_attrs))
        })?;
        Ok(Self {
            strip,
            root: Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg\s*>").context("svg root pattern")?,
            tag: Regex::new(r"<([A-Za-z][\w:.-]*)((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*?)(/?)>")
                .context("svg tag pattern")?,
            attr: Regex::new(r#"\s+([\w:.-]+)\s*=\s*("[^"]*"|'[^']*')"#).context("svg attribute pattern")?,
            id_prefix: options.id_prefix.clone(),
            width: options.width.clone(),
        })
    }

    /// Symbol id for an icon file stem.
    pub fn symbol_id(&self, stem: &str) -> String {
        let stem: String = stem
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .collect();
        format!("{}{stem}", self.id_prefix)
    }

    /// Convert one SVG document into a `<symbol>`.
    pub fn symbol_for(&self, stem: &str, svg: &str) -> std::result::Result<String, String> {
        let caps = self
            .root
            .captures(svg)
            .ok_or_else(|| "no <svg> root element".to_string())?;
        let root_attrs = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        let id = self.symbol_id(stem);
        let view_box = self
            .attr
            .captures_iter(root_attrs)
            .find(|c| &c[1] == "viewBox")
            .map(|c| c[2].to_string());

        let local_ids: BTreeSet<String> = self
            .tag
            .captures_iter(body)
            .flat_map(|t| {
                self.attr
                    .captures_iter(t.get(2).map_or("", |m| m.as_str()))
                    .filter(|a| &a[1] == "id")
                    .map(|a| unquote(&a[2]).to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        let body = self.tag.replace_all(body, |t: &Captures<'_>| {
            let attrs = self.rewrite_attrs(&t[2], &id, &local_ids);
            format!("<{}{}{}>", &t[1], attrs, &t[3])
        });

        let mut out = format!(r#"<symbol id="{id}""#);
        if let Some(view_box) = view_box {
            out.push_str(&format!(" viewBox={view_box}"));
        }
        out.push('>');
        out.push_str(body.trim());
        out.push_str("</symbol>");
        Ok(out)
    }

    fn rewrite_attrs(&self, attrs: &str, ns: &str, local_ids: &BTreeSet<String>) -> String {
        self.attr
            .replace_all(attrs, |a: &Captures<'_>| {
                let name = &a[1];
                if self.strip.is_match(name) {
                    return String::new();
                }
                let value = unquote(&a[2]);
                let value = if name == "id" {
                    format!("{ns}-{value}")
                } else {
                    namespace_refs(value, ns, local_ids)
                };
                format!(r#" {name}="{value}""#)
            })
            .into_owned()
    }

    /// Assemble the sprite document from `(stem, svg)` pairs, sorted by stem.
    pub fn build_sprite(&self, icons: &[(String, String)]) -> std::result::Result<String, (String, String)> {
        let mut sorted: Vec<&(String, String)> = icons.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        out.push_str(XML_DECLARATION);
        out.push_str(DOCTYPE);
        out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink""#);
        if let Some(width) = &self.width {
            out.push_str(&format!(r#" width="{width}""#));
        }
        out.push('>');
        for (stem, svg) in sorted {
            let symbol = self
                .symbol_for(stem, svg)
                .map_err(|message| (stem.clone(), message))?;
            out.push_str(&symbol);
        }
        out.push_str("</svg>");
        Ok(out)
    }
}

fn unquote(v: &str) -> &str {
    v.get(1..v.len().saturating_sub(1)).unwrap_or(v)
}

fn namespace_refs(value: &str, ns: &str, local_ids: &BTreeSet<String>) -> String {
    let mut value = value.to_string();
    for id in local_ids {
        if value == format!("#{id}") {
            return format!("#{ns}-{id}");
        }
        value = value.replace(&format!("url(#{id})"), &format!("url(#{ns}-{id})"));
    }
    value
}

/// Packs every SVG matching a glob into one symbol sprite file.
#[derive(Debug, Clone)]
pub struct IconsTask {
    name: TaskName,
    fs: Arc<dyn FileSystem>,
    src_dir: PathBuf,
    pattern: String,
    output: PathBuf,
    builder: SpriteBuilder,
}

impl IconsTask {
    pub fn new(
        name: impl Into<TaskName>,
        fs: Arc<dyn FileSystem>,
        src_dir: impl Into<PathBuf>,
        pattern: impl Into<String>,
        output: impl Into<PathBuf>,
        options: &SpriteOptions,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            fs,
            src_dir: src_dir.into(),
            pattern: pattern.into(),
            output: output.into(),
            builder: SpriteBuilder::new(options)?,
        })
    }

    fn execute(&self) -> Result<()> {
        let files = expand(self.fs.as_ref(), &self.src_dir, &self.pattern)
            .map_err(|e| BuildError::io(&self.name, &self.src_dir, e))?;

        let mut icons = Vec::with_capacity(files.len());
        for file in &files {
            let svg = self
                .fs
                .read_to_string(&file.path)
                .map_err(|e| BuildError::io(&self.name, &file.path, e))?;
            let stem = file
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            icons.push((stem, svg));
        }

        let sprite = self.builder.build_sprite(&icons).map_err(|(stem, message)| {
            let path = files
                .iter()
                .find(|f| f.path.file_stem().is_some_and(|s| s.to_string_lossy() == stem))
                .map_or_else(|| self.src_dir.clone(), |f| f.path.clone());
            BuildError::transform(&self.name, path, message)
        })?;

        self.fs
            .write(&self.output, sprite.as_bytes())
            .map_err(|e| BuildError::io(&self.name, &self.output, e))?;
        info!(task = %self.name, icons = icons.len(), out = %self.output.display(), "sprite written");
        Ok(())
    }
}

impl Task for IconsTask {
    fn run(&self) -> TaskFuture<'_> {
        let this = self.clone();
        Box::pin(blocking(&self.name, move || this.execute()))
    }
}
