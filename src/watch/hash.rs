// src/watch/hash.rs

//! Content hashing for change detection.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per path.
///
/// Editors often rewrite a file without changing it (or touch it twice in
/// a row); this lets the dispatcher drop such events.
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: HashMap<PathBuf, String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `path` and compare it with the last seen hash.
    ///
    /// Returns `true` if the content is new or differs; the cache is updated
    /// either way.
    pub fn has_changed(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<bool> {
        let hash = compute_file_hash(fs, path)?;
        let previous = self.hashes.insert(path.to_path_buf(), hash.clone());
        let changed = previous.as_deref() != Some(hash.as_str());
        if !changed {
            debug!(?path, "content hash unchanged");
        }
        Ok(changed)
    }

    /// Drop the cached hash for a removed file.
    pub fn forget(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("forgot cached hash for {:?}", path);
        }
    }
}
