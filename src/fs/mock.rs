// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory filesystem for tests.
///
/// Only files are stored; a directory exists when some file lives below it
/// or it was created explicitly with [`MockFileSystem::add_dir`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.lock()
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.lock().dirs.insert(path.as_ref().to_path_buf());
    }

    /// Snapshot of every file path currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockState {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
            || self
                .files
                .keys()
                .chain(self.dirs.iter())
                .any(|p| p != path && p.starts_with(path))
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let bytes = self.read(path)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.is_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        let children: BTreeSet<PathBuf> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter_map(|rel| rel.components().next())
            .map(|first| path.join(first))
            .collect();

        Ok(children.into_iter().collect())
    }

    fn remove_dir_contents(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        let existed = state.is_dir(path);
        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|p| !p.starts_with(path));
        if existed {
            state.dirs.insert(path.to_path_buf());
        }
        Ok(())
    }
}
