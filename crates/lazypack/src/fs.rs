//! Filesystem collaborators

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use log::trace;

use crate::{blocking::run_blocking, host::FileSystem};

/// Writes to disk on a dedicated thread, creating parent directories as needed
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl DiskFileSystem {
    fn write_sync(path: &Path, code: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, code).with_context(|| format!("Failed to write {}", path.display()))?;
        trace!("Wrote {} ({} bytes)", path.display(), code.len());
        Ok(())
    }
}

#[async_trait]
impl FileSystem for DiskFileSystem {
    async fn write_file(&self, path: &Path, code: &str) -> Result<()> {
        let owned_path = path.to_path_buf();
        let code = code.to_owned();
        run_blocking(move || Self::write_sync(&owned_path, &code))
            .await
            .with_context(|| format!("Writer thread for {} panicked", path.display()))?
    }
}

/// Keeps every write in memory, in write order
///
/// Used for dry runs; a later write to the same path replaces the content
/// but keeps the original position.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<IndexMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, IndexMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn write_file(&self, path: &Path, code: &str) -> Result<()> {
        self.files().insert(path.to_path_buf(), code.to_owned());
        Ok(())
    }
}
