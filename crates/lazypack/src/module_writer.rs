//! Default module writer for lazy component entries

use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use sha2::{Digest, Sha256};

use crate::{
    config::Config,
    host::{FileSystem, ModuleWriter},
    types::{EntryModule, ModeOutput},
    write::write_all,
};

/// Names each mode output and writes it as `<bundleId>.entry.js`
pub struct HashingModuleWriter {
    fs: Arc<dyn FileSystem>,
    hash_file_names: bool,
    hash_length: usize,
    suffix: String,
    default_mode: String,
}

impl HashingModuleWriter {
    pub fn from_config(config: &Config, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hash_file_names: config.hash_file_names,
            hash_length: config.hashed_file_name_length,
            suffix: config.bundle_suffix.clone(),
            default_mode: config.default_style_mode.clone(),
        }
    }

    /// Identifier the runtime loader uses to request this output
    ///
    /// Hashed ids cover the mode name as well as the code, so two modes of
    /// the same entry never collide.
    pub fn bundle_id(&self, entry_key: &str, code: &str, mode_name: &str) -> String {
        if self.hash_file_names {
            let mut hasher = Sha256::new();
            hasher.update(mode_name.as_bytes());
            hasher.update(b"\0");
            hasher.update(code.as_bytes());
            let mut hash = format!("{:x}", hasher.finalize());
            hash.truncate(self.hash_length);
            return format!("p-{hash}{}", self.suffix);
        }

        let segments: Vec<&str> = entry_key.split('.').collect();
        let mut bundle_id = segments[0].to_owned();
        if segments.len() > 2 {
            let _ = write!(bundle_id, "_{}", segments.len() - 1);
        }
        if mode_name != self.default_mode {
            bundle_id.push('-');
            bundle_id.push_str(mode_name);
        }
        bundle_id.push_str(&self.suffix);
        bundle_id
    }
}

impl std::fmt::Debug for HashingModuleWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingModuleWriter")
            .field("hash_file_names", &self.hash_file_names)
            .field("hash_length", &self.hash_length)
            .field("suffix", &self.suffix)
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModuleWriter for HashingModuleWriter {
    async fn write_module(
        &self,
        destinations: &[PathBuf],
        entry: &EntryModule,
        code: &str,
        mode_name: &str,
    ) -> Result<ModeOutput> {
        let bundle_id = self.bundle_id(&entry.entry_key, code, mode_name);
        let file_name = format!("{bundle_id}.entry.js");
        debug!(
            "Writing entry '{}' mode '{mode_name}' as {file_name}",
            entry.entry_key
        );

        write_all(self.fs.as_ref(), code, &file_name, destinations).await?;

        Ok(ModeOutput {
            mode_name: mode_name.to_owned(),
            bundle_id,
            file_name,
        })
    }
}
