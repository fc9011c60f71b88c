//! Build manifest written by the upstream bundler
//!
//! ```json
//! {
//!   "artifacts": [
//!     { "fileName": "core.js", "codeFile": "out/core.js", "isAppCore": true },
//!     { "fileName": "my-cmp.entry.js", "code": "...", "entryKey": "my-cmp", "isComponent": true }
//!   ],
//!   "entryModules": [
//!     { "entryKey": "my-cmp", "modeNames": ["$"], "cmps": [{ "tagName": "my-cmp" }] }
//!   ]
//! }
//! ```
//!
//! `codeFile` paths are relative to the manifest's directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::{ArtifactKind, BuildArtifact, EntryModule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    pub artifacts: Vec<BuildArtifact>,
    pub entry_modules: Vec<EntryModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawManifest {
    artifacts: Vec<RawArtifact>,
    #[serde(default)]
    entry_modules: Vec<EntryModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawArtifact {
    file_name: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    code_file: Option<PathBuf>,
    #[serde(default)]
    entry_key: Option<String>,
    #[serde(default)]
    is_component: bool,
    #[serde(default)]
    is_app_core: bool,
}

pub fn load_manifest(path: &Path) -> Result<BuildManifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&content, base_dir)
        .with_context(|| format!("Invalid manifest {}", path.display()))
}

pub fn parse_manifest(content: &str, base_dir: &Path) -> Result<BuildManifest> {
    let raw: RawManifest = serde_json::from_str(content)?;

    let artifacts = raw
        .artifacts
        .into_iter()
        .map(|artifact| resolve_artifact(artifact, base_dir))
        .collect::<Result<Vec<_>>>()?;

    Ok(BuildManifest {
        artifacts,
        entry_modules: raw.entry_modules,
    })
}

fn resolve_artifact(raw: RawArtifact, base_dir: &Path) -> Result<BuildArtifact> {
    let code = match (raw.code, raw.code_file) {
        (Some(code), None) => code,
        (None, Some(code_file)) => {
            let path = base_dir.join(code_file);
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read code of {}", raw.file_name))?
        }
        (Some(_), Some(_)) => bail!("artifact {} has both code and codeFile", raw.file_name),
        (None, None) => bail!("artifact {} has neither code nor codeFile", raw.file_name),
    };

    Ok(BuildArtifact {
        code,
        file_name: raw.file_name,
        entry_key: raw.entry_key,
        kind: ArtifactKind::from_flags(raw.is_component, raw.is_app_core),
    })
}
