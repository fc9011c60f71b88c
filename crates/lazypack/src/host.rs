//! Collaborator contracts
//!
//! The pipeline never touches the filesystem, a transformer, or a minifier
//! directly. Everything outside the assembly logic is reached through the
//! traits below, bundled together in a [`BuildHost`].

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    command::{CommandFilter, Unavailable},
    config::{Config, SourceTarget},
    diagnostics::Diagnostic,
    module_writer::HashingModuleWriter,
    runtime_meta::{JsonLiteralSerializer, RuntimeComponentFormatter},
    types::{ComponentMeta, EntryModule, ModeOutput},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOutput {
    /// `None` when the optimizer produced nothing usable
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites code into a legacy language level
#[async_trait]
pub trait DownlevelTransformer: Send + Sync {
    async fn transform(&self, code: &str, target: SourceTarget) -> TransformOutput;
}

/// Minifies code
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(&self, code: &str, target: SourceTarget) -> OptimizeOutput;
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn write_file(&self, path: &Path, code: &str) -> Result<()>;
}

/// Writes the physical file of one (entry, style mode) pair and names it
#[async_trait]
pub trait ModuleWriter: Send + Sync {
    async fn write_module(
        &self,
        destinations: &[PathBuf],
        entry: &EntryModule,
        code: &str,
        mode_name: &str,
    ) -> Result<ModeOutput>;
}

/// Serializes the runtime shape of a single component
pub trait ComponentMetaFormatter: Send + Sync {
    fn format(
        &self,
        cmp: &ComponentMeta,
        include_conditional_load: bool,
        include_slot: bool,
    ) -> serde_json::Value;
}

/// Turns structured runtime data into a code literal
pub trait RuntimeDataSerializer: Send + Sync {
    fn stringify(&self, value: &serde_json::Value) -> Result<String>;
}

/// The set of collaborators one build runs against
#[derive(Clone)]
pub struct BuildHost {
    pub transformer: Arc<dyn DownlevelTransformer>,
    pub optimizer: Arc<dyn Optimizer>,
    pub fs: Arc<dyn FileSystem>,
    pub module_writer: Arc<dyn ModuleWriter>,
    pub component_formatter: Arc<dyn ComponentMetaFormatter>,
    pub serializer: Arc<dyn RuntimeDataSerializer>,
}

impl BuildHost {
    /// Default collaborators for `config`, writing through `fs`
    pub fn from_config(config: &Config, fs: Arc<dyn FileSystem>) -> Self {
        let transformer: Arc<dyn DownlevelTransformer> = match &config.transpile_command {
            Some(command) => Arc::new(CommandFilter::new("Transpile", command.clone())),
            None => Arc::new(Unavailable::new("Transpile")),
        };
        let optimizer: Arc<dyn Optimizer> = match &config.minify_command {
            Some(command) => Arc::new(CommandFilter::new("Minify", command.clone())),
            None => Arc::new(Unavailable::new("Minify")),
        };

        Self {
            transformer,
            optimizer,
            module_writer: Arc::new(HashingModuleWriter::from_config(config, Arc::clone(&fs))),
            fs,
            component_formatter: Arc::new(RuntimeComponentFormatter),
            serializer: Arc::new(JsonLiteralSerializer::default()),
        }
    }
}

impl fmt::Debug for BuildHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildHost").finish_non_exhaustive()
    }
}
