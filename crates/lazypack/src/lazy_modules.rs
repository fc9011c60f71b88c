//! Lazy module generation
//!
//! Turns the bundler's raw output into the files the lazy loader consumes:
//!
//! 1. Component entries are finished and written once per style mode.
//! 2. Shared chunks are finished and written as-is, concurrently with (1).
//! 3. Once every entry is known, the core bundle receives the serialized
//!    lazy bundle metadata and is written last.
//!
//! Concurrent work is never cancelled: every task started in a phase runs to
//! completion before the first failure of that phase is reported.

use std::{borrow::Cow, sync::Arc};

use anyhow::Result;
use cow_utils::CowUtils;
use futures::future::join_all;
use log::{debug, trace, warn};
use rustc_hash::FxHashMap;

use crate::{
    classify::classify_artifacts,
    config::Config,
    diagnostics::{BuildDiagnostics, Diagnostic},
    error::LazyBundleError,
    finish::CodeFinisher,
    host::BuildHost,
    runtime_meta::LazyBundleFormatter,
    types::{BuildArtifact, BundleModule, EntryModule, LAZY_BUNDLE_DATA_PLACEHOLDER},
    write::write_all,
};

/// Build state shared with the surrounding compiler
#[derive(Debug, Default)]
pub struct BuildContext {
    pub entry_modules: Vec<EntryModule>,
    pub diagnostics: BuildDiagnostics,
}

impl BuildContext {
    pub fn new(entry_modules: Vec<EntryModule>) -> Self {
        Self {
            entry_modules,
            diagnostics: BuildDiagnostics::new(),
        }
    }
}

pub type EntryIndex<'a> = FxHashMap<&'a str, &'a EntryModule>;

#[derive(Debug, Clone, Copy)]
pub struct LazyModuleGenerator<'a> {
    config: &'a Config,
    host: &'a BuildHost,
}

impl<'a> LazyModuleGenerator<'a> {
    pub fn new(config: &'a Config, host: &'a BuildHost) -> Self {
        Self { config, host }
    }

    /// Run the whole pipeline over one build's artifacts
    ///
    /// Returns the bundle modules of every component entry, in artifact
    /// order.
    pub async fn generate(
        &self,
        build_ctx: &BuildContext,
        artifacts: Vec<BuildArtifact>,
    ) -> Result<Vec<BundleModule>> {
        let classified = classify_artifacts(artifacts);
        debug!(
            "Generating lazy modules: {} entries, {} chunks, {} core bundles",
            classified.entries.len(),
            classified.chunks.len(),
            classified.cores.len()
        );

        let mut entry_index = EntryIndex::default();
        for entry in &build_ctx.entry_modules {
            entry_index.entry(entry.entry_key.as_str()).or_insert(entry);
        }

        let entry_builds = join_all(
            classified
                .entries
                .iter()
                .map(|artifact| self.generate_entry_module(build_ctx, &entry_index, artifact)),
        );
        let chunk_writes = join_all(classified.chunks.iter().map(|artifact| {
            self.write_chunk(build_ctx, artifact.code.clone(), &artifact.file_name)
        }));
        let (bundle_modules, chunk_results) = futures::join!(entry_builds, chunk_writes);

        let bundle_modules = bundle_modules.into_iter().collect::<Result<Vec<_>>>()?;
        chunk_results.into_iter().collect::<Result<()>>()?;

        self.write_cores(build_ctx, &classified.cores, &bundle_modules)
            .await?;

        Ok(bundle_modules)
    }

    /// Finish one component entry and write it for every style mode
    pub async fn generate_entry_module(
        &self,
        build_ctx: &BuildContext,
        entry_index: &EntryIndex<'_>,
        artifact: &BuildArtifact,
    ) -> Result<BundleModule> {
        let entry = artifact
            .entry_key
            .as_deref()
            .and_then(|key| entry_index.get(key).copied())
            .ok_or_else(|| LazyBundleError::MissingEntryModule {
                file_name: artifact.file_name.clone(),
                entry_key: artifact.entry_key.clone(),
            })?;

        let code = self
            .finisher(build_ctx)
            .finish(
                artifact.code.clone(),
                self.config.source_target,
                self.config.minify_js,
            )
            .await;

        let writes = entry.mode_names.iter().map(|mode_name| {
            self.host
                .module_writer
                .write_module(&self.config.destinations, entry, &code, mode_name)
        });
        let mut outputs = join_all(writes)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        // Completion order of the writes must not leak into the metadata
        outputs.sort_by(|a, b| a.mode_name.cmp(&b.mode_name));
        trace!(
            "Entry '{}' written for modes {:?}",
            entry.entry_key,
            outputs.iter().map(|o| o.mode_name.as_str()).collect::<Vec<_>>()
        );

        Ok(BundleModule {
            entry_key: entry.entry_key.clone(),
            mode_names: entry.mode_names.clone(),
            cmps: Arc::clone(&entry.cmps),
            outputs,
        })
    }

    /// Finish a shared chunk and write it to every destination
    pub async fn write_chunk(
        &self,
        build_ctx: &BuildContext,
        code: String,
        file_name: &str,
    ) -> Result<()> {
        let code = self
            .finisher(build_ctx)
            .finish(code, self.config.source_target, self.config.minify_js)
            .await;
        write_all(
            self.host.fs.as_ref(),
            &code,
            file_name,
            &self.config.destinations,
        )
        .await
    }

    /// Inject the lazy bundle metadata into every core bundle and write them
    ///
    /// The metadata is computed before the first core write, so an invalid
    /// bundle module aborts the build with no core bundle on disk.
    pub async fn write_cores(
        &self,
        build_ctx: &BuildContext,
        cores: &[BuildArtifact],
        bundle_modules: &[BundleModule],
    ) -> Result<()> {
        let lazy_data = LazyBundleFormatter::new(
            self.host.component_formatter.as_ref(),
            self.host.serializer.as_ref(),
            &self.config.default_style_mode,
        )
        .format(bundle_modules)?;
        debug!(
            "Lazy bundle data for {} bundles: {} bytes",
            bundle_modules.len(),
            lazy_data.len()
        );

        let codes = cores
            .iter()
            .map(|core| self.inject_lazy_data(build_ctx, core, &lazy_data))
            .collect::<Result<Vec<_>>>()?;

        let writes = cores
            .iter()
            .zip(codes)
            .map(|(core, code)| self.write_chunk(build_ctx, code, &core.file_name));
        join_all(writes).await.into_iter().collect()
    }

    /// Replace the placeholder of one core bundle with `lazy_data`
    pub fn inject_lazy_data(
        &self,
        build_ctx: &BuildContext,
        core: &BuildArtifact,
        lazy_data: &str,
    ) -> Result<String> {
        match core
            .code
            .cow_replacen(LAZY_BUNDLE_DATA_PLACEHOLDER, lazy_data, 1)
        {
            Cow::Owned(code) => Ok(code),
            Cow::Borrowed(code) => {
                if self.config.require_lazy_data_placeholder {
                    return Err(LazyBundleError::MissingPlaceholder {
                        file_name: core.file_name.clone(),
                    }
                    .into());
                }
                warn!(
                    "Core bundle {} has no lazy bundle data placeholder, writing it unchanged",
                    core.file_name
                );
                build_ctx.diagnostics.push(
                    Diagnostic::warning(
                        "Lazy bundle data",
                        format!("placeholder {LAZY_BUNDLE_DATA_PLACEHOLDER} not found"),
                    )
                    .with_file(core.file_name.clone()),
                );
                Ok(code.to_owned())
            }
        }
    }

    fn finisher<'b>(&'b self, build_ctx: &'b BuildContext) -> CodeFinisher<'b> {
        CodeFinisher::new(
            self.host.transformer.as_ref(),
            self.host.optimizer.as_ref(),
            &build_ctx.diagnostics,
        )
    }
}
