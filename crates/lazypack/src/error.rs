//! Fatal pipeline errors
//!
//! These are build-invariant violations. Recoverable problems (a transform
//! that failed, a minifier that gave up) are reported as diagnostics instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LazyBundleError {
    #[error("no entry module found for component bundle '{file_name}' (entry key: {entry_key:?})")]
    MissingEntryModule {
        file_name: String,
        entry_key: Option<String>,
    },

    #[error("bundle module '{entry_key}' must have at least one output")]
    EmptyBundleOutputs { entry_key: String },

    #[error("core bundle '{file_name}' does not contain the lazy bundle data placeholder")]
    MissingPlaceholder { file_name: String },
}
