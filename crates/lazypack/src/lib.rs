//! Lazy bundle assembly
//!
//! Takes the code artifacts produced by an upstream bundler and turns them
//! into lazily loadable modules: component entries are written once per style
//! mode, shared chunks are written as-is, and the core loader bundle receives
//! the metadata it needs to request the right file for a component at
//! runtime. See [`lazy_modules::LazyModuleGenerator`] for the pipeline.

pub mod blocking;
pub mod classify;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod finish;
pub mod fs;
pub mod host;
pub mod lazy_modules;
pub mod manifest;
pub mod module_writer;
pub mod runtime_meta;
pub mod types;
pub mod write;

pub use config::{Config, SourceTarget};
pub use diagnostics::{BuildDiagnostics, Diagnostic, DiagnosticLevel};
pub use error::LazyBundleError;
pub use host::BuildHost;
pub use lazy_modules::{BuildContext, LazyModuleGenerator};
