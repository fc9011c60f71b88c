//! Shared type definitions for the lazypack crate
//!
//! This module contains the records that flow through the lazy bundle
//! pipeline: raw build artifacts coming from the upstream bundler, the entry
//! modules describing each component entry point, and the bundle modules
//! produced once every style mode of an entry has been written.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Style mode used when a component has no mode-specific styling
pub const DEFAULT_STYLE_MODE: &str = "$";

/// Token in the core bundle replaced with the serialized lazy bundle metadata
pub const LAZY_BUNDLE_DATA_PLACEHOLDER: &str = "[/*!__LAZY_BUNDLE_DATA__*/]";

/// Classification of a build artifact
///
/// Resolved once when the artifact enters the pipeline, so no stage has to
/// re-interpret the upstream bundler's boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Entry point of one or more lazily loaded components
    ComponentEntry,

    /// Shared code split out by the bundler
    Chunk,

    /// The runtime loader that receives the lazy bundle metadata
    CoreBundle,
}

impl ArtifactKind {
    /// Resolve the upstream classification flags
    ///
    /// The flags are expected to be mutually exclusive; when both are set the
    /// component flag takes precedence.
    pub fn from_flags(is_component: bool, is_app_core: bool) -> Self {
        if is_component {
            Self::ComponentEntry
        } else if is_app_core {
            Self::CoreBundle
        } else {
            Self::Chunk
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComponentEntry => write!(f, "component-entry"),
            Self::Chunk => write!(f, "chunk"),
            Self::CoreBundle => write!(f, "core"),
        }
    }
}

/// One compiled output of the upstream bundler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub code: String,
    pub file_name: String,
    pub entry_key: Option<String>,
    pub kind: ArtifactKind,
}

impl BuildArtifact {
    pub fn new(kind: ArtifactKind, file_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            file_name: file_name.into(),
            entry_key: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_entry_key(mut self, entry_key: impl Into<String>) -> Self {
        self.entry_key = Some(entry_key.into());
        self
    }
}

/// A logical component entry point and the style modes it must be emitted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryModule {
    pub entry_key: String,
    pub mode_names: Vec<String>,
    pub cmps: Arc<[ComponentMeta]>,
}

/// Shadow DOM / scoped CSS strategy of a component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encapsulation {
    #[default]
    None,
    Shadow,
    Scoped,
}

/// Compiled shape of a single component, as recorded by the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentMeta {
    pub tag_name: String,
    pub encapsulation: Encapsulation,
    pub has_slot: bool,
    pub has_mode: bool,
    /// Members keyed by property name, in declaration order
    pub members: IndexMap<String, MemberMeta>,
    pub listeners: Vec<ListenerMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Prop,
    State,
    Method,
    Element,
    Event,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropType {
    String,
    Number,
    Boolean,
    #[default]
    Any,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMeta {
    pub kind: MemberKind,
    #[serde(default)]
    pub prop_type: PropType,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub reflect: bool,
    #[serde(default)]
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerMeta {
    pub event: String,
    pub method: String,
    #[serde(default)]
    pub target: Option<ListenerTarget>,
    #[serde(default)]
    pub capture: bool,
    #[serde(default)]
    pub passive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerTarget {
    Document,
    Window,
    Body,
    Parent,
}

/// One physical file written for an (entry, style mode) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeOutput {
    pub mode_name: String,
    pub bundle_id: String,
    pub file_name: String,
}

/// Everything the runtime loader needs to know about one component entry
///
/// `outputs` is sorted by mode name, so identical inputs always serialize to
/// identical metadata regardless of write completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleModule {
    pub entry_key: String,
    pub mode_names: Vec<String>,
    pub cmps: Arc<[ComponentMeta]>,
    pub outputs: Vec<ModeOutput>,
}
