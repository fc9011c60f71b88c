//! Runtime metadata for the lazy loader
//!
//! Every bundle module is encoded as a 2-tuple:
//!
//! ```text
//! [bundleIds, [cmpMeta, ...]]
//! ```
//!
//! `bundleIds` is a plain string when the entry only exists in the default
//! style mode, and an object keyed by mode name otherwise, e.g.
//! `[{"ios":"b2","md":"a1"},[[1,"ion-icon",{"name":[1]}]]]`. The loader tells
//! the two apart by type.

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    error::LazyBundleError,
    host::{ComponentMetaFormatter, RuntimeDataSerializer},
    types::{
        BundleModule, ComponentMeta, Encapsulation, ListenerMeta, ListenerTarget, MemberKind,
        MemberMeta, PropType,
    },
};

/// Bundle identifier field of a runtime tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BundleIds {
    Single(String),
    PerMode(IndexMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LazyBundleRuntimeData(pub BundleIds, pub Vec<Value>);

#[derive(Clone, Copy)]
pub struct LazyBundleFormatter<'a> {
    component_formatter: &'a dyn ComponentMetaFormatter,
    serializer: &'a dyn RuntimeDataSerializer,
    default_mode: &'a str,
}

impl<'a> LazyBundleFormatter<'a> {
    pub fn new(
        component_formatter: &'a dyn ComponentMetaFormatter,
        serializer: &'a dyn RuntimeDataSerializer,
        default_mode: &'a str,
    ) -> Self {
        Self {
            component_formatter,
            serializer,
            default_mode,
        }
    }

    /// Serialize the metadata of every bundle module into one code literal
    pub fn format(&self, bundle_modules: &[BundleModule]) -> Result<String> {
        let bundles = bundle_modules
            .iter()
            .map(|bundle_module| self.format_bundle(bundle_module))
            .collect::<Result<Vec<_>>>()?;

        self.serializer.stringify(&serde_json::to_value(bundles)?)
    }

    pub fn format_bundle(&self, bundle_module: &BundleModule) -> Result<LazyBundleRuntimeData> {
        let bundle_ids = match bundle_module.outputs.as_slice() {
            [] => {
                return Err(LazyBundleError::EmptyBundleOutputs {
                    entry_key: bundle_module.entry_key.clone(),
                }
                .into());
            }
            [only] if only.mode_name == self.default_mode => {
                BundleIds::Single(only.bundle_id.clone())
            }
            outputs => BundleIds::PerMode(
                outputs
                    .iter()
                    .map(|output| (output.mode_name.clone(), output.bundle_id.clone()))
                    .collect(),
            ),
        };

        let cmps = bundle_module
            .cmps
            .iter()
            .map(|cmp| self.component_formatter.format(cmp, true, true))
            .collect();

        Ok(LazyBundleRuntimeData(bundle_ids, cmps))
    }
}

impl std::fmt::Debug for LazyBundleFormatter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyBundleFormatter")
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

pub mod cmp_flags {
    pub const SHADOW_DOM_ENCAPSULATION: u32 = 1 << 0;
    pub const SCOPED_CSS_ENCAPSULATION: u32 = 1 << 1;
    pub const HAS_SLOT_RELOCATION: u32 = 1 << 2;
    pub const HAS_MODE: u32 = 1 << 5;
}

pub mod member_flags {
    pub const STRING: u32 = 1 << 0;
    pub const NUMBER: u32 = 1 << 1;
    pub const BOOLEAN: u32 = 1 << 2;
    pub const ANY: u32 = 1 << 3;
    pub const UNKNOWN: u32 = 1 << 4;
    pub const STATE: u32 = 1 << 5;
    pub const METHOD: u32 = 1 << 6;
    pub const EVENT: u32 = 1 << 7;
    pub const ELEMENT: u32 = 1 << 8;
    pub const REFLECT_ATTR: u32 = 1 << 9;
    pub const MUTABLE: u32 = 1 << 10;
}

pub mod listener_flags {
    pub const PASSIVE: u32 = 1 << 0;
    pub const CAPTURE: u32 = 1 << 1;
    pub const TARGET_DOCUMENT: u32 = 1 << 2;
    pub const TARGET_WINDOW: u32 = 1 << 3;
    pub const TARGET_BODY: u32 = 1 << 4;
    pub const TARGET_PARENT: u32 = 1 << 5;
}

/// Compact `[flags, tagName, members?, listeners?]` encoding of a component
///
/// With `include_conditional_load`, method members are kept so the loader can
/// proxy them until the implementation arrives. With `include_slot`, slot
/// relocation is flagged for components that use slots without native
/// shadow DOM.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeComponentFormatter;

impl ComponentMetaFormatter for RuntimeComponentFormatter {
    fn format(
        &self,
        cmp: &ComponentMeta,
        include_conditional_load: bool,
        include_slot: bool,
    ) -> Value {
        let mut flags = match cmp.encapsulation {
            Encapsulation::Shadow => cmp_flags::SHADOW_DOM_ENCAPSULATION,
            Encapsulation::Scoped => cmp_flags::SCOPED_CSS_ENCAPSULATION,
            Encapsulation::None => 0,
        };
        if include_slot && cmp.has_slot && cmp.encapsulation != Encapsulation::Shadow {
            flags |= cmp_flags::HAS_SLOT_RELOCATION;
        }
        if cmp.has_mode {
            flags |= cmp_flags::HAS_MODE;
        }

        let members: serde_json::Map<String, Value> = cmp
            .members
            .iter()
            .filter(|(_, member)| include_conditional_load || member.kind != MemberKind::Method)
            .map(|(name, member)| (name.clone(), format_member(member)))
            .collect();
        let listeners: Vec<Value> = cmp.listeners.iter().map(format_listener).collect();

        let mut meta = vec![json!(flags), json!(cmp.tag_name)];
        if !members.is_empty() || !listeners.is_empty() {
            meta.push(Value::Object(members));
        }
        if !listeners.is_empty() {
            meta.push(Value::Array(listeners));
        }
        Value::Array(meta)
    }
}

fn format_member(member: &MemberMeta) -> Value {
    let mut flags = match member.kind {
        MemberKind::Prop => match member.prop_type {
            PropType::String => member_flags::STRING,
            PropType::Number => member_flags::NUMBER,
            PropType::Boolean => member_flags::BOOLEAN,
            PropType::Any => member_flags::ANY,
            PropType::Unknown => member_flags::UNKNOWN,
        },
        MemberKind::State => member_flags::STATE,
        MemberKind::Method => member_flags::METHOD,
        MemberKind::Event => member_flags::EVENT,
        MemberKind::Element => member_flags::ELEMENT,
    };
    if member.reflect {
        flags |= member_flags::REFLECT_ATTR;
    }
    if member.mutable {
        flags |= member_flags::MUTABLE;
    }

    match (&member.kind, &member.attribute) {
        (MemberKind::Prop, Some(attribute)) => json!([flags, attribute]),
        _ => json!([flags]),
    }
}

fn format_listener(listener: &ListenerMeta) -> Value {
    let mut flags = match listener.target {
        Some(ListenerTarget::Document) => listener_flags::TARGET_DOCUMENT,
        Some(ListenerTarget::Window) => listener_flags::TARGET_WINDOW,
        Some(ListenerTarget::Body) => listener_flags::TARGET_BODY,
        Some(ListenerTarget::Parent) => listener_flags::TARGET_PARENT,
        None => 0,
    };
    if listener.passive {
        flags |= listener_flags::PASSIVE;
    }
    if listener.capture {
        flags |= listener_flags::CAPTURE;
    }
    json!([flags, listener.event, listener.method])
}

/// Emits runtime data as a JSON literal
///
/// Payloads longer than `parse_threshold` characters are wrapped in
/// `JSON.parse("...")`, which engines parse faster than an equivalent object
/// literal.
#[derive(Debug, Clone, Copy)]
pub struct JsonLiteralSerializer {
    pub parse_threshold: usize,
}

impl Default for JsonLiteralSerializer {
    fn default() -> Self {
        Self {
            parse_threshold: 10_000,
        }
    }
}

impl RuntimeDataSerializer for JsonLiteralSerializer {
    fn stringify(&self, value: &Value) -> Result<String> {
        let json = serde_json::to_string(value)?;
        if json.len() > self.parse_threshold {
            Ok(format!("JSON.parse({})", serde_json::to_string(&json)?))
        } else {
            Ok(json)
        }
    }
}

#[cfg(test)]
mod tests;
