//! Tests for lazy bundle runtime metadata

use std::sync::Arc;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use super::*;
use crate::types::{ModeOutput, DEFAULT_STYLE_MODE};

fn output(mode_name: &str, bundle_id: &str) -> ModeOutput {
    ModeOutput {
        mode_name: mode_name.to_owned(),
        bundle_id: bundle_id.to_owned(),
        file_name: format!("{bundle_id}.entry.js"),
    }
}

fn bundle(entry_key: &str, outputs: Vec<ModeOutput>, cmps: Vec<ComponentMeta>) -> BundleModule {
    BundleModule {
        entry_key: entry_key.to_owned(),
        mode_names: outputs.iter().map(|o| o.mode_name.clone()).collect(),
        cmps: cmps.into(),
        outputs,
    }
}

fn icon() -> ComponentMeta {
    let mut members = IndexMap::new();
    members.insert(
        "name".to_owned(),
        MemberMeta {
            kind: MemberKind::Prop,
            prop_type: PropType::String,
            attribute: Some("name".to_owned()),
            reflect: false,
            mutable: false,
        },
    );
    ComponentMeta {
        tag_name: "ion-icon".to_owned(),
        encapsulation: Encapsulation::Shadow,
        members,
        ..ComponentMeta::default()
    }
}

fn formatter(default_mode: &str) -> (RuntimeComponentFormatter, JsonLiteralSerializer, String) {
    (
        RuntimeComponentFormatter,
        JsonLiteralSerializer::default(),
        default_mode.to_owned(),
    )
}

#[test]
fn test_multiple_modes_encode_as_mapping() {
    let (cmp_formatter, serializer, default_mode) = formatter("md");
    let formatter = LazyBundleFormatter::new(&cmp_formatter, &serializer, &default_mode);

    let e1 = bundle("E1", vec![output("ios", "b2"), output("md", "a1")], vec![icon()]);
    let data = formatter.format_bundle(&e1).unwrap();

    let mut expected = IndexMap::new();
    expected.insert("ios".to_owned(), "b2".to_owned());
    expected.insert("md".to_owned(), "a1".to_owned());
    assert_eq!(data.0, BundleIds::PerMode(expected));

    insta::assert_snapshot!(
        formatter.format(&[e1]).unwrap(),
        @r#"[[{"ios":"b2","md":"a1"},[[1,"ion-icon",{"name":[1,"name"]}]]]]"#
    );
}

#[test]
fn test_single_default_mode_encodes_as_scalar() {
    let (cmp_formatter, serializer, default_mode) = formatter("md");
    let formatter = LazyBundleFormatter::new(&cmp_formatter, &serializer, &default_mode);

    let e2 = bundle("E2", vec![output("md", "c3")], vec![]);
    let data = formatter.format_bundle(&e2).unwrap();

    assert_eq!(data.0, BundleIds::Single("c3".to_owned()));
    insta::assert_snapshot!(formatter.format(&[e2]).unwrap(), @r#"[["c3",[]]]"#);
}

#[test]
fn test_single_non_default_mode_encodes_as_mapping() {
    let (cmp_formatter, serializer, default_mode) = formatter(DEFAULT_STYLE_MODE);
    let formatter = LazyBundleFormatter::new(&cmp_formatter, &serializer, &default_mode);

    let data = formatter
        .format_bundle(&bundle("E3", vec![output("ios", "d4")], vec![]))
        .unwrap();

    match data.0 {
        BundleIds::PerMode(ids) => {
            assert_eq!(ids.keys().collect::<Vec<_>>(), vec!["ios"]);
        }
        BundleIds::Single(id) => panic!("expected a mapping, got scalar {id}"),
    }
}

#[test]
fn test_empty_outputs_is_fatal() {
    let (cmp_formatter, serializer, default_mode) = formatter(DEFAULT_STYLE_MODE);
    let formatter = LazyBundleFormatter::new(&cmp_formatter, &serializer, &default_mode);

    let err = formatter
        .format(&[bundle("empty-entry", vec![], vec![icon()])])
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LazyBundleError>(),
        Some(LazyBundleError::EmptyBundleOutputs { entry_key }) if entry_key == "empty-entry"
    ));
}

#[test]
fn test_component_flags_and_conditional_members() {
    let mut members = IndexMap::new();
    members.insert(
        "open".to_owned(),
        MemberMeta {
            kind: MemberKind::Prop,
            prop_type: PropType::Boolean,
            attribute: Some("open".to_owned()),
            reflect: true,
            mutable: true,
        },
    );
    members.insert(
        "present".to_owned(),
        MemberMeta {
            kind: MemberKind::Method,
            prop_type: PropType::Any,
            attribute: None,
            reflect: false,
            mutable: false,
        },
    );
    let modal = ComponentMeta {
        tag_name: "ion-modal".to_owned(),
        encapsulation: Encapsulation::Scoped,
        has_slot: true,
        has_mode: true,
        members,
        listeners: vec![ListenerMeta {
            event: "keydown".to_owned(),
            method: "onKeydown".to_owned(),
            target: Some(ListenerTarget::Document),
            capture: false,
            passive: true,
        }],
    };

    let full = RuntimeComponentFormatter.format(&modal, true, true);
    assert_eq!(
        full,
        json!([
            2 | 4 | 32,
            "ion-modal",
            {"open": [4 | 512 | 1024, "open"], "present": [64]},
            [[4 | 1, "keydown", "onKeydown"]]
        ])
    );

    let bare = RuntimeComponentFormatter.format(&modal, false, false);
    assert_eq!(
        bare,
        json!([
            2 | 32,
            "ion-modal",
            {"open": [4 | 512 | 1024, "open"]},
            [[4 | 1, "keydown", "onKeydown"]]
        ])
    );
}

#[test]
fn test_shadow_components_never_relocate_slots() {
    let cmp = ComponentMeta {
        tag_name: "my-card".to_owned(),
        encapsulation: Encapsulation::Shadow,
        has_slot: true,
        ..ComponentMeta::default()
    };
    assert_eq!(RuntimeComponentFormatter.format(&cmp, true, true), json!([1, "my-card"]));
}

#[test]
fn test_large_payloads_are_wrapped_in_json_parse() {
    let serializer = JsonLiteralSerializer { parse_threshold: 10 };

    assert_eq!(serializer.stringify(&json!(["ab"])).unwrap(), r#"["ab"]"#);
    assert_eq!(
        serializer.stringify(&json!(["abcdefghij"])).unwrap(),
        r#"JSON.parse("[\"abcdefghij\"]")"#
    );
}

#[test]
fn test_cmps_are_shared_not_copied() {
    let cmps: Arc<[ComponentMeta]> = vec![icon()].into();
    let bundle_module = BundleModule {
        entry_key: "ion-icon".to_owned(),
        mode_names: vec![DEFAULT_STYLE_MODE.to_owned()],
        cmps: Arc::clone(&cmps),
        outputs: vec![output(DEFAULT_STYLE_MODE, "ion-icon")],
    };
    assert!(Arc::ptr_eq(&cmps, &bundle_module.cmps));

    let (cmp_formatter, serializer, default_mode) = formatter(DEFAULT_STYLE_MODE);
    let formatter = LazyBundleFormatter::new(&cmp_formatter, &serializer, &default_mode);
    insta::assert_snapshot!(
        formatter.format(&[bundle_module]).unwrap(),
        @r#"[["ion-icon",[[1,"ion-icon",{"name":[1,"name"]}]]]]"#
    );
}
