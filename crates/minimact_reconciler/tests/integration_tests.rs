//! Integration tests for reconciliation

use minimact_reconciler::{reconcile, ReconcileConfig, Reconciler};
use minimact_telemetry::metrics;
use minimact_vdom::prelude::*;
use minimact_vdom::{from_json_checked, patches_to_json};

fn div_with_span(text: &str) -> VNode {
    let div = HexPath::root().child(0);
    let span = div.child(0);
    VElement::new("div", div)
        .with_child(VElement::new("span", span.clone()).with_child(VNode::text(text, span.child(0))))
        .into()
}

fn keyed_list(keys: &[&str]) -> VNode {
    let ul = HexPath::root().child(0);
    let items = keys.iter().map(|key| -> VNode {
        // Keyed children keep their path wherever they move.
        let slot = key.parse::<u32>().unwrap_or(0);
        let path = ul.child_segment(slot * 0x1000_0000);
        let label = match *key {
            "1" => "A",
            "2" => "B",
            _ => "?",
        };
        VElement::new("li", path.clone())
            .with_key(*key)
            .with_child(VNode::text(label, path.child(0)))
            .into()
    });
    VElement::new("ul", ul.clone()).with_children(items).into()
}

#[test]
fn test_span_text_change_is_single_update() {
    let patches = reconcile(&div_with_span("A"), &div_with_span("B")).unwrap();
    let text_path = HexPath::root().child(0).child(0).child(0);
    assert_eq!(
        patches,
        vec![Patch::UpdateText {
            path: text_path,
            content: "B".into()
        }]
    );
}

#[test]
fn test_class_change_is_single_set_attribute() {
    let path = HexPath::root().child(0);
    let old: VNode = VElement::new("div", path.clone()).with_attr("class", "x").into();
    let new: VNode = VElement::new("div", path.clone()).with_attr("class", "y").into();
    assert_eq!(
        reconcile(&old, &new).unwrap(),
        vec![Patch::SetAttribute {
            path,
            name: "class".into(),
            value: "y".into()
        }]
    );
}

#[test]
fn test_keyed_swap_is_single_reorder() {
    let old = keyed_list(&["1", "2"]);
    let new = keyed_list(&["2", "1"]);
    let patches = reconcile(&old, &new).unwrap();
    assert_eq!(patches.len(), 1);
    match &patches[0] {
        Patch::ReorderChildren { parent_path, order } => {
            assert_eq!(parent_path, old.path());
            assert_eq!(order, &vec![1, 0]);
        }
        other => panic!("expected a reorder, got {:?}", other),
    }
    assert_eq!(patched(&old, &patches).unwrap(), new);
}

#[test]
fn test_root_mismatch_falls_back_to_replace() {
    let root = HexPath::root().child(0);
    let old: VNode = VElement::new("div", root.clone()).into();
    let new = VNode::text("plain", root.clone());
    let patches = reconcile(&old, &new).unwrap();
    assert_eq!(
        patches,
        vec![Patch::ReplaceNode {
            path: root,
            node: new.clone()
        }]
    );
    assert_eq!(patched(&old, &patches).unwrap(), new);
}

#[test]
fn test_null_slot_toggles() {
    let root = HexPath::root().child(0);
    let shown: VNode = VElement::new("div", root.clone())
        .with_child(VNode::text("banner", root.child(0)))
        .with_child(VNode::text("body", root.child(1)))
        .into();
    let hidden: VNode = VElement::new("div", root.clone())
        .with_child(VNode::null(root.child(0)))
        .with_child(VNode::text("body", root.child(1)))
        .into();

    let hide = reconcile(&shown, &hidden).unwrap();
    assert_eq!(hide.len(), 1);
    assert!(matches!(&hide[0], Patch::ReplaceNode { path, node: VNode::Null(_) } if *path == root.child(0)));

    let show = reconcile(&hidden, &shown).unwrap();
    assert_eq!(patched(&hidden, &show).unwrap(), shown);
}

#[test]
fn test_json_in_json_out() {
    let old = r#"{"type":"Element","tag":"p","path":"10000000","attributes":{"id":"a"},
        "children":[{"type":"Text","content":"hi","path":"10000000.10000000"}]}"#;
    let new = r#"{"type":"Element","tag":"p","path":"10000000","attributes":{},
        "children":[{"type":"Text","content":"hi","path":"10000000.10000000"},
                    {"type":"Null","path":"10000000.20000000"}]}"#;
    let config = ValidationConfig::default();
    let old = from_json_checked(old, &config).unwrap();
    let new = from_json_checked(new, &config).unwrap();

    let patches = Reconciler::new(ReconcileConfig::checked())
        .reconcile(&old, &new)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&patches_to_json(&patches).unwrap()).unwrap();
    assert_eq!(json[0]["type"], "RemoveAttribute");
    assert_eq!(json[0]["name"], "id");
    assert_eq!(json[1]["type"], "InsertChild");
    assert_eq!(json[1]["parent_path"], "10000000");
    assert_eq!(json[1]["index"], 1);
    assert_eq!(json[1]["node"]["type"], "Null");
}

#[test]
fn test_metrics_recorded() {
    let before = metrics().snapshot();
    reconcile(&div_with_span("A"), &div_with_span("B")).unwrap();
    let dup: VNode = VElement::new("div", "1")
        .with_child(VNode::null("1.1"))
        .with_child(VNode::null("1.1"))
        .into();
    assert!(reconcile(&dup, &dup).is_err());

    let after = metrics().snapshot();
    assert!(after.reconcile_calls >= before.reconcile_calls + 2);
    assert!(after.reconcile_errors > before.reconcile_errors);
    assert!(after.validation_failures > before.validation_failures);
    assert!(after.patches_emitted > before.patches_emitted);
}
