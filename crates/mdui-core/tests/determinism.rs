use serde_json::json;

use mdui_core::canonical_json::{to_canonical_json_bytes, to_canonical_json_string};
use mdui_core::hash::content_id;
use mdui_core::model::{Block, Document, Point, Reference, ReferenceKind, Span};

fn sample() -> serde_json::Value {
    json!({
        "version": "1.0.0",
        "id": "doc",
        "metadata": { "title": "T", "authors": ["a", "b"] },
        "blocks": [
            { "id": "h", "type": "heading", "data": { "level": 1, "content": [], "anchor": "top" },
              "position": { "start": { "line": 1, "column": 1 }, "end": { "line": 1, "column": 6 } } },
            { "id": "tabs", "type": "ui:tabs", "data": { "labels": ["One"] },
              "position": { "start": { "line": 3, "column": 1 }, "end": { "line": 9, "column": 5 } },
              "children": [{ "id": "c", "type": "divider", "data": {},
                "position": { "start": { "line": 4, "column": 1 }, "end": { "line": 4, "column": 4 } } }] }
        ],
        "references": [{ "id": "c->top", "source": "c", "target": "top", "kind": "link" }],
        "layout": { "mode": "flow", "spacing": "normal", "maxWidth": 720.0 }
    })
}

#[test]
fn wire_shape_round_trips() {
    let doc: Document = serde_json::from_value(sample()).expect("sample must parse");
    assert_eq!(doc.blocks[1].children.as_ref().map(Vec::len), Some(1));
    assert_eq!(serde_json::to_value(&doc).unwrap(), sample());
}

#[test]
fn canonical_bytes_ignore_insertion_order() {
    let mut a = Document::new("d");
    a.metadata.insert("z".to_string(), json!(1));
    a.metadata.insert("a".to_string(), json!({ "y": 2, "b": 3 }));

    let mut b = Document::new("d");
    b.metadata.insert("a".to_string(), json!({ "b": 3, "y": 2 }));
    b.metadata.insert("z".to_string(), json!(1));

    assert_eq!(to_canonical_json_bytes(&a).unwrap(), to_canonical_json_bytes(&b).unwrap());
    assert!(to_canonical_json_string(&a).unwrap().contains(r#""metadata":{"a":{"b":3,"y":2},"z":1}"#));
}

#[test]
fn content_ids_are_stable_across_spellings() {
    let composed = content_id("text", &["caf\u{e9}\r\n"]);
    let decomposed = content_id("text", &["cafe\u{301}\n"]);
    assert_eq!(composed, decomposed);
    assert!(composed.starts_with("text-"));
    assert_eq!(composed.len(), "text-".len() + 8);
    assert_ne!(content_id("text", &["ab", "c"]), content_id("text", &["a", "bc"]));
}

#[test]
fn subtree_ids_are_pre_order() {
    let span = Span::new(Point::new(1, 1), Point::new(1, 2));
    let mut root = Block::new("r", "ui:tabs", Default::default(), span);
    let mut mid = Block::new("m", "ui:grid", Default::default(), span);
    mid.children = Some(vec![Block::new("leaf", "divider", Default::default(), span)]);
    root.children = Some(vec![mid, Block::new("tail", "divider", Default::default(), span)]);
    assert_eq!(root.subtree_ids(), vec!["r", "m", "leaf", "tail"]);
}

#[test]
fn references_are_a_set_on_the_wire_and_in_equality() {
    let reference = |id: &str| Reference {
        id: id.to_string(),
        source: "s".to_string(),
        target: "t".to_string(),
        kind: ReferenceKind::Link,
    };

    let mut unsorted = Document::new("d");
    unsorted.references = vec![reference("z"), reference("a")];
    let mut sorted = Document::new("d");
    sorted.references = vec![reference("a"), reference("z")];
    assert_eq!(unsorted, sorted);

    let wire = serde_json::to_value(&unsorted).unwrap();
    assert_eq!(wire["references"][0]["id"], "a");
    assert_eq!(wire["references"][1]["id"], "z");

    let mut raw = serde_json::to_value(&sorted).unwrap();
    raw["references"] = json!([
        { "id": "z", "source": "s", "target": "t", "kind": "link" },
        { "id": "a", "source": "s", "target": "t", "kind": "link" }
    ]);
    let parsed: Document = serde_json::from_value(raw).unwrap();
    let ids: Vec<&str> = parsed.references.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "z"]);

    let mut fewer = Document::new("d");
    fewer.references = vec![reference("a")];
    assert_ne!(fewer, sorted);
}
