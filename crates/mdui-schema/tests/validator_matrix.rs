use serde_json::{Value, json};

use mdui_core::diagnostics::{DiagnosticCode, Severity, has_errors};
use mdui_core::model::Document;
use mdui_schema::{BlockSchema, FieldKind, FieldSpec, SchemaRegistry, ValidateOptions, validate_ir};

struct Case {
    id: &'static str,
    blocks: Value,
    references: Value,
    expect: &'static [DiagnosticCode],
}

fn document(blocks: Value, references: Value) -> Document {
    serde_json::from_value(json!({
        "version": "1.0.0",
        "id": "doc",
        "blocks": blocks,
        "references": references
    }))
    .unwrap()
}

fn text(id: &str) -> Value {
    json!({ "id": id, "type": "text", "data": { "content": [{ "type": "text", "value": "x" }] } })
}

#[test]
fn validator_matrix() {
    use DiagnosticCode::*;

    let cases = vec![
        Case { id: "clean", blocks: json!([text("a")]), references: json!([]), expect: &[] },
        Case {
            id: "empty-id",
            blocks: json!([text("")]),
            references: json!([]),
            expect: &[EmptyId],
        },
        Case {
            id: "unregistered-type",
            blocks: json!([{ "id": "a", "type": "ui:nope", "data": {} }]),
            references: json!([]),
            expect: &[UnknownComponent],
        },
        Case {
            id: "poll-without-options",
            blocks: json!([{ "id": "p", "type": "ui:poll", "data": { "question": "Q", "options": [] } }]),
            references: json!([]),
            expect: &[SchemaViolation],
        },
        Case {
            id: "invalid-marked-block-is-not-rechecked",
            blocks: json!([{ "id": "p", "type": "ui:poll", "data": { "source": "options: [" }, "invalid": true }]),
            references: json!([]),
            expect: &[InvalidBlock],
        },
        Case {
            id: "undeclared-field",
            blocks: json!([{ "id": "c", "type": "ui:callout", "data": { "body": "b", "colour": "red" } }]),
            references: json!([]),
            expect: &[UnknownField],
        },
        Case {
            id: "children-on-leaf",
            blocks: json!([{ "id": "c", "type": "ui:callout", "data": { "body": "b" }, "children": [text("x")] }]),
            references: json!([]),
            expect: &[ChildrenNotAllowed, ChildNotAllowed],
        },
        Case {
            id: "disallowed-child",
            blocks: json!([{ "id": "g", "type": "ui:grid", "data": {}, "children": [{ "id": "t", "type": "ui:tabs", "data": {} }] }]),
            references: json!([]),
            expect: &[ChildNotAllowed],
        },
        Case {
            id: "comparison-refinement",
            blocks: json!([{ "id": "cmp", "type": "ui:comparison", "data": {
                "options": ["A", "B"],
                "features": [{ "name": "Seats", "values": [1] }]
            } }]),
            references: json!([]),
            expect: &[SchemaViolation],
        },
        Case {
            id: "nested-duplicate",
            blocks: json!([text("x"), { "id": "t", "type": "ui:tabs", "data": {}, "children": [text("x")] }]),
            references: json!([]),
            expect: &[DuplicateId],
        },
        Case {
            id: "dangling-reference",
            blocks: json!([text("a")]),
            references: json!([{ "id": "a->gone", "source": "a", "target": "gone", "kind": "link" }]),
            expect: &[DanglingReference],
        },
        Case {
            id: "missing-source",
            blocks: json!([text("a")]),
            references: json!([{ "id": "z->a", "source": "z", "target": "a", "kind": "link" }]),
            expect: &[ReferenceSourceMissing],
        },
        Case {
            id: "duplicate-reference-id",
            blocks: json!([text("a"), text("b")]),
            references: json!([
                { "id": "r", "source": "a", "target": "b", "kind": "link" },
                { "id": "r", "source": "b", "target": "a", "kind": "link" }
            ]),
            expect: &[DuplicateReferenceId],
        },
    ];

    let registry = SchemaRegistry::default();
    let mut passed = 0usize;
    let total = cases.len();

    for c in cases {
        let doc = document(c.blocks, c.references);
        let got: Vec<DiagnosticCode> =
            validate_ir(&doc, &registry, &ValidateOptions::default()).iter().map(|d| d.code).collect();
        if got == c.expect {
            passed += 1;
        } else {
            panic!("Validator conformance failure: {} (expected {:?}, got {:?})", c.id, c.expect, got);
        }
    }

    eprintln!("MDUI IR validator conformance: {passed}/{total}");
}

#[test]
fn dangling_severity_follows_options() {
    let doc = document(
        json!([text("a")]),
        json!([{ "id": "a->gone", "source": "a", "target": "gone", "kind": "link" }]),
    );
    let lenient = validate_ir(&doc, &SchemaRegistry::default(), &ValidateOptions::default());
    assert!(!has_errors(&lenient));

    let strict = ValidateOptions { dangling_references: Severity::Error, ..ValidateOptions::default() };
    assert!(has_errors(&validate_ir(&doc, &SchemaRegistry::default(), &strict)));
}

#[test]
fn custom_schemas_are_honoured() {
    let mut registry = SchemaRegistry::default();
    registry.register(
        BlockSchema::new("ui:rating", "Star rating")
            .field(FieldSpec::required("stars", FieldKind::integer(Some(1), Some(5)))),
    );

    let ok = document(json!([{ "id": "r", "type": "ui:rating", "data": { "stars": 4 } }]), json!([]));
    assert!(validate_ir(&ok, &registry, &ValidateOptions::default()).is_empty());

    let bad = document(json!([{ "id": "r", "type": "ui:rating", "data": { "stars": 9 } }]), json!([]));
    let diags = validate_ir(&bad, &registry, &ValidateOptions::default());
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].path.as_deref(), Some("stars"));

    let core_only = validate_ir(&ok, &SchemaRegistry::core(), &ValidateOptions::default());
    assert_eq!(core_only[0].code, DiagnosticCode::UnknownComponent);
}
