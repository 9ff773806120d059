mod util;

use anyhow::Result;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use mdui_io::prelude::*;

use util::read_fixture;

static IR_SCHEMA: Lazy<Result<Validator, String>> = Lazy::new(|| {
    let schema_json: Value = serde_json::from_str(include_str!("../../../spec/schemas/ir.v1.schema.json"))
        .map_err(|e| format!("invalid IR schema JSON: {e}"))?;

    Validator::new(&schema_json).map_err(|e| format!("compile IR schema: {e}"))
});

static PATCH_SCHEMA: Lazy<Result<Validator, String>> = Lazy::new(|| {
    let schema_json: Value = serde_json::from_str(include_str!("../../../spec/schemas/patch.v1.schema.json"))
        .map_err(|e| format!("invalid patch schema JSON: {e}"))?;

    Validator::new(&schema_json).map_err(|e| format!("compile patch schema: {e}"))
});

fn ir_schema() -> &'static Validator {
    IR_SCHEMA.as_ref().unwrap()
}

fn patch_schema() -> &'static Validator {
    PATCH_SCHEMA.as_ref().unwrap()
}

fn assert_valid(schema: &Validator, instance: &Value) {
    let mut errors = schema.iter_errors(instance).peekable();
    if errors.peek().is_some() {
        let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("schema validation failed:\n{}", msgs.join("\n"));
    }
}

fn compile_fixture(name: &str) -> Document {
    compile(&read_fixture(name), &SchemaRegistry::default(), &CompileOptions::default()).ir
}

#[test]
fn compiled_fixtures_conform_to_ir_schema() -> Result<()> {
    for name in ["demo.md", "containers.md"] {
        let ir = serde_json::to_value(compile_fixture(name))?;
        assert_valid(ir_schema(), &ir);
    }
    Ok(())
}

#[test]
fn invalid_blocks_still_conform() -> Result<()> {
    let source = "```ui:poll\nquestion: Q\noptions: []\n```\n\n```ui:nope\na: 1\n```\n";
    let compiled = compile(source, &SchemaRegistry::default(), &CompileOptions::default());
    assert!(!compiled.is_valid());
    assert_valid(ir_schema(), &serde_json::to_value(&compiled.ir)?);
    Ok(())
}

#[test]
fn diffs_conform_to_patch_schema() -> Result<()> {
    let a = compile_fixture("demo.md");
    let mut b = compile_fixture("containers.md");
    b.id = a.id.clone();
    b.metadata.insert("edited".to_string(), Value::Bool(true));

    let patch = diff_ir(&a, &b)?;
    assert!(!patch.is_empty());
    assert_valid(patch_schema(), &serde_json::to_value(&patch)?);

    let reordered = {
        let mut r = a.clone();
        r.blocks.rotate_left(2);
        r
    };
    assert_valid(patch_schema(), &serde_json::to_value(diff_ir(&a, &reordered)?)?);
    Ok(())
}

#[test]
fn schema_rejects_unknown_ops() {
    let bad = serde_json::json!([{ "op": "replaceBlock", "id": "x" }]);
    assert!(!patch_schema().is_valid(&bad));

    let missing = serde_json::json!({ "version": "1.0.0", "id": "d" });
    assert!(!ir_schema().is_valid(&missing));
}
