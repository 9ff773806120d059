//! Raw tree → IR blocks (without ids).
//!
//! Every node yields a [`Draft`]: the block, its explicit id if the author
//! wrote one, translated children for containers, and the block-scoped
//! diagnostics. Ids are assigned afterwards in one pass (see `crate::ids`)
//! so explicit ids can be reserved before any implicit id is derived.

use serde_json::{Map, Value, json};
use unicode_normalization::UnicodeNormalization;

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource};
use mdui_core::model::{Block, BlockData, Inline, Span, block_types};
use mdui_schema::{SchemaRegistry, check_payload};

use crate::container;
use crate::inline::to_inlines;
use crate::options::InvalidBlockPolicy;
use crate::parser::{LineIndex, RawInline, RawNode, TypedBlockNode, yaml_mapping};

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub explicit_id: Option<String>,
    /// Block with an empty id and no children.
    pub block: Block,
    pub children: Option<Vec<Draft>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Draft {
    fn leaf(block_type: &str, data: BlockData, span: Span) -> Self {
        Self {
            explicit_id: None,
            block: Block::new("", block_type, data, span),
            children: None,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics of this draft and all of its descendants, pre-order.
    fn into_diagnostics(self, out: &mut Vec<Diagnostic>) {
        out.extend(self.diagnostics);
        for child in self.children.into_iter().flatten() {
            child.into_diagnostics(out);
        }
    }
}

pub struct Translator<'r> {
    pub(crate) registry: &'r SchemaRegistry,
    pub(crate) index: &'r LineIndex,
    policy: InvalidBlockPolicy,
    /// Diagnostics of blocks removed under [`InvalidBlockPolicy::Drop`].
    orphaned: Vec<Diagnostic>,
}

impl<'r> Translator<'r> {
    pub fn new(registry: &'r SchemaRegistry, index: &'r LineIndex, policy: InvalidBlockPolicy) -> Self {
        Self { registry, index, policy, orphaned: Vec::new() }
    }

    pub fn translate(&mut self, nodes: Vec<RawNode>, depth: usize) -> Vec<Draft> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let draft = self.translate_node(node, depth);
            if draft.block.invalid && self.policy == InvalidBlockPolicy::Drop {
                draft.into_diagnostics(&mut self.orphaned);
                continue;
            }
            out.push(draft);
        }
        out
    }

    pub fn into_orphaned(self) -> Vec<Diagnostic> {
        self.orphaned
    }

    fn translate_node(&mut self, node: RawNode, depth: usize) -> Draft {
        match node {
            RawNode::Paragraph { inlines, span } => {
                Draft::leaf(block_types::TEXT, object(json!({ "content": inlines_value(&inlines) })), span)
            }
            RawNode::Heading { level, explicit_id, inlines, span } => {
                let content = to_inlines(&inlines);
                let anchor = explicit_id.clone().unwrap_or_else(|| slugify(&Inline::plain_text_of(&content)));
                let mut draft = Draft::leaf(
                    block_types::HEADING,
                    object(json!({
                        "level": level,
                        "content": serde_json::to_value(&content).unwrap_or_default(),
                        "anchor": anchor,
                    })),
                    span,
                );
                draft.explicit_id = explicit_id;
                draft
            }
            RawNode::Code { language, code, span } => {
                let mut data = Map::new();
                if let Some(language) = language {
                    data.insert("language".to_string(), Value::String(language));
                }
                data.insert("code".to_string(), Value::String(code));
                Draft::leaf(block_types::CODE, data, span)
            }
            RawNode::List { ordered, start, items, span } => {
                let mut data = Map::new();
                data.insert("ordered".to_string(), Value::Bool(ordered));
                if let Some(start) = start.filter(|_| ordered) {
                    data.insert("start".to_string(), json!(start));
                }
                data.insert(
                    "items".to_string(),
                    Value::Array(items.iter().map(|item| inlines_value(item)).collect()),
                );
                Draft::leaf(block_types::LIST, data, span)
            }
            RawNode::Quote { inlines, span } => {
                Draft::leaf(block_types::QUOTE, object(json!({ "content": inlines_value(&inlines) })), span)
            }
            RawNode::Rule { span } => Draft::leaf(block_types::DIVIDER, Map::new(), span),
            RawNode::Html { html, span } => Draft::leaf(block_types::HTML, object(json!({ "html": html })), span),
            RawNode::Typed(typed) => self.typed(typed, depth),
        }
    }

    fn typed(&mut self, node: TypedBlockNode, depth: usize) -> Draft {
        let span = node.span;
        let registry = self.registry;
        let Some(schema) = registry.get(&node.type_name) else {
            let mut draft = Draft::leaf(
                block_types::UNKNOWN,
                object(json!({ "component": node.type_name, "source": node.payload })),
                span,
            );
            draft.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::UnknownComponent,
                    DiagnosticSource::Compiler,
                    format!("component type '{}' is not registered; kept as an unknown placeholder", node.type_name),
                )
                .with_position(span)
                .with_details(json!({ "component": node.type_name })),
            );
            return draft;
        };

        let is_container = schema.is_container();
        let (props, body) = if is_container {
            container::split_payload(&node.payload)
        } else {
            (node.payload.as_str(), None)
        };

        let mut diagnostics = Vec::new();
        let mut explicit_id = None;
        let at = |d: Diagnostic| d.with_position(span);

        let (data, invalid) = match yaml_mapping(props) {
            Err(e) => {
                diagnostics.push(at(Diagnostic::error(
                    DiagnosticCode::YamlMalformed,
                    DiagnosticSource::Parser,
                    format!("payload of '{}' is not a valid YAML mapping: {e}", node.type_name),
                )));
                (object(json!({ "source": props })), true)
            }
            Ok(mut payload) => {
                let mut id_ok = true;
                match payload.remove("id") {
                    None => {}
                    Some(Value::String(id)) if !id.trim().is_empty() => explicit_id = Some(id),
                    Some(other) => {
                        id_ok = false;
                        diagnostics.push(at(Diagnostic::error(
                            DiagnosticCode::SchemaViolation,
                            DiagnosticSource::Schema,
                            "id: explicit id must be a non-empty string",
                        )
                        .with_path("id")));
                        payload.insert("id".to_string(), other);
                    }
                }

                let outcome = check_payload(schema, &payload);
                for v in &outcome.violations {
                    let path = if v.path.is_empty() { "payload" } else { v.path.as_str() };
                    diagnostics.push(at(Diagnostic::error(
                        DiagnosticCode::SchemaViolation,
                        DiagnosticSource::Schema,
                        format!("{path}: {}", v.message),
                    )
                    .with_path(v.path.clone())));
                }
                for field in &outcome.unknown_fields {
                    if field == "id" {
                        continue;
                    }
                    diagnostics.push(at(Diagnostic::warning(
                        DiagnosticCode::UnknownField,
                        DiagnosticSource::Schema,
                        format!("field '{field}' is not declared by '{}'", node.type_name),
                    )
                    .with_path(field.clone())));
                }

                if id_ok && outcome.is_ok() {
                    (outcome.data, false)
                } else {
                    (payload, true)
                }
            }
        };

        let children = if is_container {
            let (text, offset) = body.unwrap_or(("", 0));
            Some(self.compile_children(&node.type_name, text, node.payload_offset + offset, depth, &mut diagnostics))
        } else {
            None
        };

        let mut block = Block::new("", node.type_name.as_str(), data, span);
        block.invalid = invalid;
        Draft { explicit_id, block, children, diagnostics }
    }
}

fn object(v: Value) -> BlockData {
    match v {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn inlines_value(raw: &[RawInline]) -> Value {
    serde_json::to_value(to_inlines(raw)).unwrap_or_default()
}

/// Heading anchor: lower-case NFC text, alphanumerics kept, every run of
/// other characters collapsed to a single `-`.
pub fn slugify(text: &str) -> String {
    let mut out = String::new();
    let mut gap = false;
    for c in text.nfc().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('-');
            }
            gap = false;
            out.push(c);
        } else {
            gap = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn drafts(src: &str, policy: InvalidBlockPolicy) -> (Vec<Draft>, Vec<Diagnostic>) {
        let registry = SchemaRegistry::default();
        let raw = parse(src);
        let mut t = Translator::new(&registry, &raw.index, policy);
        let out = t.translate(raw.nodes, 0);
        (out, t.into_orphaned())
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Getting Started!"), "getting-started");
        assert_eq!(slugify("  Ünïcode & Co.  "), "ünïcode-co");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn core_nodes_translate_to_core_blocks() {
        let (out, _) = drafts("# Title\n\npara\n\n- a\n- b\n\n---\n\n> quoted\n", InvalidBlockPolicy::Keep);
        let types: Vec<&str> = out.iter().map(|d| d.block.block_type.as_str()).collect();
        assert_eq!(types, vec!["heading", "text", "list", "divider", "quote"]);
        assert_eq!(out[0].block.data["anchor"], json!("title"));
        assert_eq!(out[2].block.data["ordered"], json!(false));
        assert!(out[2].block.data.get("start").is_none());
    }

    #[test]
    fn valid_payload_is_normalized() {
        let (out, _) = drafts("```ui:poll\nquestion: Q\noptions: [A, B]\n```\n", InvalidBlockPolicy::Keep);
        assert!(!out[0].block.invalid);
        assert_eq!(out[0].block.data["multiple"], json!(false));
        assert!(out[0].diagnostics.is_empty());
    }

    #[test]
    fn payload_id_is_explicit_and_removed() {
        let (out, _) = drafts("```ui:poll\nid: lunch\nquestion: Q\noptions: [A]\n```\n", InvalidBlockPolicy::Keep);
        assert_eq!(out[0].explicit_id.as_deref(), Some("lunch"));
        assert!(out[0].block.data.get("id").is_none());
    }

    #[test]
    fn json_payloads_are_accepted() {
        let (out, _) = drafts("```ui:poll\n{\"question\": \"Q\", \"options\": [\"A\"]}\n```\n", InvalidBlockPolicy::Keep);
        assert!(!out[0].block.invalid);
    }

    #[test]
    fn schema_failure_keeps_block_invalid_with_raw_payload() {
        let (out, _) = drafts("```ui:poll\nquestion: Q\noptions: []\n```\n", InvalidBlockPolicy::Keep);
        let d = &out[0];
        assert!(d.block.invalid);
        assert_eq!(d.block.data, object(json!({ "question": "Q", "options": [] })));
        assert_eq!(d.diagnostics.len(), 1);
        assert_eq!(d.diagnostics[0].code, DiagnosticCode::SchemaViolation);
        assert_eq!(d.diagnostics[0].path.as_deref(), Some("options"));
    }

    #[test]
    fn yaml_failure_keeps_source() {
        let (out, _) = drafts("```ui:callout\nbody: [oops\n```\n", InvalidBlockPolicy::Keep);
        assert!(out[0].block.invalid);
        assert_eq!(out[0].block.data["source"], json!("body: [oops\n"));
        assert_eq!(out[0].diagnostics[0].code, DiagnosticCode::YamlMalformed);
    }

    #[test]
    fn unknown_component_becomes_placeholder() {
        let (out, _) = drafts("```ui:chart\nkind: bar\n```\n", InvalidBlockPolicy::Keep);
        assert_eq!(out[0].block.block_type, "unknown");
        assert_eq!(out[0].block.data["component"], json!("ui:chart"));
        assert_eq!(out[0].diagnostics[0].code, DiagnosticCode::UnknownComponent);
    }

    #[test]
    fn drop_policy_removes_invalid_blocks_but_keeps_diagnostics() {
        let (out, orphaned) = drafts("Intro\n\n```ui:poll\noptions: []\n```\n", InvalidBlockPolicy::Drop);
        assert_eq!(out.len(), 1);
        assert_eq!(orphaned.len(), 2);
        assert!(orphaned.iter().all(|d| d.code == DiagnosticCode::SchemaViolation));
    }

    #[test]
    fn unknown_fields_are_warned_and_kept() {
        let (out, _) = drafts("```ui:callout\nbody: B\ncolour: red\n```\n", InvalidBlockPolicy::Keep);
        assert!(!out[0].block.invalid);
        assert_eq!(out[0].block.data["colour"], json!("red"));
        assert_eq!(out[0].diagnostics[0].code, DiagnosticCode::UnknownField);
    }
}
