//! Cross-block references.
//!
//! Pass 1 extracts `(source, target, kind)` from every valid block, driven by
//! the block's schema: `#target` links inside inline fields become `link`
//! references, `Reference` fields become `embed` references. Pass 2 resolves
//! targets against every block id and heading anchor.

use std::collections::BTreeMap;

use serde_json::Value;

use mdui_core::diagnostics::{Diagnostic, Severity};
use mdui_core::model::{Block, Inline, Reference, ReferenceKind, resolvable_targets, walk};
use mdui_schema::{FieldKind, SchemaRegistry, dangling_reference, duplicate_ids};

use crate::inline::fragment_links;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Sorted by id.
    pub references: Vec<Reference>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn resolve(blocks: &[Block], registry: &SchemaRegistry, dangling: Severity) -> Resolution {
    let mut references = Vec::new();
    let mut repeats: BTreeMap<String, usize> = BTreeMap::new();

    for (block, _) in walk(blocks) {
        for (target, kind) in extract(block, registry) {
            let base = format!("{}->{}", block.id, target);
            let n = repeats.entry(base.clone()).or_insert(0);
            let id = if *n == 0 { base } else { format!("{base}~{n}") };
            *n += 1;
            references.push(Reference { id, source: block.id.clone(), target, kind });
        }
    }
    references.sort_by(|a, b| a.id.cmp(&b.id));

    let mut diagnostics = duplicate_ids(blocks);

    let targets = resolvable_targets(blocks);
    let positions: BTreeMap<&str, _> = walk(blocks).into_iter().map(|(b, _)| (b.id.as_str(), b.position)).collect();
    for r in &references {
        if !targets.contains(&r.target) {
            diagnostics.push(dangling_reference(r, dangling, positions.get(r.source.as_str()).copied()));
        }
    }

    Resolution { references, diagnostics }
}

/// Reference targets declared by one block, in field order.
fn extract(block: &Block, registry: &SchemaRegistry) -> Vec<(String, ReferenceKind)> {
    let mut out = Vec::new();
    if block.invalid {
        return out;
    }
    let Some(schema) = registry.get(&block.block_type) else {
        return out;
    };

    for field in &schema.fields {
        let Some(value) = block.data.get(&field.name) else { continue };
        match &field.kind {
            FieldKind::Inlines => links_in(value, &mut out),
            FieldKind::Array { items, .. } if matches!(**items, FieldKind::Inlines) => {
                for item in value.as_array().into_iter().flatten() {
                    links_in(item, &mut out);
                }
            }
            FieldKind::Reference => {
                if let Some(target) = value.as_str().map(|s| s.trim_start_matches('#')).filter(|s| !s.is_empty()) {
                    out.push((target.to_string(), ReferenceKind::Embed));
                }
            }
            _ => {}
        }
    }
    out
}

fn links_in(value: &Value, out: &mut Vec<(String, ReferenceKind)>) {
    if let Ok(inlines) = serde_json::from_value::<Vec<Inline>>(value.clone()) {
        out.extend(fragment_links(&inlines).into_iter().map(|t| (t, ReferenceKind::Link)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdui_core::diagnostics::DiagnosticCode;
    use mdui_core::model::Span;
    use serde_json::json;

    fn block(id: &str, block_type: &str, data: Value) -> Block {
        Block::new(id, block_type, data.as_object().cloned().unwrap_or_default(), Span::default())
    }

    fn link_text(id: &str, target: &str) -> Block {
        block(
            id,
            "text",
            json!({ "content": [{ "type": "link", "url": format!("#{target}"), "children": [] }] }),
        )
    }

    #[test]
    fn links_and_embeds_are_extracted() {
        let blocks = vec![
            block("intro", "heading", json!({ "level": 1, "content": [], "anchor": "intro-anchor" })),
            link_text("t", "intro-anchor"),
            block("e", "ui:embed", json!({ "target": "#t" })),
        ];
        let res = resolve(&blocks, &SchemaRegistry::default(), Severity::Warning);
        assert!(res.diagnostics.is_empty());
        let got: Vec<(&str, &str, ReferenceKind)> =
            res.references.iter().map(|r| (r.id.as_str(), r.target.as_str(), r.kind)).collect();
        assert_eq!(
            got,
            vec![("e->t", "t", ReferenceKind::Embed), ("t->intro-anchor", "intro-anchor", ReferenceKind::Link)]
        );
    }

    #[test]
    fn repeats_get_suffixes() {
        let mut b = link_text("t", "x");
        let content = b.data["content"].as_array().cloned().unwrap();
        b.data.insert("content".to_string(), Value::Array([content.clone(), content].concat()));
        let blocks = vec![b, block("x", "divider", json!({}))];
        let res = resolve(&blocks, &SchemaRegistry::default(), Severity::Warning);
        let ids: Vec<&str> = res.references.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t->x", "t->x~1"]);
    }

    #[test]
    fn one_dangling_diagnostic_per_reference() {
        let blocks = vec![link_text("a", "nowhere"), link_text("b", "nowhere")];
        let lenient = resolve(&blocks, &SchemaRegistry::default(), Severity::Warning);
        assert_eq!(lenient.references.len(), 2);
        assert_eq!(lenient.diagnostics.len(), 2);
        assert!(lenient.diagnostics.iter().all(|d| d.severity == Severity::Warning));

        let strict = resolve(&blocks, &SchemaRegistry::default(), Severity::Error);
        assert!(strict.diagnostics.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn duplicate_explicit_ids_yield_one_error() {
        let blocks = vec![
            block("x", "divider", json!({})),
            block("x", "divider", json!({})),
            block("x", "divider", json!({})),
        ];
        let res = resolve(&blocks, &SchemaRegistry::default(), Severity::Warning);
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].code, DiagnosticCode::DuplicateId);
    }

    #[test]
    fn invalid_blocks_are_not_scanned() {
        let mut b = link_text("a", "nowhere");
        b.invalid = true;
        let res = resolve(&[b], &SchemaRegistry::default(), Severity::Warning);
        assert!(res.references.is_empty());
    }
}
