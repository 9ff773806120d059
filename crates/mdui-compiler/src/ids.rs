//! Deterministic block ids.
//!
//! Implicit id = `<type without ui:>-<8 hex>` over the type, the canonical
//! JSON of the data and the parent id. Explicit ids are reserved first; an
//! implicit id that collides with any earlier id takes the smallest unused
//! `-<n>` suffix, in pre-order.
//!
//! Position enters an id only through the parent id and that suffix. The
//! sibling index is not hashed, so inserting, removing or editing one block
//! leaves the ids of distinct sibling blocks unchanged, and diffs between
//! compilations stay small.

use std::collections::BTreeSet;

use serde_json::Value;

use mdui_core::canonical_json::to_canonical_json_string;
use mdui_core::diagnostics::Diagnostic;
use mdui_core::hash::content_id;
use mdui_core::model::{Block, block_types};

use crate::translate::Draft;

/// Assign ids to a draft forest. Returns the blocks and the drafts'
/// diagnostics (pre-order), each scoped to its block.
pub fn assign_ids(drafts: Vec<Draft>) -> (Vec<Block>, Vec<Diagnostic>) {
    let mut taken = BTreeSet::new();
    reserve_explicit(&drafts, &mut taken);
    let mut diagnostics = Vec::new();
    let blocks = assign(drafts, None, &mut taken, &mut diagnostics);
    (blocks, diagnostics)
}

fn reserve_explicit(drafts: &[Draft], taken: &mut BTreeSet<String>) {
    for d in drafts {
        if let Some(id) = &d.explicit_id {
            taken.insert(id.clone());
        }
        if let Some(children) = &d.children {
            reserve_explicit(children, taken);
        }
    }
}

fn assign(
    drafts: Vec<Draft>,
    parent: Option<&str>,
    taken: &mut BTreeSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Block> {
    let mut out = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let Draft { explicit_id, mut block, children, diagnostics: own } = draft;
        block.id = match explicit_id {
            Some(id) => id,
            None => unique(implicit_id(&block, parent), taken),
        };
        diagnostics.extend(own.into_iter().map(|d| match d.block_id {
            Some(_) => d,
            None => d.with_block(block.id.clone()),
        }));
        block.children = children.map(|c| assign(c, Some(block.id.as_str()), taken, diagnostics));
        out.push(block);
    }
    out
}

/// Content-derived id before collision handling.
pub fn implicit_id(block: &Block, parent: Option<&str>) -> String {
    let prefix = block
        .block_type
        .strip_prefix(block_types::UI_PREFIX)
        .unwrap_or(&block.block_type);
    let data = to_canonical_json_string(&Value::Object(block.data.clone())).unwrap_or_default();
    content_id(prefix, &[&block.block_type, &data, parent.unwrap_or("")])
}

fn unique(base: String, taken: &mut BTreeSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdui_core::diagnostics::{DiagnosticCode, DiagnosticSource};
    use mdui_core::model::Span;
    use serde_json::json;

    fn draft(block_type: &str, data: Value, explicit: Option<&str>) -> Draft {
        Draft {
            explicit_id: explicit.map(str::to_string),
            block: Block::new("", block_type, data.as_object().cloned().unwrap_or_default(), Span::default()),
            children: None,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn implicit_ids_use_type_prefix() {
        let (blocks, _) = assign_ids(vec![draft("ui:poll", json!({ "question": "Q" }), None)]);
        let id = &blocks[0].id;
        assert!(id.starts_with("poll-"));
        assert_eq!(id.len(), "poll-".len() + 8);
    }

    #[test]
    fn identical_content_gets_numeric_suffixes() {
        let d = || draft("text", json!({ "content": [] }), None);
        let (blocks, _) = assign_ids(vec![d(), d(), d()]);
        let base = blocks[0].id.clone();
        assert_eq!(blocks[1].id, format!("{base}-1"));
        assert_eq!(blocks[2].id, format!("{base}-2"));
    }

    #[test]
    fn explicit_ids_are_reserved_before_implicit_ones() {
        let implicit = draft("text", json!({ "content": [] }), None);
        let base = implicit_id(&implicit.block, None);
        let (blocks, _) = assign_ids(vec![implicit.clone(), draft("divider", json!({}), Some(&base))]);
        assert_eq!(blocks[0].id, format!("{base}-1"));
        assert_eq!(blocks[1].id, base);
    }

    #[test]
    fn parent_id_separates_identical_children() {
        let child = || draft("text", json!({ "content": [] }), None);
        let mut a = draft("ui:tabs", json!({ "labels": ["A"] }), Some("a"));
        a.children = Some(vec![child()]);
        let mut b = draft("ui:tabs", json!({ "labels": ["A"] }), Some("b"));
        b.children = Some(vec![child()]);
        let (blocks, _) = assign_ids(vec![a, b]);
        let ca = &blocks[0].children.as_ref().unwrap()[0].id;
        let cb = &blocks[1].children.as_ref().unwrap()[0].id;
        assert_ne!(ca, cb);
        assert!(!cb.ends_with("-1"));
    }

    #[test]
    fn sibling_index_does_not_enter_the_id() {
        let para = |text: &str| draft("text", json!({ "content": [{ "type": "text", "value": text }] }), None);
        let (before, _) = assign_ids(vec![para("a"), para("b")]);
        let (after, _) = assign_ids(vec![para("new"), para("a"), para("b")]);
        assert_eq!(after[1].id, before[0].id);
        assert_eq!(after[2].id, before[1].id);
    }

    #[test]
    fn diagnostics_are_scoped_to_their_block() {
        let mut d = draft("divider", json!({}), Some("hr"));
        d.diagnostics
            .push(Diagnostic::warning(DiagnosticCode::UnknownField, DiagnosticSource::Schema, "x"));
        let (_, diags) = assign_ids(vec![d]);
        assert_eq!(diags[0].block_id.as_deref(), Some("hr"));
    }
}
