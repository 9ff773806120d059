//! Stateless re-validation of a complete IR document.
//!
//! The document may have been constructed externally (deserialized, patched,
//! migrated), so nothing about its origin is trusted. The validator never
//! fails: it returns every finding, and the caller decides the threshold.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, Severity};
use mdui_core::model::{Block, Document, Reference, Span, resolvable_targets, walk};
use mdui_core::version::IR_VERSION;

use crate::check::check_payload;
use crate::registry::SchemaRegistry;

/// Maximum container nesting depth. Top-level blocks are depth 0.
pub const MAX_NESTING_DEPTH: usize = 4;

/// Validator configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOptions {
    /// IR versions this validator accepts.
    pub known_versions: Vec<String>,
    /// Severity of a reference whose target does not resolve.
    pub dangling_references: Severity,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            known_versions: vec![IR_VERSION.to_string()],
            dangling_references: Severity::Warning,
        }
    }
}

/// Diagnostic for a reference whose target is not a block id or anchor.
pub fn dangling_reference(reference: &Reference, severity: Severity, position: Option<Span>) -> Diagnostic {
    let mut d = Diagnostic::new(
        severity,
        DiagnosticCode::DanglingReference,
        DiagnosticSource::Compiler,
        format!(
            "reference '{}' from block '{}' points to unknown target '{}'",
            reference.id, reference.source, reference.target
        ),
    )
    .with_block(reference.source.clone())
    .with_details(json!({ "referenceId": reference.id, "target": reference.target }));
    d.position = position;
    d
}

/// One error for an id declared more than once.
pub fn duplicate_id(id: &str, occurrences: usize, position: Option<Span>) -> Diagnostic {
    let mut d = Diagnostic::error(
        DiagnosticCode::DuplicateId,
        DiagnosticSource::Compiler,
        format!("block id '{id}' is declared {occurrences} times; ids must be unique"),
    )
    .with_block(id)
    .with_details(json!({ "occurrences": occurrences }));
    d.position = position;
    d
}

/// Re-check a standalone IR value: version, ids, schemas, nesting, references
/// and layout hints.
pub fn validate_ir(doc: &Document, registry: &SchemaRegistry, opts: &ValidateOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if !opts.known_versions.iter().any(|v| v == &doc.version) {
        out.push(
            Diagnostic::error(
                DiagnosticCode::UnknownVersion,
                DiagnosticSource::Runtime,
                format!(
                    "unsupported IR version '{}' (known: {}); migrate the document first",
                    doc.version,
                    opts.known_versions.join(", ")
                ),
            )
            .with_path("version"),
        );
    }
    if doc.id.trim().is_empty() {
        out.push(
            Diagnostic::error(DiagnosticCode::EmptyId, DiagnosticSource::Runtime, "document id is empty")
                .with_path("id"),
        );
    }

    check_blocks(&doc.blocks, registry, &mut out);
    check_references(doc, opts.dangling_references, &mut out);

    for (path, message) in doc.layout.problems() {
        out.push(
            Diagnostic::error(DiagnosticCode::InvalidLayout, DiagnosticSource::Runtime, message).with_path(path),
        );
    }

    out
}

/// One `duplicate_id` error per id value that occurs more than once in the
/// tree, in order of first occurrence.
pub fn duplicate_ids(blocks: &[Block]) -> Vec<Diagnostic> {
    // (count, position of the second occurrence)
    let mut seen: BTreeMap<&str, (usize, Option<Span>)> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (block, _) in walk(blocks) {
        let entry = seen.entry(block.id.as_str()).or_insert((0, None));
        entry.0 += 1;
        if entry.0 == 1 {
            order.push(block.id.as_str());
        } else if entry.0 == 2 {
            entry.1 = Some(block.position);
        }
    }

    order
        .into_iter()
        .filter(|id| !id.is_empty())
        .filter_map(|id| {
            let (count, pos) = seen[id];
            (count > 1).then(|| duplicate_id(id, count, pos))
        })
        .collect()
}

fn check_blocks(blocks: &[Block], registry: &SchemaRegistry, out: &mut Vec<Diagnostic>) {
    // Parent type is tracked alongside the pre-order walk.
    let mut stack: Vec<(&Block, usize, Option<&str>)> = blocks.iter().rev().map(|b| (b, 0, None)).collect();
    while let Some((block, depth, parent)) = stack.pop() {
        check_block(block, depth, parent, registry, out);

        if let Some(children) = &block.children {
            for child in children.iter().rev() {
                stack.push((child, depth + 1, Some(block.block_type.as_str())));
            }
        }
    }

    out.extend(duplicate_ids(blocks));
}

fn check_block(block: &Block, depth: usize, parent: Option<&str>, registry: &SchemaRegistry, out: &mut Vec<Diagnostic>) {
    let at = |d: Diagnostic| d.with_block(block.id.clone()).with_position(block.position);

    if block.id.trim().is_empty() {
        out.push(at(Diagnostic::error(
            DiagnosticCode::EmptyId,
            DiagnosticSource::Runtime,
            format!("block of type '{}' has an empty id", block.block_type),
        )));
    }
    if depth > MAX_NESTING_DEPTH {
        out.push(at(Diagnostic::error(
            DiagnosticCode::NestingTooDeep,
            DiagnosticSource::Runtime,
            format!("block nested at depth {depth} exceeds the maximum of {MAX_NESTING_DEPTH}"),
        )));
    }
    if let Some(parent_type) = parent {
        if !registry.allows_child(parent_type, &block.block_type) {
            out.push(at(Diagnostic::error(
                DiagnosticCode::ChildNotAllowed,
                DiagnosticSource::Schema,
                format!("'{}' may not be nested in '{parent_type}'", block.block_type),
            )));
        }
    }

    let Some(schema) = registry.get(&block.block_type) else {
        out.push(at(Diagnostic::error(
            DiagnosticCode::UnknownComponent,
            DiagnosticSource::Schema,
            format!("block type '{}' is not registered", block.block_type),
        )));
        return;
    };

    if block.children.is_some() && !schema.is_container() {
        out.push(at(Diagnostic::error(
            DiagnosticCode::ChildrenNotAllowed,
            DiagnosticSource::Schema,
            format!("block type '{}' is not a container but has children", block.block_type),
        )));
    }

    if block.invalid {
        out.push(at(Diagnostic::warning(
            DiagnosticCode::InvalidBlock,
            DiagnosticSource::Schema,
            format!("block '{}' is marked invalid; its payload was not validated", block.id),
        )));
        return;
    }

    let outcome = check_payload(schema, &block.data);
    for v in outcome.violations {
        out.push(at(Diagnostic::error(
            DiagnosticCode::SchemaViolation,
            DiagnosticSource::Schema,
            format!("{}: {}", if v.path.is_empty() { "payload" } else { v.path.as_str() }, v.message),
        )
        .with_path(v.path)));
    }
    for field in outcome.unknown_fields {
        out.push(at(Diagnostic::warning(
            DiagnosticCode::UnknownField,
            DiagnosticSource::Schema,
            format!("field '{field}' is not declared by '{}'", block.block_type),
        )
        .with_path(field)));
    }
}

fn check_references(doc: &Document, dangling: Severity, out: &mut Vec<Diagnostic>) {
    let ids: BTreeSet<&str> = walk(&doc.blocks).into_iter().map(|(b, _)| b.id.as_str()).collect();
    let targets = resolvable_targets(&doc.blocks);

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &doc.references {
        *counts.entry(r.id.as_str()).or_insert(0) += 1;
    }
    for (id, n) in counts {
        if n > 1 {
            out.push(Diagnostic::error(
                DiagnosticCode::DuplicateReferenceId,
                DiagnosticSource::Runtime,
                format!("reference id '{id}' is declared {n} times"),
            ));
        }
    }

    for r in &doc.references {
        if !ids.contains(r.source.as_str()) {
            out.push(Diagnostic::error(
                DiagnosticCode::ReferenceSourceMissing,
                DiagnosticSource::Runtime,
                format!("reference '{}' has unknown source block '{}'", r.id, r.source),
            ));
            continue;
        }
        if !targets.contains(&r.target) {
            out.push(dangling_reference(r, dangling, None));
        }
    }
}
