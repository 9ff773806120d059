use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource};
use mdui_core::model::{Block, Document, walk};

use crate::schema::{BlockUpdate, OpKind, Patch, PatchOp};
use crate::stats::PatchStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchErrorCode {
    /// An added block (or one of its descendants) uses an id already in the tree.
    BlockExists,
    /// The added subtree repeats an id.
    DuplicateId,
    BlockNotFound,
    AnchorNotFound,
    /// A block may not be moved after itself.
    SelfAnchor,
    ReferenceExists,
    ReferenceNotFound,
}

/// A rejected patch. The whole patch is rejected; the input is untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ops[{op_index}] ({op}) {message}")]
pub struct PatchError {
    pub op_index: usize,
    pub op: OpKind,
    pub code: PatchErrorCode,
    pub message: String,
}

impl PatchError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(DiagnosticCode::PatchRejected, DiagnosticSource::Runtime, self.to_string())
            .with_path(format!("ops[{}]", self.op_index))
            .with_details(json!({ "opIndex": self.op_index, "op": self.op, "code": self.code }))
    }
}

/// Apply a patch and return the updated document.
///
/// Ops are applied in array order to a copy of `ir`. Each op checks its
/// precondition against the state left by the ops before it:
/// - addBlock: no id of the added subtree exists anywhere in the tree, and
///   the subtree itself has no repeated id; the anchor (if any) is top-level
/// - removeBlock / updateBlock / moveBlock: the id is a top-level block
/// - moveBlock: the anchor (if any) is top-level and is not the moved block
/// - addReference: the reference id is absent
/// - removeReference: the reference id is present
pub fn apply_patch(ir: &Document, patch: &Patch) -> Result<Document, PatchError> {
    let mut doc = ir.clone();
    doc.sort_references();

    for (i, op) in patch.ops.iter().enumerate() {
        apply_op(&mut doc, op).map_err(|(code, message)| PatchError {
            op_index: i,
            op: op.kind(),
            code,
            message,
        })?;
    }

    let stats = PatchStats::of(patch);
    debug!(
        document = %doc.id,
        ops = stats.ops,
        target_blocks = stats.target_blocks,
        target_references = stats.target_references,
        "applied patch"
    );

    Ok(doc)
}

type OpResult = Result<(), (PatchErrorCode, String)>;

fn apply_op(doc: &mut Document, op: &PatchOp) -> OpResult {
    match op {
        PatchOp::AddBlock { block, after_block_id } => {
            let ids = block.subtree_ids();
            let mut seen = std::collections::BTreeSet::new();
            for id in &ids {
                if !seen.insert(*id) {
                    return Err((PatchErrorCode::DuplicateId, format!("block subtree repeats id '{id}'")));
                }
            }
            let existing = walk(&doc.blocks);
            if let Some(id) = ids.iter().find(|id| existing.iter().any(|(b, _)| b.id == **id)) {
                return Err((PatchErrorCode::BlockExists, format!("block id '{id}' already exists")));
            }
            let at = insertion_index(doc, after_block_id.as_deref())?;
            doc.blocks.insert(at, block.clone());
        }
        PatchOp::RemoveBlock { id } => {
            let at = top_level(doc, id)?;
            doc.blocks.remove(at);
        }
        PatchOp::UpdateBlock(update) => {
            let at = top_level(doc, &update.id)?;
            apply_update(&mut doc.blocks[at], update);
        }
        PatchOp::MoveBlock { id, after_block_id } => {
            if after_block_id.as_deref() == Some(id.as_str()) {
                return Err((PatchErrorCode::SelfAnchor, format!("block '{id}' cannot be moved after itself")));
            }
            let from = top_level(doc, id)?;
            let block = doc.blocks.remove(from);
            match insertion_index(doc, after_block_id.as_deref()) {
                Ok(at) => doc.blocks.insert(at, block),
                Err(e) => {
                    doc.blocks.insert(from, block);
                    return Err(e);
                }
            }
        }
        PatchOp::AddReference { reference } => {
            if doc.reference(&reference.id).is_some() {
                return Err((
                    PatchErrorCode::ReferenceExists,
                    format!("reference id '{}' already exists", reference.id),
                ));
            }
            doc.insert_reference(reference.clone());
        }
        PatchOp::RemoveReference { id } => {
            let Some(at) = doc.references.iter().position(|r| &r.id == id) else {
                return Err((PatchErrorCode::ReferenceNotFound, format!("unknown reference id '{id}'")));
            };
            doc.references.remove(at);
        }
        PatchOp::UpdateMetadata { metadata } => doc.metadata = metadata.clone(),
        PatchOp::UpdateLayout { layout } => doc.layout = layout.clone(),
    }
    Ok(())
}

fn top_level(doc: &Document, id: &str) -> Result<usize, (PatchErrorCode, String)> {
    doc.position_of(id)
        .ok_or_else(|| (PatchErrorCode::BlockNotFound, format!("unknown top-level block id '{id}'")))
}

fn insertion_index(doc: &Document, anchor: Option<&str>) -> Result<usize, (PatchErrorCode, String)> {
    match anchor {
        None => Ok(0),
        Some(a) => doc
            .position_of(a)
            .map(|i| i + 1)
            .ok_or_else(|| (PatchErrorCode::AnchorNotFound, format!("unknown afterBlockId '{a}'"))),
    }
}

/// Apply an update's changed fields to a block: `unset`, then `set`, then the
/// replaced fields.
pub fn apply_update(block: &mut Block, update: &BlockUpdate) {
    for key in &update.unset {
        block.data.remove(key);
    }
    for (key, value) in &update.set {
        block.data.insert(key.clone(), value.clone());
    }
    if let Some(t) = &update.block_type {
        block.block_type = t.clone();
    }
    if let Some(p) = update.position {
        block.position = p;
    }
    if let Some(children) = &update.children {
        block.children = children.clone();
    }
    if let Some(invalid) = update.invalid {
        block.invalid = invalid;
    }
}
