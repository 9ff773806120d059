//! Patch composition.
//!
//! `compose_patch(p1, p2)` is `p1 ++ p2` simplified so that, whenever applying
//! `p1` then `p2` succeeds, applying the composed patch gives the same
//! document. Rewrites are repeated until none applies:
//!
//! - an update is folded into the `addBlock` of the same block before it
//! - an update is merged into the previous update of the same block
//! - `addBlock X` .. `removeBlock X` cancels, with the updates and moves of
//!   `X` in between, unless some op in between is anchored on `X`
//! - `addReference R` .. `removeReference R` cancels
//! - only the last `updateMetadata` and the last `updateLayout` are kept
//!
//! An update that replaces `children` is folded or merged only across ops on
//! the same block, because `addBlock` checks ids against the whole tree.

use tracing::debug;

use crate::apply::apply_update;
use crate::schema::{BlockUpdate, OpKind, Patch, PatchOp};

pub fn compose_patch(first: &Patch, second: &Patch) -> Patch {
    let mut ops: Vec<PatchOp> = first.ops.iter().chain(&second.ops).cloned().collect();
    let concatenated = ops.len();

    while fold_update(&mut ops)
        || cancel_added_block(&mut ops)
        || cancel_added_reference(&mut ops)
        || keep_last_document_ops(&mut ops)
    {}

    debug!(first = first.len(), second = second.len(), concatenated, composed = ops.len(), "composed patches");
    Patch::new(ops)
}

/// Fold or merge one update into an earlier op on the same block.
fn fold_update(ops: &mut Vec<PatchOp>) -> bool {
    for j in 0..ops.len() {
        let PatchOp::UpdateBlock(later) = &ops[j] else { continue };
        let Some(i) = fold_target(ops, j, later) else { continue };

        let PatchOp::UpdateBlock(later) = ops.remove(j) else { continue };
        match &mut ops[i] {
            PatchOp::AddBlock { block, .. } => apply_update(block, &later),
            PatchOp::UpdateBlock(earlier) => merge_updates(earlier, later),
            _ => {}
        }
        return true;
    }
    false
}

/// Index of the op that the update at `j` can be folded into.
fn fold_target(ops: &[PatchOp], j: usize, update: &BlockUpdate) -> Option<usize> {
    let replaces_children = update.children.is_some();
    let mut crossed_other = false;

    for i in (0..j).rev() {
        let op = &ops[i];
        if op.target_block() != Some(update.id.as_str()) {
            crossed_other = true;
            continue;
        }
        return match op.kind() {
            OpKind::AddBlock if !replaces_children => Some(i),
            OpKind::UpdateBlock if !(replaces_children && crossed_other) => Some(i),
            OpKind::MoveBlock => continue,
            _ => None,
        };
    }
    None
}

/// `earlier` followed by `later`, as one update.
fn merge_updates(earlier: &mut BlockUpdate, later: BlockUpdate) {
    earlier.set.retain(|k, _| !later.unset.contains(k));
    earlier.set.extend(later.set);
    for key in later.unset {
        if !earlier.unset.contains(&key) {
            earlier.unset.push(key);
        }
    }
    if later.block_type.is_some() {
        earlier.block_type = later.block_type;
    }
    if later.position.is_some() {
        earlier.position = later.position;
    }
    if later.children.is_some() {
        earlier.children = later.children;
    }
    if later.invalid.is_some() {
        earlier.invalid = later.invalid;
    }
}

fn cancel_added_block(ops: &mut Vec<PatchOp>) -> bool {
    for i in 0..ops.len() {
        let PatchOp::AddBlock { block, .. } = &ops[i] else { continue };
        let id = block.id.as_str();

        let mut removal = None;
        for (k, op) in ops.iter().enumerate().skip(i + 1) {
            if op.anchor() == Some(id) {
                break;
            }
            if op.target_block() == Some(id) {
                match op.kind() {
                    OpKind::UpdateBlock | OpKind::MoveBlock => continue,
                    OpKind::RemoveBlock => removal = Some(k),
                    _ => {}
                }
                break;
            }
        }
        let Some(j) = removal else { continue };

        let id = id.to_string();
        let mut k = 0;
        ops.retain(|op| {
            let keep = !((i..=j).contains(&k) && op.target_block() == Some(id.as_str()));
            k += 1;
            keep
        });
        return true;
    }
    false
}

fn cancel_added_reference(ops: &mut Vec<PatchOp>) -> bool {
    for i in 0..ops.len() {
        let PatchOp::AddReference { reference } = &ops[i] else { continue };
        let id = reference.id.as_str();
        let later = ops
            .iter()
            .enumerate()
            .skip(i + 1)
            .find(|(_, op)| op.target_reference() == Some(id));
        if let Some((j, PatchOp::RemoveReference { .. })) = later {
            ops.remove(j);
            ops.remove(i);
            return true;
        }
    }
    false
}

fn keep_last_document_ops(ops: &mut Vec<PatchOp>) -> bool {
    let before = ops.len();
    for kind in [OpKind::UpdateMetadata, OpKind::UpdateLayout] {
        let Some(last) = ops.iter().rposition(|op| op.kind() == kind) else { continue };
        let mut k = 0;
        ops.retain(|op| {
            let keep = op.kind() != kind || k == last;
            k += 1;
            keep
        });
    }
    ops.len() != before
}
