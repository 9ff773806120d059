//! Structural diff between two IR documents of the same identity.
//!
//! Output order is canonical: removals (previous order), moves (next order),
//! updates (next order), additions (next order), reference removals,
//! reference additions, metadata, layout. Applying the result to `previous`
//! yields `next`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use mdui_core::model::{Block, Document, Reference, walk};

use crate::schema::{BlockUpdate, Patch, PatchOp};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    #[error("document ids differ: '{previous}' vs '{next}'")]
    DocumentMismatch { previous: String, next: String },
    #[error("IR versions differ: '{previous}' vs '{next}'; migrate both documents to one version first")]
    VersionMismatch { previous: String, next: String },
    #[error("block id '{id}' occurs more than once in the {side} document")]
    DuplicateBlockId { id: String, side: &'static str },
    #[error("reference id '{id}' occurs more than once in the {side} document")]
    DuplicateReferenceId { id: String, side: &'static str },
}

pub fn diff_ir(previous: &Document, next: &Document) -> Result<Patch, DiffError> {
    if previous.id != next.id {
        return Err(DiffError::DocumentMismatch { previous: previous.id.clone(), next: next.id.clone() });
    }
    if previous.version != next.version {
        return Err(DiffError::VersionMismatch {
            previous: previous.version.clone(),
            next: next.version.clone(),
        });
    }
    check_unique(previous, "previous")?;
    check_unique(next, "next")?;

    let mut ops = diff_blocks(&previous.blocks, &next.blocks);
    ops.extend(diff_references(&previous.references, &next.references));
    if previous.metadata != next.metadata {
        ops.push(PatchOp::UpdateMetadata { metadata: next.metadata.clone() });
    }
    if previous.layout != next.layout {
        ops.push(PatchOp::UpdateLayout { layout: next.layout.clone() });
    }

    debug!(document = %next.id, ops = ops.len(), "computed diff");
    Ok(Patch::new(ops))
}

fn check_unique(doc: &Document, side: &'static str) -> Result<(), DiffError> {
    let mut seen = BTreeSet::new();
    for (b, _) in walk(&doc.blocks) {
        if !seen.insert(b.id.as_str()) {
            return Err(DiffError::DuplicateBlockId { id: b.id.clone(), side });
        }
    }
    let mut refs = BTreeSet::new();
    for r in &doc.references {
        if !refs.insert(r.id.as_str()) {
            return Err(DiffError::DuplicateReferenceId { id: r.id.clone(), side });
        }
    }
    Ok(())
}

fn diff_blocks(previous: &[Block], next: &[Block]) -> Vec<PatchOp> {
    let prev_by_id: BTreeMap<&str, &Block> = previous.iter().map(|b| (b.id.as_str(), b)).collect();
    let next_ids: BTreeSet<&str> = next.iter().map(|b| b.id.as_str()).collect();

    let mut ops = Vec::new();

    for b in previous {
        if !next_ids.contains(b.id.as_str()) {
            ops.push(PatchOp::RemoveBlock { id: b.id.clone() });
        }
    }

    let prev_common: Vec<&str> = previous
        .iter()
        .map(|b| b.id.as_str())
        .filter(|id| next_ids.contains(id))
        .collect();
    let next_common: Vec<&str> = next
        .iter()
        .map(|b| b.id.as_str())
        .filter(|id| prev_by_id.contains_key(id))
        .collect();
    let stable = lcs(&prev_common, &next_common);

    // Each moved block lands right after its predecessor among the common
    // blocks of `next`; processed in `next` order this rebuilds that order.
    let mut before: Option<&str> = None;
    for id in &next_common {
        if !stable.contains(id) {
            ops.push(PatchOp::MoveBlock { id: id.to_string(), after_block_id: before.map(str::to_string) });
        }
        before = Some(id);
    }

    for b in next {
        if let Some(old) = prev_by_id.get(b.id.as_str()) {
            if let Some(update) = block_update(old, b) {
                ops.push(PatchOp::UpdateBlock(update));
            }
        }
    }

    let mut before: Option<&str> = None;
    for b in next {
        if !prev_by_id.contains_key(b.id.as_str()) {
            ops.push(PatchOp::AddBlock { block: b.clone(), after_block_id: before.map(str::to_string) });
        }
        before = Some(&b.id);
    }

    ops
}

/// Changed fields between two versions of the same block, or `None`.
fn block_update(old: &Block, new: &Block) -> Option<BlockUpdate> {
    let mut u = BlockUpdate::new(new.id.clone());
    if old.block_type != new.block_type {
        u.block_type = Some(new.block_type.clone());
    }
    for (key, value) in &new.data {
        if old.data.get(key) != Some(value) {
            u.set.insert(key.clone(), value.clone());
        }
    }
    let mut unset: Vec<String> = old.data.keys().filter(|k| !new.data.contains_key(*k)).cloned().collect();
    unset.sort();
    u.unset = unset;
    if old.position != new.position {
        u.position = Some(new.position);
    }
    if old.children != new.children {
        u.children = Some(new.children.clone());
    }
    if old.invalid != new.invalid {
        u.invalid = Some(new.invalid);
    }
    (!u.is_noop()).then_some(u)
}

/// Ids on one longest common subsequence of `a` and `b`, two orderings of
/// the same unique ids.
///
/// With unique ids the LCS is the longest increasing run of `b` positions
/// read in `a` order. Patience sorting finds it in O(n log n) time and
/// linear memory, whatever the shape of the reordering.
fn lcs<'a>(a: &[&'a str], b: &[&'a str]) -> BTreeSet<&'a str> {
    let position: HashMap<&str, usize> = b.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let seq: Vec<(&'a str, usize)> = a
        .iter()
        .filter_map(|id| position.get(id).map(|&p| (*id, p)))
        .collect();

    // tails[k] = index in `seq` of the smallest last position of an
    // increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &(_, p)) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t].1 < p);
        predecessor[i] = k.checked_sub(1).map(|k| tails[k]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut out = BTreeSet::new();
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.insert(seq[i].0);
        cursor = predecessor[i];
    }
    out
}

fn diff_references(previous: &[Reference], next: &[Reference]) -> Vec<PatchOp> {
    let prev: BTreeMap<&str, &Reference> = previous.iter().map(|r| (r.id.as_str(), r)).collect();
    let next: BTreeMap<&str, &Reference> = next.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut ops = Vec::new();
    for (id, r) in &prev {
        if next.get(id) != Some(r) {
            ops.push(PatchOp::RemoveReference { id: id.to_string() });
        }
    }
    for (id, r) in &next {
        if prev.get(id) != Some(r) {
            ops.push(PatchOp::AddReference { reference: (*r).clone() });
        }
    }
    ops
}
