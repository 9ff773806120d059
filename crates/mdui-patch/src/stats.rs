use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::Patch;

/// Deterministic counters for one patch.
///
/// Contains no timestamps; suitable for logs and CI output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStats {
    /// Ops total.
    pub ops: usize,

    /// Ops grouped by `op` tag.
    pub ops_by_type: BTreeMap<String, usize>,

    /// Distinct top-level block ids targeted by block ops.
    pub target_blocks: usize,

    /// Distinct reference ids targeted by reference ops.
    pub target_references: usize,
}

impl PatchStats {
    pub fn of(patch: &Patch) -> Self {
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut blocks = BTreeSet::new();
        let mut references = BTreeSet::new();
        for op in &patch.ops {
            *by_type.entry(op.kind().as_str().to_string()).or_insert(0) += 1;
            if let Some(id) = op.target_block() {
                blocks.insert(id);
            }
            if let Some(id) = op.target_reference() {
                references.insert(id);
            }
        }
        Self {
            ops: patch.ops.len(),
            ops_by_type: by_type,
            target_blocks: blocks.len(),
            target_references: references.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PatchOp;
    use serde_json::json;

    #[test]
    fn counts_ops_and_targets() {
        let patch = Patch::new(vec![
            PatchOp::RemoveBlock { id: "a".to_string() },
            PatchOp::MoveBlock { id: "b".to_string(), after_block_id: None },
            PatchOp::RemoveBlock { id: "b".to_string() },
            PatchOp::RemoveReference { id: "a->b".to_string() },
        ]);
        let stats = PatchStats::of(&patch);
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({
                "ops": 4,
                "opsByType": { "moveBlock": 1, "removeBlock": 2, "removeReference": 1 },
                "targetBlocks": 2,
                "targetReferences": 1
            })
        );
    }
}
