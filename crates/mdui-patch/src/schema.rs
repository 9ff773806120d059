use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use mdui_core::model::{Block, BlockId, Layout, Reference, Span};

/// Ordered edit operations over an IR document. On the wire: a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    AddBlock,
    RemoveBlock,
    UpdateBlock,
    MoveBlock,
    AddReference,
    RemoveReference,
    UpdateMetadata,
    UpdateLayout,
}

impl OpKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            OpKind::AddBlock => "addBlock",
            OpKind::RemoveBlock => "removeBlock",
            OpKind::UpdateBlock => "updateBlock",
            OpKind::MoveBlock => "moveBlock",
            OpKind::AddReference => "addReference",
            OpKind::RemoveReference => "removeReference",
            OpKind::UpdateMetadata => "updateMetadata",
            OpKind::UpdateLayout => "updateLayout",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Patch operation in wire format, tagged by `op`.
///
/// Block ops address top-level blocks. `afterBlockId` absent means "at the
/// start".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PatchOp {
    #[serde(rename_all = "camelCase")]
    AddBlock {
        block: Block,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_block_id: Option<BlockId>,
    },
    RemoveBlock {
        id: BlockId,
    },
    UpdateBlock(BlockUpdate),
    #[serde(rename_all = "camelCase")]
    MoveBlock {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_block_id: Option<BlockId>,
    },
    AddReference {
        reference: Reference,
    },
    RemoveReference {
        id: String,
    },
    /// Whole replace.
    UpdateMetadata {
        metadata: BTreeMap<String, Value>,
    },
    /// Whole replace.
    UpdateLayout {
        layout: Layout,
    },
}

impl PatchOp {
    pub fn kind(&self) -> OpKind {
        match self {
            PatchOp::AddBlock { .. } => OpKind::AddBlock,
            PatchOp::RemoveBlock { .. } => OpKind::RemoveBlock,
            PatchOp::UpdateBlock(_) => OpKind::UpdateBlock,
            PatchOp::MoveBlock { .. } => OpKind::MoveBlock,
            PatchOp::AddReference { .. } => OpKind::AddReference,
            PatchOp::RemoveReference { .. } => OpKind::RemoveReference,
            PatchOp::UpdateMetadata { .. } => OpKind::UpdateMetadata,
            PatchOp::UpdateLayout { .. } => OpKind::UpdateLayout,
        }
    }

    /// Top-level block this op adds, removes, updates or moves.
    pub fn target_block(&self) -> Option<&str> {
        match self {
            PatchOp::AddBlock { block, .. } => Some(&block.id),
            PatchOp::RemoveBlock { id } | PatchOp::MoveBlock { id, .. } => Some(id),
            PatchOp::UpdateBlock(u) => Some(&u.id),
            _ => None,
        }
    }

    pub fn target_reference(&self) -> Option<&str> {
        match self {
            PatchOp::AddReference { reference } => Some(&reference.id),
            PatchOp::RemoveReference { id } => Some(id),
            _ => None,
        }
    }

    /// `afterBlockId` of an add or move.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            PatchOp::AddBlock { after_block_id, .. } | PatchOp::MoveBlock { after_block_id, .. } => {
                after_block_id.as_deref()
            }
            _ => None,
        }
    }
}

/// Changed fields of one block.
///
/// `data` is merged at the top level: keys in `unset` are removed (absent
/// keys are ignored), then keys in `set` are inserted or replaced whole.
/// Nested values are never merged. `type`, `position`, `children` and
/// `invalid` are replaced when present; `children: null` removes children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUpdate {
    pub id: BlockId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub set: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unset: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub children: Option<Option<Vec<Block>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
}

impl BlockUpdate {
    pub fn new(id: impl Into<BlockId>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// True when the update carries no change.
    pub fn is_noop(&self) -> bool {
        self.block_type.is_none()
            && self.set.is_empty()
            && self.unset.is_empty()
            && self.position.is_none()
            && self.children.is_none()
            && self.invalid.is_none()
    }
}

/// A present field (even `null`) is `Some`; only an absent one is `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
