use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::version::IR_VERSION;

/// A stable identifier for a block.
pub type BlockId = String;

/// Block payload. Always a JSON object on the wire.
pub type BlockData = Map<String, Value>;

/// Reserved and core block type tags.
pub mod block_types {
    pub const TEXT: &str = "text";
    pub const HEADING: &str = "heading";
    pub const CODE: &str = "code";
    pub const LIST: &str = "list";
    pub const QUOTE: &str = "quote";
    pub const DIVIDER: &str = "divider";
    pub const HTML: &str = "html";
    /// Placeholder for typed blocks whose type is not registered.
    pub const UNKNOWN: &str = "unknown";

    /// Prefix of typed (fenced) block types, e.g. `ui:poll`.
    pub const UI_PREFIX: &str = "ui:";

    pub fn is_typed(block_type: &str) -> bool {
        block_type.len() > UI_PREFIX.len() && block_type.starts_with(UI_PREFIX)
    }
}

/// 1-based line/column location in the source text. Columns count characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source span of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

impl Span {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// A single typed unit of document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub data: BlockData,
    #[serde(default)]
    pub position: Span,
    /// Nested blocks. Only present on container types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
    /// Set when the block was retained even though its payload failed validation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub invalid: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Block {
    pub fn new(id: impl Into<BlockId>, block_type: impl Into<String>, data: BlockData, position: Span) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            data,
            position,
            children: None,
            invalid: false,
        }
    }

    /// Ids of this block and all of its descendants, pre-order.
    pub fn subtree_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (b, _) in walk(std::slice::from_ref(self)) {
            out.push(b.id.as_str());
        }
        out
    }

    /// Heading anchor, if this block is a heading that declares one.
    pub fn anchor(&self) -> Option<&str> {
        if self.block_type != block_types::HEADING {
            return None;
        }
        self.data.get("anchor").and_then(Value::as_str).filter(|a| !a.is_empty())
    }
}

/// Pre-order walk over a block forest, yielding each block with its depth
/// (top-level blocks are depth 0).
///
/// Uses an explicit stack, so externally constructed deep trees cannot
/// exhaust the call stack.
pub fn walk(blocks: &[Block]) -> Vec<(&Block, usize)> {
    let mut out = Vec::new();
    let mut stack: Vec<(&Block, usize)> = blocks.iter().rev().map(|b| (b, 0)).collect();
    while let Some((block, depth)) = stack.pop() {
        out.push((block, depth));
        if let Some(children) = &block.children {
            for child in children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }
    out
}

/// Every block id and heading anchor in a block forest: the set a reference
/// target may resolve against.
pub fn resolvable_targets(blocks: &[Block]) -> BTreeSet<String> {
    let mut targets = BTreeSet::new();
    for (b, _) in walk(blocks) {
        targets.insert(b.id.clone());
        if let Some(anchor) = b.anchor() {
            targets.insert(anchor.to_string());
        }
    }
    targets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Inline `[label](#target)` link.
    Link,
    /// Schema-declared reference field of a typed block.
    Embed,
}

/// A named link from one block to another block or a heading anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub source: BlockId,
    pub target: String,
    pub kind: ReferenceKind,
}

pub const LAYOUT_MODES: &[&str] = &["flow", "grid", "slides"];
pub const LAYOUT_SPACINGS: &[&str] = &["compact", "normal", "relaxed"];

/// Layout hints forwarded to rendering collaborators.
///
/// Kept as plain strings/numbers so externally constructed values can be
/// re-checked with [`Layout::problems`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub mode: String,
    pub spacing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            mode: "flow".to_string(),
            spacing: "normal".to_string(),
            max_width: None,
        }
    }
}

impl Layout {
    /// Field path and message for every ill-formed hint. Empty when well-formed.
    pub fn problems(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if !LAYOUT_MODES.contains(&self.mode.as_str()) {
            out.push((
                "layout.mode",
                format!("unknown layout mode '{}' (expected one of: {})", self.mode, LAYOUT_MODES.join(", ")),
            ));
        }
        if !LAYOUT_SPACINGS.contains(&self.spacing.as_str()) {
            out.push((
                "layout.spacing",
                format!(
                    "unknown layout spacing '{}' (expected one of: {})",
                    self.spacing,
                    LAYOUT_SPACINGS.join(", ")
                ),
            ));
        }
        if let Some(w) = self.max_width {
            if !w.is_finite() || w < 0.0 {
                out.push(("layout.maxWidth", format!("maxWidth must be a non-negative number, got {w}")));
            }
        }
        out
    }
}

/// A compiled document: the versioned intermediate representation.
///
/// `references` is a set. It is serialized and deserialized sorted by
/// reference id, and equality ignores its in-memory order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default, serialize_with = "serialize_references", deserialize_with = "deserialize_references")]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub layout: Layout,
}

impl Document {
    /// Empty document at the current IR version.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            version: IR_VERSION.to_string(),
            id: id.into(),
            metadata: BTreeMap::new(),
            blocks: Vec::new(),
            references: Vec::new(),
            layout: Layout::default(),
        }
    }

    /// Index of a top-level block.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Whether any block in the tree (top-level or nested) has this id.
    pub fn contains_block(&self, id: &str) -> bool {
        walk(&self.blocks).iter().any(|(b, _)| b.id == id)
    }

    pub fn reference(&self, id: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.id == id)
    }

    /// Insert a reference at its sorted position. Assumes `references` is sorted.
    pub fn insert_reference(&mut self, reference: Reference) {
        let at = self
            .references
            .partition_point(|r| r.id.as_str() < reference.id.as_str());
        self.references.insert(at, reference);
    }

    /// Restore the canonical reference order (by id).
    pub fn sort_references(&mut self) {
        self.references.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.id == other.id
            && self.metadata == other.metadata
            && self.blocks == other.blocks
            && self.layout == other.layout
            && sorted_references(&self.references) == sorted_references(&other.references)
    }
}

fn sorted_references(references: &[Reference]) -> Vec<&Reference> {
    let mut out: Vec<&Reference> = references.iter().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

fn serialize_references<S: serde::Serializer>(references: &[Reference], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(sorted_references(references))
}

fn deserialize_references<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<Reference>, D::Error> {
    let mut references = Vec::<Reference>::deserialize(deserializer)?;
    references.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(references)
}

/// Phrasing content of text-like blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text {
        value: String,
    },
    Strong {
        children: Vec<Inline>,
    },
    Emphasis {
        children: Vec<Inline>,
    },
    Delete {
        children: Vec<Inline>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<Inline>,
    },
    Code {
        value: String,
    },
    Image {
        url: String,
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Break,
}

impl Inline {
    /// Plain-text rendering. Images fall back to their alt text.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    pub fn plain_text_of(nodes: &[Inline]) -> String {
        let mut out = String::new();
        for n in nodes {
            n.write_plain(&mut out);
        }
        out
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            Inline::Text { value } | Inline::Code { value } => out.push_str(value),
            Inline::Strong { children }
            | Inline::Emphasis { children }
            | Inline::Delete { children }
            | Inline::Link { children, .. } => {
                for c in children {
                    c.write_plain(out);
                }
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::Break => out.push('\n'),
        }
    }
}
