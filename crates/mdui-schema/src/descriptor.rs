//! Declarative block-type schema descriptors.
//!
//! A [`BlockSchema`] is data: fields with kinds, bounds, defaults and a
//! required flag, plus named cross-field [`Refinement`]s. One generic checker
//! (`crate::check`) interprets every descriptor.

use serde_json::{Map, Value};

use crate::check::Violation;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Enum(Vec<String>),
    Array {
        items: Box<FieldKind>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object(Vec<FieldSpec>),
    /// Phrasing content (`Inline[]`). Links to `#target` become references.
    Inlines,
    /// A block id or heading anchor. Becomes an `embed` reference.
    Reference,
    Any,
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::String { min_len: None, max_len: None }
    }

    pub fn non_empty_string() -> Self {
        FieldKind::String { min_len: Some(1), max_len: None }
    }

    pub fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        FieldKind::Integer { min, max }
    }

    pub fn enumeration(values: &[&str]) -> Self {
        FieldKind::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn array_of(items: FieldKind) -> Self {
        FieldKind::Array { items: Box::new(items), min_items: None, max_items: None }
    }

    pub fn array_min(items: FieldKind, min_items: usize) -> Self {
        FieldKind::Array { items: Box::new(items), min_items: Some(min_items), max_items: None }
    }

    /// Short human name used in messages.
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::String { .. } => "string",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Number { .. } => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum(_) => "enum",
            FieldKind::Array { .. } => "array",
            FieldKind::Object(_) => "object",
            FieldKind::Inlines => "inline content",
            FieldKind::Reference => "reference",
            FieldKind::Any => "any",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Filled in when the field is absent (or null).
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: true, default: None }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: false, default: None }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Cross-field predicate over a payload whose individual fields already passed.
pub type RefinementFn = fn(&Map<String, Value>) -> Result<(), Violation>;

#[derive(Debug, Clone)]
pub struct Refinement {
    pub name: &'static str,
    pub check: RefinementFn,
}

/// Container capability: which child block types may be nested.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub allowed_children: Vec<String>,
}

impl ContainerSpec {
    pub fn allowing(types: &[&str]) -> Self {
        Self { allowed_children: types.iter().map(|t| t.to_string()).collect() }
    }

    pub fn allows(&self, child_type: &str) -> bool {
        self.allowed_children.iter().any(|t| t == child_type)
    }
}

#[derive(Debug, Clone)]
pub struct BlockSchema {
    pub type_name: String,
    pub description: String,
    pub fields: Vec<FieldSpec>,
    pub refinements: Vec<Refinement>,
    pub container: Option<ContainerSpec>,
}

impl BlockSchema {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
            fields: Vec::new(),
            refinements: Vec::new(),
            container: None,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn refine(mut self, name: &'static str, check: RefinementFn) -> Self {
        self.refinements.push(Refinement { name, check });
        self
    }

    pub fn container(mut self, spec: ContainerSpec) -> Self {
        self.container = Some(spec);
        self
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }
}
