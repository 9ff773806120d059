use std::collections::BTreeMap;

use crate::builtin;
use crate::descriptor::BlockSchema;

/// Block-type registry. Lookup is exact-string match on the type tag.
///
/// `Default` gives the built-in core and `ui:*` schemas; use
/// [`SchemaRegistry::empty`] for a registry without any.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, BlockSchema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self { schemas: BTreeMap::new() }
    }

    /// Core Markdown block types only (no `ui:*` components).
    pub fn core() -> Self {
        let mut reg = Self::empty();
        for s in builtin::core_schemas() {
            reg.register(s);
        }
        reg
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::core();
        for s in builtin::ui_schemas() {
            reg.register(s);
        }
        reg
    }

    /// Register a schema, replacing (and returning) any schema for the same type.
    pub fn register(&mut self, schema: BlockSchema) -> Option<BlockSchema> {
        self.schemas.insert(schema.type_name.clone(), schema)
    }

    pub fn get(&self, type_name: &str) -> Option<&BlockSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn is_container(&self, type_name: &str) -> bool {
        self.get(type_name).is_some_and(BlockSchema::is_container)
    }

    /// Whether `child_type` may be nested in `parent_type`.
    pub fn allows_child(&self, parent_type: &str, child_type: &str) -> bool {
        self.get(parent_type)
            .and_then(|s| s.container.as_ref())
            .is_some_and(|c| c.allows(child_type))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldKind, FieldSpec};

    #[test]
    fn lookup_is_exact() {
        let reg = SchemaRegistry::default();
        assert!(reg.contains("ui:poll"));
        assert!(!reg.contains("ui:Poll"));
        assert!(!reg.contains("poll"));
    }

    #[test]
    fn register_replaces_existing() {
        let mut reg = SchemaRegistry::default();
        let replaced = reg.register(
            BlockSchema::new("ui:poll", "custom").field(FieldSpec::required("q", FieldKind::string())),
        );
        assert_eq!(replaced.map(|s| s.description), Some("Single or multiple choice poll".to_string()));
        assert_eq!(reg.get("ui:poll").map(|s| s.fields.len()), Some(1));
    }

    #[test]
    fn container_allow_lists() {
        let reg = SchemaRegistry::default();
        assert!(reg.is_container("ui:tabs"));
        assert!(reg.allows_child("ui:tabs", "ui:callout"));
        assert!(!reg.allows_child("ui:tabs", "ui:tabs"));
        assert!(!reg.allows_child("ui:poll", "text"));
    }

    #[test]
    fn core_registry_has_no_components() {
        let reg = SchemaRegistry::core();
        assert!(reg.contains("text"));
        assert!(!reg.type_names().any(|t| t.starts_with("ui:")));
    }
}
