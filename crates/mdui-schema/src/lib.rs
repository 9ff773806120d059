#![doc = r#"
⚠️ INTERNAL CRATE – NOT A STABLE API

Block-type schema registry, the generic payload checker, and the IR validator.
Use `mdui-io` instead of depending on this crate directly.
"#]

pub mod builtin;
pub mod check;
pub mod descriptor;
pub mod registry;
pub mod validate;

pub use check::{CheckOutcome, Violation, check_payload};
pub use descriptor::{BlockSchema, ContainerSpec, FieldKind, FieldSpec, Refinement};
pub use registry::SchemaRegistry;
pub use validate::{MAX_NESTING_DEPTH, ValidateOptions, dangling_reference, duplicate_id, duplicate_ids, validate_ir};
