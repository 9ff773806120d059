#![doc = r#"
⚠️ INTERNAL CRATE – NOT A STABLE API

IR version migration: a registry of version-to-version transforms and a
chained, validated migration walk. Use `mdui-io` instead of depending on
this crate directly.
"#]

pub mod migrate;
pub mod registry;

pub use migrate::{MigrationError, migrate_ir};
pub use registry::{MigrationRegistry, Transform};
