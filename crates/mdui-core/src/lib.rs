#![doc = r#"
⚠️ INTERNAL CRATE – NOT A STABLE API

This crate is an internal implementation detail of the MDUI project.

Do NOT depend on this crate directly.
Use `mdui-io` instead.
"#]

pub mod canonical_json;
pub mod diagnostics;
pub mod hash;
pub mod model;
pub mod version;
