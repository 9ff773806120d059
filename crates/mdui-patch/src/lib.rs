#![doc = r#"
⚠️ INTERNAL CRATE – NOT A STABLE API

IR patch format, structural diff, atomic patch application, and patch
composition. Use `mdui-io` instead of depending on this crate directly.
"#]

pub mod apply;
pub mod compose;
pub mod diff;
pub mod schema;
pub mod stats;

pub use apply::{PatchError, PatchErrorCode, apply_patch, apply_update};
pub use compose::compose_patch;
pub use diff::{DiffError, diff_ir};
pub use schema::{BlockUpdate, OpKind, Patch, PatchOp};
pub use stats::PatchStats;
