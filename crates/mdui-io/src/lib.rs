//! `mdui-io` is the single supported public entrypoint for the MDUI compiler:
//! Markdown-with-typed-blocks in, versioned IR and diagnostics out, plus the
//! IR patch algebra (diff, apply, compose) and version migration.
//!
//! This crate intentionally contains **no** rendering, theming, file I/O or
//! CLI logic. Those belong in higher layers. `mdui-io` focuses on:
//! - stable types
//! - compile / validate / diff / apply / compose / migrate entrypoints
//! - canonical JSON
//! - hashing

// -----------------------------------------------------------------------------
// Public API contract
// -----------------------------------------------------------------------------
//
// Consumers SHOULD import from `mdui_io::prelude::*`.
// Anything not re-exported via the prelude is considered internal and may change
// without notice.

// Re-export the IR model and diagnostics.
#[doc(hidden)]
pub mod core {
    pub use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, ErrorClass, Severity, has_errors};
    pub use mdui_core::hash::{canonicalize_text, content_id, xxh64_hex};
    pub use mdui_core::model::{
        Block, BlockData, BlockId, Document, Inline, Layout, Point, Reference, ReferenceKind, Span, block_types, walk,
    };
}

/// Deterministic JSON canonicalization helpers.
///
/// These utilities are used for stable hashing and byte-identical output.
pub mod canonical_json {
    pub use mdui_core::canonical_json::{canonicalize, to_canonical_json_bytes, to_canonical_json_string};
}

/// Parsing IR document JSON with actionable errors.
pub mod document_json;

/// Hash helpers for canonical JSON, fingerprints and cache keys.
pub mod hashing;

/// Version constants for wire formats and CI gating.
pub mod version;

// Re-export the block-type registry and validator.
#[doc(hidden)]
pub mod schema {
    pub use mdui_schema::{
        BlockSchema, CheckOutcome, ContainerSpec, FieldKind, FieldSpec, MAX_NESTING_DEPTH, Refinement, SchemaRegistry,
        ValidateOptions, Violation, check_payload, validate_ir,
    };
}

// Re-export the compiler.
#[doc(hidden)]
pub mod compiler {
    pub use mdui_compiler::{Compilation, CompileOptions, InvalidBlockPolicy, compile};
}

// Re-export the patch algebra.
#[doc(hidden)]
pub mod patch {
    pub use mdui_patch::{
        BlockUpdate, DiffError, OpKind, Patch, PatchError, PatchErrorCode, PatchOp, PatchStats, apply_patch,
        compose_patch, diff_ir,
    };
}

// Re-export migration.
#[doc(hidden)]
pub mod migrate {
    pub use mdui_migrate::{MigrationError, MigrationRegistry, Transform, migrate_ir};
}

/// Convenience prelude for consumers.
///
/// This is the **only supported** import surface for external users.
pub mod prelude {
    pub use crate::compiler::{Compilation, CompileOptions, InvalidBlockPolicy, compile};
    pub use crate::core::{Block, BlockId, Diagnostic, DiagnosticCode, Document, Layout, Reference, ReferenceKind};
    pub use crate::core::{Severity, Span, has_errors};
    pub use crate::document_json::{DocumentJsonError, parse_document_json_str};
    pub use crate::migrate::{MigrationError, MigrationRegistry, migrate_ir};
    pub use crate::patch::{BlockUpdate, DiffError, Patch, PatchError, PatchOp, apply_patch, compose_patch, diff_ir};
    pub use crate::schema::{BlockSchema, SchemaRegistry, ValidateOptions, validate_ir};
    pub use crate::{canonical_json, hashing};
}
