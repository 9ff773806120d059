//! Version constants for wire formats and CI gating.

/// IR schema version produced by the compiler (`version` field of a document).
pub use mdui_core::version::IR_VERSION;

/// Patch wire format version.
pub use mdui_core::version::PATCH_V;

/// JSON Schema bundle version for on-disk schemas under `spec/schemas/`.
///
/// Bump this if the schema constraints change (even if the IR version stays the same).
pub const SCHEMA_BUNDLE_V: u8 = 1;
