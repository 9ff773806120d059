use serde::{Deserialize, Serialize};

use mdui_core::diagnostics::Severity;

/// What to do with a block whose payload failed YAML parsing or schema checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidBlockPolicy {
    /// Keep the block, marked `invalid`, carrying its raw payload.
    #[default]
    Keep,
    /// Remove the block. Its diagnostics are still reported.
    Drop,
}

/// Compiler configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Document id used when the frontmatter does not declare one.
    pub document_id: String,
    /// Severity of a reference whose target does not resolve.
    pub dangling_references: Severity,
    pub invalid_blocks: InvalidBlockPolicy,
    /// Re-check the finished IR with the validator and report its findings.
    pub validate: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            document_id: "document".to_string(),
            dangling_references: Severity::Warning,
            invalid_blocks: InvalidBlockPolicy::Keep,
            validate: true,
        }
    }
}

impl CompileOptions {
    /// Options for contexts where a broken link must fail the build.
    pub fn strict() -> Self {
        Self { dangling_references: Severity::Error, ..Self::default() }
    }
}
