//! Parsing IR document JSON with actionable errors.
//!
//! serde's "missing field X" is correct but unhelpful for people writing IR
//! by hand or generating it elsewhere. These helpers keep strict behavior
//! and name every missing top-level field at once.

use serde::de::Error as _;
use serde_json::Value;

use mdui_core::model::Document;
use mdui_core::version::Version;

const REQUIRED_TOP_LEVEL_FIELDS: &[&str] = &["version", "id", "blocks"];

#[derive(Debug, thiserror::Error)]
pub enum DocumentJsonError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error(
        "Invalid IR document JSON: missing required top-level field(s): {}. Required top-level fields: {}.",
        .missing.join(", "),
        .required.join(", ")
    )]
    MissingRequiredTopLevelFields {
        missing: Vec<&'static str>,
        required: Vec<&'static str>,
    },

    #[error("Invalid IR document JSON shape: {}. Required top-level fields: {}.", .0, REQUIRED_TOP_LEVEL_FIELDS.join(", "))]
    InvalidDocumentShape(#[source] serde_json::Error),

    #[error("Invalid IR version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
}

/// Parse an IR document from a JSON string.
///
/// `metadata`, `references` and `layout` may be omitted; `version`, `id`
/// and `blocks` are required. The version must be well-formed but need not
/// be the current one (see `migrate_ir`).
pub fn parse_document_json_str(s: &str) -> Result<Document, DocumentJsonError> {
    let v: Value = serde_json::from_str(s).map_err(DocumentJsonError::InvalidJson)?;
    let obj = v.as_object().ok_or_else(|| {
        DocumentJsonError::InvalidDocumentShape(serde_json::Error::custom("expected a JSON object"))
    })?;

    let missing: Vec<&'static str> =
        REQUIRED_TOP_LEVEL_FIELDS.iter().copied().filter(|k| !obj.contains_key(*k)).collect();
    if !missing.is_empty() {
        return Err(DocumentJsonError::MissingRequiredTopLevelFields {
            missing,
            required: REQUIRED_TOP_LEVEL_FIELDS.to_vec(),
        });
    }

    let doc: Document = serde_json::from_value(v).map_err(DocumentJsonError::InvalidDocumentShape)?;
    if doc.version.parse::<Version>().is_err() {
        return Err(DocumentJsonError::InvalidVersion(doc.version));
    }
    Ok(doc)
}
