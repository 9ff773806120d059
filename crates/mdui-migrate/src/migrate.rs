use std::collections::BTreeSet;

use serde_json::json;
use tracing::{debug, info};

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource, has_errors};
use mdui_core::model::Document;
use mdui_schema::{SchemaRegistry, ValidateOptions, validate_ir};

use crate::registry::{MigrationRegistry, Step, check_version};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MigrationError {
    #[error("invalid version '{version}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion { version: String },

    #[error("no migration registered from '{missing}' (migrating '{from}' to '{to}')")]
    NoPath { from: String, to: String, missing: String },

    #[error("migration cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("migration {from} -> {to} failed: {message}")]
    TransformFailed { from: String, to: String, message: String },

    #[error("migration {from} -> {to} produced an invalid document ({} error(s))", .diagnostics.iter().filter(|d| d.is_error()).count())]
    InvalidIntermediate {
        from: String,
        to: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl MigrationError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let details = match self {
            MigrationError::InvalidVersion { version } => json!({ "version": version }),
            MigrationError::NoPath { from, to, missing } => json!({ "from": from, "to": to, "missing": missing }),
            MigrationError::Cycle { path } => json!({ "path": path }),
            MigrationError::TransformFailed { from, to, .. } => json!({ "from": from, "to": to }),
            MigrationError::InvalidIntermediate { from, to, diagnostics } => {
                json!({ "from": from, "to": to, "diagnostics": diagnostics })
            }
        };
        Diagnostic::error(DiagnosticCode::MigrationFailed, DiagnosticSource::Runtime, self.to_string())
            .with_details(details)
    }
}

/// Migrate a document to `registry.latest()`.
///
/// The whole chain is planned before any transform runs. Each step's result
/// is stamped with the step's target version and validated against that
/// version; the first failure aborts the migration. The input is never
/// modified. A document already at the latest version is returned as is.
pub fn migrate_ir(
    ir: &Document,
    registry: &MigrationRegistry,
    schemas: &SchemaRegistry,
) -> Result<Document, MigrationError> {
    check_version(&ir.version)?;
    if ir.version == registry.latest() {
        debug!(document = %ir.id, version = %ir.version, "already at latest version");
        return Ok(ir.clone());
    }

    let steps = plan(&ir.version, registry)?;

    let mut doc = ir.clone();
    for (from, step) in steps {
        doc = (step.transform)(doc).map_err(|message| MigrationError::TransformFailed {
            from: from.clone(),
            to: step.to.clone(),
            message,
        })?;
        doc.version = step.to.clone();

        let opts = ValidateOptions {
            known_versions: vec![step.to.clone()],
            ..ValidateOptions::default()
        };
        let diagnostics = validate_ir(&doc, schemas, &opts);
        if has_errors(&diagnostics) {
            return Err(MigrationError::InvalidIntermediate {
                from,
                to: step.to.clone(),
                diagnostics,
            });
        }
        info!(document = %doc.id, from = %from, to = %step.to, "migrated document");
    }

    Ok(doc)
}

/// Steps from `start` to the latest version, in order.
fn plan<'r>(start: &str, registry: &'r MigrationRegistry) -> Result<Vec<(String, &'r Step)>, MigrationError> {
    let mut steps = Vec::new();
    let mut visited = BTreeSet::from([start.to_string()]);
    let mut path = vec![start.to_string()];
    let mut current = start.to_string();

    while current != registry.latest() {
        let Some(step) = registry.step(&current) else {
            return Err(MigrationError::NoPath {
                from: start.to_string(),
                to: registry.latest().to_string(),
                missing: current,
            });
        };
        path.push(step.to.clone());
        if !visited.insert(step.to.clone()) {
            return Err(MigrationError::Cycle { path });
        }
        steps.push((current, step));
        current = step.to.clone();
    }
    Ok(steps)
}
