//! Structured diagnostics shared by every stage.
//!
//! Designed to be:
//! - stable enough for machine handling (via `code`, `path`, `blockId`)
//! - still useful to humans (via `message`)

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSource {
    Parser,
    Compiler,
    Schema,
    Runtime,
    Plugin,
}

/// Error taxonomy. Every [`DiagnosticCode`] belongs to exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    ParseError,
    YamlError,
    SchemaError,
    UnknownComponentError,
    ReferenceError,
    ValidationError,
    PatchError,
    MigrationError,
}

impl ErrorClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorClass::ParseError => "ParseError",
            ErrorClass::YamlError => "YamlError",
            ErrorClass::SchemaError => "SchemaError",
            ErrorClass::UnknownComponentError => "UnknownComponentError",
            ErrorClass::ReferenceError => "ReferenceError",
            ErrorClass::ValidationError => "ValidationError",
            ErrorClass::PatchError => "PatchError",
            ErrorClass::MigrationError => "MigrationError",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Stable, machine-readable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    FrontmatterMalformed,
    FrontmatterUnterminated,
    UnterminatedFence,
    /// A `ui:` fence inside a list or block quote was moved out to the top level.
    TypedBlockLifted,
    YamlMalformed,
    SchemaViolation,
    /// Payload carries a field the schema does not declare. The field is kept.
    UnknownField,
    UnknownComponent,
    NestingTooDeep,
    ChildNotAllowed,
    DanglingReference,
    DuplicateId,
    ReferenceSourceMissing,
    DuplicateReferenceId,
    EmptyId,
    UnknownVersion,
    InvalidLayout,
    /// Block is marked invalid (retained despite a failed payload check).
    InvalidBlock,
    ChildrenNotAllowed,
    PatchRejected,
    MigrationFailed,
}

impl DiagnosticCode {
    pub const fn class(self) -> ErrorClass {
        use DiagnosticCode::*;
        match self {
            FrontmatterMalformed | FrontmatterUnterminated | UnterminatedFence | TypedBlockLifted => {
                ErrorClass::ParseError
            }
            YamlMalformed => ErrorClass::YamlError,
            SchemaViolation | UnknownField | NestingTooDeep | ChildNotAllowed => ErrorClass::SchemaError,
            UnknownComponent => ErrorClass::UnknownComponentError,
            DanglingReference | DuplicateId | ReferenceSourceMissing | DuplicateReferenceId => {
                ErrorClass::ReferenceError
            }
            EmptyId | UnknownVersion | InvalidLayout | InvalidBlock | ChildrenNotAllowed => {
                ErrorClass::ValidationError
            }
            PatchRejected => ErrorClass::PatchError,
            MigrationFailed => ErrorClass::MigrationError,
        }
    }
}

/// A single diagnostic. Collected per compile / validate / migrate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Span>,
    pub source: DiagnosticSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Field path such as `options` or `features[1].values`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, source: DiagnosticSource, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            position: None,
            source,
            block_id: None,
            path: None,
            details: None,
        }
    }

    pub fn error(code: DiagnosticCode, source: DiagnosticSource, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, source, message)
    }

    pub fn warning(code: DiagnosticCode, source: DiagnosticSource, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, source, message)
    }

    pub fn with_position(mut self, span: Span) -> Self {
        self.position = Some(span);
        self
    }

    pub fn with_block(mut self, id: impl Into<String>) -> Self {
        self.block_id = Some(id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.class())?;
        if let Some(span) = self.position {
            write!(f, " {}:{}", span.start.line, span.start.column)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Presence of any `error` diagnostic means the associated IR must not be trusted.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
