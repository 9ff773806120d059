//! Generic payload checker interpreting [`BlockSchema`] descriptors.

use serde_json::{Map, Value};

use mdui_core::model::Inline;

use crate::descriptor::{BlockSchema, FieldKind, FieldSpec};

/// One failed constraint, addressed by field path (`options`, `features[1].values`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// Result of checking a payload.
///
/// `data` is the normalized payload (defaults filled in). It is only
/// meaningful when `violations` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub data: Map<String, Value>,
    pub violations: Vec<Violation>,
    /// Top-level keys not declared by the schema, sorted. They are kept in `data`.
    pub unknown_fields: Vec<String>,
}

impl CheckOutcome {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check a payload against a block schema.
///
/// Refinements only run when every field passed on its own, so predicates can
/// rely on field shapes.
pub fn check_payload(schema: &BlockSchema, payload: &Map<String, Value>) -> CheckOutcome {
    let mut violations = Vec::new();
    let data = check_object(&schema.fields, payload, "", &mut violations);

    let mut unknown_fields: Vec<String> = payload
        .keys()
        .filter(|k| !schema.fields.iter().any(|f| &f.name == *k))
        .cloned()
        .collect();
    unknown_fields.sort();

    if violations.is_empty() {
        for r in &schema.refinements {
            if let Err(v) = (r.check)(&data) {
                violations.push(v);
            }
        }
    }

    CheckOutcome { data, violations, unknown_fields }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn check_object(
    fields: &[FieldSpec],
    input: &Map<String, Value>,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Map<String, Value> {
    let mut out = input.clone();
    for f in fields {
        let field_path = join(path, &f.name);
        match input.get(&f.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let normalized = check_value(&f.kind, value, &field_path, violations);
                out.insert(f.name.clone(), normalized);
            }
            None => {
                if let Some(default) = &f.default {
                    out.insert(f.name.clone(), default.clone());
                } else if f.required {
                    violations.push(Violation::new(field_path, "required field is missing"));
                }
            }
        }
    }
    out
}

fn check_value(kind: &FieldKind, value: &Value, path: &str, violations: &mut Vec<Violation>) -> Value {
    let mismatch = |violations: &mut Vec<Violation>| {
        violations.push(Violation::new(
            path,
            format!("expected {}, got {}", kind.describe(), json_type(value)),
        ));
    };

    match kind {
        FieldKind::String { min_len, max_len } => {
            let Some(s) = value.as_str() else {
                mismatch(violations);
                return value.clone();
            };
            let n = s.chars().count();
            if let Some(min) = min_len {
                if n < *min {
                    violations.push(Violation::new(path, format!("must be at least {min} character(s) long")));
                }
            }
            if let Some(max) = max_len {
                if n > *max {
                    violations.push(Violation::new(path, format!("must be at most {max} character(s) long")));
                }
            }
        }
        FieldKind::Integer { min, max } => {
            let Some(n) = value.as_i64() else {
                mismatch(violations);
                return value.clone();
            };
            if let Some(min) = min {
                if n < *min {
                    violations.push(Violation::new(path, format!("must be >= {min}")));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    violations.push(Violation::new(path, format!("must be <= {max}")));
                }
            }
        }
        FieldKind::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                mismatch(violations);
                return value.clone();
            };
            if let Some(min) = min {
                if n < *min {
                    violations.push(Violation::new(path, format!("must be >= {min}")));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    violations.push(Violation::new(path, format!("must be <= {max}")));
                }
            }
        }
        FieldKind::Boolean => {
            if !value.is_boolean() {
                mismatch(violations);
            }
        }
        FieldKind::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => {}
            _ => violations.push(Violation::new(
                path,
                format!("must be one of: {}", allowed.join(", ")),
            )),
        },
        FieldKind::Array { items, min_items, max_items } => {
            let Some(arr) = value.as_array() else {
                mismatch(violations);
                return value.clone();
            };
            if let Some(min) = min_items {
                if arr.len() < *min {
                    violations.push(Violation::new(path, format!("must contain at least {min} item(s)")));
                }
            }
            if let Some(max) = max_items {
                if arr.len() > *max {
                    violations.push(Violation::new(path, format!("must contain at most {max} item(s)")));
                }
            }
            let normalized = arr
                .iter()
                .enumerate()
                .map(|(i, item)| check_value(items, item, &format!("{path}[{i}]"), violations))
                .collect();
            return Value::Array(normalized);
        }
        FieldKind::Object(fields) => {
            let Some(map) = value.as_object() else {
                mismatch(violations);
                return value.clone();
            };
            return Value::Object(check_object(fields, map, path, violations));
        }
        FieldKind::Inlines => {
            if serde_json::from_value::<Vec<Inline>>(value.clone()).is_err() {
                violations.push(Violation::new(path, "expected a list of inline nodes"));
            }
        }
        FieldKind::Reference => match value.as_str() {
            Some(s) if !s.trim_start_matches('#').is_empty() => {}
            _ => violations.push(Violation::new(path, "expected a non-empty block id or anchor")),
        },
        FieldKind::Any => {}
    }
    value.clone()
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
