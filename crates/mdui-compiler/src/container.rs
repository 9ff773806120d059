//! Nested typed blocks inside container-capable block types.
//!
//! A container's payload is its own YAML props followed, from the first fence
//! line on, by a Markdown fragment holding the children. Children are checked
//! against the nesting bound and the container's allow-list *before* they are
//! translated, so a rejected child's own body is never parsed.

use serde_json::json;

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource};
use mdui_schema::MAX_NESTING_DEPTH;

use crate::parser::parse_fragment;
use crate::translate::{Draft, Translator};

/// Split a container payload into `(props, Some((body, body_offset)))` at its
/// first fence line. `body_offset` is relative to the payload.
pub fn split_payload(payload: &str) -> (&str, Option<(&str, usize)>) {
    let mut offset = 0;
    for line in payload.split_inclusive('\n') {
        let t = line.trim_start();
        if t.starts_with("```") || t.starts_with("~~~") {
            return (&payload[..offset], Some((&payload[offset..], offset)));
        }
        offset += line.len();
    }
    (payload, None)
}

impl Translator<'_> {
    /// Parse and translate a container body. `depth` is the container's own
    /// depth; rejected children are reported on the container.
    pub(crate) fn compile_children(
        &mut self,
        parent_type: &str,
        body: &str,
        base: usize,
        depth: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Draft> {
        let (nodes, parse_diags) = parse_fragment(body, base, self.index);
        diagnostics.extend(parse_diags);

        let child_depth = depth + 1;
        let mut admitted = Vec::with_capacity(nodes.len());
        for node in nodes {
            let child_type = node.block_type().to_string();
            if child_depth > MAX_NESTING_DEPTH {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::NestingTooDeep,
                        DiagnosticSource::Compiler,
                        format!(
                            "'{child_type}' would be nested at depth {child_depth}, beyond the maximum of {MAX_NESTING_DEPTH}; child dropped"
                        ),
                    )
                    .with_position(node.span())
                    .with_details(json!({ "depth": child_depth, "max": MAX_NESTING_DEPTH })),
                );
                continue;
            }
            if !self.registry.allows_child(parent_type, &child_type) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::ChildNotAllowed,
                        DiagnosticSource::Schema,
                        format!("'{child_type}' may not be nested in '{parent_type}'; child dropped"),
                    )
                    .with_position(node.span())
                    .with_details(json!({ "child": child_type, "container": parent_type })),
                );
                continue;
            }
            admitted.push(node);
        }

        self.translate(admitted, child_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_stop_at_first_fence() {
        let payload = "labels: [A, B]\n```ui:callout\nbody: x\n```\n";
        let (props, body) = split_payload(payload);
        assert_eq!(props, "labels: [A, B]\n");
        let (body, offset) = body.unwrap();
        assert_eq!(offset, props.len());
        assert!(body.starts_with("```ui:callout"));
    }

    #[test]
    fn payload_without_fence_is_all_props() {
        assert_eq!(split_payload("columns: 3\n"), ("columns: 3\n", None));
    }
}
