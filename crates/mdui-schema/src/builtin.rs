//! Built-in block schemas: the core Markdown types and the stock `ui:*` components.

use serde_json::{Map, Value, json};

use mdui_core::model::block_types;

use crate::check::Violation;
use crate::descriptor::{BlockSchema, ContainerSpec, FieldKind, FieldSpec};

pub const POLL: &str = "ui:poll";
pub const CALLOUT: &str = "ui:callout";
pub const COMPARISON: &str = "ui:comparison";
pub const EMBED: &str = "ui:embed";
pub const TABS: &str = "ui:tabs";
pub const GRID: &str = "ui:grid";

/// Schemas for blocks produced from plain Markdown, plus the `unknown` placeholder.
pub fn core_schemas() -> Vec<BlockSchema> {
    vec![
        BlockSchema::new(block_types::TEXT, "Paragraph of inline content")
            .field(FieldSpec::required("content", FieldKind::Inlines)),
        BlockSchema::new(block_types::HEADING, "Section heading")
            .field(FieldSpec::required("level", FieldKind::integer(Some(1), Some(6))))
            .field(FieldSpec::required("content", FieldKind::Inlines))
            .field(FieldSpec::required("anchor", FieldKind::string())),
        BlockSchema::new(block_types::CODE, "Literal code")
            .field(FieldSpec::optional("language", FieldKind::string()))
            .field(FieldSpec::required("code", FieldKind::string())),
        BlockSchema::new(block_types::LIST, "Bullet or ordered list")
            .field(FieldSpec::required("ordered", FieldKind::Boolean))
            .field(FieldSpec::optional("start", FieldKind::integer(Some(0), None)))
            .field(FieldSpec::required("items", FieldKind::array_of(FieldKind::Inlines))),
        BlockSchema::new(block_types::QUOTE, "Block quote")
            .field(FieldSpec::required("content", FieldKind::Inlines)),
        BlockSchema::new(block_types::DIVIDER, "Thematic break"),
        BlockSchema::new(block_types::HTML, "Raw HTML block")
            .field(FieldSpec::required("html", FieldKind::string())),
        BlockSchema::new(block_types::UNKNOWN, "Placeholder for an unregistered component")
            .field(FieldSpec::required("component", FieldKind::string()))
            .field(FieldSpec::required("source", FieldKind::string())),
    ]
}

/// Stock `ui:*` component schemas.
pub fn ui_schemas() -> Vec<BlockSchema> {
    vec![
        BlockSchema::new(POLL, "Single or multiple choice poll")
            .field(FieldSpec::required("question", FieldKind::non_empty_string()))
            .field(FieldSpec::required(
                "options",
                FieldKind::array_min(FieldKind::non_empty_string(), 1),
            ))
            .field(FieldSpec::optional("multiple", FieldKind::Boolean).with_default(json!(false))),
        BlockSchema::new(CALLOUT, "Highlighted note")
            .field(
                FieldSpec::optional("variant", FieldKind::enumeration(&["info", "tip", "warning", "danger"]))
                    .with_default(json!("info")),
            )
            .field(FieldSpec::optional("title", FieldKind::string()))
            .field(FieldSpec::required("body", FieldKind::non_empty_string())),
        BlockSchema::new(COMPARISON, "Feature comparison table")
            .field(FieldSpec::required(
                "options",
                FieldKind::array_min(FieldKind::non_empty_string(), 2),
            ))
            .field(FieldSpec::required(
                "features",
                FieldKind::array_min(
                    FieldKind::Object(vec![
                        FieldSpec::required("name", FieldKind::non_empty_string()),
                        FieldSpec::required("values", FieldKind::array_of(FieldKind::Any)),
                    ]),
                    1,
                ),
            ))
            .refine("feature_values_match_options", feature_values_match_options),
        BlockSchema::new(EMBED, "Embedded view of another block")
            .field(FieldSpec::required("target", FieldKind::Reference))
            .field(FieldSpec::optional("caption", FieldKind::string())),
        BlockSchema::new(TABS, "Tabbed container")
            .field(FieldSpec::optional("labels", FieldKind::array_of(FieldKind::non_empty_string())))
            .container(ContainerSpec::allowing(&[
                block_types::TEXT,
                block_types::HEADING,
                block_types::LIST,
                block_types::CODE,
                block_types::QUOTE,
                CALLOUT,
                POLL,
                EMBED,
                GRID,
            ])),
        BlockSchema::new(GRID, "Column grid container")
            .field(FieldSpec::optional("columns", FieldKind::integer(Some(1), Some(6))).with_default(json!(2)))
            .field(
                FieldSpec::optional("gap", FieldKind::enumeration(&["sm", "md", "lg"])).with_default(json!("md")),
            )
            .container(ContainerSpec::allowing(&[
                block_types::TEXT,
                block_types::HEADING,
                CALLOUT,
                POLL,
                EMBED,
                COMPARISON,
            ])),
    ]
}

/// Every feature row must carry exactly one value per option.
fn feature_values_match_options(data: &Map<String, Value>) -> Result<(), Violation> {
    let options = data.get("options").and_then(Value::as_array).map_or(0, Vec::len);
    let features = data.get("features").and_then(Value::as_array);
    for (i, feature) in features.into_iter().flatten().enumerate() {
        let values = feature.get("values").and_then(Value::as_array).map_or(0, Vec::len);
        if values != options {
            return Err(Violation::new(
                format!("features[{i}].values"),
                format!("feature value count ({values}) must equal option count ({options})"),
            ));
        }
    }
    Ok(())
}
