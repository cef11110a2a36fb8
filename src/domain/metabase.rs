// Metabase object model, shaped as the REST API expects it
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::grid::TargetRect;

/// Variable declared inside a native query, e.g. `{{region}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateTag {
    pub id: String,
    pub name: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A native-SQL question ("card").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDefinition {
    pub name: String,
    pub display: String,
    pub dataset_query: Value,
    pub visualization_settings: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
}

impl CardDefinition {
    pub fn native(
        name: String,
        database_id: i64,
        sql: &str,
        template_tags: &BTreeMap<String, TemplateTag>,
        display: &str,
        visualization_settings: Map<String, Value>,
        collection_id: Option<i64>,
    ) -> Self {
        Self {
            name,
            display: display.to_string(),
            dataset_query: json!({
                "type": "native",
                "native": {
                    "query": sql,
                    "template-tags": template_tags,
                },
                "database": database_id,
            }),
            visualization_settings,
            collection_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardDefinition {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardParameter {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_source_config: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterMapping {
    pub parameter_id: String,
    pub card_id: i64,
    pub target: Value,
}

impl ParameterMapping {
    pub fn template_tag(parameter_id: &str, card_id: i64, tag: &str) -> Self {
        Self {
            parameter_id: parameter_id.to_string(),
            card_id,
            target: json!(["variable", ["template-tag", tag]]),
        }
    }
}

/// A card placed on a dashboard. New dashcards carry negative ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashCard {
    pub id: i64,
    pub card_id: i64,
    pub row: i64,
    pub col: i64,
    pub size_x: i64,
    pub size_y: i64,
    pub visualization_settings: Map<String, Value>,
    pub parameter_mappings: Vec<ParameterMapping>,
}

impl DashCard {
    pub fn new(id: i64, card_id: i64, rect: TargetRect, visualization_settings: Map<String, Value>) -> Self {
        Self {
            id,
            card_id,
            row: rect.row,
            col: rect.col,
            size_x: rect.size_x,
            size_y: rect.size_y,
            visualization_settings,
            parameter_mappings: Vec::new(),
        }
    }
}

/// Full replacement of a dashboard's cards and parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardLayout {
    pub name: String,
    pub description: String,
    pub dashcards: Vec<DashCard>,
    pub parameters: Vec<DashboardParameter>,
}
