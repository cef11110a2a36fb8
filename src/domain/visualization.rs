// Component type -> Metabase display type and visualization settings
use serde_json::{Map, Value, json};

use super::spec::{Component, ComponentType};
use crate::error::MappingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Scalar,
    Area,
    Line,
    Bar,
    Funnel,
    Pie,
    Table,
    Map,
}

impl Display {
    pub fn as_str(&self) -> &'static str {
        match self {
            Display::Scalar => "scalar",
            Display::Area => "area",
            Display::Line => "line",
            Display::Bar => "bar",
            Display::Funnel => "funnel",
            Display::Pie => "pie",
            Display::Table => "table",
            Display::Map => "map",
        }
    }
}

impl From<ComponentType> for Display {
    fn from(kind: ComponentType) -> Self {
        match kind {
            ComponentType::MetricCard | ComponentType::MetricCardWithStatus => Display::Scalar,
            ComponentType::AreaChart => Display::Area,
            ComponentType::LineChart => Display::Line,
            ComponentType::BarChart => Display::Bar,
            ComponentType::HorizontalFunnel => Display::Funnel,
            ComponentType::DonutChart => Display::Pie,
            ComponentType::DataTable => Display::Table,
            ComponentType::ChoroplethMap => Display::Map,
        }
    }
}

/// Display type plus settings for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct Visualization {
    pub display: Display,
    pub settings: Map<String, Value>,
}

pub fn map_component(component: &Component) -> Result<Visualization, MappingError> {
    let kind = component
        .component_type()
        .map_err(|reason| MappingError::new(&component.id, reason))?;
    let config = &component.config;

    let mut settings = match kind {
        ComponentType::MetricCard | ComponentType::MetricCardWithStatus => scalar_settings(config),
        ComponentType::AreaChart | ComponentType::LineChart | ComponentType::BarChart => {
            graph_settings(config)
        }
        ComponentType::HorizontalFunnel => funnel_settings(config),
        ComponentType::DonutChart => pie_settings(config),
        ComponentType::DataTable => table_settings(config),
        ComponentType::ChoroplethMap => map_settings(config),
    };
    if let Some(title) = config.get("title").and_then(Value::as_str) {
        settings.insert("card.title".into(), json!(title));
    }

    Ok(Visualization {
        display: kind.into(),
        settings,
    })
}

fn number_style(format: &str) -> Option<&'static str> {
    match format {
        "percentage" | "percent" => Some("percent"),
        "number_abbreviated" | "compact" => Some("compact"),
        "currency" => Some("currency"),
        "number" => Some("decimal"),
        _ => None,
    }
}

fn scalar_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    let field = config.get("field").and_then(Value::as_str).unwrap_or("value");
    settings.insert("scalar.field".into(), json!(field));
    if let Some(style) = config.get("format").and_then(Value::as_str).and_then(number_style) {
        settings.insert("number_style".into(), json!(style));
    }
    for key in ["prefix", "suffix"] {
        if let Some(value) = config.get(key).and_then(Value::as_str) {
            settings.insert(key.into(), json!(value));
        }
    }
    if let Some(decimals) = config.get("decimals").and_then(Value::as_i64) {
        settings.insert("decimals".into(), json!(decimals));
    }
    settings
}

fn axis(config: &Map<String, Value>, key: &str) -> Option<(Option<String>, Vec<String>)> {
    let axis = config.get(key)?.as_object()?;
    let label = axis.get("label").and_then(Value::as_str).map(str::to_string);
    let fields = match (axis.get("field"), axis.get("fields")) {
        (Some(Value::String(field)), _) => vec![field.clone()],
        (_, Some(Value::Array(fields))) => fields
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Some((label, fields))
}

fn graph_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    for (key, prefix, columns_key) in [
        ("x_axis", "graph.x_axis", "graph.dimensions"),
        ("y_axis", "graph.y_axis", "graph.metrics"),
    ] {
        if let Some((label, fields)) = axis(config, key) {
            settings.insert(format!("{}.title_text", prefix), json!(label.unwrap_or_default()));
            if !fields.is_empty() {
                settings.insert(columns_key.into(), json!(fields));
            }
        }
    }
    if let Some(stacked) = config.get("stacked").and_then(Value::as_bool) {
        let stack_type = if stacked { json!("stacked") } else { Value::Null };
        settings.insert("stackable.stack_type".into(), stack_type);
    }
    if let Some(show_legend) = config.get("show_legend").and_then(Value::as_bool) {
        settings.insert("graph.show_legend".into(), json!(show_legend));
    }
    settings
}

fn funnel_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    if let Some(step) = config.get("step_field").and_then(Value::as_str) {
        settings.insert("funnel.dimension".into(), json!(step));
    }
    if let Some(value) = config.get("value_field").and_then(Value::as_str) {
        settings.insert("funnel.metric".into(), json!(value));
    }
    settings.insert("funnel.type".into(), json!("funnel"));
    settings
}

fn pie_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    let show_legend = config.get("show_legend").and_then(Value::as_bool).unwrap_or(true);
    let show_total = config
        .get("show_center_total")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    settings.insert("pie.show_legend".into(), json!(show_legend));
    settings.insert("pie.show_total".into(), json!(show_total));
    settings
}

fn table_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    let Some(columns) = config.get("columns").and_then(Value::as_array) else {
        return settings;
    };

    let mut enabled = Vec::new();
    let mut column_settings = Map::new();
    for column in columns.iter().filter_map(Value::as_object) {
        let Some(field) = column.get("field").and_then(Value::as_str) else {
            continue;
        };
        enabled.push(json!({"name": field, "enabled": true}));

        let mut formatting = Map::new();
        if let Some(label) = column.get("label").and_then(Value::as_str) {
            formatting.insert("column_title".into(), json!(label));
        }
        if let Some(style) = column.get("format").and_then(Value::as_str).and_then(number_style) {
            formatting.insert("number_style".into(), json!(style));
        }
        if !formatting.is_empty() {
            let key = json!(["name", field]).to_string();
            column_settings.insert(key, Value::Object(formatting));
        }
    }

    settings.insert("table.columns".into(), Value::Array(enabled));
    if !column_settings.is_empty() {
        settings.insert("column_settings".into(), Value::Object(column_settings));
    }
    settings
}

fn map_settings(config: &Map<String, Value>) -> Map<String, Value> {
    let mut settings = Map::new();
    settings.insert("map.type".into(), json!("region"));
    let region = config.get("region").and_then(Value::as_str).unwrap_or("us_states");
    settings.insert("map.region".into(), json!(region));
    if let Some(dimension) = config.get("region_field").and_then(Value::as_str) {
        settings.insert("map.dimension".into(), json!(dimension));
    }
    if let Some(metric) = config.get("value_field").and_then(Value::as_str) {
        settings.insert("map.metric".into(), json!(metric));
    }
    settings
}
