// Dashboard spec document model
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::grid::GridRect;

pub const SPEC_COLUMNS: i64 = 12;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Spec {
    pub meta: Option<Meta>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub filters: Filters,
    pub sections: Option<Vec<Section>>,
    #[serde(default)]
    pub queries: BTreeMap<String, QueryDef>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Meta {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Layout {
    #[serde(default = "default_columns")]
    pub columns: i64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            columns: SPEC_COLUMNS,
        }
    }
}

fn default_columns() -> i64 {
    SPEC_COLUMNS
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Filters {
    #[serde(default)]
    pub items: Vec<FilterDef>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterDef {
    #[serde(default)]
    pub id: String,
    pub label: Option<String>,
    #[serde(rename = "type", default = "default_filter_kind")]
    pub kind: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Vec<Value>,
}

fn default_filter_kind() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Section {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    #[serde(default = "GridRect::full_section")]
    pub position: GridRect,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Component {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub position: Option<ComponentPosition>,
    #[serde(default)]
    pub config: Map<String, Value>,
    pub query_id: Option<String>,
}

/// Either an absolute rectangle or an auto-flow slot inside the section.
/// Anything else is kept as `Unrecognized` and reported per component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ComponentPosition {
    Absolute(GridRect),
    Flow(FlowPosition),
    Unrecognized(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlowPosition {
    pub order: i64,
    pub width: i64,
    #[serde(default)]
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryDef {
    pub sql: Option<String>,
    pub file: Option<String>,
}

impl QueryDef {
    /// Inline SQL, if any non-blank text was given.
    pub fn sql_text(&self) -> Option<&str> {
        self.sql.as_deref().filter(|sql| !sql.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    MetricCard,
    MetricCardWithStatus,
    AreaChart,
    LineChart,
    BarChart,
    HorizontalFunnel,
    DonutChart,
    DataTable,
    ChoroplethMap,
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric_card" => Ok(Self::MetricCard),
            "metric_card_with_status" => Ok(Self::MetricCardWithStatus),
            "area_chart" => Ok(Self::AreaChart),
            "line_chart" => Ok(Self::LineChart),
            "bar_chart" => Ok(Self::BarChart),
            "horizontal_funnel" => Ok(Self::HorizontalFunnel),
            "donut_chart" => Ok(Self::DonutChart),
            "data_table" => Ok(Self::DataTable),
            "choropleth_map" => Ok(Self::ChoroplethMap),
            other => Err(format!("unsupported component type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    DateRangePreset,
    MultiSelect,
    SingleSelect,
    Text,
    Number,
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_range_preset" => Ok(Self::DateRangePreset),
            "multi_select" => Ok(Self::MultiSelect),
            "single_select" => Ok(Self::SingleSelect),
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            other => Err(format!("unsupported filter type '{}'", other)),
        }
    }
}

impl Spec {
    pub fn title(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn description(&self) -> &str {
        self.meta
            .as_ref()
            .and_then(|m| m.description.as_deref())
            .unwrap_or("")
    }

    pub fn sections(&self) -> &[Section] {
        self.sections.as_deref().unwrap_or(&[])
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.sections().iter().flat_map(|s| s.components.iter())
    }

    /// Stable identity of the dashboard across runs: `meta.id`, or the
    /// slugged title when no id is given.
    pub fn dashboard_id(&self) -> String {
        let explicit = self
            .meta
            .as_ref()
            .and_then(|m| m.id.as_deref())
            .filter(|id| !id.trim().is_empty());
        match explicit {
            Some(id) => id.trim().to_string(),
            None => slug(self.title().unwrap_or("untitled")),
        }
    }
}

impl Component {
    pub fn component_type(&self) -> Result<ComponentType, String> {
        self.kind.parse()
    }

    pub fn title(&self) -> String {
        self.config
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

impl FilterDef {
    pub fn filter_type(&self) -> Result<FilterType, String> {
        self.kind.parse()
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Lowercase, with every run of characters outside `[a-z0-9_]` folded to `_`.
pub fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out
}
