// Static spec validation: structural, referential and layout checks
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::filters::{FilterBindings, tag_name};
use super::grid::{GridRect, UNRECOGNIZED_POSITION, layout_section};
use super::spec::{
    Component, ComponentPosition, ComponentType, FilterDef, Meta, QueryDef, SPEC_COLUMNS, Section, Spec,
};

static LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(limit|top|fetch\s+first)\b").expect("valid limit pattern"));
static AGGREGATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bgroup\s+by\b|\b(count|sum|avg|min|max)\s*\(").expect("valid aggregate pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: ValidationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub title: String,
    pub description: String,
    pub sections_count: usize,
    pub components_count: usize,
    pub queries_count: usize,
    pub filters_count: usize,
}

/// Validate a raw spec payload. Never fails; problems land in `errors`.
///
/// A document that does not deserialize as a whole is read part by part,
/// so a malformed item is reported alongside every other finding.
pub fn validate(raw: &Value) -> ValidationResult {
    match Spec::deserialize(raw) {
        Ok(spec) => validate_spec(&spec),
        Err(_) => {
            let mut errors = Vec::new();
            let spec = read_leniently(raw, &mut errors);
            let mut result = validate_spec(&spec);
            errors.append(&mut result.errors);
            ValidationResult {
                valid: false,
                errors,
                warnings: result.warnings,
                summary: raw_summary(raw),
            }
        }
    }
}

pub fn validate_spec(spec: &Spec) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_meta(spec, &mut errors);
    check_unique_ids(spec, &mut errors);
    check_components(spec, &mut errors, &mut warnings);
    check_layout(spec, &mut errors, &mut warnings);
    check_queries(spec, &mut errors, &mut warnings);

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
        summary: summarize(spec),
    }
}

fn summarize(spec: &Spec) -> ValidationSummary {
    let referenced: BTreeSet<&str> = spec
        .components()
        .filter_map(|c| c.query_id.as_deref())
        .collect();
    ValidationSummary {
        title: spec.title().unwrap_or("Untitled").to_string(),
        description: spec.description().to_string(),
        sections_count: spec.sections().len(),
        components_count: spec.components().count(),
        queries_count: referenced.len(),
        filters_count: spec.filters.items.len(),
    }
}

/// Best-effort counts for documents that do not even parse.
fn raw_summary(raw: &Value) -> ValidationSummary {
    let sections = raw.get("sections").and_then(Value::as_array);
    let components = || {
        sections
            .into_iter()
            .flatten()
            .filter_map(|s| s.get("components").and_then(Value::as_array))
            .flatten()
    };
    let referenced: BTreeSet<&str> = components()
        .filter_map(|c| c.get("query_id").and_then(Value::as_str))
        .collect();
    ValidationSummary {
        title: raw
            .pointer("/meta/title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
            .to_string(),
        description: raw
            .pointer("/meta/description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        sections_count: sections.map_or(0, Vec::len),
        components_count: components().count(),
        queries_count: referenced.len(),
        filters_count: raw
            .pointer("/filters/items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
    }
}

/// Rebuild as much of the document as deserializes, one item at a time.
/// Items that fail keep whatever string fields they carry.
fn read_leniently(raw: &Value, errors: &mut Vec<String>) -> Spec {
    let mut spec = Spec::default();
    if !raw.is_object() {
        errors.push("invalid spec document: expected a JSON object".to_string());
        return spec;
    }

    if let Some(meta) = raw.get("meta").filter(|v| !v.is_null()) {
        spec.meta = Some(parse_part(meta, "meta", errors).unwrap_or_else(|| Meta {
            id: text(meta, "id"),
            title: text(meta, "title"),
            description: text(meta, "description"),
        }));
    }
    if let Some(layout) = raw.get("layout") {
        if let Some(layout) = parse_part(layout, "layout", errors) {
            spec.layout = layout;
        }
    }
    if let Some(filters) = raw.get("filters") {
        if !filters.is_object() {
            errors.push("invalid spec document: filters must be an object".to_string());
        } else if let Some(items) = filters.get("items") {
            spec.filters.items = list(items, "filters.items", errors)
                .iter()
                .map(|item| read_filter(item, errors))
                .collect();
        }
    }
    if let Some(sections) = raw.get("sections").filter(|v| !v.is_null()) {
        spec.sections = Some(
            list(sections, "sections", errors)
                .iter()
                .map(|section| read_section(section, errors))
                .collect(),
        );
    }
    if let Some(queries) = raw.get("queries") {
        match queries.as_object() {
            Some(queries) => {
                for (query_id, query) in queries {
                    let parsed = parse_part(query, &format!("query '{}'", query_id), errors).unwrap_or_else(|| {
                        QueryDef {
                            sql: text(query, "sql"),
                            file: text(query, "file"),
                        }
                    });
                    spec.queries.insert(query_id.clone(), parsed);
                }
            }
            None => errors.push("invalid spec document: queries must be an object keyed by query id".to_string()),
        }
    }
    spec
}

fn read_filter(value: &Value, errors: &mut Vec<String>) -> FilterDef {
    let id = text(value, "id").unwrap_or_default();
    parse_part(value, &format!("filter '{}'", id), errors).unwrap_or_else(|| FilterDef {
        label: text(value, "label"),
        kind: text(value, "type").unwrap_or_else(|| "text".to_string()),
        id,
        ..FilterDef::default()
    })
}

fn read_section(value: &Value, errors: &mut Vec<String>) -> Section {
    if let Ok(section) = Section::deserialize(value) {
        return section;
    }
    let id = text_field(value, "id", "section", errors).unwrap_or_default();
    let what = format!("section '{}'", id);
    let mut section = Section {
        title: text_field(value, "title", &what, errors),
        id,
        ..Section::default()
    };
    if let Some(position) = value.get("position") {
        if let Some(rect) = parse_part(position, &format!("{} position", what), errors) {
            section.position = rect;
        }
    }
    if let Some(components) = value.get("components") {
        section.components = list(components, &format!("{} components", what), errors)
            .iter()
            .map(|component| read_component(component, errors))
            .collect();
    }
    section
}

fn read_component(value: &Value, errors: &mut Vec<String>) -> Component {
    let id = text(value, "id").unwrap_or_default();
    parse_part(value, &format!("component '{}'", id), errors).unwrap_or_else(|| Component {
        kind: text(value, "type").unwrap_or_default(),
        position: value
            .get("position")
            .and_then(|p| ComponentPosition::deserialize(p).ok()),
        config: value
            .get("config")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        query_id: text(value, "query_id"),
        id,
    })
}

fn parse_part<T: DeserializeOwned>(value: &Value, what: &str, errors: &mut Vec<String>) -> Option<T> {
    match T::deserialize(value) {
        Ok(part) => Some(part),
        Err(e) => {
            errors.push(format!("invalid spec document: {}: {}", what, e));
            None
        }
    }
}

fn list<'a>(value: &'a Value, what: &str, errors: &mut Vec<String>) -> &'a [Value] {
    match value {
        Value::Array(items) => items,
        Value::Null => &[],
        _ => {
            errors.push(format!("invalid spec document: {} must be a list", what));
            &[]
        }
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn text_field(value: &Value, key: &str, what: &str, errors: &mut Vec<String>) -> Option<String> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(format!("invalid spec document: {} {} must be a string (got {})", what, key, other));
            None
        }
    }
}

fn check_meta(spec: &Spec, errors: &mut Vec<String>) {
    if spec.meta.is_none() {
        errors.push("missing required field: meta".to_string());
    } else if spec.title().is_none() {
        errors.push("missing required field: meta.title".to_string());
    }
    match &spec.sections {
        None => errors.push("missing required field: sections".to_string()),
        Some(sections) if sections.is_empty() => {
            errors.push("sections must contain at least one section".to_string())
        }
        Some(_) => {}
    }
    if spec.layout.columns != SPEC_COLUMNS {
        errors.push(format!(
            "layout.columns must be {} (got {})",
            SPEC_COLUMNS, spec.layout.columns
        ));
    }
}

fn check_unique_ids(spec: &Spec, errors: &mut Vec<String>) {
    let mut entries: Vec<(&'static str, &str)> = Vec::new();
    for section in spec.sections() {
        entries.push(("section", section.id.as_str()));
        for component in &section.components {
            entries.push(("component", component.id.as_str()));
        }
    }
    for filter in &spec.filters.items {
        entries.push(("filter", filter.id.as_str()));
    }
    for query_id in spec.queries.keys() {
        entries.push(("query", query_id.as_str()));
    }

    let mut seen: BTreeMap<&str, Vec<&'static str>> = BTreeMap::new();
    for (kind, id) in entries {
        if id.trim().is_empty() {
            errors.push(format!("{} is missing an id", kind));
        } else {
            seen.entry(id).or_default().push(kind);
        }
    }
    for (id, kinds) in seen {
        if kinds.len() > 1 {
            errors.push(format!("duplicate id '{}' ({})", id, kinds.join(", ")));
        }
    }
}

fn check_components(spec: &Spec, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for section in spec.sections() {
        if section.components.is_empty() {
            warnings.push(format!("section '{}' has no components", section.id));
        }
        for component in &section.components {
            if let Err(reason) = component.component_type() {
                errors.push(format!("component '{}': {}", component.id, reason));
            }
            match component.query_id.as_deref() {
                None => errors.push(format!("component '{}' does not reference a query", component.id)),
                Some(query_id) if !spec.queries.contains_key(query_id) => errors.push(format!(
                    "component '{}' references undefined query: {}",
                    component.id, query_id
                )),
                Some(_) => {}
            }
        }
    }
    for filter in &spec.filters.items {
        if let Err(reason) = filter.filter_type() {
            errors.push(format!("filter '{}': {}", filter.id, reason));
        }
    }
}

fn check_layout(spec: &Spec, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for section in spec.sections() {
        if let Some(reason) = section.position.bounds_violation() {
            errors.push(format!("section '{}' position invalid: {}", section.id, reason));
            continue;
        }
        let unrecognized: Vec<&str> = section
            .components
            .iter()
            .filter(|c| matches!(c.position, Some(ComponentPosition::Unrecognized(_))))
            .map(|c| c.id.as_str())
            .collect();
        if !unrecognized.is_empty() {
            for id in unrecognized {
                errors.push(format!("component '{}' position invalid: {}", id, UNRECOGNIZED_POSITION));
            }
            continue;
        }
        let placed = match layout_section(section) {
            Ok(placed) => placed,
            Err(e) => {
                errors.push(format!("component '{}' position invalid: {}", e.id, e.reason));
                continue;
            }
        };
        for item in &placed {
            if let Some(reason) = item.rect.bounds_violation() {
                errors.push(format!("component '{}' position invalid: {}", item.component.id, reason));
            }
        }
        let rects: Vec<(&str, GridRect)> = placed
            .iter()
            .map(|p| (p.component.id.as_str(), p.rect))
            .collect();
        for (i, (a_id, a)) in rects.iter().enumerate() {
            for (b_id, b) in &rects[i + 1..] {
                if a.overlaps(b) {
                    warnings.push(format!(
                        "components '{}' and '{}' overlap in section '{}'",
                        a_id, b_id, section.id
                    ));
                }
            }
        }
    }
}

fn check_queries(spec: &Spec, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    for (query_id, query) in &spec.queries {
        if query.sql_text().is_none() {
            match &query.file {
                Some(file) => warnings.push(format!(
                    "query '{}' references external file '{}' - SQL must be inline",
                    query_id, file
                )),
                None => warnings.push(format!("query '{}' has no SQL", query_id)),
            }
        }
    }

    let bindings = FilterBindings::build(&spec.filters.items, &spec.queries);
    for (tag, first, second) in bindings.collisions() {
        errors.push(format!(
            "filters '{}' and '{}' both bind template tag '{{{{{}}}}}'",
            first, second, tag
        ));
    }
    for (query_id, tag) in bindings.unresolved() {
        let near = spec
            .filters
            .items
            .iter()
            .map(|f| (f.id.as_str(), tag_name(&f.id)))
            .find(|(_, name)| name.eq_ignore_ascii_case(tag));
        match near {
            Some((filter_id, name)) => errors.push(format!(
                "query '{}' references template tag '{{{{{}}}}}' with no matching filter; filter '{}' binds '{{{{{}}}}}'",
                query_id, tag, filter_id, name
            )),
            None => errors.push(format!(
                "query '{}' references template tag '{{{{{}}}}}' with no matching filter",
                query_id, tag
            )),
        }
    }
    for filter in &spec.filters.items {
        if !filter.id.is_empty() && !bindings.is_referenced(&filter.id) {
            warnings.push(format!("filter '{}' is never referenced by any query", filter.id));
        }
    }

    let mut flagged = BTreeSet::new();
    for component in spec.components() {
        if component.component_type() != Ok(ComponentType::DataTable) {
            continue;
        }
        let Some(query_id) = component.query_id.as_deref() else { continue };
        let Some(sql) = spec.queries.get(query_id).and_then(|q| q.sql_text()) else {
            continue;
        };
        if !LIMIT_PATTERN.is_match(sql) && !AGGREGATE_PATTERN.is_match(sql) && flagged.insert(query_id) {
            warnings.push(format!(
                "query '{}' feeds data table '{}' without a row limit or aggregation",
                query_id, component.id
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_spec() -> Value {
        json!({
            "meta": {"id": "sales", "title": "Sales Overview"},
            "layout": {"columns": 12},
            "filters": {"items": [
                {"id": "filter_date", "label": "Date", "type": "date_range_preset", "default": "past30days"}
            ]},
            "sections": [{
                "id": "kpis",
                "title": "KPIs",
                "position": {"row": 0, "col": 0, "width": 12, "height": 2},
                "components": [
                    {"id": "revenue_card", "type": "metric_card", "position": {"order": 1, "width": 3}, "query_id": "revenue"},
                    {"id": "orders_card", "type": "metric_card", "position": {"order": 2, "width": 3}, "query_id": "orders"}
                ]
            }],
            "queries": {
                "revenue": {"sql": "SELECT sum(amount) AS value FROM sales WHERE {{filter_date}}"},
                "orders": {"sql": "SELECT count(*) AS value FROM orders"}
            }
        })
    }

    #[test]
    fn test_valid_spec() {
        let result = validate(&base_spec());
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.summary.title, "Sales Overview");
        assert_eq!(result.summary.sections_count, 1);
        assert_eq!(result.summary.components_count, 2);
        assert_eq!(result.summary.queries_count, 2);
    }

    #[test]
    fn test_empty_document() {
        let result = validate(&json!({"meta": {}, "sections": []}));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("meta.title")));
        assert!(result.errors.iter().any(|e| e.contains("at least one section")));
        assert_eq!(result.summary.sections_count, 0);
        assert_eq!(result.summary.components_count, 0);
        assert_eq!(result.summary.queries_count, 0);
    }

    #[test]
    fn test_duplicate_ids_across_kinds() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][1]["id"] = json!("kpis");
        spec["filters"]["items"][0]["id"] = json!("revenue");
        spec["queries"]["revenue"]["sql"] = json!("SELECT sum(amount) FROM sales WHERE {{revenue}}");

        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.contains(&"duplicate id 'kpis' (section, component)".to_string()));
        assert!(result.errors.contains(&"duplicate id 'revenue' (filter, query)".to_string()));
    }

    #[test]
    fn test_undefined_query() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][0]["query_id"] = json!("missing");
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result
            .errors
            .contains(&"component 'revenue_card' references undefined query: missing".to_string()));
    }

    #[test]
    fn test_unknown_component_type() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][0]["type"] = json!("gauge");
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("unsupported component type 'gauge'")));
    }

    #[test]
    fn test_position_bounds() {
        let mut spec = base_spec();
        spec["sections"][0]["position"] = json!({"row": 0, "col": 4, "width": 10, "height": 2});
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("section 'kpis' position invalid")));

        let mut spec = base_spec();
        spec["sections"][0]["components"][0]["position"] = json!({"order": 1, "width": 0});
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("revenue_card")));

        let mut spec = base_spec();
        spec["sections"][0]["components"][0]["position"] =
            json!({"row": 0, "col": 9, "width": 4, "height": 1});
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("exceeds 12 columns")));
    }

    #[test]
    fn test_unreferenced_filter_warns() {
        let mut spec = base_spec();
        spec["queries"]["revenue"]["sql"] = json!("SELECT sum(amount) AS value FROM sales");
        let result = validate(&spec);
        assert!(result.valid);
        assert!(result
            .warnings
            .contains(&"filter 'filter_date' is never referenced by any query".to_string()));
    }

    #[test]
    fn test_undeclared_template_tag_is_error() {
        let mut spec = base_spec();
        spec["queries"]["orders"]["sql"] = json!("SELECT count(*) FROM orders WHERE {{channel}}");
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("{{channel}}")));
    }

    #[test]
    fn test_mixed_case_filter_id_matches_its_tag() {
        let mut spec = base_spec();
        spec["filters"]["items"][0]["id"] = json!("Region");
        spec["queries"]["revenue"]["sql"] = json!("SELECT sum(amount) AS value FROM sales WHERE {{Region}}");
        let result = validate(&spec);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);

        spec["queries"]["revenue"]["sql"] = json!("SELECT sum(amount) AS value FROM sales WHERE {{region}}");
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors[0].ends_with("filter 'Region' binds '{{Region}}'"), "{:?}", result.errors);
    }

    #[test]
    fn test_filter_ids_sharing_a_tag_are_rejected() {
        let mut spec = base_spec();
        spec["filters"]["items"] = json!([
            {"id": "a-b", "type": "text"},
            {"id": "a_b", "type": "text"}
        ]);
        spec["queries"]["revenue"]["sql"] = json!("SELECT sum(amount) AS value FROM sales WHERE {{a_b}}");
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result
            .errors
            .contains(&"filters 'a-b' and 'a_b' both bind template tag '{{a_b}}'".to_string()));
    }

    #[test]
    fn test_unrecognized_position_reported_with_other_errors() {
        let raw = json!({
            "meta": {},
            "sections": [
                {"id": "dup", "components": [
                    {"id": "dup", "type": "gauge", "position": {"width": 6}, "query_id": "missing"}
                ]},
                {"id": "dup", "components": []}
            ],
            "queries": {}
        });
        let result = validate(&raw);
        assert!(!result.valid);
        for expected in [
            "missing required field: meta.title",
            "duplicate id 'dup' (section, component, section)",
            "component 'dup' position invalid: position must be",
            "component 'dup': unsupported component type 'gauge'",
            "component 'dup' references undefined query: missing",
        ] {
            assert!(result.errors.iter().any(|e| e.starts_with(expected)), "{} not in {:?}", expected, result.errors);
        }
    }

    #[test]
    fn test_type_errors_do_not_hide_other_findings() {
        let mut spec = base_spec();
        spec["meta"]["title"] = json!("");
        spec["sections"][0]["components"][0]["query_id"] = json!(5);
        spec["sections"][0]["components"][1]["position"] = json!({"order": 2, "width": "6"});
        spec["sections"][0]["components"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": "lost", "type": "metric_card", "query_id": "nowhere"}));

        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("invalid spec document: component 'revenue_card'"));
        assert!(result.errors.contains(&"missing required field: meta.title".to_string()));
        assert!(result
            .errors
            .iter()
            .any(|e| e.starts_with("component 'orders_card' position invalid")));
        assert!(result
            .errors
            .contains(&"component 'lost' references undefined query: nowhere".to_string()));
        assert_eq!(result.summary.components_count, 3);
    }

    #[test]
    fn test_extreme_positions_are_invalid() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][0]["position"] =
            json!({"row": 0, "col": i64::MAX, "width": 1, "height": 1});
        spec["sections"][0]["components"][1]["position"] =
            json!({"row": i64::MAX, "col": 0, "width": i64::MAX, "height": i64::MAX});
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.starts_with("component 'revenue_card' position invalid")));
        assert!(result.errors.iter().any(|e| e.starts_with("component 'orders_card' position invalid")));

        let mut spec = base_spec();
        spec["sections"][0]["position"] = json!({"row": i64::MAX, "col": 0, "width": 12, "height": i64::MAX});
        let result = validate(&spec);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.starts_with("section 'kpis' position invalid")));
    }

    #[test]
    fn test_unbounded_table_warns() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][1]["type"] = json!("data_table");
        spec["queries"]["orders"]["sql"] = json!("SELECT * FROM orders");
        let result = validate(&spec);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("without a row limit")));

        spec["queries"]["orders"]["sql"] = json!("SELECT * FROM orders LIMIT 100");
        assert!(validate(&spec).warnings.is_empty());
    }

    #[test]
    fn test_overlap_warns() {
        let mut spec = base_spec();
        spec["sections"][0]["components"][1]["position"] =
            json!({"row": 0, "col": 2, "width": 3, "height": 2});
        let result = validate(&spec);
        assert!(result.valid);
        assert!(result
            .warnings
            .contains(&"components 'revenue_card' and 'orders_card' overlap in section 'kpis'".to_string()));
    }

    #[test]
    fn test_unparseable_document_still_summarized() {
        let raw = json!({"meta": {"title": "Broken"}, "sections": [{"id": "s", "components": "nope"}]});
        let result = validate(&raw);
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("invalid spec document"));
        assert_eq!(result.summary.title, "Broken");
        assert_eq!(result.summary.sections_count, 1);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let raw = base_spec();
        assert_eq!(validate(&raw), validate(&raw));
    }
}
