// Filter definitions -> dashboard parameters and SQL template-tag bindings
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

use super::metabase::{DashboardParameter, TemplateTag};
use super::spec::{FilterDef, FilterType, QueryDef, slug};
use crate::error::MappingError;

// `{{name}}`; snippets (`{{snippet: x}}`) and card refs (`{{#12}}`) never match.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid tag pattern"));

/// Template-tag name a filter binds to inside SQL: the filter id with case
/// kept and every character outside `[A-Za-z0-9_]` replaced by `_`.
pub fn tag_name(filter_id: &str) -> String {
    let name: String = filter_id
        .trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect();
    // tags cannot start with a digit
    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name
    }
}

/// Every distinct template tag referenced in the SQL text, sorted.
pub fn scan_tags(sql: &str) -> BTreeSet<String> {
    TAG_PATTERN
        .captures_iter(sql)
        .map(|caps| caps[1].to_string())
        .collect()
}

impl FilterType {
    pub fn parameter_type(&self) -> &'static str {
        match self {
            FilterType::DateRangePreset => "date/all-options",
            FilterType::MultiSelect | FilterType::SingleSelect => "string/=",
            FilterType::Text => "string/contains",
            FilterType::Number => "number/=",
        }
    }

    pub fn tag_type(&self) -> &'static str {
        match self {
            FilterType::DateRangePreset => "date",
            FilterType::Number => "number",
            _ => "text",
        }
    }
}

/// `"all"` and null mean "no default".
fn effective_default(filter: &FilterDef) -> Option<Value> {
    match &filter.default {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s == "all" => None,
        Some(other) => Some(other.clone()),
    }
}

pub fn to_parameter(filter: &FilterDef) -> Result<DashboardParameter, MappingError> {
    let kind = filter
        .filter_type()
        .map_err(|reason| MappingError::new(&filter.id, reason))?;
    let (values_source_type, values_source_config) = if filter.options.is_empty() {
        (None, None)
    } else {
        let values: Vec<Value> = filter
            .options
            .iter()
            .map(|option| match option {
                Value::Object(obj) => obj.get("value").cloned().unwrap_or(Value::Null),
                other => other.clone(),
            })
            .collect();
        (Some("static-list".to_string()), Some(json!({ "values": values })))
    };

    Ok(DashboardParameter {
        id: filter.id.clone(),
        name: filter.display_name().to_string(),
        slug: slug(&filter.id),
        kind: kind.parameter_type().to_string(),
        default: effective_default(filter),
        values_source_type,
        values_source_config,
    })
}

pub fn to_template_tag(filter: &FilterDef) -> Result<TemplateTag, MappingError> {
    let kind = filter
        .filter_type()
        .map_err(|reason| MappingError::new(&filter.id, reason))?;
    let name = tag_name(&filter.id);
    Ok(TemplateTag {
        id: format!("tag-{}", name),
        name,
        display_name: filter.display_name().to_string(),
        kind: kind.tag_type().to_string(),
        default: effective_default(filter),
    })
}

/// Which filters each query references, derived from its SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterBindings {
    /// query id -> (tag -> filter id)
    by_query: BTreeMap<String, BTreeMap<String, String>>,
    /// query id -> tags with no declared filter
    unresolved: BTreeMap<String, BTreeSet<String>>,
    /// (tag, bound filter id, shadowed filter id)
    collisions: Vec<(String, String, String)>,
}

impl FilterBindings {
    pub fn build(filters: &[FilterDef], queries: &BTreeMap<String, QueryDef>) -> Self {
        let mut bindings = Self::default();
        let mut tag_to_filter: BTreeMap<String, &str> = BTreeMap::new();
        for filter in filters.iter().filter(|f| !f.id.is_empty()) {
            let tag = tag_name(&filter.id);
            match tag_to_filter.get(&tag) {
                Some(first) if *first != filter.id => {
                    bindings.collisions.push((tag, first.to_string(), filter.id.clone()))
                }
                Some(_) => {}
                None => {
                    tag_to_filter.insert(tag, filter.id.as_str());
                }
            }
        }

        for (query_id, query) in queries {
            let Some(sql) = query.sql_text() else { continue };
            for tag in scan_tags(sql) {
                match tag_to_filter.get(&tag) {
                    Some(filter_id) => {
                        bindings
                            .by_query
                            .entry(query_id.clone())
                            .or_default()
                            .insert(tag, filter_id.to_string());
                    }
                    None => {
                        bindings.unresolved.entry(query_id.clone()).or_default().insert(tag);
                    }
                }
            }
        }
        bindings
    }

    /// (tag, filter id) pairs bound in one query.
    pub fn for_query(&self, query_id: &str) -> impl Iterator<Item = (&str, &str)> {
        self.by_query
            .get(query_id)
            .into_iter()
            .flat_map(|tags| tags.iter().map(|(tag, filter)| (tag.as_str(), filter.as_str())))
    }

    pub fn is_referenced(&self, filter_id: &str) -> bool {
        self.by_query
            .values()
            .any(|tags| tags.values().any(|f| f == filter_id))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.unresolved
            .iter()
            .flat_map(|(query, tags)| tags.iter().map(move |tag| (query.as_str(), tag.as_str())))
    }

    /// Distinct filter ids that map to the same tag. The first one wins.
    pub fn collisions(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.collisions
            .iter()
            .map(|(tag, first, second)| (tag.as_str(), first.as_str(), second.as_str()))
    }

    /// Template tags to register on the native query for `query_id`.
    pub fn template_tags(
        &self,
        query_id: &str,
        filters: &[FilterDef],
    ) -> Result<BTreeMap<String, TemplateTag>, MappingError> {
        let mut tags = BTreeMap::new();
        for (tag, filter_id) in self.for_query(query_id) {
            if let Some(filter) = filters.iter().find(|f| f.id == filter_id) {
                tags.insert(tag.to_string(), to_template_tag(filter)?);
            }
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(id: &str, kind: &str) -> FilterDef {
        FilterDef {
            id: id.to_string(),
            label: Some(format!("{} label", id)),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn queries(entries: &[(&str, &str)]) -> BTreeMap<String, QueryDef> {
        entries
            .iter()
            .map(|(id, sql)| {
                (
                    id.to_string(),
                    QueryDef {
                        sql: Some(sql.to_string()),
                        file: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_scan_tags() {
        let sql = "SELECT * FROM t WHERE 1=1 [[AND d = {{ filter_date }}]] [[AND r = {{region}}]] \
                   {{snippet: base}} {{#42}} {{region}}";
        let tags: Vec<_> = scan_tags(sql).into_iter().collect();
        assert_eq!(tags, vec!["filter_date", "region"]);
    }

    #[test]
    fn test_tag_name_keeps_case() {
        assert_eq!(tag_name("filter_date"), "filter_date");
        assert_eq!(tag_name("Region"), "Region");
        assert_eq!(tag_name("Region-Code"), "Region_Code");
        assert_eq!(tag_name("7day"), "_7day");
    }

    #[test]
    fn test_mixed_case_filter_binds_its_tag() {
        let filters = vec![filter("Region", "text")];
        let queries = queries(&[("sales", "SELECT * FROM s WHERE region = {{Region}}")]);
        let bindings = FilterBindings::build(&filters, &queries);

        assert!(bindings.is_referenced("Region"));
        assert_eq!(bindings.unresolved().count(), 0);
        assert_eq!(to_parameter(&filters[0]).unwrap().slug, "region");
        assert!(bindings.template_tags("sales", &filters).unwrap().contains_key("Region"));
    }

    #[test]
    fn test_ids_sharing_a_tag_are_collisions() {
        let filters = vec![filter("a-b", "text"), filter("a_b", "text"), filter("a_b", "text")];
        let queries = queries(&[("q", "SELECT * FROM t WHERE {{a_b}}")]);
        let bindings = FilterBindings::build(&filters, &queries);

        assert_eq!(bindings.collisions().collect::<Vec<_>>(), vec![("a_b", "a-b", "a_b")]);
        assert_eq!(bindings.for_query("q").collect::<Vec<_>>(), vec![("a_b", "a-b")]);
    }

    #[test]
    fn test_parameter_mapping() {
        let mut date = filter("filter_date", "date_range_preset");
        date.default = Some(json!("past30days"));
        let param = to_parameter(&date).unwrap();
        assert_eq!(param.kind, "date/all-options");
        assert_eq!(param.default, Some(json!("past30days")));
        assert_eq!(param.slug, "filter_date");

        let mut region = filter("region", "multi_select");
        region.default = Some(json!("all"));
        region.options = vec![json!({"value": "EU", "label": "Europe"}), json!("US")];
        let param = to_parameter(&region).unwrap();
        assert_eq!(param.kind, "string/=");
        assert_eq!(param.default, None);
        assert_eq!(param.values_source_type.as_deref(), Some("static-list"));
        assert_eq!(param.values_source_config, Some(json!({"values": ["EU", "US"]})));

        assert!(to_parameter(&filter("x", "slider")).is_err());
    }

    #[test]
    fn test_bindings_adjacency() {
        let filters = vec![filter("filter_date", "date_range_preset"), filter("region", "text")];
        let queries = queries(&[
            ("revenue", "SELECT sum(x) FROM s WHERE {{filter_date}}"),
            ("orders", "SELECT * FROM o WHERE {{filter_date}} AND {{channel}}"),
        ]);
        let bindings = FilterBindings::build(&filters, &queries);

        assert_eq!(
            bindings.for_query("revenue").collect::<Vec<_>>(),
            vec![("filter_date", "filter_date")]
        );
        assert!(bindings.is_referenced("filter_date"));
        assert!(!bindings.is_referenced("region"));
        assert_eq!(bindings.unresolved().collect::<Vec<_>>(), vec![("orders", "channel")]);

        let tags = bindings.template_tags("revenue", &filters).unwrap();
        assert_eq!(tags["filter_date"].kind, "date");
        assert_eq!(tags["filter_date"].display_name, "filter_date label");
    }
}
