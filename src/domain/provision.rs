// Provisioning outcome model
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Dashboard,
    Query,
    Card,
    Parameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
}

/// An external object created or updated during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEntity {
    pub kind: EntityKind,
    pub spec_id: String,
    pub external_id: i64,
    pub action: Action,
}

/// An item that could not be provisioned and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub kind: EntityKind,
    pub spec_id: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(kind: EntityKind, spec_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            kind,
            spec_id: spec_id.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionResult {
    pub success: bool,
    pub dashboard_id: i64,
    pub dashboard_url: String,
    pub message: String,
    pub cards_created: usize,
    pub created: Vec<CreatedEntity>,
    pub failures: Vec<ItemFailure>,
    pub warnings: Vec<String>,
}

/// Where the dashboard and its queries are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionTarget {
    pub database_id: i64,
    pub collection_id: Option<i64>,
}
