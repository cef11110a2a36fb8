// Dashboard service - validate specs and provision them through a connection
use serde::Deserialize;
use serde_json::Value;

use crate::application::dashboard_provisioner::provision_dashboard;
use crate::application::session_manager::SessionManager;
use crate::domain::connection::default_connection_name;
use crate::domain::provision::{ProvisionResult, ProvisionTarget};
use crate::domain::spec::Spec;
use crate::domain::validation::{ValidationResult, validate};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CreateDashboardRequest {
    pub spec: Value,
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
    pub database_id: i64,
    #[serde(default)]
    pub collection_id: Option<i64>,
}

#[derive(Clone)]
pub struct DashboardService {
    sessions: SessionManager,
}

impl DashboardService {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub fn validate(&self, raw: &Value) -> ValidationResult {
        validate(raw)
    }

    /// Validate, then provision. Validator warnings are carried into the result.
    pub async fn create_dashboard(&self, request: CreateDashboardRequest) -> AppResult<ProvisionResult> {
        let report = validate(&request.spec);
        if !report.valid {
            return Err(AppError::InvalidSpec(report.errors));
        }
        let spec: Spec =
            serde_json::from_value(request.spec).map_err(|e| AppError::InvalidSpec(vec![e.to_string()]))?;

        let target = ProvisionTarget {
            database_id: request.database_id,
            collection_id: request.collection_id,
        };
        let api = self.sessions.api(&request.connection_name).await?;

        tracing::info!(
            connection = %request.connection_name,
            dashboard = %spec.dashboard_id(),
            database_id = target.database_id,
            "provisioning dashboard"
        );
        let mut result = provision_dashboard(&api, &spec, &target).await?;

        let mut warnings = report.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_manager::tests::{ScriptedTransport, cipher, store_with};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn service(transport: Arc<ScriptedTransport>) -> DashboardService {
        let cipher = cipher();
        let store = store_with("default", "pw", &cipher);
        DashboardService::new(SessionManager::new(store, cipher, transport, chrono::Duration::hours(1)))
    }

    #[test]
    fn test_request_defaults() {
        let request: CreateDashboardRequest =
            serde_json::from_value(json!({"spec": {}, "database_id": 2})).unwrap();
        assert_eq!(request.connection_name, "default");
        assert_eq!(request.collection_id, None);
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_before_login() {
        let transport = Arc::new(ScriptedTransport::default());
        let service = service(transport.clone());

        let err = service
            .create_dashboard(CreateDashboardRequest {
                spec: json!({"meta": {}, "sections": []}),
                connection_name: "default".to_string(),
                database_id: 1,
                collection_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidSpec(ref errors) if errors.len() >= 2));
        assert_eq!(transport.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let service = service(Arc::new(ScriptedTransport::default()));

        let err = service
            .create_dashboard(CreateDashboardRequest {
                spec: json!({
                    "meta": {"title": "T"},
                    "sections": [{"id": "s", "components": [{"id": "c", "type": "data_table", "query_id": "q"}]}],
                    "queries": {"q": {"sql": "SELECT count(*) FROM t"}}
                }),
                connection_name: "staging".to_string(),
                database_id: 1,
                collection_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ConnectionNotFound(ref name) if name == "staging"));
    }
}
