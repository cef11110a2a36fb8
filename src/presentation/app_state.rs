// Application state for HTTP handlers
use crate::application::connection_service::ConnectionService;
use crate::application::dashboard_service::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub connection_service: ConnectionService,
    pub dashboard_service: DashboardService,
}
