// Application layer - use cases and the ports they depend on
pub mod connection_service;
pub mod connection_store;
pub mod dashboard_provisioner;
pub mod dashboard_service;
pub mod metabase_api;
pub mod query_provisioner;
pub mod session_manager;
