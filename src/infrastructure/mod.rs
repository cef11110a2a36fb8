// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod crypto;
pub mod metabase_client;
pub mod sqlite_store;
