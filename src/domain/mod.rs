// Domain layer - spec model, mapping rules and result types
pub mod connection;
pub mod filters;
pub mod grid;
pub mod metabase;
pub mod provision;
pub mod spec;
pub mod validation;
pub mod visualization;
