//! Database bootstrap, models and queries

pub mod init;
pub mod migrations;
pub mod models;
pub mod schema_sync;
pub mod settings;
pub mod table_schemas;

pub use init::*;
pub use migrations::*;
pub use models::*;
pub use schema_sync::*;
pub use settings::*;
pub use table_schemas::*;
