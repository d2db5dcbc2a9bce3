//! Database initialization, settings and schema maintenance

pub mod init;
pub mod schema_sync;
pub mod settings;
pub mod table_schemas;

pub use init::*;
pub use schema_sync::*;
pub use settings::*;
pub use table_schemas::*;
