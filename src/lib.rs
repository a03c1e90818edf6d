//! # redshift-plugin
//!
//! Redshift datasource plugin for a low-code host runtime: SQL execution and
//! schema introspection over the PostgreSQL wire protocol.
//!
//! The plugin is thin glue by design. Protocol work is delegated to
//! `tokio-postgres`; pooling, retries, and scheduling belong to the host.
//! Each host operation validates its configuration, opens exactly one
//! connection, runs exactly one statement, maps the rows, and releases the
//! connection on every exit path.
//!
//! # Operations
//!
//! - **execute** - run the action's SQL with prepared-statement parameters,
//!   return rows with normalized column names
//! - **metadata** - introspect one schema's tables and columns via
//!   `pg_table_def`
//! - **test** - short-timeout connectivity check (`SELECT NOW()`)
//! - **get_request** - echo the raw statement for audit logging
//! - **dynamic_properties** - declare which action fields the host templates
//!
//! # Quick start
//!
//! ```rust,ignore
//! use redshift_plugin::prelude::*;
//!
//! let plugin = RedshiftPlugin::new();
//!
//! let config: DatasourceConfiguration = serde_json::from_value(serde_json::json!({
//!     "endpoint": {"host": "cluster.abc.us-east-1.redshift.amazonaws.com"},
//!     "authentication": {
//!         "username": "admin",
//!         "password": "secret",
//!         "database": "analytics"
//!     },
//!     "ssl_mode": "require"
//! }))?;
//!
//! plugin.test(&config).await?;
//! let schema = plugin.metadata(&config).await?;
//! ```
//!
//! # Security note
//!
//! `ssl_mode: require` encrypts the session but does **not** verify the
//! server certificate (see [`config::SslMode`]). Verified TLS is a tracked
//! follow-up.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod plugin;
pub mod schema;
pub mod types;
pub mod value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        ActionConfiguration, Authentication, DatasourceConfiguration, Endpoint, ExecutionContext,
        PluginExecutionProps, SslMode,
    };
    pub use crate::connection::ConnectionHooks;
    pub use crate::error::{PluginError, Result};
    pub use crate::plugin::{
        DatasourcePlugin, ExecutionOutput, MetadataOutput, PluginSpec, RedshiftPlugin,
    };
    pub use crate::schema::{Column, DbSchema, Table};
    pub use crate::types::SensitiveString;
    pub use crate::value::{normalize_output, Row, Value};
}

pub use error::{PluginError, Result};
pub use plugin::{DatasourcePlugin, RedshiftPlugin};

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _plugin = RedshiftPlugin::new();
        let _value = Value::Int64(42);
        let _mode = SslMode::Require;
        let _hooks = ConnectionHooks::new();
    }
}
