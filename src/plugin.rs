//! Host-facing plugin operations
//!
//! The façade composes the other modules into the five operations the host
//! runtime invokes: execute, metadata, test, get_request, dynamic_properties.
//! Every operation that opens a connection releases it on every exit path,
//! success or failure, before the result is handed back.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ActionConfiguration, DatasourceConfiguration, PluginExecutionProps};
use crate::connection::{self, ConnectionHooks, DEFAULT_CONNECT_TIMEOUT, TEST_CONNECT_TIMEOUT};
use crate::error::{PluginError, Result};
use crate::executor;
use crate::schema::{self, DbSchema};
use crate::value::{bind_params, decode_row, normalize_output, Row, Value};

/// Liveness statement for connectivity tests
const LIVENESS_QUERY: &str = "SELECT NOW()";

/// Action fields the host treats as dynamic/templated
const DYNAMIC_PROPERTIES: &[&str] = &["body"];

/// Result of a statement execution, rows with normalized column names
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOutput {
    /// Output rows, empty for statements that return none
    pub body: Vec<Row>,
}

impl ExecutionOutput {
    /// Output with no rows, used for empty statement bodies
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether the output carries any rows
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Result of schema introspection, in the envelope the host expects
#[derive(Debug, Clone, Serialize)]
pub struct MetadataOutput {
    /// The grouped table/column descriptor
    #[serde(rename = "dbSchema")]
    pub db_schema: DbSchema,
}

/// Plugin identity published to the host registry
#[derive(Debug, Clone, Serialize)]
pub struct PluginSpec {
    /// Plugin type identifier
    pub name: String,
    /// Crate version
    pub version: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the datasource configuration
    pub config_schema: serde_json::Value,
}

/// Operations a datasource plugin exposes to the host runtime
#[async_trait]
pub trait DatasourcePlugin: Send + Sync {
    /// Run the action's statement and return its rows
    async fn execute(&self, props: &PluginExecutionProps) -> Result<ExecutionOutput>;

    /// Introspect the datasource's table/column structure
    async fn metadata(&self, config: &DatasourceConfiguration) -> Result<MetadataOutput>;

    /// Verify the datasource is reachable; absence of an error is the signal
    async fn test(&self, config: &DatasourceConfiguration) -> Result<()>;

    /// The raw statement text, for host-side audit logging
    fn get_request(&self, action: &ActionConfiguration) -> String;

    /// Action fields the host templates before execution
    fn dynamic_properties(&self) -> &'static [&'static str];
}

/// The Redshift datasource plugin
#[derive(Debug, Default)]
pub struct RedshiftPlugin {
    hooks: ConnectionHooks,
}

impl RedshiftPlugin {
    /// Create a plugin with no host lifecycle hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plugin with host-provided connection lifecycle hooks
    pub fn with_hooks(hooks: ConnectionHooks) -> Self {
        Self { hooks }
    }

    /// Plugin identity and configuration schema for the host registry
    pub fn spec() -> PluginSpec {
        PluginSpec {
            name: "redshift".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Amazon Redshift datasource - SQL execution and schema introspection \
                          via the PostgreSQL wire protocol"
                .to_string(),
            config_schema: serde_json::to_value(schemars::schema_for!(DatasourceConfiguration))
                .unwrap_or_default(),
        }
    }

    async fn run_query(
        &self,
        client: &tokio_postgres::Client,
        sql: &str,
        params: &[Value],
    ) -> Result<ExecutionOutput> {
        let boxed = bind_params(params);
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = boxed
            .iter()
            .map(|b| b.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        let pg_rows = executor::run_statement(|| client.query(sql, &refs))
            .await
            .map_err(|e| PluginError::query_with_sql(e.to_string(), sql))?;

        let rows: Vec<Row> = pg_rows.iter().map(decode_row).collect();
        Ok(ExecutionOutput {
            body: normalize_output(rows),
        })
    }
}

#[async_trait]
impl DatasourcePlugin for RedshiftPlugin {
    async fn execute(&self, props: &PluginExecutionProps) -> Result<ExecutionOutput> {
        let config = &props.datasource_configuration;
        config.validate_for_connection()?;

        let Some(sql) = props.action_configuration.statement() else {
            debug!("empty statement body, returning empty result");
            return Ok(ExecutionOutput::empty());
        };

        let conn = connection::open(config, DEFAULT_CONNECT_TIMEOUT, &self.hooks).await?;
        let result = self
            .run_query(conn.client(), sql, &props.context.params)
            .await;
        conn.close();

        if let Ok(output) = &result {
            debug!("execute returned {} rows", output.body.len());
        }
        result
    }

    async fn metadata(&self, config: &DatasourceConfiguration) -> Result<MetadataOutput> {
        config.validate_for_connection()?;
        let schema_name = config.target_schema().to_string();

        let conn = connection::open(config, DEFAULT_CONNECT_TIMEOUT, &self.hooks).await?;
        let params: [&(dyn tokio_postgres::types::ToSql + Sync); 1] = [&schema_name];
        let result =
            executor::run_statement(|| conn.client().query(schema::COLUMNS_QUERY, &params)).await;
        conn.close();

        let pg_rows =
            result.map_err(|e| PluginError::connection_from("failed to fetch metadata", &e))?;
        let rows: Vec<Row> = pg_rows.iter().map(decode_row).collect();
        let db_schema = schema::build_schema(&rows);

        debug!(
            "metadata for schema '{}' found {} tables",
            schema_name,
            db_schema.tables.len()
        );
        Ok(MetadataOutput { db_schema })
    }

    async fn test(&self, config: &DatasourceConfiguration) -> Result<()> {
        config.validate_for_connection()?;

        let conn = connection::open(config, TEST_CONNECT_TIMEOUT, &self.hooks).await?;
        let result = executor::run_statement(|| conn.client().simple_query(LIVENESS_QUERY)).await;
        conn.close();

        result
            .map(|_| ())
            .map_err(|e| PluginError::connection_from("connectivity test failed", &e))?;

        info!("datasource test succeeded");
        Ok(())
    }

    fn get_request(&self, action: &ActionConfiguration) -> String {
        action.body.clone().unwrap_or_default()
    }

    fn dynamic_properties(&self) -> &'static [&'static str] {
        DYNAMIC_PROPERTIES
    }
}
