//! Datasource and action configuration
//!
//! Configuration arrives from the host as JSON per invocation and is
//! read-only. Endpoint and authentication are modeled as optional so that a
//! partially-filled datasource form fails validation here, with a message
//! naming the missing field, instead of failing somewhere inside the driver.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{PluginError, Result};
use crate::types::SensitiveString;
use crate::value::Value;

/// Schema used for metadata introspection when none is configured
pub const DEFAULT_SCHEMA: &str = "public";

/// SSL mode for warehouse connections.
///
/// Only two modes exist: plain TCP, or TLS that accepts the server
/// certificate without verification. The relaxed trust is a deliberate
/// compatibility choice for clusters fronted by self-signed certificates;
/// verified TLS (CA and hostname checks) is a tracked security follow-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// No SSL
    #[default]
    Disable,
    /// TLS without server certificate verification
    Require,
}

/// Warehouse endpoint
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Endpoint {
    /// Cluster endpoint hostname
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    /// Cluster port (default: 5439)
    #[serde(default = "default_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
}

fn default_port() -> u16 {
    5439
}

/// Warehouse credentials and target database
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Authentication {
    /// Database username
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    /// Database password
    pub password: SensitiveString,

    /// Database name to connect to
    pub database: Option<String>,

    /// Schema scope for metadata introspection (default: public)
    pub schema: Option<String>,
}

/// Connection parameters for one warehouse target
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct DatasourceConfiguration {
    /// Cluster endpoint
    #[validate(nested)]
    pub endpoint: Option<Endpoint>,

    /// Credentials and target database
    #[validate(nested)]
    pub authentication: Option<Authentication>,

    /// SSL mode for the connection
    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl DatasourceConfiguration {
    /// Validate that everything needed to open a connection is present.
    ///
    /// Runs before any network I/O in every public operation. Returns the
    /// endpoint, authentication block, and database name so callers don't
    /// re-unwrap the options.
    pub fn validate_for_connection(&self) -> Result<(&Endpoint, &Authentication, &str)> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| PluginError::configuration("missing endpoint"))?;

        let authentication = self
            .authentication
            .as_ref()
            .ok_or_else(|| PluginError::configuration("missing authentication"))?;

        let database = authentication
            .database
            .as_deref()
            .filter(|db| !db.trim().is_empty())
            .ok_or_else(|| PluginError::configuration("missing database name"))?;

        self.validate()
            .map_err(|e| PluginError::configuration(e.to_string()))?;

        Ok((endpoint, authentication, database))
    }

    /// Schema scope for metadata introspection, defaulting to `public`
    pub fn target_schema(&self) -> &str {
        self.authentication
            .as_ref()
            .and_then(|auth| auth.schema.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SCHEMA)
    }
}

/// Per-call payload: the SQL text to run
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ActionConfiguration {
    /// Literal SQL statement to execute
    pub body: Option<String>,
}

impl ActionConfiguration {
    /// The statement to run, or `None` when the body is empty or whitespace
    pub fn statement(&self) -> Option<&str> {
        self.body
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Execution context supplied by the host per invocation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionContext {
    /// Prepared-statement parameter values, in placeholder order
    #[serde(default)]
    pub params: Vec<Value>,
}

/// The host's per-invocation input for `execute`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginExecutionProps {
    /// Execution context (prepared-statement parameters)
    #[serde(default)]
    pub context: ExecutionContext,

    /// Datasource configuration
    pub datasource_configuration: DatasourceConfiguration,

    /// Action configuration
    pub action_configuration: ActionConfiguration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DatasourceConfiguration {
        serde_json::from_value(serde_json::json!({
            "endpoint": {"host": "cluster.abc.us-east-1.redshift.amazonaws.com"},
            "authentication": {
                "username": "admin",
                "password": "secret",
                "database": "analytics"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = valid_config();
        let (endpoint, auth, database) = config.validate_for_connection().unwrap();
        assert_eq!(endpoint.port, 5439);
        assert_eq!(auth.username, "admin");
        assert_eq!(database, "analytics");
    }

    #[test]
    fn test_missing_endpoint() {
        let mut config = valid_config();
        config.endpoint = None;
        let err = config.validate_for_connection().unwrap_err();
        assert_eq!(err.to_string(), "configuration error: missing endpoint");
    }

    #[test]
    fn test_missing_authentication() {
        let mut config = valid_config();
        config.authentication = None;
        let err = config.validate_for_connection().unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: missing authentication"
        );
    }

    #[test]
    fn test_missing_database_name() {
        let mut config = valid_config();
        config.authentication.as_mut().unwrap().database = None;
        let err = config.validate_for_connection().unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: missing database name"
        );

        // Blank counts as missing too
        let mut config = valid_config();
        config.authentication.as_mut().unwrap().database = Some("  ".into());
        assert!(config.validate_for_connection().is_err());
    }

    #[test]
    fn test_field_constraints() {
        let mut config = valid_config();
        config.endpoint.as_mut().unwrap().host = String::new();
        assert!(config.validate_for_connection().is_err());

        let mut config = valid_config();
        config.endpoint.as_mut().unwrap().port = 0;
        assert!(config.validate_for_connection().is_err());
    }

    #[test]
    fn test_target_schema_default_and_override() {
        let config = valid_config();
        assert_eq!(config.target_schema(), "public");

        let mut config = valid_config();
        config.authentication.as_mut().unwrap().schema = Some("sales".into());
        assert_eq!(config.target_schema(), "sales");

        // Blank schema falls back to the default
        let mut config = valid_config();
        config.authentication.as_mut().unwrap().schema = Some("".into());
        assert_eq!(config.target_schema(), "public");
    }

    #[test]
    fn test_ssl_mode_serde() {
        assert_eq!(
            serde_json::to_string(&SslMode::Disable).unwrap(),
            "\"disable\""
        );
        assert_eq!(
            serde_json::to_string(&SslMode::Require).unwrap(),
            "\"require\""
        );
        let config: DatasourceConfiguration = serde_json::from_value(serde_json::json!({
            "endpoint": {"host": "h"},
            "authentication": {"username": "u", "password": "p", "database": "d"},
            "ssl_mode": "require"
        }))
        .unwrap();
        assert_eq!(config.ssl_mode, SslMode::Require);
    }

    #[test]
    fn test_statement_trims_and_filters_empty() {
        let action = ActionConfiguration { body: None };
        assert_eq!(action.statement(), None);

        let action = ActionConfiguration {
            body: Some("   ".into()),
        };
        assert_eq!(action.statement(), None);

        let action = ActionConfiguration {
            body: Some(" SELECT 1; ".into()),
        };
        assert_eq!(action.statement(), Some("SELECT 1;"));
    }

    #[test]
    fn test_props_deserialization() {
        let props: PluginExecutionProps = serde_json::from_value(serde_json::json!({
            "context": {"params": [1, "a", null]},
            "datasource_configuration": {
                "endpoint": {"host": "h", "port": 5440},
                "authentication": {"username": "u", "password": "p", "database": "d"}
            },
            "action_configuration": {"body": "SELECT * FROM users WHERE id = $1"}
        }))
        .unwrap();

        assert_eq!(props.context.params.len(), 3);
        assert_eq!(
            props.datasource_configuration.endpoint.as_ref().unwrap().port,
            5440
        );
        assert!(props.action_configuration.statement().is_some());
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = valid_config();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
