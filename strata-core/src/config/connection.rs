//! `ConnectionConfig` (§6): a tagged variant discriminated by `type`, one
//! per supported engine. The core never talks to these engines directly —
//! it only validates and carries the config; concrete adapters living
//! outside this crate do the actual connecting (§1 "deliberately out of
//! scope").

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionConfig {
    Duckdb(DuckDbConfig),
    Snowflake(SnowflakeConfig),
    Databricks(DatabricksConfig),
    Bigquery(BigQueryConfig),
    Redshift(RedshiftConfig),
    Postgres(PostgresConfig),
    Spark(SparkConfig),
}

impl ConnectionConfig {
    pub fn concurrent_tasks(&self) -> u32 {
        match self {
            Self::Duckdb(c) => c.concurrent_tasks,
            Self::Snowflake(c) => c.concurrent_tasks,
            Self::Databricks(c) => c.concurrent_tasks,
            Self::Bigquery(c) => c.concurrent_tasks,
            Self::Redshift(c) => c.concurrent_tasks,
            Self::Postgres(c) => c.concurrent_tasks,
            Self::Spark(c) => c.concurrent_tasks,
        }
    }

    /// `true` iff `concurrent_tasks > 1` — the adapter maintains
    /// thread-local cursors in that case (§5).
    pub fn is_multithreaded(&self) -> bool {
        self.concurrent_tasks() > 1
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Snowflake(c) => c.validate(),
            Self::Databricks(c) => c.validate(),
            _ => Ok(()),
        }
    }
}

fn config_err(message: impl Into<String>) -> CoreError {
    CoreError::config(message, "connection_config")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckDbConfig {
    pub database_path: Option<String>,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    pub account: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub authenticator: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

impl SnowflakeConfig {
    fn validate(&self) -> Result<(), CoreError> {
        let has_authenticator = self.authenticator.is_some();
        let has_user_password = self.user.is_some() && self.password.is_some();
        if !has_authenticator && !has_user_password {
            return Err(config_err(
                "snowflake connection requires either `authenticator` or both `user` and `password`",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabricksConfig {
    pub server_hostname: Option<String>,
    pub http_path: Option<String>,
    pub access_token: Option<String>,
    /// Set when running inside a Databricks notebook — notebook detection
    /// itself is out of scope (§1), so callers supply this directly.
    #[serde(default)]
    pub in_notebook: bool,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

impl DatabricksConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if self.in_notebook {
            return Ok(());
        }
        if self.server_hostname.is_some() && self.http_path.is_some() && self.access_token.is_some()
        {
            return Ok(());
        }
        Err(config_err(
            "databricks connection requires `server_hostname`, `http_path`, and `access_token` \
             unless running inside a Databricks notebook",
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigQueryConfig {
    pub project: String,
    pub credentials_path: Option<String>,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedshiftConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkConfig {
    pub master: Option<String>,
    pub config: std::collections::BTreeMap<String, String>,
    #[serde(default = "default_concurrent_tasks")]
    pub concurrent_tasks: u32,
}

fn default_concurrent_tasks() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_requires_auth() {
        let cfg = SnowflakeConfig {
            account: "acct".into(),
            user: None,
            password: None,
            authenticator: None,
            warehouse: None,
            database: None,
            concurrent_tasks: 1,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn snowflake_accepts_user_password() {
        let cfg = SnowflakeConfig {
            account: "acct".into(),
            user: Some("u".into()),
            password: Some("p".into()),
            authenticator: None,
            warehouse: None,
            database: None,
            concurrent_tasks: 1,
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn databricks_notebook_bypasses_requirements() {
        let cfg = DatabricksConfig {
            server_hostname: None,
            http_path: None,
            access_token: None,
            in_notebook: true,
            concurrent_tasks: 1,
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn databricks_requires_full_triple_outside_notebook() {
        let cfg = DatabricksConfig {
            server_hostname: Some("h".into()),
            http_path: None,
            access_token: Some("t".into()),
            in_notebook: false,
            concurrent_tasks: 1,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn multithreaded_flag_tracks_concurrent_tasks() {
        let cfg = ConnectionConfig::Duckdb(DuckDbConfig {
            database_path: None,
            concurrent_tasks: 4,
        });
        assert!(cfg.is_multithreaded());
    }
}
