//! # Configuration
//!
//! One JSON config file declares the server settings, the named connections
//! the provider is expected to serve, and the endpoint definitions. Loading
//! runs an explicit validation pass so bad definitions fail at startup, not
//! at request time.

mod endpoint;
mod settings;

pub use endpoint::{validate_template, EndpointDef, Verb};
pub use settings::ServerConfig;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors; all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint [{path}]: {message}")]
    Endpoint { path: String, message: String },

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn endpoint(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Endpoint {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

/// Top-level configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Names of the connections the provider serves
    #[serde(default)]
    pub connections: Vec<String>,

    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration: well-formed endpoints, unique paths, and
    /// connection references that resolve
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let known: HashSet<&str> = self.connections.iter().map(String::as_str).collect();

        for endpoint in &self.endpoints {
            endpoint.validate()?;

            let key = endpoint.path.trim_matches('/').to_string();
            if !seen.insert(key) {
                return Err(ConfigError::endpoint(&endpoint.path, "duplicate path"));
            }
            if !known.contains(endpoint.connection_name.as_str()) {
                return Err(ConfigError::endpoint(
                    &endpoint.path,
                    format!("unknown connection [{}]", endpoint.connection_name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sqlroute.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_valid_config() {
        let (_dir, path) = write_config(
            r#"{
                "server": {"port": 9000, "debug": true},
                "connections": ["main"],
                "endpoints": [
                    {
                        "path": "users/<id>",
                        "connection_name": "main",
                        "get_statement": "SELECT * FROM users WHERE id = <id>"
                    }
                ]
            }"#,
        );

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(config.server.debug);
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].path, "users/<id>");
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let (_dir, path) = write_config("{not json");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_paths() {
        let config = AppConfig {
            connections: vec!["main".to_string()],
            endpoints: vec![
                EndpointDef::new("users", "main"),
                EndpointDef::new("/users/", "main"),
            ],
            ..Default::default()
        };
        let err = config.validate().err().unwrap();
        assert!(err.to_string().contains("duplicate path"));
    }

    #[test]
    fn test_validate_rejects_unknown_connection() {
        let config = AppConfig {
            connections: vec!["main".to_string()],
            endpoints: vec![EndpointDef::new("orders", "reporting")],
            ..Default::default()
        };
        let err = config.validate().err().unwrap();
        assert!(err.to_string().contains("unknown connection"));
    }

    #[test]
    fn test_validate_rejects_bad_template_brackets() {
        let config = AppConfig {
            connections: vec!["main".to_string()],
            endpoints: vec![EndpointDef::new("users", "main")
                .with_statement(Verb::Get, "SELECT 1 [a] [b]")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
