//! # Endpoint Definitions
//!
//! An endpoint binds a route path to one SQL template per HTTP verb, a
//! named connection, and optional logging overrides. Definitions are loaded
//! and validated up front; the engine only reads them per request.

use serde::{Deserialize, Serialize};

use crate::observability::Severity;

use super::ConfigError;

/// The HTTP verbs an endpoint can bind a statement to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete];

    /// Parses a verb name, case-insensitively. Anything outside the four
    /// supported verbs is rejected.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

/// One registered endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDef {
    /// Unique route key; may contain `<name>` capture segments
    pub path: String,

    /// Symbolic reference to a configured connection
    pub connection_name: String,

    #[serde(default)]
    pub get_statement: Option<String>,

    #[serde(default)]
    pub post_statement: Option<String>,

    #[serde(default)]
    pub put_statement: Option<String>,

    #[serde(default)]
    pub delete_statement: Option<String>,

    /// Admin-facing free text
    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub is_disabled: bool,

    /// Per-endpoint minimum log severity
    #[serde(default)]
    pub log_level_override: Option<Severity>,

    /// With `filter_field_value`, gates verbose logging: requests whose
    /// bound value for this field does not match are logged at INFO and up
    #[serde(default)]
    pub filter_field_name: Option<String>,

    #[serde(default)]
    pub filter_field_value: Option<String>,
}

impl EndpointDef {
    /// Minimal definition used by tests and programmatic registration
    pub fn new(path: impl Into<String>, connection_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            connection_name: connection_name.into(),
            get_statement: None,
            post_statement: None,
            put_statement: None,
            delete_statement: None,
            notes: None,
            is_disabled: false,
            log_level_override: None,
            filter_field_name: None,
            filter_field_value: None,
        }
    }

    pub fn with_statement(mut self, verb: Verb, statement: impl Into<String>) -> Self {
        let statement = Some(statement.into());
        match verb {
            Verb::Get => self.get_statement = statement,
            Verb::Post => self.post_statement = statement,
            Verb::Put => self.put_statement = statement,
            Verb::Delete => self.delete_statement = statement,
        }
        self
    }

    /// The template bound to `verb`, if any. Selection is an explicit
    /// enumerated match; there is no dynamic field lookup.
    pub fn statement_for(&self, verb: Verb) -> Option<&str> {
        match verb {
            Verb::Get => self.get_statement.as_deref(),
            Verb::Post => self.post_statement.as_deref(),
            Verb::Put => self.put_statement.as_deref(),
            Verb::Delete => self.delete_statement.as_deref(),
        }
    }

    /// Validates the definition: a usable path and well-formed templates in
    /// every verb slot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim_matches('/').is_empty() {
            return Err(ConfigError::endpoint(&self.path, "path must not be empty"));
        }
        if self.connection_name.trim().is_empty() {
            return Err(ConfigError::endpoint(
                &self.path,
                "connection_name must not be empty",
            ));
        }
        if self.filter_field_name.is_some() != self.filter_field_value.is_some() {
            return Err(ConfigError::endpoint(
                &self.path,
                "filter_field_name and filter_field_value must be set together",
            ));
        }
        for verb in Verb::ALL {
            if let Some(template) = self.statement_for(verb) {
                validate_template(template)
                    .map_err(|message| ConfigError::endpoint(&self.path, message))?;
            }
        }
        Ok(())
    }
}

/// Rejects templates whose optional-fragment brackets are ambiguous: at
/// most one `[ ... ]` region, properly ordered, no nesting. Multiple or
/// nested regions would silently mis-parse, so they fail at load time.
pub fn validate_template(template: &str) -> Result<(), String> {
    let opens = template.matches('[').count();
    let closes = template.matches(']').count();
    if opens > 1 || closes > 1 {
        return Err("template may contain at most one optional [..] region".to_string());
    }
    if opens != closes {
        return Err("template has an unbalanced optional [..] region".to_string());
    }
    if let (Some(open), Some(close)) = (template.find('['), template.find(']')) {
        if open > close {
            return Err("template optional region closes before it opens".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_from_name() {
        assert_eq!(Verb::from_name("get"), Some(Verb::Get));
        assert_eq!(Verb::from_name(" DELETE "), Some(Verb::Delete));
        assert_eq!(Verb::from_name("PATCH"), None);
        assert_eq!(Verb::from_name(""), None);
    }

    #[test]
    fn test_statement_for_explicit_mapping() {
        let endpoint = EndpointDef::new("users", "main")
            .with_statement(Verb::Get, "SELECT * FROM users")
            .with_statement(Verb::Delete, "DELETE FROM users WHERE id = <id>");

        assert_eq!(endpoint.statement_for(Verb::Get), Some("SELECT * FROM users"));
        assert_eq!(endpoint.statement_for(Verb::Post), None);
        assert_eq!(endpoint.statement_for(Verb::Put), None);
        assert!(endpoint.statement_for(Verb::Delete).is_some());
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let endpoint = EndpointDef::new("//", "main");
        assert!(endpoint.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_lone_filter_field() {
        let mut endpoint = EndpointDef::new("users", "main");
        endpoint.filter_field_name = Some("section".to_string());
        assert!(endpoint.validate().is_err());

        endpoint.filter_field_value = Some("42".to_string());
        assert!(endpoint.validate().is_ok());
    }

    #[test]
    fn test_validate_template_brackets() {
        assert!(validate_template("SELECT 1").is_ok());
        assert!(validate_template("SELECT * FROM t WHERE a = <a> [AND b = <b>]").is_ok());
        assert!(validate_template("SELECT 1 [a] [b]").is_err());
        assert!(validate_template("SELECT 1 [a").is_err());
        assert!(validate_template("SELECT 1 ]a[").is_err());
        assert!(validate_template("[a [b] c]").is_err());
    }

    #[test]
    fn test_validate_checks_every_verb_slot() {
        let endpoint = EndpointDef::new("users", "main")
            .with_statement(Verb::Get, "SELECT 1")
            .with_statement(Verb::Put, "UPDATE t SET a = 1 [WHERE b = <b>");
        assert!(endpoint.validate().is_err());
    }

    #[test]
    fn test_endpoint_def_deserializes_with_defaults() {
        let endpoint: EndpointDef = serde_json::from_str(
            r#"{
                "path": "users/<id>",
                "connection_name": "main",
                "get_statement": "SELECT * FROM users WHERE id = <id>",
                "log_level_override": "TRACE"
            }"#,
        )
        .unwrap();

        assert!(!endpoint.is_disabled);
        assert_eq!(endpoint.log_level_override, Some(Severity::Trace));
        assert!(endpoint.post_statement.is_none());
    }
}
