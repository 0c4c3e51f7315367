//! # Parameter Source
//!
//! Normalizes path-captured variables and query/body key-value pairs into a
//! single ordered mapping with an index-addressable view for positional
//! binding.

use serde_json::Value;

/// Decoded request body parameters
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// `application/json` body; only a top-level object contributes keys
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs in wire order
    Form(Vec<(String, String)>),
}

/// Insertion-ordered mapping from parameter name to raw value.
///
/// Order is significant: positional binding addresses the k-th inserted
/// key, and a miss at position k inserts the synthetic name `p<k>`.
/// Re-inserting an existing key overwrites its value in place, keeping the
/// original position.
#[derive(Debug, Clone, Default)]
pub struct ParameterSource {
    entries: Vec<(String, Option<String>)>,
}

impl ParameterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the source from the three precedence-ordered origins: path
    /// captures (lowest), then body parameters, then query parameters
    /// (highest).
    pub fn from_request(
        path_vars: &[(String, String)],
        body: Option<&RequestBody>,
        query: &[(String, String)],
    ) -> Self {
        let mut source = Self::new();
        for (name, value) in path_vars {
            source.insert(name, Some(value.clone()));
        }
        if let Some(body) = body {
            source.extend_from_body(body);
        }
        for (name, value) in query {
            source.insert(name, Some(value.clone()));
        }
        source
    }

    /// Inserts or overwrites a parameter, preserving its original position
    pub fn insert(&mut self, name: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Merges decoded body parameters into the source
    pub fn extend_from_body(&mut self, body: &RequestBody) {
        match body {
            RequestBody::Json(Value::Object(map)) => {
                for (name, value) in map {
                    self.insert(name, json_scalar_to_raw(value));
                }
            }
            // Non-object JSON bodies carry no named parameters
            RequestBody::Json(_) => {}
            RequestBody::Form(pairs) => {
                for (name, value) in pairs {
                    self.insert(name, Some(value.clone()));
                }
            }
        }
    }

    /// Outer None: the name is absent. Inner None: present but null.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// The key at insertion index `index`, if one exists
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(n, _)| n.as_str())
    }

    /// The key at `index`, inserting the synthetic null-valued name `p<index>`
    /// when the source has no entry there yet.
    pub fn key_at_or_insert(&mut self, index: usize) -> String {
        if let Some(name) = self.key_at(index) {
            return name.to_string();
        }
        let name = format!("p{}", index);
        self.entries.push((name.clone(), None));
        name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

/// Normalizes a JSON scalar to its raw string form. Arrays and objects are
/// carried as compact JSON text.
fn json_scalar_to_raw(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
