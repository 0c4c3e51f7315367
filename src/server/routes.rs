//! # Route Table
//!
//! Immutable index from request paths to endpoint definitions. A table is
//! built once from a set of definitions and never mutated; publishing a new
//! set swaps a single shared pointer, so concurrent requests always see a
//! fully-built table.

use std::sync::{Arc, RwLock};

use crate::config::EndpointDef;

/// One segment of a compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled endpoint path such as `users/<id>/orders`
#[derive(Debug, Clone)]
pub struct RoutePattern {
    segments: Vec<Segment>,
    raw: String,
}

impl RoutePattern {
    /// Compiles a path; `<name>` segments become captures
    pub fn compile(path: &str) -> Self {
        let raw = path.trim_matches('/').to_string();
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.len() > 2 && s.starts_with('<') && s.ends_with('>') {
                    Segment::Capture(s[1..s.len() - 1].to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments, raw }
    }

    /// The normalized path text this pattern was compiled from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Matches a request path, returning captured variables in segment order
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(text) => {
                    if text != part {
                        return None;
                    }
                }
                Segment::Capture(name) => captures.push((name.clone(), part.to_string())),
            }
        }
        Some(captures)
    }
}

/// Immutable route index. Longer patterns take precedence over shorter
/// ones, so the most specific registration wins.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<(RoutePattern, Arc<EndpointDef>)>,
}

impl RouteTable {
    /// Builds a table from endpoint definitions
    pub fn build(endpoints: impl IntoIterator<Item = EndpointDef>) -> Self {
        let mut routes: Vec<(RoutePattern, Arc<EndpointDef>)> = endpoints
            .into_iter()
            .map(|endpoint| (RoutePattern::compile(&endpoint.path), Arc::new(endpoint)))
            .collect();
        routes.sort_by(|a, b| b.0.raw().len().cmp(&a.0.raw().len()));
        Self { routes }
    }

    /// Resolves a request path to its endpoint and captured variables
    pub fn resolve(&self, path: &str) -> Option<(&EndpointDef, Vec<(String, String)>)> {
        self.routes.iter().find_map(|(pattern, endpoint)| {
            pattern
                .matches(path)
                .map(|captures| (endpoint.as_ref(), captures))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Shared, atomically-swappable route table.
///
/// Requests clone the current snapshot; publishing a replacement is a
/// single pointer swap behind the lock. A poisoned lock still holds a
/// fully-built table (the swap is one assignment), so reads recover it.
#[derive(Debug)]
pub struct SharedRoutes {
    current: RwLock<Arc<RouteTable>>,
}

impl SharedRoutes {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// The current table snapshot
    pub fn snapshot(&self) -> Arc<RouteTable> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Publishes a replacement table
    pub fn publish(&self, table: RouteTable) {
        let table = Arc::new(table);
        match self.current.write() {
            Ok(mut guard) => *guard = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verb;

    fn endpoint(path: &str) -> EndpointDef {
        EndpointDef::new(path, "main").with_statement(Verb::Get, "SELECT 1")
    }

    #[test]
    fn test_pattern_literal_match() {
        let pattern = RoutePattern::compile("users/active");
        assert_eq!(pattern.matches("users/active"), Some(vec![]));
        assert_eq!(pattern.matches("/users/active/"), Some(vec![]));
        assert_eq!(pattern.matches("users"), None);
        assert_eq!(pattern.matches("users/other"), None);
    }

    #[test]
    fn test_pattern_captures() {
        let pattern = RoutePattern::compile("users/<id>/orders/<order_id>");
        let captures = pattern.matches("users/7/orders/42").unwrap();
        assert_eq!(
            captures,
            vec![
                ("id".to_string(), "7".to_string()),
                ("order_id".to_string(), "42".to_string())
            ]
        );
    }

    #[test]
    fn test_longer_patterns_win() {
        let table = RouteTable::build(vec![endpoint("users/<id>"), endpoint("users/<id>/orders")]);

        let (matched, _) = table.resolve("users/7/orders").unwrap();
        assert_eq!(matched.path, "users/<id>/orders");

        let (matched, captures) = table.resolve("users/7").unwrap();
        assert_eq!(matched.path, "users/<id>");
        assert_eq!(captures, vec![("id".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_resolve_unknown_path() {
        let table = RouteTable::build(vec![endpoint("users")]);
        assert!(table.resolve("orders").is_none());
    }

    #[test]
    fn test_shared_routes_swap() {
        let shared = SharedRoutes::new(RouteTable::build(vec![endpoint("users")]));
        let before = shared.snapshot();
        assert!(before.resolve("users").is_some());
        assert!(before.resolve("orders").is_none());

        shared.publish(RouteTable::build(vec![endpoint("orders")]));

        // The old snapshot is untouched; new snapshots see the new table
        assert!(before.resolve("users").is_some());
        let after = shared.snapshot();
        assert!(after.resolve("users").is_none());
        assert!(after.resolve("orders").is_some());
    }
}
