//! The compiled, immutable routing table.
//!
//! A table is produced by the manifest compiler and never mutated afterwards;
//! reconfiguration builds a new one. Entries are kept sorted most-specific
//! first so lookup is a single linear scan that stops at the first match.
use std::collections::BTreeMap;

use crate::core::{
    manifest::{Operation, Parameter},
    method::HttpMethod,
    path_pattern::{Captures, PathPattern, normalize_path, split_segments},
};

/// Operation details carried alongside the resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMetadata {
    pub summary: String,
    pub parameters: Vec<Parameter>,
}

impl From<&Operation> for OperationMetadata {
    fn from(operation: &Operation) -> Self {
        Self {
            summary: operation.summary.clone(),
            parameters: operation.parameters.clone(),
        }
    }
}

/// Upstream target of one (listening path, method) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    pub method: HttpMethod,
    /// Absolute upstream base URL, resolved at compile time. May still hold
    /// `{param}` placeholders that are filled per request.
    pub upstream_url: String,
    pub operation: OperationMetadata,
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pattern: PathPattern,
    methods: BTreeMap<HttpMethod, MethodTarget>,
}

impl RouteEntry {
    pub fn new(listening_path: &str, methods: BTreeMap<HttpMethod, MethodTarget>) -> Self {
        Self {
            pattern: PathPattern::parse(listening_path),
            methods,
        }
    }

    pub fn listening_path(&self) -> &str {
        self.pattern.source()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn methods(&self) -> &BTreeMap<HttpMethod, MethodTarget> {
        &self.methods
    }

    pub fn target(&self, method: HttpMethod) -> Option<&MethodTarget> {
        self.methods.get(&method)
    }
}

/// Outcome of matching a request against a table.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Found {
        entry: &'a RouteEntry,
        target: &'a MethodTarget,
        captures: Captures,
    },
    /// The path matched but the method has no upstream.
    MethodNotAllowed { entry: &'a RouteEntry },
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
    revision: u64,
}

impl RoutingTable {
    pub fn new(mut entries: Vec<RouteEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.pattern
                .specificity()
                .cmp(&b.pattern.specificity())
                .then_with(|| a.listening_path().cmp(b.listening_path()))
        });
        Self {
            entries,
            revision: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry revision this table was installed under; 0 until installed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of listening paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of (listening path, method) pairs.
    pub fn route_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.methods.len()).sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn get(&self, listening_path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| entry.listening_path() == listening_path)
    }

    /// Resolved upstream for a listening path and method, if configured.
    pub fn upstream(&self, listening_path: &str, method: HttpMethod) -> Option<&str> {
        self.get(listening_path)
            .and_then(|entry| entry.target(method))
            .map(|target| target.upstream_url.as_str())
    }

    /// Match an inbound request path and method.
    pub fn lookup(&self, method: &http::Method, path: &str) -> RouteMatch<'_> {
        let normalized = normalize_path(path);
        let parts = split_segments(&normalized);

        let method = HttpMethod::from_http(method);

        // A path match without the method falls through to less specific
        // patterns; it only decides the outcome if nothing else matches.
        let mut path_only = None;
        for entry in &self.entries {
            let Some(captures) = entry.pattern.captures_segments(&parts) else {
                continue;
            };
            match method.and_then(|m| entry.target(m)) {
                Some(target) => {
                    return RouteMatch::Found {
                        entry,
                        target,
                        captures,
                    };
                }
                None => {
                    path_only.get_or_insert(entry);
                }
            }
        }

        match path_only {
            Some(entry) => RouteMatch::MethodNotAllowed { entry },
            None => RouteMatch::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, method: HttpMethod, url: &str) -> RouteEntry {
        let mut methods = BTreeMap::new();
        methods.insert(
            method,
            MethodTarget {
                method,
                upstream_url: url.to_string(),
                operation: OperationMetadata {
                    summary: "test".to_string(),
                    parameters: Vec::new(),
                },
            },
        );
        RouteEntry::new(path, methods)
    }

    #[test]
    fn test_lookup_prefers_most_specific_pattern() {
        let table = RoutingTable::new(vec![
            entry("/users/{rest+}", HttpMethod::Get, "http://greedy"),
            entry("/users/{id}", HttpMethod::Get, "http://param"),
            entry("/users/me", HttpMethod::Get, "http://literal"),
        ]);

        let url = |path| match table.lookup(&http::Method::GET, path) {
            RouteMatch::Found { target, .. } => target.upstream_url.clone(),
            other => panic!("expected a match for {path}, got {other:?}"),
        };

        assert_eq!(url("/users/me"), "http://literal");
        assert_eq!(url("/users/42"), "http://param");
        assert_eq!(url("/users/42/orders"), "http://greedy");
    }

    #[test]
    fn test_lookup_distinguishes_missing_method_from_missing_path() {
        let table = RoutingTable::new(vec![entry("/users/{id}", HttpMethod::Get, "http://u")]);

        assert!(matches!(
            table.lookup(&http::Method::POST, "/users/1"),
            RouteMatch::MethodNotAllowed { .. }
        ));
        assert!(matches!(
            table.lookup(&http::Method::HEAD, "/users/1"),
            RouteMatch::MethodNotAllowed { .. }
        ));
        assert!(matches!(
            table.lookup(&http::Method::GET, "/orders/1"),
            RouteMatch::NotFound
        ));
    }

    #[test]
    fn test_method_mismatch_falls_through_to_next_pattern() {
        let table = RoutingTable::new(vec![
            entry("/users/me", HttpMethod::Post, "http://literal"),
            entry("/users/{id}", HttpMethod::Get, "http://param"),
        ]);

        match table.lookup(&http::Method::GET, "/users/me") {
            RouteMatch::Found { target, captures, .. } => {
                assert_eq!(target.upstream_url, "http://param");
                assert_eq!(captures.param("id"), Some("me"));
            }
            other => panic!("expected fall-through match, got {other:?}"),
        }
        match table.lookup(&http::Method::DELETE, "/users/me") {
            RouteMatch::MethodNotAllowed { entry } => {
                assert_eq!(entry.listening_path(), "/users/me");
            }
            other => panic!("expected method mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_counts_and_upstream_lookup() {
        let table = RoutingTable::new(vec![
            entry("/a", HttpMethod::Get, "http://a"),
            entry("/b", HttpMethod::Post, "http://b"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.route_count(), 2);
        assert_eq!(table.upstream("/b", HttpMethod::Post), Some("http://b"));
        assert_eq!(table.upstream("/b", HttpMethod::Get), None);
        assert!(RoutingTable::empty().is_empty());
    }
}
