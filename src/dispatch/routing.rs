//! Route table and resolver.
//!
//! The table is an ordered sequence of entries mapping path patterns to
//! function names. It is built once per host generation and replaced by
//! atomic pointer swap on reload; a resolution pass always iterates a single
//! consistent snapshot.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Data token key carrying an explicit target-function override on a route.
///
/// When a matched entry carries this token, the token's value replaces both
/// the entry's target and any caller-supplied function-name hint.
pub const TARGET_FUNCTION_TOKEN: &str = "target-function";

/// HTTP method constraint for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl RouteMethod {
    /// Check if this constraint matches the given method string.
    pub fn matches(&self, method: &str) -> bool {
        match self {
            RouteMethod::Any => true,
            RouteMethod::Get => method.eq_ignore_ascii_case("GET"),
            RouteMethod::Post => method.eq_ignore_ascii_case("POST"),
            RouteMethod::Put => method.eq_ignore_ascii_case("PUT"),
            RouteMethod::Delete => method.eq_ignore_ascii_case("DELETE"),
            RouteMethod::Patch => method.eq_ignore_ascii_case("PATCH"),
            RouteMethod::Head => method.eq_ignore_ascii_case("HEAD"),
            RouteMethod::Options => method.eq_ignore_ascii_case("OPTIONS"),
        }
    }
}

impl From<&str> for RouteMethod {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => RouteMethod::Get,
            "POST" => RouteMethod::Post,
            "PUT" => RouteMethod::Put,
            "DELETE" => RouteMethod::Delete,
            "PATCH" => RouteMethod::Patch,
            "HEAD" => RouteMethod::Head,
            "OPTIONS" => RouteMethod::Options,
            "*" | "ANY" => RouteMethod::Any,
            _ => RouteMethod::Get,
        }
    }
}

/// A route entry mapping a path pattern to a target function.
///
/// Patterns support exact paths, `:param` segments, and a trailing `/*`
/// prefix wildcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Route path pattern (e.g., "/api/orders/:id").
    pub pattern: String,
    /// HTTP method constraint.
    pub method: RouteMethod,
    /// Target function name.
    pub target: String,
    /// Position in the table's total order; assigned on insertion.
    pub order: u32,
    /// Out-of-band key/value data attached to a match.
    #[serde(default)]
    pub data_tokens: HashMap<String, String>,
}

impl RouteEntry {
    /// Create a new route entry.
    pub fn new(
        method: impl Into<RouteMethod>,
        pattern: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            method: method.into(),
            target: target.into(),
            order: 0,
            data_tokens: HashMap::new(),
        }
    }

    /// Attach a data token to this entry.
    pub fn data_token(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data_tokens.insert(key.into(), value.into());
        self
    }

    /// Match the entry against a path and method, capturing route values.
    ///
    /// Returns the captured `:param` values on a match (the remainder of a
    /// `/*` wildcard is captured under `"path"`), or `None`.
    pub fn capture(&self, path: &str, method: &str) -> Option<HashMap<String, String>> {
        if !self.method.matches(method) {
            return None;
        }

        if let Some(prefix) = self.pattern.strip_suffix("/*") {
            if path.starts_with(prefix) {
                let mut values = HashMap::new();
                values.insert(
                    "path".to_string(),
                    path[prefix.len()..].trim_start_matches('/').to_string(),
                );
                return Some(values);
            }
            return None;
        }

        if self.pattern.contains(':') {
            let pattern_segments: Vec<&str> = self.pattern.split('/').collect();
            let path_segments: Vec<&str> = path.split('/').collect();

            if pattern_segments.len() != path_segments.len() {
                return None;
            }

            let mut values = HashMap::new();
            for (p, s) in pattern_segments.iter().zip(path_segments.iter()) {
                if let Some(name) = p.strip_prefix(':') {
                    values.insert(name.to_string(), (*s).to_string());
                } else if p != s {
                    return None;
                }
            }
            return Some(values);
        }

        (self.pattern == path).then(HashMap::new)
    }
}

/// Ordered route table.
///
/// Entries keep their insertion order; `order` records each entry's position
/// so resolution is deterministic for either iteration mode. The table is
/// immutable once handed to a resolver; rebuilds go through
/// [`RouteResolver::reload`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from entries, preserving their order.
    pub fn with_entries(entries: impl IntoIterator<Item = RouteEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.add(entry);
        }
        table
    }

    /// Append an entry; its `order` becomes its insertion position.
    pub fn add(&mut self, mut entry: RouteEntry) {
        entry.order = self.entries.len() as u32;
        self.entries.push(entry);
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order in which the resolver walks the table.
///
/// The mode changes only the iteration order, never the candidate set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Walk entries in registration order.
    #[default]
    Registration,
    /// Walk entries in exact reverse registration order, so later-registered
    /// proxy overrides are tried before earlier generic entries.
    ProxyOverride,
}

/// Result of a successful route resolution.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Resolved function name: the entry's target-function data token when
    /// present, else the entry's target.
    pub function_name: String,
    /// Values captured from the pattern.
    pub route_values: HashMap<String, String>,
    /// Data tokens attached to the matched entry.
    pub data_tokens: HashMap<String, String>,
}

/// Resolves requests against an atomically swapped route table snapshot.
pub struct RouteResolver {
    table: ArcSwap<RouteTable>,
}

impl RouteResolver {
    /// Create a resolver over the given table.
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Replace the table wholesale. In-flight resolutions keep reading the
    /// snapshot they started with.
    pub fn reload(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
    }

    /// Resolve a path and method to a function name and route data.
    ///
    /// Pure function of the request, the table snapshot, and the mode.
    /// Returns `None` when no entry matches; callers fall through to their
    /// default not-found handling.
    pub fn resolve(&self, path: &str, method: &str, mode: ResolutionMode) -> Option<MatchResult> {
        let table = self.table.load();
        let entries: Box<dyn Iterator<Item = &RouteEntry>> = match mode {
            ResolutionMode::Registration => Box::new(table.entries().iter()),
            ResolutionMode::ProxyOverride => Box::new(table.entries().iter().rev()),
        };

        for entry in entries {
            if let Some(route_values) = entry.capture(path, method) {
                let function_name = entry
                    .data_tokens
                    .get(TARGET_FUNCTION_TOKEN)
                    .cloned()
                    .unwrap_or_else(|| entry.target.clone());
                debug!(
                    "Route '{}' (order {}) matched {} {} -> {}",
                    entry.pattern, entry.order, method, path, function_name
                );
                return Some(MatchResult {
                    function_name,
                    route_values,
                    data_tokens: entry.data_tokens.clone(),
                });
            }
        }

        None
    }
}
