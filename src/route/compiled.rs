//! The compiled, immutable route.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode, Uri};

use crate::routing::PathPattern;
use crate::template::{CheckRef, TemplateRef, TemplateSet};

/// A validated route, produced only by [`compile`](crate::route::compile).
///
/// Holding a `Route` proves every path, template, check and test case
/// passed compilation. Routes are never mutated after compilation and are
/// shared read-only across concurrent requests.
#[derive(Debug)]
pub struct Route {
    pub(super) paths: Vec<PathPattern>,
    pub(super) title: String,
    pub(super) description: String,
    pub(super) allowlist: Arc<HashSet<String>>,
    pub(super) params: Vec<(String, TemplateRef)>,
    pub(super) checks: Vec<Check>,
    pub(super) redirect: TemplateRef,
    pub(super) tests: Vec<RouteTest>,
    pub(super) templates: TemplateSet,
}

#[derive(Debug)]
pub(super) struct Check {
    pub(super) expr: CheckRef,
    pub(super) error: TemplateRef,
}

/// A declared request and the redirect it must produce.
#[derive(Debug, Clone)]
pub struct RouteTest {
    pub request: TestRequest,
    pub response: TestResponse,
}

#[derive(Debug, Clone)]
pub struct TestRequest {
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Process environment overrides applied while the test runs.
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct TestResponse {
    /// Always `307 Temporary Redirect`; self-tests only cover success.
    pub status: StatusCode,
    pub location: String,
}

impl Route {
    /// Primary path followed by aliases.
    pub fn paths(&self) -> &[PathPattern] {
        &self.paths
    }

    pub fn primary_path(&self) -> &str {
        self.paths.first().map(PathPattern::as_str).unwrap_or("/")
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether `get_env` may read `key` for this route.
    pub fn allows_env(&self, key: &str) -> bool {
        self.allowlist.contains(key)
    }

    /// Declared param names, sorted.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(key, _)| key.as_str())
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    pub fn tests(&self) -> &[RouteTest] {
        &self.tests
    }
}
