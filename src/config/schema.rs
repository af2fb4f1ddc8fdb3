//! Configuration schema definitions.
//!
//! This module defines the decoded configuration structure for the redirect
//! server. All types derive Serde traits for deserialization from config files
//! and reject unknown fields so typos surface at load time.
//!
//! `RouteDefinition` is the *unvalidated* form of a route. It never reaches the
//! serving layer directly; `route::compile` turns it into a `route::Route`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the redirect server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RedirectConfig {
    /// Listener, TLS, documentation and observability settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Route definitions in declaration order.
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Route documentation page.
    pub documentation: DocumentationConfig,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            tls: None,
            documentation: DocumentationConfig::default(),
            request_timeout_secs: 30,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// TLS configuration for the listener.
///
/// Both fields are required together; see `validation::validate_server`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert: String,

    /// Path to private key file (PEM).
    pub key: String,
}

/// Documentation page settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentationConfig {
    /// Absolute path the page is served at.
    pub path: String,

    /// Page heading.
    pub title: String,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            title: "Redirects".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// A raw route definition as written in the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteDefinition {
    /// Primary path pattern, e.g. `/docs/{page}`.
    pub path: String,

    /// Additional path patterns served by the same route.
    pub aliases: Vec<String>,

    /// Human readable description rendered on the documentation page.
    pub documentation: RouteDocumentation,

    /// Environment variables the route may read.
    pub environment: RouteEnvironment,

    /// Param name to template source.
    pub params: BTreeMap<String, String>,

    /// Guards evaluated in order against the rendered params.
    pub checks: Vec<RouteCheck>,

    /// Redirect target.
    pub redirect: RouteRedirect,

    /// Self-test cases replayed by `reroute validate`.
    pub tests: Vec<RouteTest>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteDocumentation {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteEnvironment {
    /// Names of the environment variables exposed to `get_env`.
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteCheck {
    /// Boolean expression over the params. Passes only when it yields `true`.
    pub expr: String,

    /// Template for the 400 body returned when the check fails.
    pub error: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteRedirect {
    /// Template for the `Location` header.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteTest {
    pub request: RouteTestRequest,
    pub response: RouteTestResponse,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteTestRequest {
    /// Request target including the query string, e.g. `/docs/intro?lang=en`.
    pub url: String,

    /// Request headers.
    pub headers: BTreeMap<String, String>,

    /// Environment overrides applied while the test runs.
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouteTestResponse {
    /// Expected `Location` header, compared byte for byte.
    pub url: String,
}
