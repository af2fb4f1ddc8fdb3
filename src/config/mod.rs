//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/YAML/TOML)
//!     → loader.rs (parse & deserialize, unknown fields rejected)
//!     → validation.rs (server section semantic checks)
//!     → RedirectConfig (server settings + raw route definitions)
//!     → route::compile (route definitions → compiled routes)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Server fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigFormat};
pub use schema::{
    DocumentationConfig, LogFormat, ObservabilityConfig, RedirectConfig, RouteCheck,
    RouteDefinition, RouteDocumentation, RouteEnvironment, RouteRedirect, RouteTest,
    RouteTestRequest, RouteTestResponse, ServerConfig, TlsConfig,
};
pub use validation::{validate_server, ValidationError};
