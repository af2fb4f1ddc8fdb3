//! Server configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of the server section (serde handles syntactic)
//! - TLS cert/key pairing and file existence
//! - Metrics address shape when metrics are enabled
//! - Documentation path shape and collisions with route paths
//!
//! # Design Decisions
//! - Validation is a pure function over the decoded config
//! - Returns the first error, matching the fail-fast startup
//! - Route definitions are validated by the route compiler, not here

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{RouteDefinition, ServerConfig};

/// A semantic error in the server section.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server address is required")]
    MissingAddress,

    #[error("server TLS key is required when TLS cert is provided")]
    MissingTlsKey,

    #[error("server TLS cert is required when TLS key is provided")]
    MissingTlsCert,

    #[error("server TLS cert file at path {0:?} does not exist")]
    TlsCertNotFound(String),

    #[error("server TLS key file at path {0:?} does not exist")]
    TlsKeyNotFound(String),

    #[error("metrics address {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("documentation path must be an absolute path (start with slash)")]
    RelativeDocumentationPath,

    #[error("documentation path {0:?} must not contain path captures")]
    DocumentationPathCapture(String),

    #[error("documentation path {path:?} collides with route at index [{index}]")]
    DocumentationPathCollision { path: String, index: usize },
}

/// Validate the server section against the declared routes.
pub fn validate_server(
    server: &ServerConfig,
    routes: &[RouteDefinition],
) -> Result<(), ValidationError> {
    if server.address.trim().is_empty() {
        return Err(ValidationError::MissingAddress);
    }

    if let Some(tls) = &server.tls {
        match (tls.cert.is_empty(), tls.key.is_empty()) {
            (false, true) => return Err(ValidationError::MissingTlsKey),
            (true, false) => return Err(ValidationError::MissingTlsCert),
            (true, true) => {}
            (false, false) => {
                if !Path::new(&tls.cert).exists() {
                    return Err(ValidationError::TlsCertNotFound(tls.cert.clone()));
                }
                if !Path::new(&tls.key).exists() {
                    return Err(ValidationError::TlsKeyNotFound(tls.key.clone()));
                }
            }
        }
    }

    let observability = &server.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        return Err(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    let docs_path = &server.documentation.path;
    if !docs_path.starts_with('/') {
        return Err(ValidationError::RelativeDocumentationPath);
    }
    if docs_path.contains(['{', '}']) {
        return Err(ValidationError::DocumentationPathCapture(docs_path.clone()));
    }

    for (index, route) in routes.iter().enumerate() {
        let collides = std::iter::once(&route.path)
            .chain(route.aliases.iter())
            .any(|p| p == docs_path);
        if collides {
            return Err(ValidationError::DocumentationPathCollision {
                path: docs_path.clone(),
                index,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    fn server() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_server_is_valid() {
        assert_eq!(validate_server(&server(), &[]), Ok(()));
    }

    #[test]
    fn test_missing_address() {
        let mut config = server();
        config.address = String::new();
        assert_eq!(validate_server(&config, &[]), Err(ValidationError::MissingAddress));
    }

    #[test]
    fn test_tls_pairing() {
        let mut config = server();
        config.tls = Some(TlsConfig { cert: "cert.pem".into(), key: String::new() });
        assert_eq!(validate_server(&config, &[]), Err(ValidationError::MissingTlsKey));

        config.tls = Some(TlsConfig { cert: String::new(), key: "key.pem".into() });
        assert_eq!(validate_server(&config, &[]), Err(ValidationError::MissingTlsCert));
    }

    #[test]
    fn test_tls_files_must_exist() {
        let cert = tempfile::NamedTempFile::new().unwrap();
        let mut config = server();
        config.tls = Some(TlsConfig {
            cert: cert.path().display().to_string(),
            key: "/nonexistent/key.pem".into(),
        });
        assert_eq!(
            validate_server(&config, &[]),
            Err(ValidationError::TlsKeyNotFound("/nonexistent/key.pem".into()))
        );

        config.tls = Some(TlsConfig {
            cert: "/nonexistent/cert.pem".into(),
            key: cert.path().display().to_string(),
        });
        assert_eq!(
            validate_server(&config, &[]),
            Err(ValidationError::TlsCertNotFound("/nonexistent/cert.pem".into()))
        );
    }

    #[test]
    fn test_metrics_address_checked_when_enabled() {
        let mut config = server();
        config.observability.metrics_address = "localhost".into();
        assert_eq!(validate_server(&config, &[]), Ok(()));

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_server(&config, &[]),
            Err(ValidationError::InvalidMetricsAddress("localhost".into()))
        );

        config.observability.metrics_address = "127.0.0.1:9090".into();
        assert_eq!(validate_server(&config, &[]), Ok(()));
    }

    #[test]
    fn test_documentation_path() {
        let mut config = server();
        config.documentation.path = "docs".into();
        assert_eq!(
            validate_server(&config, &[]),
            Err(ValidationError::RelativeDocumentationPath)
        );

        config.documentation.path = "/docs/{page}".into();
        assert!(matches!(
            validate_server(&config, &[]),
            Err(ValidationError::DocumentationPathCapture(_))
        ));
    }

    #[test]
    fn test_documentation_path_collision() {
        let mut config = server();
        config.documentation.path = "/help".into();
        let routes = vec![
            RouteDefinition { path: "/a".into(), ..Default::default() },
            RouteDefinition {
                path: "/b".into(),
                aliases: vec!["/help".into()],
                ..Default::default()
            },
        ];
        assert_eq!(
            validate_server(&config, &routes),
            Err(ValidationError::DocumentationPathCollision { path: "/help".into(), index: 1 })
        );
    }
}
