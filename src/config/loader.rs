//! Configuration loading from disk.
//!
//! The decoder is picked from the file extension: `.json`, `.yaml`/`.yml`
//! or `.toml`.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RedirectConfig;
use crate::config::validation::{validate_server, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported configuration file extension: {0:?} (supported are .yaml, .yml, .json and .toml)")]
    UnsupportedExtension(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Definition(#[from] crate::route::DefinitionError),
}

/// Supported configuration encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match ext {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => {
                let shown = if ext.is_empty() { String::new() } else { format!(".{ext}") };
                Err(ConfigError::UnsupportedExtension(shown))
            }
        }
    }
}

/// Decode configuration content in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RedirectConfig, ConfigError> {
    let config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Load configuration from a file and validate the server section.
///
/// Routes are only decoded here; compiling them is `route::compile`'s job.
pub fn load_config(path: &Path) -> Result<RedirectConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&content, format)?;

    validate_server(&config.server, &config.routes)?;

    tracing::debug!(
        path = %path.display(),
        routes = config.routes.len(),
        "Configuration file decoded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON: &str = r#"{
        "server": { "address": "127.0.0.1:8080" },
        "routes": [
            {
                "path": "/example/{id}",
                "aliases": ["/ex/{id}"],
                "params": { "id": "{{ get_path(\"id\") }}" },
                "redirect": { "url": "https://example.com/{{ id }}" }
            }
        ]
    }"#;

    const YAML: &str = r#"
server:
  address: 127.0.0.1:8080
routes:
  - path: /example/{id}
    params:
      id: '{{ get_path("id") }}'
    checks:
      - expr: id != ""
        error: id is required
    redirect:
      url: https://example.com/{{ id }}
    tests:
      - request:
          url: /example/abc
        response:
          url: https://example.com/abc
"#;

    const TOML: &str = r#"
[server]
address = "127.0.0.1:8080"

[[routes]]
path = "/example"

[routes.redirect]
url = "https://example.com"
"#;

    #[test]
    fn test_parse_json() {
        let config = parse_config(JSON, ConfigFormat::Json).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:8080");
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].aliases, vec!["/ex/{id}".to_string()]);
        assert_eq!(config.routes[0].params["id"], r#"{{ get_path("id") }}"#);
    }

    #[test]
    fn test_parse_yaml() {
        let config = parse_config(YAML, ConfigFormat::Yaml).unwrap();
        let route = &config.routes[0];
        assert_eq!(route.checks[0].expr, r#"id != """#);
        assert_eq!(route.tests[0].response.url, "https://example.com/abc");
        // Unset sections fall back to defaults
        assert_eq!(config.server.documentation.path, "/");
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_parse_toml() {
        let config = parse_config(TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.routes[0].redirect.url, "https://example.com");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let content = r#"{ "server": { "address": ":80", "port": 80 } }"#;
        let err = parse_config(content, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigFormat::from_path(Path::new("config.ini")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported configuration file extension: \".ini\" (supported are .yaml, .yml, .json and .toml)"
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.routes[0].path, "/example/{id}");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
