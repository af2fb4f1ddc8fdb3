//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

use reroute::config::{
    RouteCheck, RouteDefinition, RouteRedirect, RouteTest, RouteTestRequest, RouteTestResponse,
};
use reroute::route::{compile, mount, EnvSource};
use reroute::routing::RouteTable;

/// Builder for route definitions.
#[derive(Default)]
pub struct RouteBuilder {
    definition: RouteDefinition,
}

impl RouteBuilder {
    pub fn new(path: &str, redirect: &str) -> Self {
        Self {
            definition: RouteDefinition {
                path: path.into(),
                redirect: RouteRedirect { url: redirect.into() },
                ..Default::default()
            },
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.definition.aliases.push(alias.into());
        self
    }

    pub fn allow_env(mut self, name: &str) -> Self {
        self.definition.environment.allowlist.push(name.into());
        self
    }

    pub fn param(mut self, key: &str, template: &str) -> Self {
        self.definition.params.insert(key.into(), template.into());
        self
    }

    pub fn check(mut self, expr: &str, error: &str) -> Self {
        self.definition.checks.push(RouteCheck {
            expr: expr.into(),
            error: error.into(),
        });
        self
    }

    pub fn test(
        mut self,
        url: &str,
        headers: &[(&str, &str)],
        environment: &[(&str, &str)],
        expected: &str,
    ) -> Self {
        self.definition.tests.push(RouteTest {
            request: RouteTestRequest {
                url: url.into(),
                headers: pairs(headers),
                environment: pairs(environment),
            },
            response: RouteTestResponse { url: expected.into() },
        });
        self
    }

    pub fn build(self) -> RouteDefinition {
        self.definition
    }
}

fn pairs(values: &[(&str, &str)]) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Compile `definitions` into a routing table.
pub fn table(definitions: &[RouteDefinition]) -> Arc<RouteTable> {
    Arc::new(RouteTable::new(compile(definitions).unwrap()))
}

/// Compile and mount `definitions` against `env`.
pub fn router(definitions: &[RouteDefinition], env: Arc<dyn EnvSource>) -> Router {
    mount(table(definitions), env)
}

/// Send a GET request with optional headers.
pub async fn get(router: &Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
