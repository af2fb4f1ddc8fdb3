//! Route compilation.
//!
//! # Responsibilities
//! - Validate paths and aliases
//! - Parse param, check-error and redirect templates
//! - Compile check expressions against the route's param names
//! - Validate declared self-tests
//!
//! # Design Decisions
//! - Routes compile independently, in input order
//! - The first failure aborts the whole batch; no partial route set
//! - All routes of a batch share one render buffer pool

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, StatusCode, Uri};

use crate::config::{RouteDefinition, RouteTest as TestDefinition};
use crate::route::compiled::{Check, Route, RouteTest, TestRequest, TestResponse};
use crate::route::error::DefinitionError;
use crate::routing::{PathPattern, PatternError};
use crate::template::{BufferPool, CheckVariables, TemplateRef, TemplateSet};

/// Compile raw route definitions into routes ready to serve.
pub fn compile(definitions: &[RouteDefinition]) -> Result<Vec<Route>, DefinitionError> {
    let pool = Arc::new(BufferPool::default());
    let routes = definitions
        .iter()
        .enumerate()
        .map(|(index, definition)| compile_route(index, definition, pool.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(routes = routes.len(), "Routes compiled");
    Ok(routes)
}

fn compile_route(
    index: usize,
    definition: &RouteDefinition,
    pool: Arc<BufferPool>,
) -> Result<Route, DefinitionError> {
    let paths = parse_paths(index, &definition.path, &definition.aliases)?;

    let mut templates = TemplateSet::new(pool);

    let mut params = Vec::with_capacity(definition.params.len());
    for (key, source) in &definition.params {
        let template = templates
            .add_template(format!("params.{key}"), source)
            .map_err(|source| DefinitionError::ParamTemplate {
                index,
                key: key.clone(),
                source,
            })?;
        params.push((key.clone(), template));
    }

    let allowlist: HashSet<String> = definition.environment.allowlist.iter().cloned().collect();

    let variables = CheckVariables::from_params(&definition.params);
    let mut checks = Vec::with_capacity(definition.checks.len());
    for (check, raw) in definition.checks.iter().enumerate() {
        let expr = templates
            .add_check(format!("checks.{check}.expr"), &raw.expr, &variables)
            .map_err(|source| DefinitionError::CheckExpression { index, check, source })?;

        if raw.error.is_empty() {
            return Err(DefinitionError::MissingCheckError { index, check });
        }
        let error = templates
            .add_template(format!("checks.{check}.error"), &raw.error)
            .map_err(|source| DefinitionError::CheckErrorTemplate { index, check, source })?;

        checks.push(Check { expr, error });
    }

    let redirect = parse_redirect(index, &mut templates, &definition.redirect.url)?;

    let tests = definition
        .tests
        .iter()
        .enumerate()
        .map(|(test, raw)| {
            parse_test(raw).map_err(|reason| DefinitionError::Test { index, test, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        route_index = index,
        path = %paths[0],
        aliases = paths.len() - 1,
        params = params.len(),
        checks = checks.len(),
        tests = tests.len(),
        "Route compiled"
    );

    Ok(Route {
        paths,
        title: definition.documentation.title.clone(),
        description: definition.documentation.description.clone(),
        allowlist: Arc::new(allowlist),
        params,
        checks,
        redirect,
        tests,
        templates,
    })
}

fn parse_paths(
    index: usize,
    path: &str,
    aliases: &[String],
) -> Result<Vec<PathPattern>, DefinitionError> {
    std::iter::once(path)
        .chain(aliases.iter().map(String::as_str))
        .map(|p| {
            PathPattern::parse(p).map_err(|source| match source {
                PatternError::Relative(path) => DefinitionError::RelativePath { index, path },
                source => DefinitionError::InvalidPattern { index, source },
            })
        })
        .collect()
}

fn parse_redirect(
    index: usize,
    templates: &mut TemplateSet,
    url: &str,
) -> Result<TemplateRef, DefinitionError> {
    if url.is_empty() {
        return Err(DefinitionError::MissingRedirect { index });
    }
    templates
        .add_template("redirect", url)
        .map_err(|source| DefinitionError::RedirectTemplate { index, source })
}

fn parse_test(test: &TestDefinition) -> Result<RouteTest, String> {
    let url = &test.request.url;
    if url.is_empty() {
        return Err("test request url is required but was missing".to_string());
    }
    if test.response.url.is_empty() {
        return Err("test response url is required but was missing".to_string());
    }
    if !url.starts_with('/') {
        return Err(format!("test request url {url:?} must be an absolute path (start with slash)"));
    }
    let uri: Uri = url
        .parse()
        .map_err(|e| format!("test request url {url:?} is invalid: {e}"))?;

    let mut headers = HeaderMap::with_capacity(test.request.headers.len());
    for (name, value) in &test.request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("test request header name {name:?} is invalid: {e}"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("test request header {name:?} has an invalid value: {e}"))?;
        headers.append(name, value);
    }

    Ok(RouteTest {
        request: TestRequest {
            uri,
            headers,
            environment: test.request.environment.clone(),
        },
        response: TestResponse {
            status: StatusCode::TEMPORARY_REDIRECT,
            location: test.response.url.clone(),
        },
    })
}
