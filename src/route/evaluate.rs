//! Request evaluation.
//!
//! # Responsibilities
//! - Render every param against the request scope
//! - Run checks in declared order, stopping at the first failure
//! - Render the redirect URL and build the 307 response
//!
//! # Design Decisions
//! - Evaluation is synchronous and side-effect free apart from environment
//!   reads through the injected `EnvSource`
//! - Every failure is a 400; the body tells the failure kinds apart

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::route::compiled::Route;
use crate::route::environment::{AllowListedEnv, EnvSource};
use crate::route::error::EvaluationError;
use crate::template::{CheckOutcome, ParamMap, RequestScope};

/// The parts of a live request that param templates can read.
#[derive(Debug, Default, Clone)]
pub struct RequestInput {
    pub captures: HashMap<String, String>,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl Route {
    /// Render the params for `input`.
    pub fn render_params(
        &self,
        input: RequestInput,
        env: Arc<dyn EnvSource>,
    ) -> Result<ParamMap, EvaluationError> {
        let scope = RequestScope::new(
            input.captures,
            input.query,
            input.headers,
            AllowListedEnv::new(self.allowlist.clone(), env),
        )
        .into_value();

        let mut params = ParamMap::with_capacity(self.params.len());
        for (key, template) in &self.params {
            let value = self
                .templates
                .render_param(template, &scope)
                .map_err(|source| EvaluationError::Param {
                    key: key.clone(),
                    source,
                })?;
            params.insert(key.clone(), value);
        }
        Ok(params)
    }

    /// Evaluate the route and return the redirect target.
    pub fn evaluate(
        &self,
        input: RequestInput,
        env: Arc<dyn EnvSource>,
    ) -> Result<HeaderValue, EvaluationError> {
        let params = self.render_params(input, env)?;

        for check in &self.checks {
            let outcome = self
                .templates
                .evaluate(&check.expr, &params)
                .map_err(EvaluationError::CheckEvaluation)?;
            if outcome == CheckOutcome::Failed {
                let message = self
                    .templates
                    .render(&check.error, &params)
                    .map_err(EvaluationError::CheckMessage)?;
                return Err(EvaluationError::CheckFailed(message));
            }
        }

        let url = self
            .templates
            .render(&self.redirect, &params)
            .map_err(EvaluationError::Redirect)?;
        HeaderValue::from_str(&url).map_err(|_| EvaluationError::InvalidLocation(url))
    }

    /// Evaluate the route and turn the outcome into an HTTP response.
    pub fn respond(&self, input: RequestInput, env: Arc<dyn EnvSource>) -> Response {
        match self.evaluate(input, env) {
            Ok(location) => {
                tracing::debug!(route = %self.primary_path(), location = ?location, "Redirecting");
                (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
            }
            Err(err) => {
                tracing::warn!(
                    route = %self.primary_path(),
                    kind = err.kind(),
                    error = %err,
                    "Rejected request"
                );
                err.into_response()
            }
        }
    }
}
