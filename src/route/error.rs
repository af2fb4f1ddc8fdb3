//! Route error taxonomy.
//!
//! - `DefinitionError`: compile time, fatal to startup
//! - `EvaluationError`: request time, recovered into a 400 response
//! - `SelfTestError`: first mismatch found by the self-test harness

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routing::PatternError;
use crate::template::TemplateError;

/// A route definition that cannot be compiled.
///
/// Every variant names the offending route by index and the failing field.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse path or alias for route at index [{index}]: {path:?} must be an absolute path (start with slash)")]
    RelativePath { index: usize, path: String },

    #[error("failed to parse path or alias for route at index [{index}]: {source}")]
    InvalidPattern {
        index: usize,
        #[source]
        source: PatternError,
    },

    #[error("failed to parse params for route at index [{index}]: failed to parse param template {key:?}: {source}")]
    ParamTemplate {
        index: usize,
        key: String,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse check expression [{check}] for route at index [{index}]: {source}")]
    CheckExpression {
        index: usize,
        check: usize,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse check error template [{check}] for route at index [{index}]: {source}")]
    CheckErrorTemplate {
        index: usize,
        check: usize,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse check error template [{check}] for route at index [{index}]: missing template")]
    MissingCheckError { index: usize, check: usize },

    #[error("failed to parse redirect url for route at index [{index}]: {source}")]
    RedirectTemplate {
        index: usize,
        #[source]
        source: TemplateError,
    },

    #[error("failed to parse redirect url for route at index [{index}]: missing template")]
    MissingRedirect { index: usize },

    #[error("failed to parse test [{test}] for route at index [{index}]: {reason}")]
    Test {
        index: usize,
        test: usize,
        reason: String,
    },
}

impl DefinitionError {
    /// Index of the offending route in the input batch.
    pub fn route_index(&self) -> usize {
        match self {
            Self::RelativePath { index, .. }
            | Self::InvalidPattern { index, .. }
            | Self::ParamTemplate { index, .. }
            | Self::CheckExpression { index, .. }
            | Self::CheckErrorTemplate { index, .. }
            | Self::MissingCheckError { index, .. }
            | Self::RedirectTemplate { index, .. }
            | Self::MissingRedirect { index }
            | Self::Test { index, .. } => *index,
        }
    }
}

/// A request that could not be turned into a redirect.
///
/// All variants are client errors. The check variants share a status code
/// and differ only in their message.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to parse param for key {key:?}: {source}")]
    Param {
        key: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to evaluate check expression: {0}")]
    CheckEvaluation(#[source] minijinja::Error),

    /// A check returned something other than `true`; the payload is the
    /// rendered error message.
    #[error("{0}")]
    CheckFailed(String),

    #[error("failed to render check error: {0}")]
    CheckMessage(#[source] minijinja::Error),

    #[error("failed to create redirect url: {0}")]
    Redirect(#[source] minijinja::Error),

    #[error("failed to create redirect url: {0:?} is not a valid header value")]
    InvalidLocation(String),
}

impl EvaluationError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Param { .. } => "param",
            Self::CheckEvaluation(_) => "check_evaluation",
            Self::CheckFailed(_) => "check_failed",
            Self::CheckMessage(_) => "check_message",
            Self::Redirect(_) | Self::InvalidLocation(_) => "redirect",
        }
    }
}

impl IntoResponse for EvaluationError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// The first self-test that did not produce the expected redirect.
#[derive(Debug, Error)]
#[error("test [{test}] for route at index [{route}] ({path}) failed: {reason}")]
pub struct SelfTestError {
    pub route: usize,
    pub test: usize,
    pub path: String,
    pub reason: SelfTestFailure,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelfTestFailure {
    #[error("expected status {expected} but got {actual} (body: {body:?})")]
    Status {
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("expected redirect to {expected:?} but got {actual:?}")]
    Location { expected: String, actual: String },
}
