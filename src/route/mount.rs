//! Mounting compiled routes on an axum router.
//!
//! Every request reaches a single dispatch function that looks the path up
//! in the `RouteTable`. Live serving and the self-test harness share it.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::observability::metrics;
use crate::route::environment::EnvSource;
use crate::route::evaluate::RequestInput;
use crate::routing::RouteTable;

#[derive(Clone)]
struct MountState {
    table: Arc<RouteTable>,
    env: Arc<dyn EnvSource>,
}

/// Build a router serving every path and alias of `table`.
///
/// Only `GET` (and `HEAD`) are served; other methods on a known path get 405,
/// unknown paths 404.
pub fn mount(table: Arc<RouteTable>, env: Arc<dyn EnvSource>) -> Router {
    for handler in table.handlers() {
        tracing::debug!(route = %handler.key(), route_index = handler.index(), "Mounted route");
    }

    Router::new()
        .fallback(dispatch)
        .with_state(MountState { table, env })
}

async fn dispatch(
    State(state): State<MountState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();

    let Some(found) = state.table.lookup(uri.path()) else {
        tracing::debug!(path = %uri.path(), "No route matched");
        return (StatusCode::NOT_FOUND, "no route matches the request path").into_response();
    };

    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
            "method not allowed",
        )
            .into_response();
    }

    let input = RequestInput {
        captures: found.captures,
        query: uri.query().map(str::to_owned),
        headers,
    };
    let response = found.handler.route().respond(input, state.env.clone());

    metrics::record_request(found.handler.pattern().as_str(), response.status(), start);
    response
}
