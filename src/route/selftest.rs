//! Self-test harness.
//!
//! # Responsibilities
//! - Replay every declared test through the same dispatch used for serving
//! - Apply each test's environment overrides and restore them afterwards
//! - Stop at the first mismatch and report route, test, expected and actual
//!
//! # Design Decisions
//! - Tests run sequentially; a process-wide lock keeps concurrent harness
//!   runs from interleaving their environment overrides
//! - Must not run while the same process serves live traffic

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::route::compiled::RouteTest;
use crate::route::environment::{EnvOverride, ProcessEnv};
use crate::route::error::{SelfTestError, SelfTestFailure};
use crate::route::mount::mount;
use crate::routing::RouteTable;

/// Largest response body captured for a failure report.
const MAX_REPORTED_BODY: usize = 64 * 1024;

static ENVIRONMENT_LOCK: Mutex<()> = Mutex::const_new(());

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfTestReport {
    /// Routes that declared at least one test.
    pub routes: usize,
    pub tests: usize,
}

/// Run every declared test of every route.
pub async fn run_tests(table: Arc<RouteTable>) -> Result<SelfTestReport, SelfTestError> {
    let _lock = ENVIRONMENT_LOCK.lock().await;
    let router = mount(table.clone(), Arc::new(ProcessEnv));
    let mut report = SelfTestReport::default();

    for (route_index, route) in table.routes().iter().enumerate() {
        if route.tests().is_empty() {
            continue;
        }
        report.routes += 1;

        for (test_index, test) in route.tests().iter().enumerate() {
            let outcome = {
                let _env = EnvOverride::apply(&test.request.environment);
                run_test(&router, test).await
            };

            if let Err(reason) = outcome {
                let err = SelfTestError {
                    route: route_index,
                    test: test_index,
                    path: route.primary_path().to_string(),
                    reason,
                };
                tracing::error!(error = %err, "Self-test failed");
                return Err(err);
            }

            tracing::info!(
                route = %route.primary_path(),
                route_index,
                test_index,
                url = %test.request.uri,
                "Self-test passed"
            );
            report.tests += 1;
        }
    }

    Ok(report)
}

async fn run_test(router: &Router, test: &RouteTest) -> Result<(), SelfTestFailure> {
    let mut request = Request::new(Body::empty());
    *request.method_mut() = Method::GET;
    *request.uri_mut() = test.request.uri.clone();
    *request.headers_mut() = test.request.headers.clone();

    let response = match router.clone().oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let status = response.status();
    if status != test.response.status {
        let body = axum::body::to_bytes(response.into_body(), MAX_REPORTED_BODY)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        return Err(SelfTestFailure::Status {
            expected: test.response.status.as_u16(),
            actual: status.as_u16(),
            body,
        });
    }

    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();
    if location != test.response.location {
        return Err(SelfTestFailure::Location {
            expected: test.response.location.clone(),
            actual: location,
        });
    }

    Ok(())
}
