//! End-to-end redirect behaviour through the mounted router.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use reroute::route::MapEnv;

mod common;
use common::{body_text, get, router, RouteBuilder};

fn complex_route() -> RouteBuilder {
    RouteBuilder::new(
        "/example/{id}",
        "https://{{ host }}/id/{{ id }}?query={{ q }}&header={{ h }}",
    )
    .alias("/ex/{id}")
    .allow_env("REROUTE_IT_HOST")
    .param("id", r#"{{ get_path("id") }}"#)
    .param("q", r#"{{ get_query("q") }}"#)
    .param("h", r#"{{ get_header("x-test-header") }}"#)
    .param("host", r#"{{ get_env("REROUTE_IT_HOST") }}"#)
    .check(r#"host != """#, "host is not configured")
}

#[tokio::test]
async fn test_static_redirect() {
    let router = router(
        &[RouteBuilder::new("/example", "https://example.com").build()],
        Arc::new(MapEnv::new()),
    );

    let response = get(&router, "/example", &[]).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "https://example.com");
}

#[tokio::test]
async fn test_params_from_path_query_header_and_env() {
    let env = MapEnv::new().with("REROUTE_IT_HOST", "example.com");
    let router = router(&[complex_route().build()], Arc::new(env));

    for path in ["/example/wasd?q=xyz", "/ex/wasd?q=xyz"] {
        let response = get(&router, path, &[("x-test-header", "abc")]).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/id/wasd?query=xyz&header=abc"
        );
    }
}

#[tokio::test]
async fn test_failed_check_returns_literal_message() {
    let router = router(&[complex_route().build()], Arc::new(MapEnv::new()));

    let response = get(&router, "/example/wasd?q=xyz", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "host is not configured");
}

#[tokio::test]
async fn test_env_outside_allowlist_hidden() {
    let route = RouteBuilder::new("/secret", "https://example.com/?v={{ v }}")
        .param("v", r#"{{ get_env("REROUTE_IT_SECRET") }}"#)
        .build();
    let env = MapEnv::new().with("REROUTE_IT_SECRET", "hunter2");
    let router = router(&[route], Arc::new(env));

    let response = get(&router, "/secret", &[]).await;
    assert_eq!(response.headers()[header::LOCATION], "https://example.com/?v=");
}

#[tokio::test]
async fn test_first_failing_check_wins() {
    let route = RouteBuilder::new("/gate", "https://example.com")
        .param("a", r#"{{ get_query("a") }}"#)
        .param("b", r#"{{ get_query("b") }}"#)
        .check(r#"a != """#, "a is required")
        .check(r#"b != """#, "b is required")
        .build();
    let router = router(&[route], Arc::new(MapEnv::new()));

    let response = get(&router, "/gate", &[]).await;
    assert_eq!(body_text(response).await, "a is required");

    let response = get(&router, "/gate?a=1", &[]).await;
    assert_eq!(body_text(response).await, "b is required");

    let response = get(&router, "/gate?a=1&b=2", &[]).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_wildcard_capture() {
    let route = RouteBuilder::new("/go/{*rest}", "https://example.com/{{ rest }}")
        .param("rest", r#"{{ get_path("rest") }}"#)
        .build();
    let router = router(&[route], Arc::new(MapEnv::new()));

    let response = get(&router, "/go/a/b/c", &[]).await;
    assert_eq!(response.headers()[header::LOCATION], "https://example.com/a/b/c");
}

#[tokio::test]
async fn test_repeated_requests_identical() {
    let env = MapEnv::new().with("REROUTE_IT_HOST", "example.com");
    let router = router(&[complex_route().build()], Arc::new(env));

    let first = get(&router, "/example/a?q=1", &[("x-test-header", "h")]).await;
    let second = get(&router, "/example/a?q=1", &[("x-test-header", "h")]).await;
    assert_eq!(first.status(), second.status());
    assert_eq!(
        first.headers()[header::LOCATION],
        second.headers()[header::LOCATION]
    );
}

#[tokio::test]
async fn test_ill_typed_guard_never_redirects() {
    for expr in ["h == 1", "h > 3", "h + 1 > 2", "h"] {
        let route = RouteBuilder::new("/p", "https://example.com/{{ h }}")
            .param("h", r#"{{ get_query("h") }}"#)
            .check(expr, "rejected")
            .build();
        assert!(reroute::route::compile(&[route]).is_err(), "{expr}");
    }

    // the numeric form of the same guard is enforced at request time
    let route = RouteBuilder::new("/p", "https://example.com/{{ h }}")
        .param("h", r#"{{ get_query("h") }}"#)
        .check("h | int > 3", "h must be above 3")
        .build();
    let router = router(&[route], Arc::new(MapEnv::new()));

    let response = get(&router, "/p?h=abc", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&router, "/p?h=2", &[]).await;
    assert_eq!(body_text(response).await, "h must be above 3");

    let response = get(&router, "/p?h=7", &[]).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}
