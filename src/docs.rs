//! Route documentation page.
//!
//! # Responsibilities
//! - Render one HTML index of every route (title, description, paths)
//! - Serve it as `text/html` at the configured documentation path
//!
//! # Design Decisions
//! - Rendered once at startup; requests only clone an `Arc`
//! - HTML auto-escaping is on here, unlike route templates

use std::sync::Arc;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use minijinja::{context, Environment};
use serde::Serialize;

use crate::route::Route;

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
</head>
<body>
<h1>{{ title }}</h1>
{%- for route in routes %}
<section>
<h2>{{ route.title or route.path }}</h2>
{%- if route.description %}
<p>{{ route.description }}</p>
{%- endif %}
<ul>
<li><code>{{ route.path }}</code></li>
{%- for alias in route.aliases %}
<li><code>{{ alias }}</code> (alias)</li>
{%- endfor %}
</ul>
</section>
{%- endfor %}
</body>
</html>
"#;

#[derive(Serialize)]
struct RouteEntry<'a> {
    title: &'a str,
    description: &'a str,
    path: &'a str,
    aliases: Vec<&'a str>,
}

/// A rendered documentation page.
#[derive(Debug, Clone)]
pub struct DocsPage {
    html: Arc<str>,
}

impl DocsPage {
    /// Render the page for `routes` in declaration order.
    pub fn render(title: &str, routes: &[Arc<Route>]) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("docs.html", PAGE_TEMPLATE)?;

        let entries: Vec<RouteEntry<'_>> = routes
            .iter()
            .map(|route| RouteEntry {
                title: route.title(),
                description: route.description(),
                path: route.primary_path(),
                aliases: route.paths().iter().skip(1).map(|p| p.as_str()).collect(),
            })
            .collect();

        let html = env
            .get_template("docs.html")?
            .render(context! { title => title, routes => entries })?;
        Ok(Self { html: html.into() })
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// A router serving the page with `GET` at `path`.
    pub fn router(&self, path: &str) -> Router {
        let page = self.clone();
        Router::new().route(path, get(move || async move { page.into_response() }))
    }
}

impl IntoResponse for DocsPage {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            self.html.to_string(),
        )
            .into_response()
    }
}
