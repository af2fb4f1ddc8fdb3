//! Configuration-driven HTTP redirect server library.

pub mod config;
pub mod docs;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod route;
pub mod routing;
pub mod template;

pub use config::schema::RedirectConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use route::{compile, mount, run_tests, Route};
pub use routing::RouteTable;
