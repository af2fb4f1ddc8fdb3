//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum setup, listener, graceful shutdown)
//!     → request.rs (assign and echo x-request-id)
//!     → docs page, or route::mount dispatch
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod tls;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
