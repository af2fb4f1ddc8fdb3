//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → subscribers (HTTP server) stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup in main: config, logging, compile, docs page, listen
//! - Self-tests run only under the `validate` command, never while serving
//! - Plain HTTP drains until in-flight requests finish; HTTPS drops
//!   connections still open after `DRAIN_TIMEOUT`

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
