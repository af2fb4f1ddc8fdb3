//! Redirect routes: compilation, evaluation and self-tests.
//!
//! # Data Flow
//! ```text
//! RouteDefinition[] (unvalidated, from config)
//!     → compiler.rs (paths, templates, checks, tests)
//!     → Route[] (immutable)
//!     → routing::RouteTable
//!     → mount.rs (axum router, GET dispatch)
//!         → evaluate.rs (params → checks → redirect)
//!     → selftest.rs (replay declared tests through the same router)
//! ```
//!
//! # Design Decisions
//! - `Route` has no public constructor: serving and self-tests accept only
//!   values produced by `compile`
//! - Environment reads go through an injected `EnvSource`

mod compiled;
mod compiler;
pub mod environment;
mod error;
mod evaluate;
mod mount;
mod selftest;

pub use compiled::{Route, RouteTest, TestRequest, TestResponse};
pub use compiler::compile;
pub use environment::{AllowListedEnv, EnvOverride, EnvSource, MapEnv, ProcessEnv};
pub use error::{DefinitionError, EvaluationError, SelfTestError, SelfTestFailure};
pub use evaluate::RequestInput;
pub use mount::mount;
pub use selftest::{run_tests, SelfTestReport};
