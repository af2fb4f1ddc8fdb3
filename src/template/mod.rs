//! Template and check-expression engine.
//!
//! # Data Flow
//! ```text
//! Compile time (route::compile):
//!     template source  → TemplateSet::add_template → TemplateRef
//!     check expression → TemplateSet::add_check    → CheckRef
//!
//! Request time (route evaluation):
//!     RequestScope → render_params → param value
//!     ParamMap     → evaluate      → CheckOutcome
//!     ParamMap     → render        → error message / redirect URL
//! ```
//!
//! # Design Decisions
//! - One minijinja `Environment` per route; templates are parsed once and
//!   only executed per request
//! - Strict undefined: referencing an unknown variable is a render error
//! - No auto-escaping; output is a URL or plain text
//! - Check expressions are syntax-checked standalone and statically typed
//!   over string params (see `typecheck`), so they always yield a bool;
//!   they are stored as an `{% if %}` template that renders a marker on `true`
//! - The param map is the complete value model for checks: string keys to
//!   string values

pub mod pool;
pub mod scope;
pub mod typecheck;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};
use serde::Serialize;
use thiserror::Error;

pub use pool::{BufferPool, PooledBuffer};
pub use scope::RequestScope;

/// Rendered params, the only input checks and the redirect template see.
pub type ParamMap = HashMap<String, String>;

/// What a check wrapper template renders when the expression is `true`.
const CHECK_PASSED: &str = "1";

/// Error raised while compiling a template or check expression.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Syntax(#[from] minijinja::Error),

    #[error("no expression to evaluate")]
    EmptyExpression,

    #[error("undeclared reference to {}", .0.iter().map(|v| format!("'{v}'")).collect::<Vec<_>>().join(", "))]
    UndeclaredVariables(Vec<String>),

    #[error("{0}")]
    Type(String),
}

/// Handle to a compiled template inside a `TemplateSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef(String);

impl TemplateRef {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Handle to a compiled check expression inside a `TemplateSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRef(String);

/// The variables a check expression may reference: the route's param names,
/// all string typed.
#[derive(Debug, Clone, Default)]
pub struct CheckVariables(BTreeSet<String>);

impl CheckVariables {
    pub fn from_params<V>(params: &BTreeMap<String, V>) -> Self {
        Self(params.keys().cloned().collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

/// Result of a check that evaluated without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The expression yielded boolean `true`.
    Passed,
    /// The expression yielded anything else.
    Failed,
}

/// The compiled templates and checks of a single route.
#[derive(Debug)]
pub struct TemplateSet {
    env: Environment<'static>,
    pool: Arc<BufferPool>,
}

impl TemplateSet {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function("get_path", scope::get_path);
        env.add_function("get_query", scope::get_query);
        env.add_function("get_header", scope::get_header);
        env.add_function("get_env", scope::get_env);
        Self { env, pool }
    }

    /// Parse `source` and register it under `name`.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: &str,
    ) -> Result<TemplateRef, TemplateError> {
        let name = name.into();
        self.env.add_template_owned(name.clone(), source.to_owned())?;
        Ok(TemplateRef(name))
    }

    /// Compile a boolean check expression that may only reference `variables`.
    pub fn add_check(
        &mut self,
        name: impl Into<String>,
        expr: &str,
        variables: &CheckVariables,
    ) -> Result<CheckRef, TemplateError> {
        if expr.trim().is_empty() {
            return Err(TemplateError::EmptyExpression);
        }
        // Rejects anything that is not exactly one expression
        self.env.compile_expression(expr)?;

        let name = name.into();
        self.env
            .add_template_owned(
                name.clone(),
                format!("{{% if ({expr}) %}}{CHECK_PASSED}{{% endif %}}"),
            )?;

        let mut undeclared: Vec<String> = self
            .env
            .get_template(&name)?
            .undeclared_variables(false)
            .into_iter()
            .filter(|v| !variables.contains(v))
            .collect();
        if !undeclared.is_empty() {
            undeclared.sort();
            return Err(TemplateError::UndeclaredVariables(undeclared));
        }
        typecheck::check_expression(expr, variables).map_err(TemplateError::Type)?;

        Ok(CheckRef(name))
    }

    /// Render a param template with the request scope bound.
    pub fn render_param(&self, template: &TemplateRef, scope: &Value) -> Result<String, minijinja::Error> {
        let ctx = BTreeMap::from([(scope::SCOPE_VAR, scope.clone())]);
        self.render(template, ctx)
    }

    /// Render a template against `ctx`.
    pub fn render<S: Serialize>(&self, template: &TemplateRef, ctx: S) -> Result<String, minijinja::Error> {
        let template = self.env.get_template(&template.0)?;
        let mut buffer = self.pool.acquire();
        template.render_captured_to(ctx, &mut *buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Evaluate a check against the rendered params.
    ///
    /// `Err` means the expression itself failed; a non-`true` value is
    /// `Ok(CheckOutcome::Failed)`.
    pub fn evaluate(&self, check: &CheckRef, params: &ParamMap) -> Result<CheckOutcome, minijinja::Error> {
        let template = self.env.get_template(&check.0)?;
        if template.render(params)? == CHECK_PASSED {
            Ok(CheckOutcome::Passed)
        } else {
            Ok(CheckOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::environment::{AllowListedEnv, MapEnv};
    use axum::http::HeaderMap;
    use std::collections::HashSet;

    fn set() -> TemplateSet {
        TemplateSet::new(Arc::new(BufferPool::default()))
    }

    fn variables(names: &[&str]) -> CheckVariables {
        CheckVariables(names.iter().map(|n| n.to_string()).collect())
    }

    fn params(pairs: &[(&str, &str)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_params_map() {
        let mut set = set();
        let tmpl = set.add_template("redirect", "https://{{ host }}/id/{{ id }}").unwrap();
        let rendered = set
            .render(&tmpl, params(&[("host", "example.com"), ("id", "42")]))
            .unwrap();
        assert_eq!(rendered, "https://example.com/id/42");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut set = set();
        let tmpl = set.add_template("page.html", "{{ q }}").unwrap();
        let rendered = set.render(&tmpl, params(&[("q", "a&b=\"c\"")])).unwrap();
        assert_eq!(rendered, "a&b=\"c\"");
    }

    #[test]
    fn test_undefined_variable_is_render_error() {
        let mut set = set();
        let tmpl = set.add_template("redirect", "https://{{ missing }}").unwrap();
        assert!(set.render(&tmpl, params(&[])).is_err());
    }

    #[test]
    fn test_syntax_error() {
        let mut set = set();
        let err = set.add_template("params.id", "{{{}}").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn test_capabilities_render_from_scope() {
        let mut set = set();
        let tmpl = set
            .add_template(
                "params.all",
                r#"{{ get_path("id") }}|{{ get_query("q") }}|{{ get_header("x-h") }}|{{ get_env("HOST") }}|{{ get_env("NOPE") }}"#,
            )
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-h", "abc".parse().unwrap());
        let env = AllowListedEnv::new(
            Arc::new(HashSet::from(["HOST".to_string()])),
            Arc::new(MapEnv::new().with("HOST", "example.com").with("NOPE", "leak")),
        );
        let scope = RequestScope::new(
            HashMap::from([("id".to_string(), "wasd".to_string())]),
            Some("q=xyz".to_string()),
            headers,
            env,
        )
        .into_value();

        assert_eq!(set.render_param(&tmpl, &scope).unwrap(), "wasd|xyz|abc|example.com|");
    }

    #[test]
    fn test_capabilities_unavailable_outside_params() {
        let mut set = set();
        let tmpl = set.add_template("redirect", r#"{{ get_env("HOST") }}"#).unwrap();
        let err = set.render(&tmpl, params(&[])).unwrap_err();
        assert!(err.to_string().contains("only available in param templates"));
    }

    #[test]
    fn test_check_passes_only_on_true() {
        let mut set = set();
        let vars = variables(&["host", "id"]);
        let check = set.add_check("checks.0.expr", r#"host != """#, &vars).unwrap();

        assert_eq!(
            set.evaluate(&check, &params(&[("host", "example.com"), ("id", "")])).unwrap(),
            CheckOutcome::Passed
        );
        assert_eq!(
            set.evaluate(&check, &params(&[("host", ""), ("id", "")])).unwrap(),
            CheckOutcome::Failed
        );

        // Truthy but not boolean
        assert!(matches!(
            set.add_check("checks.1.expr", "host", &vars),
            Err(TemplateError::Type(_))
        ));
    }

    #[test]
    fn test_ill_typed_checks_rejected() {
        let mut set = set();
        let vars = variables(&["host"]);

        for (i, expr) in ["host == 1", "host > 3", "host + 1 > 2", "host"].iter().enumerate() {
            let err = set.add_check(format!("checks.{i}.expr"), expr, &vars).unwrap_err();
            assert!(matches!(err, TemplateError::Type(_)), "{expr}: {err}");
        }
    }

    #[test]
    fn test_check_evaluation_error() {
        let mut set = set();
        let vars = variables(&["id"]);
        let check = set.add_check("checks.0.expr", "id | int > 3", &vars).unwrap();
        assert!(set.evaluate(&check, &params(&[("id", "abc")])).is_err());
        assert_eq!(
            set.evaluate(&check, &params(&[("id", "7")])).unwrap(),
            CheckOutcome::Passed
        );
    }

    #[test]
    fn test_check_compile_errors() {
        let mut set = set();
        let vars = variables(&["host"]);

        assert!(matches!(
            set.add_check("c0", "", &vars),
            Err(TemplateError::EmptyExpression)
        ));
        assert!(matches!(
            set.add_check("c1", "{", &vars),
            Err(TemplateError::Syntax(_))
        ));
        assert!(matches!(
            set.add_check("c2", "host == 1 %}{% set x = 2", &vars),
            Err(TemplateError::Syntax(_))
        ));

        let err = set.add_check("c3", "port != '' and user != ''", &vars).unwrap_err();
        assert_eq!(err.to_string(), "undeclared reference to 'port', 'user'");
    }
}
