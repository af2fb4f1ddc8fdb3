//! Request-scoped capabilities for param templates.
//!
//! Param templates read request data through four functions:
//!
//! | function            | reads                                        |
//! |---------------------|----------------------------------------------|
//! | `get_path("id")`    | named path capture                           |
//! | `get_query("q")`    | first value of a query parameter             |
//! | `get_header("x-a")` | first value of a header (case-insensitive)   |
//! | `get_env("HOST")`   | allow-listed environment variable            |
//!
//! Unknown keys yield `""`. The functions fail outside a param template,
//! where no request scope is bound.
//!
//! Percent-decoded path captures and query values that are not valid UTF-8
//! have the bad sequences replaced with U+FFFD (`?a=%C3%28` reads as
//! `"\u{FFFD}("`). Header values that are not visible ASCII read as `""`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use minijinja::value::{Object, ObjectRepr};
use minijinja::{Error, ErrorKind, State, Value};

use crate::route::environment::AllowListedEnv;

/// Context variable the request scope is bound to while rendering params.
pub(crate) const SCOPE_VAR: &str = "__request";

/// Request data visible to param templates.
#[derive(Debug)]
pub struct RequestScope {
    captures: HashMap<String, String>,
    query: Option<String>,
    headers: HeaderMap,
    env: AllowListedEnv,
}

impl RequestScope {
    pub fn new(
        captures: HashMap<String, String>,
        query: Option<String>,
        headers: HeaderMap,
        env: AllowListedEnv,
    ) -> Self {
        Self { captures, query, headers, env }
    }

    pub fn path(&self, key: &str) -> String {
        self.captures.get(key).cloned().unwrap_or_default()
    }

    pub fn query(&self, key: &str) -> String {
        let Some(query) = &self.query else {
            return String::new();
        };
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    pub fn header(&self, key: &str) -> String {
        self.headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_default()
    }

    pub fn env(&self, key: &str) -> String {
        self.env.get(key)
    }

    /// Wrap the scope as a template value.
    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for RequestScope {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }
}

fn with_scope(
    state: &State,
    function: &str,
    read: impl FnOnce(&RequestScope) -> String,
) -> Result<String, Error> {
    let unavailable = || {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("{function}() is only available in param templates"),
        )
    };
    let value = state.lookup(SCOPE_VAR).ok_or_else(unavailable)?;
    let scope = value.downcast_object_ref::<RequestScope>().ok_or_else(unavailable)?;
    Ok(read(scope))
}

pub(crate) fn get_path(state: &State, key: &str) -> Result<String, Error> {
    with_scope(state, "get_path", |scope| scope.path(key))
}

pub(crate) fn get_query(state: &State, key: &str) -> Result<String, Error> {
    with_scope(state, "get_query", |scope| scope.query(key))
}

pub(crate) fn get_header(state: &State, key: &str) -> Result<String, Error> {
    with_scope(state, "get_header", |scope| scope.header(key))
}

pub(crate) fn get_env(state: &State, key: &str) -> Result<String, Error> {
    with_scope(state, "get_env", |scope| scope.env(key))
}
