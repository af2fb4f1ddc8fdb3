//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes together with their path patterns
//! - Look up the route for a request path
//! - Return matched route with captures, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Patterns sorted by specificity once; lookup is a linear scan
//! - Patterns of identical shape: the last registration wins

use std::collections::HashMap;
use std::sync::Arc;

use crate::route::Route;
use crate::routing::matcher::PathPattern;

/// A path pattern bound to the route that serves it.
#[derive(Debug, Clone)]
pub struct RouteHandler {
    pattern: PathPattern,
    route: Arc<Route>,
    index: usize,
}

impl RouteHandler {
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Index of the route in the compiled batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Method and pattern, e.g. `GET /docs/{page}`.
    pub fn key(&self) -> String {
        format!("GET {}", self.pattern)
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub handler: &'a RouteHandler,
    pub captures: HashMap<String, String>,
}

/// Immutable lookup table over all compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    handlers: Vec<RouteHandler>,
}

impl RouteTable {
    /// Build the table. Every path and alias of every route becomes a handler.
    pub fn new(routes: Vec<Route>) -> Self {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();

        let mut by_shape: HashMap<String, usize> = HashMap::new();
        let mut handlers: Vec<RouteHandler> = Vec::new();
        for (index, route) in routes.iter().enumerate() {
            for pattern in route.paths() {
                let handler = RouteHandler {
                    pattern: pattern.clone(),
                    route: route.clone(),
                    index,
                };
                match by_shape.get(&pattern.shape()) {
                    Some(&slot) => {
                        tracing::warn!(
                            pattern = %pattern,
                            replaced = %handlers[slot].pattern,
                            route_index = index,
                            "Path registered twice, last registration wins"
                        );
                        handlers[slot] = handler;
                    }
                    None => {
                        by_shape.insert(pattern.shape(), handlers.len());
                        handlers.push(handler);
                    }
                }
            }
        }

        handlers.sort_by(|a, b| a.pattern.specificity_cmp(&b.pattern));

        Self { routes, handlers }
    }

    /// All compiled routes in declaration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// All mounted (pattern, route) pairs, most specific first.
    pub fn handlers(&self) -> &[RouteHandler] {
        &self.handlers
    }

    /// Find the most specific handler matching `path`.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.handlers.iter().find_map(|handler| {
            handler
                .pattern
                .match_path(path)
                .map(|captures| RouteMatch { handler, captures })
        })
    }
}
