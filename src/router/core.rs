//! Router core module - hot path for request routing.
//!
//! Static lookups borrow the request path (no key allocation); only the matched
//! parameter values are allocated.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::matcher::match_path;
use crate::route::RouteDefinition;
use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>`; values are per-request strings taken verbatim from
/// the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the registry)
    pub route: Arc<RouteDefinition>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `{"id": "123"}`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Route registry: exact-match index for static routes, ordered list for templated ones.
///
/// # Invariants
///
/// - `(method, path)` is unique among static routes; registering the same key again
///   replaces the earlier route silently.
/// - Templated routes keep registration order and are scanned first to last.
#[derive(Clone, Default)]
pub struct Router {
    /// method → exact path → route
    static_routes: HashMap<Method, HashMap<String, Arc<RouteDefinition>>>,
    /// `(method, path)` of static routes in first-registration order, for listings
    static_order: Vec<(Method, String)>,
    /// Templated routes, first registered first tried
    templated_routes: Vec<Arc<RouteDefinition>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from a route table, registering in iteration order.
    #[must_use]
    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        let mut router = Self::new();
        for route in routes {
            router.register(route);
        }
        info!(
            static_routes = router.static_order.len(),
            templated_routes = router.templated_routes.len(),
            "Routing table loaded"
        );
        router
    }

    /// Register one route.
    ///
    /// Static routes go into the exact-match index keyed by method and path; templated
    /// routes are appended to the ordered scan list.
    pub fn register(&mut self, route: RouteDefinition) {
        let method = route.method().clone();
        let path = route.path_pattern().to_string();

        if route.is_templated() {
            debug!(method = %method, path = %path, "Templated route registered");
            self.templated_routes.push(Arc::new(route));
            return;
        }

        let by_path = self.static_routes.entry(method.clone()).or_default();
        if by_path.insert(path.clone(), Arc::new(route)).is_some() {
            warn!(
                method = %method,
                path = %path,
                "Static route registered twice - last registration wins"
            );
        } else {
            debug!(method = %method, path = %path, "Static route registered");
            self.static_order.push((method, path));
        }
    }

    /// Resolve a request to a route.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - exact static match, or the first templated match
    /// * `None` - no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let match_start = Instant::now();

        if let Some(route) = self
            .static_routes
            .get(method)
            .and_then(|by_path| by_path.get(path))
        {
            debug!(
                method = %method,
                path = %path,
                kind = "static",
                duration_us = match_start.elapsed().as_micros(),
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(route),
                path_params: ParamVec::new(),
            });
        }

        for route in self.templated_routes.iter().filter(|r| r.method() == method) {
            if let Some(path_params) = match_path(route.path_pattern(), path) {
                let match_duration = match_start.elapsed();
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.path_pattern(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        kind = "templated",
                        route_pattern = %route.path_pattern(),
                        path_params = ?path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
        }

        debug!(
            method = %method,
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        None
    }

    /// All routes: static routes in first-registration order, then templated routes.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> + '_ {
        self.static_order
            .iter()
            .filter_map(|(method, path)| {
                self.static_routes
                    .get(method)
                    .and_then(|by_path| by_path.get(path))
            })
            .chain(self.templated_routes.iter())
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.static_order.len() + self.templated_routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.len());
        for route in self.routes() {
            let roles = route.required_roles();
            if roles.is_empty() {
                println!("[route] {} {}", route.method(), route.path_pattern());
            } else {
                println!(
                    "[route] {} {} (roles: {})",
                    route.method(),
                    route.path_pattern(),
                    roles.join(", ")
                );
            }
        }
    }
}
