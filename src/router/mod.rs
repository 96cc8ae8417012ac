//! # Router Module
//!
//! The router module is the route registry of bendf. It stores every
//! [`RouteDefinition`](crate::route::RouteDefinition) registered at startup and resolves
//! an incoming `(method, path)` pair to one of them.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Keeping static routes (no `{param}` segment) in an exact-match index
//! - Keeping templated routes in registration order
//! - Extracting path parameters from templated matches
//! - Exposing the registered table for the route catalog
//!
//! ## Resolution order
//!
//! 1. **Exact match**: the static index is consulted first, so `GET /tasks` always wins
//!    over a templated `GET /{resource}`.
//! 2. **Templated scan**: templated routes with the same method are tried in the order
//!    they were registered; the first structural match wins. There is no specificity
//!    ranking.
//!
//! ## Example
//!
//! ```rust
//! use bendf::route::RouteDefinition;
//! use bendf::router::Router;
//! use http::Method;
//! use serde_json::json;
//!
//! let mut router = Router::new();
//! router.register(
//!     RouteDefinition::builder()
//!         .method("GET")
//!         .path("/users/{id}")
//!         .handler(|_| Ok(json!({})))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let m = router.route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(router.route(&Method::GET, "/users/42/extra").is_none());
//! ```
//!
//! ## Concurrency
//!
//! The router is populated once before the server accepts connections and is only read
//! afterwards, so lookups take `&self` and need no locking.

mod core;
mod matcher;

pub use self::core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use matcher::{is_param_segment, match_path, param_name};
