//! # Dispatcher Module
//!
//! The dispatcher turns one raw request into one response. It owns the route table,
//! the optional [`Authorizer`](crate::security::Authorizer) and the
//! [`Validator`](crate::validator::Validator), and runs every request through the same
//! strictly ordered pipeline.
//!
//! ## Pipeline
//!
//! 1. **Resolve** the `(method, path)` pair in the [`Router`](crate::router::Router);
//!    no match is a 404
//! 2. **Authorize**, only when the route declares roles and an authorizer is configured;
//!    a rejection or an authorizer failure is a 403
//! 3. **Acquire the body** for `POST`, `PUT` and `PATCH`: `multipart/form-data` goes
//!    through the [multipart decoder](crate::multipart), anything else must be one JSON
//!    document
//! 4. **Validate the input** against the route's input schema
//! 5. **Merge context** into a [`RequestData`]: input, files, query-string and path
//!    parameters (validated against the query-parameter schema when one is declared) and
//!    the authorizer's principal, each only when non-empty
//! 6. **Invoke the handler**; errors and panics become 500s
//! 7. **Validate the output** against the response schema
//! 8. **Respond** with 200 and the handler's JSON result
//!
//! Every stage runs once; the first failure short-circuits and is converted into a
//! [`DispatchError`] response at the dispatcher boundary. Nothing propagates further,
//! and a response is always either a full success body or a full error body.
//!
//! ## Concurrency
//!
//! [`Dispatcher::dispatch`] takes `&self`. The route table is read-only after
//! [`DispatcherBuilder::build`], so one `Arc<Dispatcher>` is shared by every connection
//! coroutine without locking. Handlers run on the calling coroutine.
//!
//! ## Example
//!
//! ```rust
//! use bendf::dispatcher::Dispatcher;
//! use bendf::route::RouteDefinition;
//! use bendf::server::RawRequest;
//! use http::Method;
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::builder()
//!     .route(
//!         RouteDefinition::builder()
//!             .method("GET")
//!             .path("/tasks/{id}")
//!             .handler(|req| Ok(json!({ "id": req.query_param("id") })))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build();
//!
//! let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/tasks/7"));
//! assert_eq!(resp.body, json!({ "id": "7" }));
//!
//! let missing = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/nonexistent"));
//! assert_eq!(missing.status, 404);
//! assert_eq!(missing.body, json!({ "error": "Route not found" }));
//! ```

mod core;
mod error;

pub use self::core::{
    Dispatcher, DispatcherBuilder, HandlerResponse, HeaderVec, RequestData, MAX_INLINE_HEADERS,
};
pub use error::{DispatchError, ValidationTarget};
