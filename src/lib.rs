//! # bendf
//!
//! **bendf** is a minimal, coroutine-powered HTTP request dispatcher. Routes are declared
//! in code as [`RouteDefinition`](route::RouteDefinition)s carrying a method, a path
//! pattern, a handler, optional JSON Schemas for input, query parameters and response,
//! and the roles allowed to call them. The dispatcher resolves each request, asks an
//! optional [`Authorizer`](security::Authorizer), decodes the body (JSON or
//! `multipart/form-data`), validates, calls the handler and validates its result.
//!
//! ## Architecture
//!
//! - **[`route`]** - route declarations, the [`Handler`](route::Handler) trait and
//!   [`HandlerError`](route::HandlerError)
//! - **[`router`]** - route registry and path matcher (`/tasks/{id}` templates)
//! - **[`multipart`]** - binary-safe `multipart/form-data` decoder
//! - **[`validator`]** - the [`Validator`](validator::Validator) seam and its JSON Schema
//!   implementation, with a compiled-schema cache in [`validator_cache`]
//! - **[`security`]** - the [`Authorizer`](security::Authorizer) seam plus static-token
//!   and JWT-role authorizers
//! - **[`dispatcher`]** - the request pipeline and error-to-response mapping
//! - **[`server`]** - HTTP/1.1 over `may::net`, one coroutine per connection
//! - **[`runtime_config`]**, **[`logging`]**, **[`ids`]** - environment configuration,
//!   `tracing` setup, request ids
//! - **[`cli`]**, **[`demo`]** - the `bendf` binary and its demo route table
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may coroutine)
//!     participant Dispatcher
//!     participant Router
//!     participant Auth as Authorizer
//!     participant Body as Body decoder<br/>(JSON / multipart)
//!     participant Val as Validator
//!     participant Handler
//!
//!     Client->>Server: POST /tasks
//!     Server->>Server: Parse request line, headers,<br/>Content-Length body
//!     Server->>Dispatcher: dispatch(&RawRequest)
//!     Dispatcher->>Router: route(POST, "/tasks")
//!     alt No Route Match
//!         Dispatcher-->>Client: 404 {"error":"Route not found"}
//!     end
//!     Router-->>Dispatcher: RouteMatch (route, path params)
//!
//!     opt Route declares roles and an authorizer is set
//!         Dispatcher->>Auth: authorize(request, roles)
//!         alt Falsy principal or error
//!             Dispatcher-->>Client: 403 {"error":"Forbidden"}
//!         end
//!     end
//!
//!     Dispatcher->>Body: JSON or multipart/form-data
//!     Dispatcher->>Val: validate(input, input schema)
//!     Dispatcher->>Val: validate(query + path params, queryParams schema)
//!     Dispatcher->>Handler: handle(RequestData)
//!     alt Error or panic
//!         Dispatcher-->>Client: 500 {"error": message}
//!     end
//!     Handler-->>Dispatcher: JSON result
//!     Dispatcher->>Val: validate(result, response schema)
//!     Dispatcher-->>Server: HandlerResponse 200
//!     Server-->>Client: HTTP/1.1 200 OK + JSON body
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use bendf::dispatcher::Dispatcher;
//! use bendf::route::RouteDefinition;
//! use bendf::server::{AppService, HttpServer};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let hello = RouteDefinition::builder()
//!     .method("GET")
//!     .path("/hello")
//!     .handler(|_req| Ok(json!({ "message": "hello" })))
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Arc::new(Dispatcher::builder().route(hello).build());
//! let handle = HttpServer(AppService::new(dispatcher)).start("0.0.0.0:8080").unwrap();
//! handle.join().unwrap();
//! ```
//!
//! ## Runtime Considerations
//!
//! bendf uses the `may` coroutine runtime, not tokio. Handlers are synchronous
//! functions that run on the connection's coroutine; blocking through `may` primitives
//! yields to the scheduler. Coroutine stack size is configurable via `BENDF_STACK_SIZE`.

pub mod cli;
pub mod demo;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod multipart;
pub mod route;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod validator;
pub mod validator_cache;

pub use dispatcher::{Dispatcher, DispatcherBuilder, HandlerResponse, RequestData};
pub use route::{HandlerError, RouteDefinition};
pub use router::Router;
