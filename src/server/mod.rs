//! # Server Module
//!
//! Serves a [`Dispatcher`](crate::dispatcher::Dispatcher) over HTTP/1.1 with
//! `may_minihttp`: the library owns sockets, request-head parsing, keep-alive and
//! pipelining, and this module turns its requests into [`RawRequest`]s.
//!
//! ## Components
//!
//! - [`RawRequest`] - method, target, headers and buffered body of one request
//! - [`parse_request`] - converts a `may_minihttp` request, enforcing the body cap
//!   on the declared `Content-Length` before reading the body
//! - [`AppService`] - the `HttpService` that dispatches and writes JSON responses
//! - [`HttpServer`] / [`ServerHandle`] - start, readiness, stop and join
//!
//! ## Wire behaviour
//!
//! - Bodies are framed by `Content-Length` only; any `Transfer-Encoding` is answered
//!   with `501`
//! - An invalid `Content-Length` gets `400` and an oversized one `413`, both with a
//!   `{"error", "code"}` JSON body
//! - Requests `may_minihttp` cannot parse close the connection without a response
//!
//! ## Example
//!
//! ```rust,no_run
//! use bendf::dispatcher::Dispatcher;
//! use bendf::server::{AppService, HttpServer};
//! use std::sync::Arc;
//!
//! let dispatcher = Arc::new(Dispatcher::builder().build());
//! let handle = HttpServer(AppService::new(dispatcher)).start("127.0.0.1:8080").unwrap();
//! handle.wait_ready().unwrap();
//! handle.join().unwrap();
//! ```

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{
    body_capacity, expected_body_len, parse_request, request_from_head, RawRequest,
    RequestError,
};
pub use response::{body_bytes, status_reason, write_request_error, write_response};
pub use service::AppService;
