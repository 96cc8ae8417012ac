//! # Route Definitions
//!
//! A [`RouteDefinition`] is the typed declaration of one endpoint: HTTP method, path
//! pattern, handler, optional input / query-parameter / response schemas and the roles
//! an [`Authorizer`](crate::security::Authorizer) must grant before the handler runs.
//!
//! Definitions are built once at startup through [`RouteDefinition::builder`] and handed
//! to the [`Router`](crate::router::Router). A definition that is missing its method,
//! path or handler never makes it into the table: [`RouteDefinitionBuilder::build`]
//! rejects it with a [`RouteDefinitionError`].
//!
//! ```rust
//! use bendf::route::RouteDefinition;
//! use serde_json::json;
//!
//! let route = RouteDefinition::builder()
//!     .method("post")
//!     .path("/tasks")
//!     .input_schema(json!({
//!         "type": "object",
//!         "required": ["title"],
//!         "properties": { "title": { "type": "string" } }
//!     }))
//!     .roles(["ADMIN"])
//!     .handler(|req| Ok(req.input.unwrap_or_default()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(route.method().as_str(), "POST");
//! assert!(!route.is_templated());
//! ```

use crate::dispatcher::RequestData;
use crate::router::is_param_segment;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A JSON Schema document attached to a route.
pub type Schema = Value;

/// Contract every route handler fulfils.
///
/// Handlers run inside the connection's coroutine; blocking I/O performed through
/// `may` primitives yields to the scheduler instead of parking the worker thread.
pub trait Handler: Send + Sync {
    /// Produce the JSON result for one request.
    ///
    /// # Errors
    ///
    /// Any [`HandlerError`] becomes a 500 response carrying its message.
    fn handle(&self, req: RequestData) -> Result<Value, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(RequestData) -> Result<Value, HandlerError> + Send + Sync,
{
    fn handle(&self, req: RequestData) -> Result<Value, HandlerError> {
        self(req)
    }
}

/// Error raised by a handler.
///
/// The message, when present, is surfaced to the client as the `error` field of the
/// 500 body; without one the generic `"Internal server error"` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerError {
    message: Option<String>,
}

impl HandlerError {
    /// Error with a client-visible message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Error without a message.
    #[must_use]
    pub fn opaque() -> Self {
        Self { message: None }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => f.write_str(m),
            None => f.write_str("Internal server error"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Reasons a route declaration is rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDefinitionError {
    /// No HTTP method was supplied.
    MissingMethod,
    /// The method string is not a valid HTTP token.
    InvalidMethod(String),
    /// No path pattern was supplied.
    MissingPath,
    /// The path pattern does not start with `/`.
    InvalidPath(String),
    /// No handler was supplied.
    MissingHandler,
}

impl fmt::Display for RouteDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDefinitionError::MissingMethod => write!(f, "route definition has no method"),
            RouteDefinitionError::InvalidMethod(m) => {
                write!(f, "route definition has an invalid method '{m}'")
            }
            RouteDefinitionError::MissingPath => write!(f, "route definition has no path"),
            RouteDefinitionError::InvalidPath(p) => {
                write!(f, "route path '{p}' must start with '/'")
            }
            RouteDefinitionError::MissingHandler => write!(f, "route definition has no handler"),
        }
    }
}

impl std::error::Error for RouteDefinitionError {}

/// One registered endpoint. Immutable once built.
#[derive(Clone)]
pub struct RouteDefinition {
    method: Method,
    path_pattern: String,
    handler: Arc<dyn Handler>,
    input_schema: Option<Schema>,
    query_params_schema: Option<Schema>,
    response_schema: Option<Schema>,
    required_roles: Vec<String>,
}

impl RouteDefinition {
    #[must_use]
    pub fn builder() -> RouteDefinitionBuilder {
        RouteDefinitionBuilder::default()
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path_pattern(&self) -> &str {
        &self.path_pattern
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    #[must_use]
    pub fn input_schema(&self) -> Option<&Schema> {
        self.input_schema.as_ref()
    }

    #[must_use]
    pub fn query_params_schema(&self) -> Option<&Schema> {
        self.query_params_schema.as_ref()
    }

    #[must_use]
    pub fn response_schema(&self) -> Option<&Schema> {
        self.response_schema.as_ref()
    }

    /// Roles in declaration order, duplicates removed.
    #[must_use]
    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    /// A route is templated when at least one path segment is a `{name}` parameter.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.path_pattern.split('/').any(is_param_segment)
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("path_pattern", &self.path_pattern)
            .field("input_schema", &self.input_schema.is_some())
            .field("query_params_schema", &self.query_params_schema.is_some())
            .field("response_schema", &self.response_schema.is_some())
            .field("required_roles", &self.required_roles)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RouteDefinition`]. Method, path and handler are mandatory.
#[derive(Default)]
pub struct RouteDefinitionBuilder {
    method: Option<String>,
    path: Option<String>,
    handler: Option<Arc<dyn Handler>>,
    input_schema: Option<Schema>,
    query_params_schema: Option<Schema>,
    response_schema: Option<Schema>,
    required_roles: Vec<String>,
}

impl RouteDefinitionBuilder {
    /// HTTP method, case-insensitive (`"post"` and `"POST"` are the same route).
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Path pattern made of literal and `{name}` segments, e.g. `/tasks/{id}`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RequestData) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn input_schema(mut self, schema: Schema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn query_params_schema(mut self, schema: Schema) -> Self {
        self.query_params_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn response_schema(mut self, schema: Schema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for role in roles {
            let role = role.into();
            if !self.required_roles.contains(&role) {
                self.required_roles.push(role);
            }
        }
        self
    }

    /// Validate the declaration and freeze it.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteDefinitionError`] when the method, path or handler is missing,
    /// the method is not a valid token, or the path does not start with `/`.
    pub fn build(self) -> Result<RouteDefinition, RouteDefinitionError> {
        let raw_method = self.method.ok_or(RouteDefinitionError::MissingMethod)?;
        let upper = raw_method.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(RouteDefinitionError::MissingMethod);
        }
        let method = Method::from_bytes(upper.as_bytes())
            .map_err(|_| RouteDefinitionError::InvalidMethod(raw_method.clone()))?;

        let path_pattern = self.path.ok_or(RouteDefinitionError::MissingPath)?;
        if path_pattern.is_empty() {
            return Err(RouteDefinitionError::MissingPath);
        }
        if !path_pattern.starts_with('/') {
            return Err(RouteDefinitionError::InvalidPath(path_pattern));
        }

        let handler = self.handler.ok_or(RouteDefinitionError::MissingHandler)?;

        Ok(RouteDefinition {
            method,
            path_pattern,
            handler,
            input_schema: self.input_schema,
            query_params_schema: self.query_params_schema,
            response_schema: self.response_schema,
            required_roles: self.required_roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_handler(_: RequestData) -> Result<Value, HandlerError> {
        Ok(json!({}))
    }

    #[test]
    fn test_build_uppercases_method() {
        let route = RouteDefinition::builder()
            .method("patch")
            .path("/items/{id}")
            .handler(ok_handler)
            .build()
            .unwrap();
        assert_eq!(route.method(), &Method::PATCH);
        assert!(route.is_templated());
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = RouteDefinition::builder()
            .path("/x")
            .handler(ok_handler)
            .build()
            .unwrap_err();
        assert_eq!(err, RouteDefinitionError::MissingMethod);

        let err = RouteDefinition::builder()
            .method("GET")
            .handler(ok_handler)
            .build()
            .unwrap_err();
        assert_eq!(err, RouteDefinitionError::MissingPath);

        let err = RouteDefinition::builder()
            .method("GET")
            .path("/x")
            .build()
            .unwrap_err();
        assert_eq!(err, RouteDefinitionError::MissingHandler);
    }

    #[test]
    fn test_relative_path_is_rejected() {
        let err = RouteDefinition::builder()
            .method("GET")
            .path("tasks")
            .handler(ok_handler)
            .build()
            .unwrap_err();
        assert_eq!(err, RouteDefinitionError::InvalidPath("tasks".to_string()));
    }

    #[test]
    fn test_roles_keep_order_without_duplicates() {
        let route = RouteDefinition::builder()
            .method("GET")
            .path("/tasks")
            .roles(["ADMIN", "MEMBER", "ADMIN"])
            .handler(ok_handler)
            .build()
            .unwrap();
        assert_eq!(route.required_roles(), &["ADMIN".to_string(), "MEMBER".to_string()]);
    }

    #[test]
    fn test_handler_error_display() {
        assert_eq!(HandlerError::new("boom").to_string(), "boom");
        assert_eq!(HandlerError::opaque().to_string(), "Internal server error");
    }
}
