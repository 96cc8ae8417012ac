//! # Security Module
//!
//! Role-based authorization for routes that declare `required_roles`.
//!
//! ## Overview
//!
//! The dispatcher does not know how credentials are checked. It only calls an
//! [`Authorizer`] with the raw request and the route's required roles, and reads the
//! answer:
//!
//! | `authorize` returns | Dispatcher outcome |
//! |---|---|
//! | `Ok(Some(principal))` with a truthy principal | handler runs, principal becomes `auth_data` |
//! | `Ok(None)`, or a falsy principal (`null`, `false`, `0`, `""`) | 403 `Forbidden` |
//! | `Err(_)` | 403 `Authorization failed` |
//!
//! Routes without required roles, or a dispatcher without an authorizer, skip this step.
//!
//! ## Providers
//!
//! - [`StaticTokenAuthorizer`] maps bearer tokens to fixed principals; useful for
//!   service-to-service calls and tests
//! - [`JwtRoleAuthorizer`] reads a role claim from a bearer JWT payload. The signature is
//!   **not** verified; put a verifying proxy in front of it or supply your own
//!   [`Authorizer`]
//!
//! Any `Fn(&AuthorizationRequest<'_>) -> Result<Option<Principal>, AuthorizerError>`
//! closure is an authorizer too:
//!
//! ```rust
//! use bendf::security::{AuthorizationRequest, Authorizer, AuthorizerError, Principal};
//! use bendf::server::RawRequest;
//! use http::Method;
//! use serde_json::json;
//!
//! let api_key = |req: &AuthorizationRequest<'_>| -> Result<Option<Principal>, AuthorizerError> {
//!     Ok(req
//!         .get_header("x-api-key")
//!         .filter(|k| *k == "secret")
//!         .map(|_| json!({"role": "ADMIN"})))
//! };
//!
//! let raw = RawRequest::new(Method::GET, "/admin").header("X-Api-Key", "secret");
//! let roles = vec!["ADMIN".to_string()];
//! let req = AuthorizationRequest::new(&raw, &roles);
//! assert!(api_key.authorize(&req).unwrap().is_some());
//! ```

use crate::server::RawRequest;
use serde_json::Value;
use std::fmt;

mod bearer_jwt;
mod static_token;

pub use bearer_jwt::JwtRoleAuthorizer;
pub use static_token::StaticTokenAuthorizer;

/// Identity data returned by a successful authorization; handed to handlers as
/// `auth_data`.
pub type Principal = Value;

/// The authorizer itself failed (as opposed to rejecting the caller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerError {
    message: String,
}

impl AuthorizerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AuthorizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authorizer error: {}", self.message)
    }
}

impl std::error::Error for AuthorizerError {}

/// What an authorizer gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    /// The request as received, headers and body included
    pub request: &'a RawRequest,
    /// Roles declared on the matched route, in declaration order
    pub required_roles: &'a [String],
}

impl<'a> AuthorizationRequest<'a> {
    #[must_use]
    pub fn new(request: &'a RawRequest, required_roles: &'a [String]) -> Self {
        Self {
            request,
            required_roles,
        }
    }

    /// Header value by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&'a str> {
        self.request.get_header(name)
    }

    /// Token from an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&'a str> {
        self.get_header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// `true` when `role` is one of the route's required roles.
    #[must_use]
    pub fn requires(&self, role: &str) -> bool {
        self.required_roles.iter().any(|r| r == role)
    }
}

/// Authorization capability consulted for routes with required roles.
pub trait Authorizer: Send + Sync {
    /// Decide whether the request may proceed.
    ///
    /// # Errors
    ///
    /// [`AuthorizerError`] when the decision itself could not be made. The dispatcher
    /// answers 403 either way.
    fn authorize(
        &self,
        req: &AuthorizationRequest<'_>,
    ) -> Result<Option<Principal>, AuthorizerError>;
}

impl<F> Authorizer for F
where
    F: Fn(&AuthorizationRequest<'_>) -> Result<Option<Principal>, AuthorizerError> + Send + Sync,
{
    fn authorize(
        &self,
        req: &AuthorizationRequest<'_>,
    ) -> Result<Option<Principal>, AuthorizerError> {
        self(req)
    }
}

/// A principal counts as a grant unless it is `null`, `false`, `0` or an empty string.
#[must_use]
pub fn is_granted(principal: &Principal) -> bool {
    match principal {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Role names carried by `claim`, which may be a string or an array of strings.
pub(crate) fn roles_of<'v>(principal: &'v Value, claim: &str) -> Vec<&'v str> {
    match principal.get(claim) {
        Some(Value::String(role)) => vec![role.as_str()],
        Some(Value::Array(roles)) => roles.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
