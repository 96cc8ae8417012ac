use super::core::HandlerResponse;
use crate::multipart::MultipartError;
use crate::route::HandlerError;
use crate::security::AuthorizerError;
use crate::validator::ValidationError;
use serde_json::{json, Value};
use std::fmt;

/// Which payload failed schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTarget {
    Input,
    QueryParams,
    Response,
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationTarget::Input => "input",
            ValidationTarget::QueryParams => "queryParams",
            ValidationTarget::Response => "response",
        })
    }
}

/// Every way a request can fail inside the dispatcher.
///
/// | Variant | Status | Body |
/// |---|---|---|
/// | `RouteNotFound` | 404 | `{"error":"Route not found"}` |
/// | `Forbidden` | 403 | `{"error":"Forbidden","message":"Insufficient permissions"}` |
/// | `AuthorizationFailed` | 403 | `{"error":"Authorization failed"}` |
/// | `PayloadTooLarge` | 413 | `{"error":"Request body too large","message":...}` |
/// | everything else | 500 | `{"error":<message>}` |
///
/// Validation failures stay in the 500 class, input validation included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    RouteNotFound,
    Forbidden,
    AuthorizationFailed(AuthorizerError),
    Multipart(MultipartError),
    InvalidJson(String),
    PayloadTooLarge {
        limit: usize,
    },
    Validation {
        target: ValidationTarget,
        source: ValidationError,
    },
    Handler(HandlerError),
}

impl DispatchError {
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound => 404,
            DispatchError::Forbidden | DispatchError::AuthorizationFailed(_) => 403,
            DispatchError::PayloadTooLarge { .. } => 413,
            DispatchError::Multipart(_)
            | DispatchError::InvalidJson(_)
            | DispatchError::Validation { .. }
            | DispatchError::Handler(_) => 500,
        }
    }

    /// JSON error body sent to the client.
    ///
    /// The authorizer's own failure message is logged but never exposed.
    #[must_use]
    pub fn to_body(&self) -> Value {
        match self {
            DispatchError::RouteNotFound => json!({ "error": "Route not found" }),
            DispatchError::Forbidden => {
                json!({ "error": "Forbidden", "message": "Insufficient permissions" })
            }
            DispatchError::AuthorizationFailed(_) => json!({ "error": "Authorization failed" }),
            DispatchError::PayloadTooLarge { limit } => json!({
                "error": "Request body too large",
                "message": format!("limit is {limit} bytes"),
            }),
            DispatchError::Multipart(e) => json!({ "error": e.to_string() }),
            DispatchError::InvalidJson(msg) => json!({ "error": msg }),
            DispatchError::Validation { source, .. } => json!({ "error": source.to_string() }),
            DispatchError::Handler(e) => json!({ "error": e.to_string() }),
        }
    }

    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        HandlerResponse::json(self.status(), self.to_body())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RouteNotFound => write!(f, "route not found"),
            DispatchError::Forbidden => write!(f, "forbidden: insufficient permissions"),
            DispatchError::AuthorizationFailed(e) => write!(f, "authorization failed: {e}"),
            DispatchError::Multipart(e) => write!(f, "{e}"),
            DispatchError::InvalidJson(msg) => write!(f, "invalid JSON body: {msg}"),
            DispatchError::PayloadTooLarge { limit } => {
                write!(f, "request body exceeds {limit} bytes")
            }
            DispatchError::Validation { target, source } => {
                write!(f, "{target} validation failed: {source}")
            }
            DispatchError::Handler(e) => write!(f, "handler error: {e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::AuthorizationFailed(e) => Some(e),
            DispatchError::Multipart(e) => Some(e),
            DispatchError::Validation { source, .. } => Some(source),
            DispatchError::Handler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MultipartError> for DispatchError {
    fn from(err: MultipartError) -> Self {
        DispatchError::Multipart(err)
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}
