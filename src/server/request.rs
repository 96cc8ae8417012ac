//! Conversion of `may_minihttp` requests into [`RawRequest`]s.

use crate::dispatcher::HeaderVec;
use http::Method;
use may_minihttp::Request;
use serde_json::{json, Value};
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on the buffer reserved up front for a body; the declared length is not
/// trusted beyond this.
const MAX_BODY_PREALLOC: usize = 64 * 1024;

/// A request exactly as received: method, request-target, headers and the fully
/// buffered body.
///
/// Header names are stored lowercase; lookups are case-insensitive anyway. The builder
/// methods make it easy to construct requests without a socket:
///
/// ```rust
/// use bendf::server::RawRequest;
/// use http::Method;
///
/// let req = RawRequest::new(Method::POST, "/tasks?notify=1")
///     .header("Content-Type", "application/json")
///     .body(r#"{"title":"t"}"#);
/// assert_eq!(req.path(), "/tasks");
/// assert_eq!(req.query(), Some("notify=1"));
/// assert_eq!(req.content_type(), Some("application/json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub method: Method,
    /// Request-target as sent: path plus optional `?query`
    pub target: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the body and set `content-type: application/json`.
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    /// Form-urlencoded query pairs, percent-decoded, in order of appearance.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First header with the given name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// Declared `Content-Length`, if any.
    ///
    /// # Errors
    ///
    /// [`RequestError::InvalidContentLength`] when the value is not a byte count.
    pub fn content_length(&self) -> Result<Option<usize>, RequestError> {
        self.get_header("content-length")
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| RequestError::InvalidContentLength)
            })
            .transpose()
    }
}

/// Why a request was refused before reaching the dispatcher.
#[derive(Debug)]
pub enum RequestError {
    InvalidMethod,
    InvalidContentLength,
    BodyTooLarge { limit: usize },
    UnsupportedTransferEncoding,
    /// Reading the body off the socket failed; there is no one left to answer.
    Io(io::Error),
}

impl RequestError {
    /// Status to answer with; `None` when the connection is unusable.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::InvalidMethod | RequestError::InvalidContentLength => Some(400),
            RequestError::BodyTooLarge { .. } => Some(413),
            RequestError::UnsupportedTransferEncoding => Some(501),
            RequestError::Io(_) => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::InvalidMethod => "INVALID_METHOD",
            RequestError::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            RequestError::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            RequestError::UnsupportedTransferEncoding => "UNSUPPORTED_TRANSFER_ENCODING",
            RequestError::Io(_) => "IO_ERROR",
        }
    }

    /// `{"error": <description>, "code": <CODE>}`
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({ "error": self.to_string(), "code": self.code() })
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidMethod => write!(f, "Invalid HTTP method"),
            RequestError::InvalidContentLength => write!(f, "Invalid Content-Length"),
            RequestError::BodyTooLarge { .. } => write!(f, "Request body too large"),
            RequestError::UnsupportedTransferEncoding => {
                write!(f, "Transfer-Encoding is not supported")
            }
            RequestError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Build a body-less [`RawRequest`] from a parsed request head.
///
/// Header names are lowercased; values that are not UTF-8 are decoded lossily.
///
/// # Errors
///
/// [`RequestError::InvalidMethod`] when `method` is not a valid method token.
pub fn request_from_head<'a, I>(
    method: &str,
    target: &str,
    headers: I,
) -> Result<RawRequest, RequestError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let method =
        Method::from_bytes(method.as_bytes()).map_err(|_| RequestError::InvalidMethod)?;
    let mut req = RawRequest::new(method, target);
    for (name, value) in headers {
        req.headers.push((
            Arc::from(name.to_ascii_lowercase()),
            String::from_utf8_lossy(value).trim().to_string(),
        ));
    }
    Ok(req)
}

/// Number of body bytes to read for `req`, checked against `max_body_bytes`.
///
/// Bodies are framed by `Content-Length` only. A missing header means no body.
///
/// # Errors
///
/// - [`RequestError::UnsupportedTransferEncoding`] for any `Transfer-Encoding`
/// - [`RequestError::InvalidContentLength`] when the length is not a `usize`
/// - [`RequestError::BodyTooLarge`] when the length exceeds the cap
pub fn expected_body_len(
    req: &RawRequest,
    max_body_bytes: Option<usize>,
) -> Result<usize, RequestError> {
    if req.get_header("transfer-encoding").is_some() {
        return Err(RequestError::UnsupportedTransferEncoding);
    }
    let len = req.content_length()?.unwrap_or(0);
    match max_body_bytes {
        Some(limit) if len > limit => Err(RequestError::BodyTooLarge { limit }),
        _ => Ok(len),
    }
}

/// Capacity to reserve before reading a body of `len` declared bytes.
#[inline]
#[must_use]
pub fn body_capacity(len: usize) -> usize {
    len.min(MAX_BODY_PREALLOC)
}

/// Convert a `may_minihttp` request into a [`RawRequest`], reading its body.
///
/// The declared length is checked before any body byte is read, so an oversized
/// upload is refused without buffering it.
///
/// # Errors
///
/// Everything [`request_from_head`] and [`expected_body_len`] reject, plus
/// [`RequestError::Io`] when the body cannot be read.
pub fn parse_request(
    req: Request,
    max_body_bytes: Option<usize>,
) -> Result<RawRequest, RequestError> {
    let mut raw = request_from_head(
        req.method(),
        req.path(),
        req.headers().iter().map(|h| (h.name, h.value)),
    )?;
    let len = expected_body_len(&raw, max_body_bytes)?;
    if len > 0 {
        let mut body = Vec::with_capacity(body_capacity(len));
        req.body()
            .take(len as u64)
            .read_to_end(&mut body)
            .map_err(RequestError::Io)?;
        raw.body = body;
    }
    debug!(
        method = %raw.method,
        path = %raw.path(),
        headers = raw.headers.len(),
        body_bytes = raw.body.len(),
        "Request parsed"
    );
    Ok(raw)
}
