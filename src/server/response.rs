use super::request::RequestError;
use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use serde_json::Value;

#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// JSON bytes of a response body.
#[must_use]
pub fn body_bytes(body: &Value) -> Vec<u8> {
    // A `Value` always serializes; its map keys are strings.
    serde_json::to_vec(body).unwrap_or_default()
}

/// Write a dispatched response.
///
/// `may_minihttp` only takes `'static` header lines, so the per-request headers in
/// `resp.headers` (such as `x-request-id`) stay on the [`HandlerResponse`] and in the
/// logs. The body is always JSON.
pub fn write_response(res: &mut Response, resp: &HandlerResponse) {
    write_json(res, resp.status, &resp.body);
}

/// Answer a request refused before dispatch with `{"error", "code"}`.
pub fn write_request_error(res: &mut Response, status: u16, err: &RequestError) {
    write_json(res, status, &err.to_body());
}

fn write_json(res: &mut Response, status: u16, body: &Value) {
    res.status_code(usize::from(status), status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body_bytes(body));
}
