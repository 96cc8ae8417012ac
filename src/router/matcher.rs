//! Segment-wise path matcher for templated routes.

use super::core::ParamVec;
use std::sync::Arc;

/// `true` when the segment is a `{name}` parameter placeholder.
#[inline]
#[must_use]
pub fn is_param_segment(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Parameter name of a `{name}` segment, `None` for literal segments.
#[inline]
#[must_use]
pub fn param_name(segment: &str) -> Option<&str> {
    if is_param_segment(segment) {
        Some(&segment[1..segment.len() - 1])
    } else {
        None
    }
}

/// Match one path pattern against one request path.
///
/// Both strings are split on `/` and must yield the same number of segments. Parameter
/// segments bind the corresponding path segment verbatim; literal segments must be
/// byte-for-byte equal. No percent-decoding and no trailing-slash normalization is done,
/// so `/users/` has an (empty) third segment that only a parameter or an empty literal
/// segment can match.
///
/// A parameter name used twice keeps the value of its last occurrence.
///
/// ```rust
/// use bendf::router::match_path;
///
/// let params = match_path("/users/{id}/posts/{post}", "/users/7/posts/abc").unwrap();
/// assert_eq!(params.len(), 2);
/// assert!(match_path("/users/{id}", "/users").is_none());
/// ```
#[must_use]
pub fn match_path(pattern: &str, path: &str) -> Option<ParamVec> {
    if pattern.split('/').count() != path.split('/').count() {
        return None;
    }

    let mut params = ParamVec::new();
    for (pattern_segment, path_segment) in pattern.split('/').zip(path.split('/')) {
        match param_name(pattern_segment) {
            Some(name) => {
                if let Some(slot) = params.iter_mut().find(|(k, _)| k.as_ref() == name) {
                    slot.1 = path_segment.to_string();
                } else {
                    params.push((Arc::from(name), path_segment.to_string()));
                }
            }
            None if pattern_segment != path_segment => return None,
            None => {}
        }
    }

    Some(params)
}
