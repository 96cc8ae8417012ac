//! Binary-safe `multipart/form-data` decoding.

use super::file::{FileEntry, UploadedFile};
use memchr::memmem;
use serde_json::{Map, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Separates a part's header block from its body.
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
/// Content type assumed for parts that do not declare one.
const DEFAULT_PART_TYPE: &str = "text/plain";

/// Multipart decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// The `Content-Type` header carries no usable `boundary=` parameter.
    MissingBoundary,
    /// The body cannot be split into parts with the given boundary.
    Malformed(String),
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipartError::MissingBoundary => write!(f, "Missing boundary in multipart data"),
            MultipartError::Malformed(reason) => write!(f, "Malformed multipart data: {reason}"),
        }
    }
}

impl std::error::Error for MultipartError {}

/// Decoded multipart body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    /// Text fields; values are JSON when the part body parsed as JSON, strings otherwise.
    /// A repeated field name keeps the last value.
    pub fields: Map<String, Value>,
    /// Files by field name.
    pub files: BTreeMap<String, FileEntry>,
}

/// `true` when a `Content-Type` value announces `multipart/form-data`.
#[must_use]
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("multipart/form-data")
}

/// Extract the boundary token from a `Content-Type` header value.
///
/// Everything after `boundary=` up to the next `;` is the token; one pair of
/// surrounding double quotes is removed.
///
/// # Errors
///
/// [`MultipartError::MissingBoundary`] when the parameter is absent or empty.
pub fn boundary_from_content_type(content_type: &str) -> Result<&str, MultipartError> {
    const PARAM: &str = "boundary=";
    // ASCII lowercasing keeps byte offsets, so the index also applies to `content_type`.
    let start = content_type
        .to_ascii_lowercase()
        .find(PARAM)
        .ok_or(MultipartError::MissingBoundary)?
        + PARAM.len();
    let raw = content_type[start..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    let token = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if token.is_empty() {
        Err(MultipartError::MissingBoundary)
    } else {
        Ok(token)
    }
}

/// Decode a buffered multipart body.
///
/// 1. The body is split on the literal delimiter `--<boundary>`.
/// 2. Chunks that are empty or `--` once surrounding whitespace is trimmed are dropped
///    (preamble, closing marker).
/// 3. Each chunk is split at its first blank line into headers and body; chunks without
///    a blank line, or with an empty header block, are skipped.
/// 4. One trailing CRLF is stripped from the body.
/// 5. `Content-Disposition: form-data` supplies `name` and optionally `filename`;
///    `Content-Type` defaults to `text/plain`. Parts without a name are skipped.
/// 6. Parts with a filename become [`UploadedFile`]s, others become fields.
///
/// An empty (or whitespace-only) body decodes to an empty [`FormData`].
///
/// # Errors
///
/// [`MultipartError::MissingBoundary`] for an empty boundary and
/// [`MultipartError::Malformed`] when a non-empty body never contains the delimiter.
pub fn decode(body: &[u8], boundary: &str) -> Result<FormData, MultipartError> {
    if boundary.is_empty() {
        return Err(MultipartError::MissingBoundary);
    }

    let mut form = FormData::default();
    if body.trim_ascii().is_empty() {
        return Ok(form);
    }

    let mut delimiter = Vec::with_capacity(boundary.len() + 2);
    delimiter.extend_from_slice(b"--");
    delimiter.extend_from_slice(boundary.as_bytes());

    let chunks = split_on(body, &delimiter);
    if chunks.len() == 1 {
        return Err(MultipartError::Malformed(
            "body does not contain the boundary delimiter".to_string(),
        ));
    }

    for (index, chunk) in chunks.into_iter().enumerate() {
        let trimmed = chunk.trim_ascii();
        if trimmed.is_empty() || trimmed == b"--" {
            continue;
        }

        let Some(separator) = memmem::find(chunk, HEADER_SEPARATOR) else {
            debug!(part = index, "Multipart part without header separator skipped");
            continue;
        };
        let header_block = &chunk[..separator];
        if header_block.is_empty() {
            debug!(part = index, "Multipart part without headers skipped");
            continue;
        }

        let raw_body = &chunk[separator + HEADER_SEPARATOR.len()..];
        let part_body = raw_body.strip_suffix(b"\r\n").unwrap_or(raw_body);

        let headers = PartHeaders::parse(header_block);
        let Some(name) = headers.name else {
            debug!(part = index, "Multipart part without a name skipped");
            continue;
        };

        match headers.filename {
            Some(filename) => {
                let mimetype = headers
                    .content_type
                    .unwrap_or_else(|| DEFAULT_PART_TYPE.to_string());
                debug!(
                    part = index,
                    field = %name,
                    filename = %filename,
                    mimetype = %mimetype,
                    size = part_body.len(),
                    "Multipart file decoded"
                );
                let file = UploadedFile::new(filename, mimetype, part_body.to_vec());
                match form.files.entry(name) {
                    Entry::Occupied(mut entry) => entry.get_mut().push(file),
                    Entry::Vacant(entry) => {
                        entry.insert(FileEntry::Single(file));
                    }
                }
            }
            None => {
                let value = serde_json::from_slice::<Value>(part_body).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(part_body).into_owned())
                });
                debug!(part = index, field = %name, "Multipart field decoded");
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Split `haystack` on every non-overlapping occurrence of `needle`.
fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(haystack, needle) {
        chunks.push(&haystack[start..pos]);
        start = pos + needle.len();
    }
    chunks.push(&haystack[start..]);
    chunks
}

/// The headers of one part that the decoder cares about.
#[derive(Debug, Default, PartialEq, Eq)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
}

impl PartHeaders {
    fn parse(block: &[u8]) -> Self {
        let mut headers = PartHeaders::default();
        let text = String::from_utf8_lossy(block);
        for line in text.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("content-disposition") {
                let (name, filename) = parse_disposition(value.trim());
                headers.name = name;
                headers.filename = filename;
            } else if key.eq_ignore_ascii_case("content-type") {
                let value = value.trim();
                if !value.is_empty() {
                    headers.content_type = Some(value.to_string());
                }
            }
        }
        headers
    }
}

/// `(name, filename)` of a `form-data` disposition; empty values count as absent.
fn parse_disposition(value: &str) -> (Option<String>, Option<String>) {
    let (kind, mut rest) = split_param(value);
    if !kind.trim().eq_ignore_ascii_case("form-data") {
        return (None, None);
    }

    let mut name = None;
    let mut filename = None;
    while !rest.is_empty() {
        let (param, tail) = split_param(rest);
        rest = tail;
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw.trim()));
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(unquote(raw.trim()));
        }
    }

    (
        name.filter(|n| !n.is_empty()),
        filename.filter(|f| !f.is_empty()),
    )
}

/// Split at the first `;` that is not inside a quoted string.
fn split_param(s: &str) -> (&str, &str) {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if in_quotes && !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => in_quotes = !in_quotes,
            ';' if !in_quotes => return (&s[..i], &s[i + 1..]),
            _ => {}
        }
        escaped = false;
    }
    (s, "")
}

fn unquote(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod header_tests {
    use super::*;

    #[test]
    fn test_disposition_with_filename() {
        let (name, filename) =
            parse_disposition(r#"form-data; name="avatar"; filename="a.png""#);
        assert_eq!(name.as_deref(), Some("avatar"));
        assert_eq!(filename.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_disposition_quoted_semicolon_and_escape() {
        let (name, filename) =
            parse_disposition(r#"form-data; name="doc"; filename="a;b \"c\".txt""#);
        assert_eq!(name.as_deref(), Some("doc"));
        assert_eq!(filename.as_deref(), Some(r#"a;b "c".txt"#));
    }

    #[test]
    fn test_disposition_other_kind_has_no_name() {
        assert_eq!(parse_disposition(r#"attachment; name="x""#), (None, None));
    }

    #[test]
    fn test_empty_filename_is_a_field() {
        let (name, filename) = parse_disposition(r#"form-data; name="x"; filename="""#);
        assert_eq!(name.as_deref(), Some("x"));
        assert_eq!(filename, None);
    }

    #[test]
    fn test_part_headers_default_content_type_absent() {
        let headers = PartHeaders::parse(b"\r\nContent-Disposition: form-data; name=\"a\"");
        assert_eq!(headers.name.as_deref(), Some("a"));
        assert_eq!(headers.content_type, None);
    }
}
