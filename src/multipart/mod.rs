//! # Multipart Module
//!
//! Decoder for `multipart/form-data` request bodies.
//!
//! ## Overview
//!
//! A multipart body is a sequence of parts separated by `--<boundary>` lines. Each part
//! carries its own header block (`Content-Disposition`, optionally `Content-Type`) and a
//! body. The decoder turns a fully buffered body into a [`FormData`]:
//!
//! - parts **without** a `filename` attribute are *fields*; their body is parsed as JSON
//!   when it is valid JSON and kept as a string otherwise
//! - parts **with** a `filename` attribute are *files* and become [`UploadedFile`]s with
//!   their bytes untouched
//! - a second file under the same field name turns that entry into an ordered list
//!   ([`FileEntry::Multiple`])
//!
//! All splitting happens on raw bytes, so binary uploads survive byte-for-byte.
//!
//! ## Example
//!
//! ```rust
//! use bendf::multipart::{decode, FileEntry};
//!
//! let body = b"--xyz\r\n\
//! Content-Disposition: form-data; name=\"count\"\r\n\r\n\
//! 42\r\n\
//! --xyz\r\n\
//! Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\
//! Content-Type: image/png\r\n\r\n\
//! \x89PNG\r\n\
//! --xyz--\r\n";
//!
//! let form = decode(body, "xyz").unwrap();
//! assert_eq!(form.fields["count"], 42);
//! match &form.files["avatar"] {
//!     FileEntry::Single(f) => assert_eq!(f.size, 4),
//!     FileEntry::Multiple(_) => unreachable!(),
//! }
//! ```

mod core;
mod file;

pub use self::core::{boundary_from_content_type, decode, is_multipart, FormData, MultipartError};
pub use file::{FileEntry, UploadedFile};
