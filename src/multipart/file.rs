use serde::Serialize;

/// One uploaded file from a multipart body.
///
/// Lives as long as the request data handed to the handler. `content` is skipped when
/// serializing so that handlers can echo file metadata without dumping the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Client-supplied file name from the `filename` attribute
    pub filename: String,
    /// Part `Content-Type`, `text/plain` when the part declared none
    pub mimetype: String,
    /// Raw bytes exactly as transmitted
    #[serde(skip)]
    pub content: Vec<u8>,
    /// `content.len()`
    pub size: usize,
}

impl UploadedFile {
    #[must_use]
    pub fn new(filename: impl Into<String>, mimetype: impl Into<String>, content: Vec<u8>) -> Self {
        let size = content.len();
        Self {
            filename: filename.into(),
            mimetype: mimetype.into(),
            content,
            size,
        }
    }
}

/// Files received under one field name.
///
/// The first file is stored as [`FileEntry::Single`]; the second one promotes the entry
/// to [`FileEntry::Multiple`], which keeps arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileEntry {
    Single(UploadedFile),
    Multiple(Vec<UploadedFile>),
}

impl FileEntry {
    /// Add another file under the same name, promoting a single entry to a list.
    pub fn push(&mut self, file: UploadedFile) {
        match self {
            FileEntry::Multiple(files) => files.push(file),
            FileEntry::Single(_) => {
                if let FileEntry::Single(first) =
                    std::mem::replace(self, FileEntry::Multiple(Vec::new()))
                {
                    *self = FileEntry::Multiple(vec![first, file]);
                }
            }
        }
    }

    /// Files in arrival order.
    #[must_use]
    pub fn as_slice(&self) -> &[UploadedFile] {
        match self {
            FileEntry::Single(file) => std::slice::from_ref(file),
            FileEntry::Multiple(files) => files,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UploadedFile> {
        self.as_slice().iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, FileEntry::Multiple(_))
    }
}

impl<'a> IntoIterator for &'a FileEntry {
    type Item = &'a UploadedFile;
    type IntoIter = std::slice::Iter<'a, UploadedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
