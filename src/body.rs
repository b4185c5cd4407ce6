//! Request body variants.

use bytes::Bytes;
use std::path::{Path, PathBuf};

/// A byte range of a file, transmitted without buffering the whole file.
///
/// The transport opens the file and reads `length` bytes starting at
/// `offset` when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSegment {
    path: PathBuf,
    offset: u64,
    length: u64,
}

impl FileSegment {
    /// Creates a segment covering `length` bytes of `path` from `offset`.
    pub fn new(path: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
        }
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the segment start.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Segment length in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }
}

/// The body attached to an outgoing request.
///
/// An empty text body is never constructed by the request builder; a
/// method whose body argument renders to the empty string sends no body
/// at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw bytes with their content type.
    Bytes {
        /// The payload.
        data: Bytes,
        /// The `Content-Type` the bytes were encoded for.
        content_type: String,
    },
    /// Text with its content type.
    Text {
        /// The payload.
        text: String,
        /// The `Content-Type` the text was encoded for.
        content_type: String,
    },
    /// A file byte range streamed by the transport.
    File(FileSegment),
}

impl RequestBody {
    /// The content type the body was encoded for, when it carries one.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Bytes { content_type, .. } | RequestBody::Text { content_type, .. } => {
                Some(content_type)
            }
            RequestBody::File(_) => None,
        }
    }
}
