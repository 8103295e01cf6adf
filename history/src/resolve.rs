//! Content source resolution.
//!
//! The backend stores the first version of a file as the file's own base
//! content, and every later version as an independent change record. The
//! content of a selected version must therefore be fetched from one of two
//! endpoints depending on its version number:
//!
//! - version 1: `GET /files/{fileId}/content`
//! - any other: `GET /file-changes/{changeId}/content`
//!
//! The two paths must stay separate unless the backend contract changes.

use std::fmt;

use crate::types::{ChangeRecord, SequencedEntry};

/// Version number under which the backend stores a file's base content.
pub const BASE_VERSION: i64 = 1;

/// Where the content of a version lives on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentSource {
    /// The file's base content, addressed by the file identifier.
    Base { file_id: String },

    /// A later version, addressed by its change identifier.
    Change { change_id: String },
}

impl ContentSource {
    /// Resolves the content source of a displayed history entry.
    #[must_use]
    pub fn for_entry(file_id: &str, entry: &SequencedEntry) -> Self {
        Self::for_record(file_id, &entry.record)
    }

    /// Resolves the content source of a change record.
    #[must_use]
    pub fn for_record(file_id: &str, record: &ChangeRecord) -> Self {
        if record.version == BASE_VERSION {
            Self::Base {
                file_id: file_id.to_string(),
            }
        } else {
            Self::Change {
                change_id: record.id.clone(),
            }
        }
    }

    /// URL path segments of the endpoint serving this content.
    ///
    /// Segments are returned unescaped; the HTTP layer encodes them.
    #[must_use]
    pub fn path_segments(&self) -> [&str; 3] {
        match self {
            Self::Base { file_id } => ["files", file_id, "content"],
            Self::Change { change_id } => ["file-changes", change_id, "content"],
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base { file_id } => write!(f, "base content of file {file_id}"),
            Self::Change { change_id } => write!(f, "content of change {change_id}"),
        }
    }
}
