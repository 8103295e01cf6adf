//! Fetching the content of a selected version.
//!
//! [`ContentSource`] decides which endpoint serves a version; this module
//! performs the fetch against a [`HistoryBackend`]. A missing payload
//! surfaces as [`ApiError::NotFound`] so the caller can show "content
//! unavailable" instead of failing the whole screen.

use campus_history::{ContentPayload, ContentSource, SequencedEntry};
use tracing::debug;

use crate::api::{ApiError, HistoryBackend};

/// Resolves version content through a backend.
#[derive(Debug)]
pub struct ContentResolver<'a, B> {
    backend: &'a B,
}

impl<'a, B: HistoryBackend> ContentResolver<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetches the content of `entry`, a version of file `file_id`.
    ///
    /// Version 1 is read through the file's base-content endpoint; every
    /// other version through its own change identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the backend holds no content for the
    /// version, or any transport error from the backend.
    pub async fn resolve(
        &self,
        file_id: &str,
        entry: &SequencedEntry,
    ) -> Result<ContentPayload, ApiError> {
        let source = ContentSource::for_entry(file_id, entry);
        debug!(
            file_id,
            label = %entry.label,
            version = entry.record.version,
            source = %source,
            "Resolving version content"
        );

        match &source {
            ContentSource::Base { file_id } => self.backend.fetch_base_content(file_id).await,
            ContentSource::Change { change_id } => {
                self.backend.fetch_change_content(change_id).await
            }
        }
    }
}
