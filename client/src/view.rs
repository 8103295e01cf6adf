//! History loading and cancellable refresh.
//!
//! [`HistoryService`] runs the fetch, normalize and sequence steps for one
//! file. [`HistoryView`] holds the history currently on screen and applies
//! refresh results only while they are still wanted:
//!
//! - every refresh cancels the one before it, so a slow stale response can
//!   never overwrite a newer one
//! - [`HistoryView::cancel`] abandons the in-flight refresh, e.g. when the
//!   user navigates away
//! - a failed refresh leaves the previous history in place
//!
//! Nothing is retried automatically.

use std::sync::{Mutex, MutexGuard, PoisonError};

use campus_history::{normalize_all, sequence, ContentPayload, History};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, HistoryBackend};
use crate::error::{ClientError, Result};
use crate::resolver::ContentResolver;

/// Loads the sequenced history of files from a backend.
#[derive(Debug)]
pub struct HistoryService<B> {
    backend: B,
}

impl<B: HistoryBackend> HistoryService<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend this service reads from.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetches, normalizes and sequences the history of `file_id`.
    ///
    /// Normalization only runs once the complete record list has arrived.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`ApiError`] unchanged.
    pub async fn load(&self, file_id: &str) -> std::result::Result<History, ApiError> {
        let raw = self.backend.fetch_history(file_id).await?;
        let records = normalize_all(&raw);

        let skipped = raw.len() - records.len();
        if skipped > 0 {
            warn!(file_id, skipped, "Skipped unusable change records");
        }

        let history = sequence(records);
        debug!(file_id, entries = history.len(), "History sequenced");
        Ok(history)
    }
}

/// What happened to a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The result replaced the displayed history.
    Applied { entries: usize },

    /// A newer refresh or an explicit cancel made this one stale; its
    /// result was discarded.
    Superseded,
}

#[derive(Debug, Default)]
struct ViewState {
    history: Option<History>,
    in_flight: Option<CancellationToken>,
}

/// The history of one file as currently displayed.
#[derive(Debug)]
pub struct HistoryView<B> {
    service: HistoryService<B>,
    file_id: String,
    state: Mutex<ViewState>,
}

impl<B: HistoryBackend> HistoryView<B> {
    /// Creates a view of `file_id`. Nothing is loaded until [`refresh`](Self::refresh).
    #[must_use]
    pub fn new(backend: B, file_id: impl Into<String>) -> Self {
        Self {
            service: HistoryService::new(backend),
            file_id: file_id.into(),
            state: Mutex::new(ViewState::default()),
        }
    }

    /// The file this view shows.
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// A snapshot of the displayed history, or `None` before the first
    /// successful refresh.
    #[must_use]
    pub fn history(&self) -> Option<History> {
        self.lock().history.clone()
    }

    /// Fetches the history again and replaces the displayed one.
    ///
    /// Any refresh still in flight is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns the backend error if this refresh fails while still current.
    /// The previously displayed history is kept.
    pub async fn refresh(&self) -> std::result::Result<RefreshOutcome, ApiError> {
        let token = self.begin_refresh();

        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(file_id = %self.file_id, "Refresh cancelled while in flight");
                return Ok(RefreshOutcome::Superseded);
            }
            result = self.service.load(&self.file_id) => result,
        };

        let mut state = self.lock();
        if token.is_cancelled() {
            debug!(file_id = %self.file_id, "Discarding stale refresh result");
            return Ok(RefreshOutcome::Superseded);
        }
        state.in_flight = None;

        let history = result?;
        let entries = history.len();
        state.history = Some(history);
        info!(file_id = %self.file_id, entries, "History refreshed");
        Ok(RefreshOutcome::Applied { entries })
    }

    /// Abandons the refresh in flight, if any. The displayed history is kept.
    pub fn cancel(&self) {
        if let Some(token) = self.lock().in_flight.take() {
            token.cancel();
        }
    }

    /// Fetches the content of the displayed version labelled `label`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnknownVersion`] - no such label in the displayed history
    /// - [`ClientError::Api`] - the fetch failed; `NotFound` means the backend
    ///   holds no content for that version
    pub async fn select(&self, label: &str) -> Result<ContentPayload> {
        let entry = self
            .lock()
            .history
            .as_ref()
            .and_then(|history| history.by_label(label).cloned())
            .ok_or_else(|| ClientError::UnknownVersion {
                file_id: self.file_id.clone(),
                version: label.to_string(),
            })?;

        let payload = ContentResolver::new(self.service.backend())
            .resolve(&self.file_id, &entry)
            .await?;
        Ok(payload)
    }

    fn begin_refresh(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut state = self.lock();
        if let Some(previous) = state.in_flight.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
