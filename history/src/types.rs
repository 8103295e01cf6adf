//! Canonical history types.
//!
//! All types serialize to camelCase JSON, matching the shape the CLI emits
//! with `--json`.

use serde::{Deserialize, Serialize};

/// One backend-recorded edit to a file, in canonical shape.
///
/// Records are immutable once the backend creates them, with the exception of
/// [`reviewed`](Self::reviewed), which a tutor may flip later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Opaque backend identifier, unique per change.
    pub id: String,

    /// Backend-assigned version number. Not guaranteed contiguous or ordered.
    pub version: i64,

    /// Creation timestamp exactly as received. May be malformed.
    pub created_at: String,

    /// Full payload of this change.
    pub content: String,

    /// Byte length of [`content`](Self::content).
    pub size: usize,

    /// Change note. Empty when the author wrote none.
    pub description: String,

    /// Whether a tutor has reviewed this change.
    pub reviewed: bool,
}

impl ChangeRecord {
    /// Creates a record with no description that has not been reviewed.
    ///
    /// The size is derived from the content length.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        version: i64,
        created_at: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            version,
            created_at: created_at.into(),
            size: content.len(),
            content,
            description: String::new(),
            reviewed: false,
        }
    }

    /// Sets the change note.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the tutor review flag.
    #[must_use]
    pub fn with_reviewed(mut self, reviewed: bool) -> Self {
        self.reviewed = reviewed;
        self
    }

    /// Returns true if the author wrote a change note.
    #[must_use]
    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }
}

/// A change record placed in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencedEntry {
    #[serde(flatten)]
    pub record: ChangeRecord,

    /// Zero-based index in ascending chronological order.
    pub position: usize,

    /// Hierarchical label shown to users, see [`crate::label`].
    pub label: String,

    /// True only for the chronologically last entry.
    pub is_current: bool,
}

/// The ordered version history of one file.
///
/// Entries are held in ascending chronological order. A `History` has no
/// identity of its own: it is rebuilt from scratch on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<SequencedEntry>,
}

impl History {
    pub(crate) fn from_entries(entries: Vec<SequencedEntry>) -> Self {
        Self { entries }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the file has no recorded history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending chronological order.
    #[must_use]
    pub fn entries(&self) -> &[SequencedEntry] {
        &self.entries
    }

    /// Entries most recent first, the order the history screen shows them in.
    pub fn display_order(&self) -> impl DoubleEndedIterator<Item = &SequencedEntry> {
        self.entries.iter().rev()
    }

    /// The current (chronologically last) entry.
    #[must_use]
    pub fn current(&self) -> Option<&SequencedEntry> {
        self.entries.last()
    }

    /// Looks up an entry by its display label.
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<&SequencedEntry> {
        crate::label::parse_label(label).and_then(|position| self.entries.get(position))
    }

    /// Looks up an entry by its change identifier.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&SequencedEntry> {
        self.entries.iter().find(|entry| entry.record.id == id)
    }

    /// Consumes the history, returning entries in ascending order.
    #[must_use]
    pub fn into_entries(self) -> Vec<SequencedEntry> {
        self.entries
    }
}
