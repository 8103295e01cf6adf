//! Campus History - version history shaping for edited files.
//!
//! This crate turns the raw change records returned by the Campus REST API
//! into the ordered, labelled sequence the history screen displays.
//!
//! # Overview
//!
//! Everything here is synchronous and free of I/O. The client crate fetches
//! the raw records and content, then hands them to this crate:
//!
//! ```text
//! raw JSON --normalize--> ChangeRecord --sequence--> History --resolve--> ContentSource
//! ```
//!
//! # Modules
//!
//! - [`types`]: Canonical change records, sequenced entries and histories
//! - [`normalize`]: Field aliasing and placeholder suppression for raw records
//! - [`sequence`]: Chronological ordering with version tie-breaks
//! - [`label`]: The hierarchical display label scheme ("1.1", "2.0", ...)
//! - [`resolve`]: Choosing the content endpoint for a selected version
//! - [`payload`]: Content payloads and base64 sanitization

pub mod label;
pub mod normalize;
pub mod payload;
pub mod resolve;
pub mod sequence;
pub mod types;

pub use label::{display_label, parse_label};
pub use normalize::{extract_records, normalize_all, normalize_record};
pub use payload::{sanitize_base64, ContentPayload, PayloadError};
pub use resolve::ContentSource;
pub use sequence::{parse_timestamp, sequence};
pub use types::{ChangeRecord, History, SequencedEntry};
