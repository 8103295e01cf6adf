//! Campus Client - file version history over the Campus REST API.
//!
//! This crate provides the networked half of the history screen: an
//! authenticated API client, session persistence, content resolution and a
//! cancellable fetch-then-render view. Ordering, labelling and normalization
//! live in [`campus_history`].
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for client operations
//! - [`session`]: Bearer-token session with explicit load/save/clear
//! - [`api`]: HTTP client for the Campus REST API
//! - [`resolver`]: Fetching the content of a selected version
//! - [`view`]: History loading and cancellable refresh

pub mod api;
pub mod config;
pub mod error;
pub mod resolver;
pub mod session;
pub mod view;

pub use api::{ApiClient, ApiError, HistoryBackend};
pub use config::Config;
pub use error::{ClientError, Result};
pub use resolver::ContentResolver;
pub use session::{Session, SessionError, SessionStore, UserProfile};
pub use view::{HistoryService, HistoryView, RefreshOutcome};
