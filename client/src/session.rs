//! Authenticated session state.
//!
//! A [`Session`] holds the bearer token returned by login. It is an explicit
//! value: it is loaded from a [`SessionStore`], handed to
//! [`ApiClient`](crate::api::ApiClient) at construction, and saved or cleared
//! by the caller. Nothing reads it from global state.
//!
//! # Storage
//!
//! The session is stored as JSON in `<dir>/session.json` with permissions
//! 0600 on unix. The token is zeroized when a `Session` is dropped and is
//! never included in `Debug` output.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

/// Session file name within the session directory.
const SESSION_FILE: &str = "session.json";

/// Errors that can occur while persisting a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session file is not valid JSON.
    #[error("corrupt session file: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored session has no token.
    #[error("session token is empty")]
    EmptyToken,
}

/// The signed-in user, as reported by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// A bearer-token session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,

    #[serde(default)]
    user: Option<UserProfile>,
}

impl Session {
    /// Creates a session from a bearer token.
    #[must_use]
    pub fn new(token: impl Into<String>, user: Option<UserProfile>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The signed-in user, if the backend reported one.
    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

/// File-backed persistence for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Creates a store rooted at `dir`. The directory is created on save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Returns true if a session file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Loads the stored session.
    ///
    /// Returns `Ok(None)` when no session has been saved.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the file cannot be read, is not valid JSON,
    /// or holds an empty token.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let path = self.path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: Session = serde_json::from_str(&contents)?;
        if session.token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }

        debug!(path = %path.display(), "Session loaded");
        Ok(Some(session))
    }

    /// Saves a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the directory or file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path();
        let mut body = serde_json::to_vec_pretty(session)?;
        let mut file = File::create(&path)?;

        // Session file permissions 0600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        let written = file.write_all(&body).and_then(|()| file.write_all(b"\n"));
        body.zeroize();
        written?;

        debug!(path = %path.display(), "Session saved");
        Ok(())
    }

    /// Removes the stored session.
    ///
    /// Returns true if a session file was removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Accepts user ids sent either as strings or as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
