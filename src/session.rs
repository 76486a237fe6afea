//! Bearer-token session store.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `Session` per dashboard instance, created by `app::Dashboard` and
//! shared by handle with the interceptor, route guard, authenticator, and
//! idle monitor. The token lives in durable storage so it survives restarts.
//!
//! DESIGN
//! ======
//! A session is either fully present (non-empty token) or absent. Expiry is
//! never checked locally; the backend reports it through a failed request.
//! Reads hit an in-memory copy loaded at open time; writes go through to the
//! backing `TokenStore`.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "access_token";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("refusing to store an empty token")]
    EmptyToken,
}

/// Durable key-value slot holding the bearer token.
pub trait TokenStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    fn load(&self) -> Result<Option<String>, SessionError>;

    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn save(&self, token: &str) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be removed.
    fn remove(&self) -> Result<(), SessionError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    access_token: Option<String>,
}

/// JSON file holding `{"access_token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io { path: self.path.clone(), source }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let file: TokenFile =
            serde_json::from_str(&raw).map_err(|source| SessionError::Malformed { path: self.path.clone(), source })?;
        Ok(file.access_token.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let raw = serde_json::to_string(&TokenFile { access_token: Some(token.to_owned()) })
            .map_err(|source| SessionError::Malformed { path: self.path.clone(), source })?;
        std::fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Non-durable store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Shared handle to the current bearer token. Cloning shares state.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session over `store`, loading any persisted token.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted token cannot be read.
    pub fn open(store: Arc<dyn TokenStore>) -> Result<Self, SessionError> {
        let token = store.load()?;
        Ok(Self { store, token: Arc::new(RwLock::new(token)) })
    }

    /// Ephemeral session with no persisted token.
    pub fn in_memory() -> Self {
        Self { store: Arc::new(MemoryTokenStore::default()), token: Arc::new(RwLock::new(None)) }
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Store `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] for an empty token, or a storage
    /// error if persisting fails (in which case the session is unchanged).
    pub fn set(&self, token: &str) -> Result<(), SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        self.store.save(token)?;
        *slot = Some(token.to_owned());
        tracing::debug!("session token stored");
        Ok(())
    }

    /// Drop the token. Returns whether one was present; clearing an absent
    /// session is a no-op.
    pub fn clear(&self) -> bool {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        let was_present = slot.take().is_some();
        if was_present {
            if let Err(e) = self.store.remove() {
                tracing::warn!(error = %e, "failed to remove persisted session token");
            }
            tracing::debug!("session token cleared");
        }
        was_present
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
