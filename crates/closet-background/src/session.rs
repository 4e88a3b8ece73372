use std::sync::Arc;

use chrono::{DateTime, Utc};
use closet_core::Session;

use crate::error::StorageError;
use crate::storage::{read_json, write_json, Storage};

/// Storage key holding the persisted backend session.
pub const SESSION_KEY: &str = "closet.auth.session";

/// Persists the backend session in extension storage so it survives restarts.
pub struct SessionStore<S> {
    storage: Arc<S>,
}

impl<S: Storage> SessionStore<S> {
    #[must_use]
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// The stored session, if any and not yet expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read or the stored
    /// value is not a session.
    pub async fn current(&self, now: DateTime<Utc>) -> Result<Option<Session>, StorageError> {
        let session: Option<Session> = read_json(self.storage.as_ref(), SESSION_KEY).await?;
        Ok(session.filter(|s| {
            let live = !s.is_expired(now);
            if !live {
                tracing::debug!(user_id = %s.user.id, "stored session has expired");
            }
            live
        }))
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the session cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), SESSION_KEY, session).await
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be updated.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(SESSION_KEY).await
    }
}
