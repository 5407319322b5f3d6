// Whitelist service - validates input and talks to the store under a deadline.
//
// The uniqueness check lives in the store (unique key on user_id), not here.
// The service never does "read, then write": add goes straight to
// `insert_if_absent`, which must resolve the race itself.

use super::whitelist_models::{AddOutcome, NewWhitelistEntry, WhitelistEntry};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Whitelist storage unavailable: {0}")]
    StorageUnavailable(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for whitelist entries.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    /// Insert the entry unless one with the same user id exists.
    ///
    /// Must be a single atomic operation: of two concurrent calls with the same
    /// user id, exactly one returns `Added`.
    async fn insert_if_absent(&self, entry: &NewWhitelistEntry)
        -> Result<AddOutcome, WhitelistError>;

    /// Look up an entry by user id.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<WhitelistEntry>, WhitelistError>;

    /// Release underlying resources. Called once on shutdown.
    async fn close(&self) {}
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct WhitelistService<S: WhitelistStore> {
    store: S,
    timeout: Duration,
}

impl<S: WhitelistStore> WhitelistService<S> {
    #[cfg(test)]
    pub fn new(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_STORE_TIMEOUT)
    }

    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    fn validate_user_id(user_id: &str) -> Result<&str, WhitelistError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            Err(WhitelistError::InvalidInput(
                "user id must not be empty".to_string(),
            ))
        } else {
            Ok(user_id)
        }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, WhitelistError>>,
    ) -> Result<T, WhitelistError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Whitelist store call timed out"
                );
                Err(WhitelistError::StorageUnavailable(format!(
                    "{op} timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    /// Add `user_id` with `nickname` unless it is already whitelisted.
    ///
    /// # Returns
    /// - `Ok(AddOutcome::Added)` when a new entry was written
    /// - `Ok(AddOutcome::AlreadyExists)` when the id was present (stored entry untouched)
    /// - `Err(WhitelistError::InvalidInput)` for an empty id, before any store call
    /// - `Err(WhitelistError::StorageUnavailable)` on store failure or timeout
    pub async fn add_if_absent(
        &self,
        user_id: &str,
        nickname: &str,
    ) -> Result<AddOutcome, WhitelistError> {
        let user_id = Self::validate_user_id(user_id)?;
        let entry = NewWhitelistEntry::whitelisted(user_id, nickname);

        let outcome = self
            .bounded("insert_if_absent", self.store.insert_if_absent(&entry))
            .await?;

        match outcome {
            AddOutcome::Added => tracing::info!(user_id, "Whitelist entry added"),
            AddOutcome::AlreadyExists => {
                tracing::debug!(user_id, "Whitelist entry already present")
            }
        }

        Ok(outcome)
    }

    /// Fetch the entry stored for `user_id`, if any.
    pub async fn lookup(&self, user_id: &str) -> Result<Option<WhitelistEntry>, WhitelistError> {
        let user_id = Self::validate_user_id(user_id)?;
        self.bounded("find_by_id", self.store.find_by_id(user_id)).await
    }

    /// Close the store. Call once, after the bot has stopped dispatching commands.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}

// ============================================================================
// TESTS
// ============================================================================
