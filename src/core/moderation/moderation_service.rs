// Purge service - core logic for the `clear` moderation command.
//
// This service handles:
// - Range checking the requested count before touching the platform
// - Skipping messages outside the bulk-delete window
// - Bounding every platform call with a timeout
//
// NO Discord dependencies here - the channel is reached through `ChannelGateway`.

use super::moderation_models::{PurgeLimits, RecentMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single platform call.
pub const DEFAULT_PLATFORM_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("Invalid message count {requested}: must be between 1 and {max}")]
    InvalidCount { requested: i64, max: i64 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),
}

// ============================================================================
// CHANNEL TRAIT (PORT)
// ============================================================================

/// The slice of the chat platform a purge needs.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Fetch up to `limit` of the most recent messages in a channel, newest first.
    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, PurgeError>;

    /// Delete the given messages from a channel in as few requests as the platform allows.
    async fn delete_messages(&self, channel_id: u64, message_ids: &[u64])
        -> Result<(), PurgeError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PurgeService<G: ChannelGateway> {
    gateway: G,
    limits: PurgeLimits,
    timeout: Duration,
}

impl<G: ChannelGateway> PurgeService<G> {
    #[cfg(test)]
    pub fn new(gateway: G) -> Self {
        Self::with_settings(gateway, PurgeLimits::default(), DEFAULT_PLATFORM_TIMEOUT)
    }

    pub fn with_settings(gateway: G, limits: PurgeLimits, timeout: Duration) -> Self {
        Self {
            gateway,
            limits,
            timeout,
        }
    }

    fn validate_count(&self, count: i64) -> Result<u8, PurgeError> {
        if count < 1 || count > self.limits.max_count {
            return Err(PurgeError::InvalidCount {
                requested: count,
                max: self.limits.max_count,
            });
        }
        u8::try_from(count).map_err(|_| PurgeError::InvalidCount {
            requested: count,
            max: self.limits.max_count,
        })
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, PurgeError>>,
    ) -> Result<T, PurgeError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(PurgeError::PlatformUnavailable(format!(
                    "{op} timed out after {:?}",
                    self.timeout
                )))
            })
    }

    /// Fetching is read-only, so a transient failure gets one more attempt.
    async fn fetch_recent(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, PurgeError> {
        match self
            .bounded("recent_messages", self.gateway.recent_messages(channel_id, limit))
            .await
        {
            Err(PurgeError::PlatformUnavailable(reason)) => {
                tracing::warn!(channel_id, %reason, "Fetching messages failed, retrying once");
                self.bounded("recent_messages", self.gateway.recent_messages(channel_id, limit))
                    .await
            }
            other => other,
        }
    }

    /// Delete the `count` most recent messages in `channel_id`.
    ///
    /// # Returns
    /// The number of messages actually removed. This can be lower than `count`
    /// when the channel has fewer messages or some are too old to bulk delete.
    pub async fn delete_recent(&self, channel_id: u64, count: i64) -> Result<u64, PurgeError> {
        let limit = self.validate_count(count)?;

        let messages = self.fetch_recent(channel_id, limit).await?;
        let now = Utc::now();
        let eligible: Vec<u64> = messages
            .iter()
            .take(limit as usize)
            .filter(|m| self.limits.is_eligible(m.created_at, now))
            .map(|m| m.id)
            .collect();

        let skipped = messages.len().min(limit as usize) - eligible.len();
        if skipped > 0 {
            tracing::debug!(
                channel_id,
                skipped,
                "Skipping messages older than the bulk-delete window"
            );
        }

        if eligible.is_empty() {
            return Ok(0);
        }

        // Deletion is irreversible and may have landed even if the reply was lost,
        // so it is never retried here.
        self.bounded("delete_messages", self.gateway.delete_messages(channel_id, &eligible))
            .await?;

        tracing::info!(
            channel_id,
            requested = count,
            removed = eligible.len(),
            "Purged channel messages"
        );

        Ok(eligible.len() as u64)
    }
}

// ============================================================================
// TESTS
// ============================================================================
