// Serenity implementation of `ChannelGateway`.
//
// Translates between Discord ids/timestamps and the primitives the core uses,
// and folds Discord's HTTP failures into `PurgeError`.

use crate::core::moderation::{ChannelGateway, PurgeError, RecentMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Discord JSON error code for "Missing Permissions".
const MISSING_PERMISSIONS: isize = 50013;
/// Discord JSON error code for "Missing Access".
const MISSING_ACCESS: isize = 50001;

pub struct SerenityChannelGateway {
    http: Arc<serenity::Http>,
}

impl SerenityChannelGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

/// Classify a failed Discord response. 403s are permission problems; anything
/// else (rate limits, 5xx, bad gateway) is treated as transient.
fn classify_response(status: u16, code: isize, message: &str) -> PurgeError {
    if status == 403 || code == MISSING_PERMISSIONS || code == MISSING_ACCESS {
        PurgeError::PermissionDenied(message.to_string())
    } else {
        PurgeError::PlatformUnavailable(format!("HTTP {status}: {message}"))
    }
}

fn to_purge_error(err: serenity::Error) -> PurgeError {
    match &err {
        serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(response)) => {
            classify_response(
                response.status_code.as_u16(),
                response.error.code,
                &response.error.message,
            )
        }
        _ => PurgeError::PlatformUnavailable(err.to_string()),
    }
}

/// `None` when the timestamp is out of chrono's range; such a message is
/// left alone rather than guessed to be recent.
fn recent_message(id: u64, unix_secs: i64) -> Option<RecentMessage> {
    let created_at = DateTime::<Utc>::from_timestamp(unix_secs, 0)?;
    Some(RecentMessage { id, created_at })
}

#[async_trait]
impl ChannelGateway for SerenityChannelGateway {
    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, PurgeError> {
        let messages = serenity::ChannelId::new(channel_id)
            .messages(&*self.http, serenity::GetMessages::new().limit(limit))
            .await
            .map_err(to_purge_error)?;

        Ok(messages
            .iter()
            .filter_map(|message| {
                let unix_secs = message.timestamp.unix_timestamp();
                let recent = recent_message(message.id.get(), unix_secs);
                if recent.is_none() {
                    tracing::debug!(
                        channel_id,
                        message_id = message.id.get(),
                        unix_secs,
                        "Skipping message with unusable timestamp"
                    );
                }
                recent
            })
            .collect())
    }

    async fn delete_messages(
        &self,
        channel_id: u64,
        message_ids: &[u64],
    ) -> Result<(), PurgeError> {
        let channel = serenity::ChannelId::new(channel_id);

        // Bulk delete needs at least two ids
        match message_ids {
            [] => Ok(()),
            [single] => channel
                .delete_message(&*self.http, serenity::MessageId::new(*single))
                .await
                .map_err(to_purge_error),
            many => {
                let ids: Vec<serenity::MessageId> =
                    many.iter().map(|id| serenity::MessageId::new(*id)).collect();
                channel
                    .delete_messages(&*self.http, &ids)
                    .await
                    .map_err(to_purge_error)
            }
        }
    }
}
