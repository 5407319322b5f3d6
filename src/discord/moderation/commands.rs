// Moderation slash commands.

use crate::core::moderation::PurgeError;
use crate::discord::{Context, Error};

/// Reply for `clear`.
pub fn clear_reply(result: &Result<u64, PurgeError>) -> String {
    match result {
        // Number actually removed; can be lower than requested when older
        // messages were skipped or the channel had fewer.
        Ok(removed) => format!("{removed} messages supprimés."),
        Err(PurgeError::InvalidCount { max, .. }) => {
            format!("❌ Please choose a number of messages between 1 and {max}.")
        }
        // Shown as-is so moderators see which permission is missing
        Err(err @ PurgeError::PermissionDenied(_)) => format!("❌ {err}"),
        Err(PurgeError::PlatformUnavailable(_)) => {
            "⚠️ Discord did not answer in time, please try again.".to_string()
        }
    }
}

/// Delete the most recent messages in this channel.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES | READ_MESSAGE_HISTORY"
)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (1-100)"]
    #[min = 1]
    #[max = 100]
    count: i64,
) -> Result<(), Error> {
    // Fetch + bulk delete can exceed the 3 second interaction deadline
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id().get();
    let result = ctx.data().purge.delete_recent(channel_id, count).await;

    if let Err(err) = &result {
        tracing::warn!(
            channel_id,
            count,
            invoked_by = ctx.author().id.get(),
            error = %err,
            "clear failed"
        );
    }

    ctx.send(
        poise::CreateReply::default()
            .content(clear_reply(&result))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
