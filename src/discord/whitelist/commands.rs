// Whitelist slash commands.
//
// Thin layer: pull the option values out of the interaction, call the core
// service, turn the outcome into reply text.

use crate::core::whitelist::{AddOutcome, WhitelistEntry, WhitelistError};
use crate::discord::{Context, Error};

/// Reply for `wl_add`. `user` is the nickname the operator typed.
pub fn add_reply(user: &str, result: &Result<AddOutcome, WhitelistError>) -> String {
    match result {
        Ok(AddOutcome::Added) => format!("The user {user} has been added to the whitelist"),
        Ok(AddOutcome::AlreadyExists) => format!("The user {user} is already in the whitelist"),
        Err(err) => failure_reply(err),
    }
}

/// Reply for `wl_check`.
pub fn check_reply(id: &str, result: &Result<Option<WhitelistEntry>, WhitelistError>) -> String {
    match result {
        Ok(Some(entry)) => format!(
            "The id {} is whitelisted as {} (status: {})",
            entry.user_id, entry.nickname, entry.status
        ),
        Ok(None) => format!("The id {id} is not in the whitelist"),
        Err(err) => failure_reply(err),
    }
}

fn failure_reply(err: &WhitelistError) -> String {
    match err {
        WhitelistError::InvalidInput(reason) => format!("❌ Invalid input: {reason}."),
        WhitelistError::StorageUnavailable(_) => {
            "⚠️ The whitelist is unavailable right now, please try again.".to_string()
        }
    }
}

/// Add a user to the whitelist.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn wl_add(
    ctx: Context<'_>,
    #[description = "Name to record for this user"] user: String,
    #[description = "External id of the user"] id: String,
) -> Result<(), Error> {
    let result = ctx.data().whitelist.add_if_absent(&id, &user).await;

    if let Err(err) = &result {
        tracing::warn!(
            invoked_by = ctx.author().id.get(),
            error = %err,
            "wl_add failed"
        );
    }

    ctx.send(
        poise::CreateReply::default()
            .content(add_reply(&user, &result))
            .ephemeral(result.is_err()),
    )
    .await?;
    Ok(())
}

/// Check whether an id is on the whitelist.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn wl_check(
    ctx: Context<'_>,
    #[description = "External id of the user"] id: String,
) -> Result<(), Error> {
    let result = ctx.data().whitelist.lookup(&id).await;

    if let Err(err) = &result {
        tracing::warn!(error = %err, "wl_check failed");
    }

    ctx.send(
        poise::CreateReply::default()
            .content(check_reply(&id, &result))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
