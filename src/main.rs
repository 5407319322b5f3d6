// This is the entry point of the whitelist bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, Discord HTTP)
// - `discord/` = Discord-specific adapters (slash commands)
//
// This file's job is to:
// 1. Load configuration
// 2. Open the whitelist store and build services
// 3. Set up the Discord framework and register commands
// 4. Close the store once the client stops

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::moderation::{PurgeLimits, PurgeService};
use crate::core::whitelist::WhitelistService;
use crate::discord::{Data, Error};
use crate::infra::moderation::SerenityChannelGateway;
use crate::infra::whitelist::SqliteWhitelistStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The store is opened exactly once here and shared by reference with
    // every command through `Data`.

    let store = SqliteWhitelistStore::connect(&config.whitelist_db_path, config.store_timeout)
        .await
        .with_context(|| {
            format!(
                "Failed to open whitelist database at {}",
                config.whitelist_db_path.display()
            )
        })?;
    tracing::info!(path = %config.whitelist_db_path.display(), "Whitelist store ready");

    let whitelist = Arc::new(WhitelistService::with_timeout(store, config.store_timeout));

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    // Slash commands only; no message content needed.
    let intents = serenity::GatewayIntents::GUILDS;

    let setup_whitelist = Arc::clone(&whitelist);
    let platform_timeout = config.platform_timeout;
    let dev_guild_id = config.dev_guild_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands(),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        command = %ctx.command().qualified_name,
                        user_id = ctx.author().id.get(),
                        "Command invoked"
                    );
                })
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(bot = %ready.user.name, "Bot is starting up...");

                match dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        tracing::info!(guild_id, "Commands registered in development guild");
                    }
                    None => {
                        // Global registration can take up to an hour to propagate
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        tracing::info!("Commands registered globally");
                    }
                }

                let gateway = SerenityChannelGateway::new(ctx.http.clone());
                let purge = PurgeService::with_settings(
                    gateway,
                    PurgeLimits::default(),
                    platform_timeout,
                );

                Ok(Data {
                    whitelist: setup_whitelist,
                    purge: Arc::new(purge),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    // Stop the shards on ctrl-c so `start` returns and the store can be closed.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    let run_result = client.start().await;

    whitelist.shutdown().await;
    tracing::info!("Whitelist store closed");

    run_result.context("Error running bot")?;
    Ok(())
}

/// Log framework errors, then let poise's default handler reply to the user.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match &error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                error = %error,
                "Command failed"
            );
        }
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!(error = %error, "Framework setup failed");
        }
        _ => {}
    }

    if let Err(e) = poise::builtins::on_error(error).await {
        tracing::error!("Error while handling error: {}", e);
    }
}
