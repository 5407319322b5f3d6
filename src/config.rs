// Runtime configuration, read once at startup from the environment (and `.env`).

use crate::core::moderation::DEFAULT_PLATFORM_TIMEOUT;
use crate::core::whitelist::DEFAULT_STORE_TIMEOUT;
use anyhow::{bail, Context as _};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "data/whitelist.db";

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// SQLite file holding the `users` table
    pub whitelist_db_path: PathBuf,
    /// Bound on each store call; SQLite's own lock waits are kept below it
    pub store_timeout: Duration,
    /// Bound on each Discord API call made by moderation commands
    pub platform_timeout: Duration,
    /// When set, commands are registered in this guild only (instant updates while developing)
    pub dev_guild_id: Option<u64>,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN").unwrap_or_default();
        if discord_token.trim().is_empty() {
            bail!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.");
        }

        let whitelist_db_path = lookup("WHITELIST_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let store_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "STORE_TIMEOUT_SECS",
            DEFAULT_STORE_TIMEOUT.as_secs(),
        )?);
        let platform_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "PLATFORM_TIMEOUT_SECS",
            DEFAULT_PLATFORM_TIMEOUT.as_secs(),
        )?);

        let dev_guild_id = lookup("DEV_GUILD_ID")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("DEV_GUILD_ID must be a guild id, got {v:?}"))
            })
            .transpose()?;

        Ok(Self {
            discord_token,
            whitelist_db_path,
            store_timeout,
            platform_timeout,
            dev_guild_id,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> anyhow::Result<u64> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?;
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(secs)
}
