// Discord layer - slash commands and the state they share.

#[path = "moderation/commands.rs"]
pub mod moderation;

#[path = "whitelist/commands.rs"]
pub mod whitelist;

use crate::core::moderation::PurgeService;
use crate::core::whitelist::WhitelistService;
use crate::infra::moderation::SerenityChannelGateway;
use crate::infra::whitelist::SqliteWhitelistStore;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// Built once in `main` and handed to poise; commands only see it by reference.
pub struct Data {
    pub whitelist: Arc<WhitelistService<SqliteWhitelistStore>>,
    pub purge: Arc<PurgeService<SerenityChannelGateway>>,
}

/// Every command the bot registers.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        whitelist::wl_add(),
        whitelist::wl_check(),
        moderation::clear(),
    ]
}
