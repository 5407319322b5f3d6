// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "whitelist/mod.rs"]
pub mod whitelist;

#[path = "moderation/mod.rs"]
pub mod moderation;
