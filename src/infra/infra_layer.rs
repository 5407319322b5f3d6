// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "whitelist/mod.rs"]
pub mod whitelist;

#[path = "moderation/mod.rs"]
pub mod moderation;
