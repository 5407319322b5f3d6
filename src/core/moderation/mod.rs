// Core moderation module - channel purge logic.
// Following the same pattern as the whitelist module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
