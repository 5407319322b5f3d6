// Core whitelist module - membership register for approved identities.
// Same layout as the moderation module: models + service (with its storage port).

pub mod whitelist_models;
pub mod whitelist_service;

pub use whitelist_models::*;
pub use whitelist_service::*;
