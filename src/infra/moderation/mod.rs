// Chat-platform adapters for moderation actions.

pub mod serenity_gateway;

pub use serenity_gateway::SerenityChannelGateway;
