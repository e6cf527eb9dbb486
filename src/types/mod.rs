//! Core domain types for the webhook bot.

pub mod ids;

pub use ids::{CommentId, DeliveryId, ParseRepoIdError, PrNumber, RepoId};
