// Core moderation module - banned-word detection and the review workflow.
// Following the same pattern as the other core modules.

pub mod aggregator;
pub mod moderation_models;
pub mod moderation_service;
pub mod normalizer;
pub mod variant_matcher;

pub use aggregator::*;
pub use moderation_models::*;
pub use moderation_service::*;
