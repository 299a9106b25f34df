// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "rate_limit/rate_limiter.rs"]
pub mod rate_limit;
