// HTTP layer - the request boundary in front of the moderation service.

#[path = "api_error.rs"]
pub mod api_error;

#[path = "handlers.rs"]
pub mod handlers;

#[path = "router.rs"]
pub mod router;

pub use router::{build_router, AppState};
