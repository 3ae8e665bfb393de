//! HTTP API endpoints for the forum steward
//!
//! Provides:
//! - Forum routes (posts, replies, thanks, likes, solutions)
//! - Admin review routes (flagged content, approval)
//! - Error mapping from the moderation taxonomy to HTTP statuses
//! - Request logging and security header middleware

pub mod error;
pub mod forum;
pub mod middleware;

pub use error::ErrorBody;
pub use forum::{create_router as create_forum_router, ForumApiState};
pub use middleware::{logging_middleware, security_headers_middleware, RequestLogConfig};
