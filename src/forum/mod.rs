//! Forum content and the service that moderates it
//!
//! [`ForumService`] runs every submission through the throttle and the
//! moderation gate, then hands persistence and ledger effects to the store.

mod actor;
mod content;
mod service;

pub use actor::{Actor, Role};
pub use content::{ContentKind, ContentRecord, ContentRevision, NewContent};
pub use service::{
    ContentRemoval, ForumService, PostThread, ReactionUpdate, SolutionUpdate, Submission,
};
