//! Persistence for contribution profiles and forum content
//!
//! [`CommunityStore`] is implemented by a PostgreSQL repository and by an
//! in-memory store used in tests and single-node development.

pub mod community;
pub mod memory;
pub mod pool;
mod store;

pub use community::CommunityRepository;
pub use memory::InMemoryStore;
pub use pool::DatabasePool;
pub use store::{
    reaction_charge, solution_charge, thanks_retraction, CommunityStore, DeletionOutcome,
    LedgerCharge, ReactionChange, ReactionOutcome, SolutionOutcome, StoreResult,
};
