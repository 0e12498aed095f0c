//! Provider synchronization: run state, locking contracts, orchestrator and triggers.

mod sync_scheduler;
mod sync_service;
mod sync_state_model;
mod sync_traits;

pub use sync_scheduler::*;
pub use sync_service::*;
pub use sync_state_model::*;
pub use sync_traits::*;
