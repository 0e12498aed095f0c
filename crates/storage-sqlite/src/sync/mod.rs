//! SQLite storage for sync run history and the cross-process sync lock.

mod lock;
mod model;
mod repository;

pub use lock::{SqliteSyncLock, DEFAULT_LOCK_STALE_AFTER_MINUTES};
pub use model::{SyncLockDB, SyncStateDB};
pub use repository::SyncStateRepository;
