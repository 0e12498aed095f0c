//! SQLite persistence for the expense ledger.
//!
//! Reads go through the r2d2 pool; every write is serialized through the
//! single writer actor in [`db::WriteHandle`].

pub mod credentials;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod schema;
pub mod sync;
pub mod values;

pub use credentials::{CredentialRepository, TokenCipher};
pub use db::{init, DbPool, WriteHandle};
pub use errors::StorageError;
pub use ledger::LedgerRepository;
pub use sync::{SqliteSyncLock, SyncStateRepository};
