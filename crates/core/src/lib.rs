//! Domain core of the expense ledger: models, repository contracts and the
//! services that drive provider synchronization, reporting and reconciliation.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod ledger;
pub mod provider;
pub mod reconciliation;
pub mod reports;
pub mod sync;

pub use config::LedgerConfig;
pub use errors::{DatabaseError, Error, Result};
