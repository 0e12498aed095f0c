//! Ledger entities, their persistence contracts and the services over them.

mod expense_service;
mod ledger_model;
mod ledger_traits;
pub mod normalize;
mod upsert_service;

pub use expense_service::*;
pub use ledger_model::*;
pub use ledger_traits::*;
pub use upsert_service::*;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests;
