//! Aggregate views over stored expenses.

mod reports_model;
mod reports_service;

pub use reports_model::*;
pub use reports_service::*;
