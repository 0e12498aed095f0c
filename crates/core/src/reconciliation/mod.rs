//! Matching stored expenses against company T&E reports.

mod reconciliation_model;
mod reconciliation_service;

pub use reconciliation_model::*;
pub use reconciliation_service::*;
