//! OAuth credential models, persistence contract and the token manager.

mod credentials_model;
mod credentials_traits;
mod token_manager;

pub use credentials_model::*;
pub use credentials_traits::*;
pub use token_manager::*;
