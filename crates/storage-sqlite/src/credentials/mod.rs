//! SQLite storage for users and encrypted OAuth credentials.

mod cipher;
mod model;
mod repository;

pub use cipher::TokenCipher;
pub use model::{OAuthCredentialDB, UserDB};
pub use repository::CredentialRepository;
