//! HTTP clients for the Zoho Expense API: the OAuth token endpoint and the
//! paginated report and expense collections.

pub mod client;
pub mod error;
pub mod oauth;

#[cfg(test)]
pub(crate) mod mock_server;

pub use client::ZohoExpenseClient;
pub use error::{Result, ZohoApiError};
pub use oauth::ZohoOAuthClient;
