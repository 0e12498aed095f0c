//! Contracts for the upstream expense provider: OAuth token endpoint and
//! paginated collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::Result;

/// Provider key used for credentials and sync state rows.
pub const PROVIDER_ZOHO_EXPENSE: &str = "zoho_expense";

/// Fixed page size for list calls.
pub const PROVIDER_PAGE_SIZE: u32 = 200;

/// Tokens returned by an `authorization_code` or `refresh_token` grant.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// OAuth2 token endpoint of the provider.
#[async_trait]
pub trait OAuthTokenEndpoint: Send + Sync {
    /// Consent URL the owner visits to grant offline access.
    fn authorization_url(&self) -> String;

    /// Exchanges an authorization code. Rejections surface as `Error::UpstreamAuth`.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    /// Runs a `refresh_token` grant. Rejections surface as `Error::UpstreamAuth`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Source of a currently valid bearer token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn get_valid_token(&self) -> Result<String>;
}

/// One normalized page of a provider collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderPage {
    pub items: Vec<Value>,
    pub has_more: bool,
}

impl ProviderPage {
    /// Normalizes a raw list response.
    ///
    /// Items are read from `collection` and fall back to `data`. The continuation flag is
    /// read from `has_more`, then `page_context.has_more_page`, and defaults to `false`.
    pub fn from_response(body: &Value, collection: &str) -> Self {
        let items = [collection, "data"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(Value::as_array))
            .find(|items| !items.is_empty())
            .cloned()
            .unwrap_or_default();

        let has_more = body
            .get("has_more")
            .and_then(Value::as_bool)
            .or_else(|| {
                body.get("page_context")
                    .and_then(|ctx| ctx.get("has_more_page"))
                    .and_then(Value::as_bool)
            })
            .unwrap_or(false);

        Self { items, has_more }
    }
}

/// Paginated read access to the provider's collections.
///
/// `since` bounds results to records modified after the cursor; pages are 1-indexed.
#[async_trait]
pub trait ExpenseProviderTrait: Send + Sync {
    async fn list_reports(&self, since: Option<DateTime<Utc>>, page: u32)
        -> Result<ProviderPage>;

    async fn list_expenses(
        &self,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> Result<ProviderPage>;
}
