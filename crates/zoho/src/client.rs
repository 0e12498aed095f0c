//! Client for the Zoho Expense list endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use expense_ledger_core::provider::{
    AccessTokenProvider, ExpenseProviderTrait, ProviderPage, PROVIDER_PAGE_SIZE,
};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use crate::error::{Result, ZohoApiError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

const REPORTS_PATH: &str = "/expense/v1/reports";
const EXPENSES_PATH: &str = "/expense/v1/expenses";

/// Paginated reader for reports and expenses.
///
/// Every request asks `token_provider` for a valid access token first.
#[derive(Clone)]
pub struct ZohoExpenseClient {
    client: reqwest::Client,
    api_base: String,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl ZohoExpenseClient {
    pub fn new(api_base: &str, token_provider: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token_provider,
        })
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Zoho] API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Zoho] API response error ({}): {}", status, preview);
    }

    fn headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("Zoho-oauthtoken {}", token))
            .map_err(|_| ZohoApiError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn query(since: Option<DateTime<Utc>>, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", PROVIDER_PAGE_SIZE.to_string()),
        ];
        if let Some(since) = since {
            query.push((
                "modified_time",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        query
    }

    /// GET {api_base}{path}?page=..&per_page=..[&modified_time=..]
    async fn fetch_page(
        &self,
        token: &str,
        path: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> Result<Value> {
        let url = format!("{}{}", self.api_base, path);
        debug!("[Zoho] GET {} page {}", path, page);

        let response = self
            .client
            .get(&url)
            .headers(Self::headers(token)?)
            .query(&Self::query(since, page))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(ZohoApiError::api(
                status.as_u16(),
                format!("GET {} failed: {}", path, body),
            ));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn list(
        &self,
        path: &str,
        collection: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> expense_ledger_core::Result<ProviderPage> {
        let token = self.token_provider.get_valid_token().await?;
        let body = self.fetch_page(&token, path, since, page).await?;
        Ok(ProviderPage::from_response(&body, collection))
    }
}

#[async_trait]
impl ExpenseProviderTrait for ZohoExpenseClient {
    async fn list_reports(
        &self,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> expense_ledger_core::Result<ProviderPage> {
        self.list(REPORTS_PATH, "reports", since, page).await
    }

    async fn list_expenses(
        &self,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> expense_ledger_core::Result<ProviderPage> {
        self.list(EXPENSES_PATH, "expenses", since, page).await
    }
}
