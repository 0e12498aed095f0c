//! Client for the Zoho accounts OAuth2 token endpoint.

use std::time::Duration;

use async_trait::async_trait;
use expense_ledger_core::config::ProviderSettings;
use expense_ledger_core::provider::{OAuthTokenEndpoint, TokenGrant};
use log::{debug, warn};
use serde_json::Value;

use crate::error::{Result, ZohoApiError};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct ZohoOAuthClient {
    client: reqwest::Client,
    accounts_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
}

impl ZohoOAuthClient {
    pub fn new(settings: &ProviderSettings, redirect_uri: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            accounts_base: settings.accounts_base.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: redirect_uri.into(),
            scopes: settings.scopes.clone(),
        })
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_base)
    }

    /// POST /oauth/v2/token
    async fn request_token(&self, grant_type: &str, extra: &[(&str, &str)]) -> Result<TokenGrant> {
        let mut form = vec![
            ("grant_type", grant_type),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(extra);

        let response = self.client.post(self.token_url()).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("[Zoho] {} grant response status: {}", grant_type, status);

        if !status.is_success() {
            return Err(ZohoApiError::auth(format!(
                "Token {} grant failed ({}): {}",
                grant_type,
                status.as_u16(),
                body
            )));
        }

        let payload: Value = serde_json::from_str(&body)?;
        parse_grant(&payload)
    }
}

/// Reads a token response. Zoho reports some rejections as 200 with an `error` field.
fn parse_grant(payload: &Value) -> Result<TokenGrant> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(ZohoApiError::auth(format!("Token endpoint returned '{}'", error)));
    }

    let access_token = payload
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ZohoApiError::auth("Token response has no access_token"))?
        .to_string();

    let refresh_token = payload
        .get("refresh_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let expires_in = match payload.get("expires_in") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .unwrap_or_else(|| {
        warn!("[Zoho] Token response without usable expires_in; assuming one hour");
        DEFAULT_EXPIRES_IN_SECS
    });

    Ok(TokenGrant {
        access_token,
        refresh_token,
        expires_in,
    })
}

#[async_trait]
impl OAuthTokenEndpoint for ZohoOAuthClient {
    fn authorization_url(&self) -> String {
        format!(
            "{}/oauth/v2/auth?response_type=code&client_id={}&scope={}&redirect_uri={}&access_type=offline&prompt=consent",
            self.accounts_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(&self.redirect_uri),
        )
    }

    async fn exchange_code(&self, code: &str) -> expense_ledger_core::Result<TokenGrant> {
        let grant = self
            .request_token(
                "authorization_code",
                &[("redirect_uri", self.redirect_uri.as_str()), ("code", code)],
            )
            .await?;
        Ok(grant)
    }

    async fn refresh(&self, refresh_token: &str) -> expense_ledger_core::Result<TokenGrant> {
        let grant = self
            .request_token("refresh_token", &[("refresh_token", refresh_token)])
            .await?;
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::{self, MockResponse};
    use expense_ledger_core::Error;
    use serde_json::json;

    fn settings(accounts_base: &str) -> ProviderSettings {
        ProviderSettings {
            client_id: "client-1".to_string(),
            client_secret: "shh".to_string(),
            api_base: "http://unused".to_string(),
            accounts_base: accounts_base.to_string(),
            scopes: "ZohoExpense.expenses.READ,ZohoExpense.reports.READ".to_string(),
        }
    }

    #[test]
    fn authorization_url_requests_offline_consent() {
        let client = ZohoOAuthClient::new(
            &settings("https://accounts.zoho.com/"),
            "http://localhost:8000/oauth/zoho/callback",
        )
        .unwrap();
        let url = client.authorization_url();

        assert!(url.starts_with("https://accounts.zoho.com/oauth/v2/auth?response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("scope=ZohoExpense.expenses.READ%2CZohoExpense.reports.READ"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Foauth%2Fzoho%2Fcallback"));
        assert!(url.ends_with("access_type=offline&prompt=consent"));
    }

    #[test]
    fn grant_defaults_expiry_and_rejects_missing_token() {
        let grant = parse_grant(&json!({ "access_token": "a1" })).unwrap();
        assert_eq!(grant.expires_in, 3600);
        assert!(grant.refresh_token.is_none());

        assert!(matches!(
            parse_grant(&json!({ "token_type": "Bearer" })),
            Err(ZohoApiError::Auth(_))
        ));
        assert!(matches!(
            parse_grant(&json!({ "error": "invalid_code" })),
            Err(ZohoApiError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn exchange_code_posts_form_with_client_credentials() {
        let (base_url, captured, server) = mock_server::start(vec![MockResponse::json(
            200,
            json!({ "access_token": "a1", "refresh_token": "r1", "expires_in": 3600 }),
        )])
        .await;
        let client = ZohoOAuthClient::new(&settings(&base_url), "http://app/callback").unwrap();

        let grant = client.exchange_code("code-123").await.unwrap();
        assert_eq!(grant.access_token, "a1");
        assert_eq!(grant.refresh_token.as_deref(), Some("r1"));

        let requests = captured.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/oauth/v2/token");
        assert_eq!(
            requests[0].form_param("grant_type").as_deref(),
            Some("authorization_code")
        );
        assert_eq!(requests[0].form_param("code").as_deref(), Some("code-123"));
        assert_eq!(requests[0].form_param("client_secret").as_deref(), Some("shh"));
        assert_eq!(
            requests[0].form_param("redirect_uri").as_deref(),
            Some("http://app/callback")
        );
        server.abort();
    }

    #[tokio::test]
    async fn rejected_refresh_is_upstream_auth() {
        let (base_url, captured, server) = mock_server::start(vec![MockResponse::json(
            400,
            json!({ "error": "invalid_client" }),
        )])
        .await;
        let client = ZohoOAuthClient::new(&settings(&base_url), "http://app/callback").unwrap();

        let err = client.refresh("r1").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        let requests = captured.lock().await;
        assert_eq!(
            requests[0].form_param("grant_type").as_deref(),
            Some("refresh_token")
        );
        assert_eq!(requests[0].form_param("refresh_token").as_deref(), Some("r1"));
        server.abort();
    }
}
