use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use tokio::sync::Mutex;

use super::{
    ConnectionStatus, CredentialRepositoryTrait, NewOAuthCredential, OAuthCredential,
    RefreshedToken,
};
use crate::errors::{Error, Result};
use crate::provider::{AccessTokenProvider, OAuthTokenEndpoint, PROVIDER_ZOHO_EXPENSE};

/// Tokens expiring within this window are refreshed before use.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 120;

/// Email of the owner user created on first authorization.
pub const DEFAULT_OWNER_EMAIL: &str = "owner@example.com";

/// Hands out valid access tokens, refreshing them through the provider when close to expiry.
pub struct TokenManager {
    provider: String,
    owner_email: String,
    scope: Option<String>,
    repository: Arc<dyn CredentialRepositoryTrait>,
    endpoint: Arc<dyn OAuthTokenEndpoint>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        repository: Arc<dyn CredentialRepositoryTrait>,
        endpoint: Arc<dyn OAuthTokenEndpoint>,
    ) -> Self {
        Self {
            provider: PROVIDER_ZOHO_EXPENSE.to_string(),
            owner_email: DEFAULT_OWNER_EMAIL.to_string(),
            scope: None,
            repository,
            endpoint,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Scope recorded on credentials created by `authorize_with_code`.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = email.into();
        self
    }

    fn load_credential(&self) -> Result<OAuthCredential> {
        self.repository
            .get_credential(&self.provider)?
            .ok_or_else(|| Error::configuration("Zoho OAuth not configured"))
    }

    fn refresh_margin() -> Duration {
        Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }

    /// Absolute expiry for a grant lifetime. Out-of-range lifetimes are rejected as a bad grant.
    fn expiry_after(expires_in: i64) -> Result<DateTime<Utc>> {
        Duration::try_seconds(expires_in)
            .filter(|lifetime| *lifetime > Duration::zero())
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::upstream_auth(format!(
                    "Token response has unusable expires_in {}",
                    expires_in
                ))
            })
    }

    /// Returns a token valid for at least the refresh margin.
    ///
    /// Fails with `Error::Configuration` when no credential exists and with
    /// `Error::UpstreamAuth` when the provider rejects the refresh.
    pub async fn get_valid_token(&self) -> Result<String> {
        let credential = self.load_credential()?;
        if !credential.needs_refresh(Utc::now(), Self::refresh_margin()) {
            return Ok(credential.access_token);
        }

        // Serialize refreshes; a concurrent caller may already have rotated the token.
        let _guard = self.refresh_lock.lock().await;
        let credential = self.load_credential()?;
        if !credential.needs_refresh(Utc::now(), Self::refresh_margin()) {
            return Ok(credential.access_token);
        }

        self.refresh(credential).await
    }

    async fn refresh(&self, credential: OAuthCredential) -> Result<String> {
        if credential.refresh_token.is_empty() {
            return Err(Error::configuration(
                "No refresh token stored. Authorize the Zoho connection again.",
            ));
        }

        debug!(
            "[TokenManager] Refreshing access token for {} (expires {})",
            credential.provider, credential.expires_at
        );
        let grant = self.endpoint.refresh(&credential.refresh_token).await?;
        let expires_at = Self::expiry_after(grant.expires_in)?;

        self.repository
            .update_access_token(
                credential.id.clone(),
                RefreshedToken {
                    access_token: grant.access_token.clone(),
                    refresh_token: grant.refresh_token.filter(|t| !t.is_empty()),
                    expires_at,
                },
            )
            .await?;

        debug!("[TokenManager] Access token refreshed, valid until {}", expires_at);
        Ok(grant.access_token)
    }

    /// Consent URL for the initial authorization.
    pub fn authorization_url(&self) -> String {
        self.endpoint.authorization_url()
    }

    /// Completes the `authorization_code` flow and stores the resulting credential.
    ///
    /// Keeps the previously stored refresh token when the provider does not return one.
    pub async fn authorize_with_code(&self, code: &str) -> Result<OAuthCredential> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::invalid_data("Authorization code is empty"));
        }

        let grant = self.endpoint.exchange_code(code).await?;
        let expires_at = Self::expiry_after(grant.expires_in)?;
        let user = self
            .repository
            .ensure_owner_user(self.owner_email.clone())
            .await?;
        let previous_refresh = self
            .repository
            .get_credential(&self.provider)?
            .map(|c| c.refresh_token);

        let refresh_token = grant
            .refresh_token
            .filter(|t| !t.is_empty())
            .or(previous_refresh)
            .unwrap_or_default();

        let credential = self
            .repository
            .upsert_credential(NewOAuthCredential {
                user_id: user.id,
                provider: self.provider.clone(),
                access_token: grant.access_token,
                refresh_token,
                expires_at,
                scope: self.scope.clone(),
            })
            .await?;

        info!(
            "[TokenManager] Stored {} credential for user {}",
            credential.provider, credential.user_id
        );
        Ok(credential)
    }

    pub fn connection_status(&self) -> Result<ConnectionStatus> {
        let credential = self.repository.get_credential(&self.provider)?;
        Ok(ConnectionStatus {
            provider: self.provider.clone(),
            is_configured: credential.is_some(),
            expires_at: credential.as_ref().map(|c| c.expires_at),
            scope: credential.and_then(|c| c.scope),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn get_valid_token(&self) -> Result<String> {
        TokenManager::get_valid_token(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::User;
    use crate::provider::TokenGrant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryCredentials {
        user: StdMutex<Option<User>>,
        credential: StdMutex<Option<OAuthCredential>>,
        updates: AtomicUsize,
    }

    impl InMemoryCredentials {
        fn with_credential(expires_at: DateTime<Utc>, refresh_token: &str) -> Self {
            let repo = Self::default();
            *repo.credential.lock().unwrap() = Some(OAuthCredential {
                id: "cred-1".to_string(),
                user_id: "user-1".to_string(),
                provider: PROVIDER_ZOHO_EXPENSE.to_string(),
                access_token: "stored-access".to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at,
                scope: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
            repo
        }
    }

    #[async_trait]
    impl CredentialRepositoryTrait for InMemoryCredentials {
        fn get_credential(&self, provider: &str) -> Result<Option<OAuthCredential>> {
            Ok(self
                .credential
                .lock()
                .unwrap()
                .clone()
                .filter(|c| c.provider == provider))
        }

        async fn ensure_owner_user(&self, email: String) -> Result<User> {
            let mut user = self.user.lock().unwrap();
            Ok(user
                .get_or_insert_with(|| User {
                    id: "user-1".to_string(),
                    email,
                    created_at: Utc::now(),
                })
                .clone())
        }

        async fn upsert_credential(
            &self,
            credential: NewOAuthCredential,
        ) -> Result<OAuthCredential> {
            let stored = OAuthCredential {
                id: "cred-1".to_string(),
                user_id: credential.user_id,
                provider: credential.provider,
                access_token: credential.access_token,
                refresh_token: credential.refresh_token,
                expires_at: credential.expires_at,
                scope: credential.scope,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            *self.credential.lock().unwrap() = Some(stored.clone());
            Ok(stored)
        }

        async fn update_access_token(
            &self,
            credential_id: String,
            token: RefreshedToken,
        ) -> Result<()> {
            let mut guard = self.credential.lock().unwrap();
            let credential = guard
                .as_mut()
                .filter(|c| c.id == credential_id)
                .ok_or_else(|| Error::NotFound(credential_id.clone()))?;
            credential.access_token = token.access_token;
            if let Some(refresh) = token.refresh_token {
                credential.refresh_token = refresh;
            }
            credential.expires_at = token.expires_at;
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeEndpoint {
        reject: bool,
        rotate_refresh: bool,
        expires_in: i64,
        refresh_calls: AtomicUsize,
    }

    impl FakeEndpoint {
        fn accepting() -> Self {
            Self {
                reject: false,
                rotate_refresh: false,
                expires_in: 3600,
                refresh_calls: AtomicUsize::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::accepting()
            }
        }
    }

    #[async_trait]
    impl OAuthTokenEndpoint for FakeEndpoint {
        fn authorization_url(&self) -> String {
            "https://accounts.example.com/oauth/v2/auth".to_string()
        }

        async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
            if self.reject {
                return Err(Error::upstream_auth("invalid_code"));
            }
            Ok(TokenGrant {
                access_token: format!("access-for-{}", code),
                refresh_token: if self.rotate_refresh {
                    Some("fresh-refresh".to_string())
                } else {
                    None
                },
                expires_in: self.expires_in,
            })
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(Error::upstream_auth("invalid refresh token"));
            }
            Ok(TokenGrant {
                access_token: format!("refreshed-with-{}", refresh_token),
                refresh_token: if self.rotate_refresh {
                    Some("rotated-refresh".to_string())
                } else {
                    None
                },
                expires_in: self.expires_in,
            })
        }
    }

    fn manager(
        repo: Arc<InMemoryCredentials>,
        endpoint: Arc<FakeEndpoint>,
    ) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(repo, endpoint))
    }

    #[tokio::test]
    async fn missing_credential_is_a_configuration_error() {
        let repo = Arc::new(InMemoryCredentials::default());
        let tokens = manager(repo, Arc::new(FakeEndpoint::accepting()));
        let err = tokens.get_valid_token().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_refresh() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() + Duration::hours(1),
            "refresh-1",
        ));
        let endpoint = Arc::new(FakeEndpoint::accepting());
        let tokens = manager(repo.clone(), endpoint.clone());

        assert_eq!(tokens.get_valid_token().await.unwrap(), "stored-access");
        assert_eq!(endpoint.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(repo.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_near_expiry_is_refreshed_and_persisted() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() + Duration::seconds(60),
            "refresh-1",
        ));
        let endpoint = Arc::new(FakeEndpoint::accepting());
        let tokens = manager(repo.clone(), endpoint.clone());

        let token = tokens.get_valid_token().await.unwrap();
        assert_eq!(token, "refreshed-with-refresh-1");

        let stored = repo.get_credential(PROVIDER_ZOHO_EXPENSE).unwrap().unwrap();
        assert_eq!(stored.access_token, "refreshed-with-refresh-1");
        assert_eq!(stored.refresh_token, "refresh-1");
        assert!(stored.expires_at > Utc::now() + Duration::minutes(50));
    }

    #[tokio::test]
    async fn rotated_refresh_token_replaces_stored_one() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() - Duration::minutes(5),
            "refresh-1",
        ));
        let endpoint = Arc::new(FakeEndpoint {
            rotate_refresh: true,
            ..FakeEndpoint::accepting()
        });
        let tokens = manager(repo.clone(), endpoint);

        tokens.get_valid_token().await.unwrap();
        let stored = repo.get_credential(PROVIDER_ZOHO_EXPENSE).unwrap().unwrap();
        assert_eq!(stored.refresh_token, "rotated-refresh");
    }

    #[tokio::test]
    async fn rejected_refresh_is_an_upstream_auth_error() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() + Duration::seconds(30),
            "refresh-1",
        ));
        let tokens = manager(repo.clone(), Arc::new(FakeEndpoint::rejecting()));

        let err = tokens.get_valid_token().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        let stored = repo.get_credential(PROVIDER_ZOHO_EXPENSE).unwrap().unwrap();
        assert_eq!(stored.access_token, "stored-access");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() + Duration::seconds(10),
            "refresh-1",
        ));
        let endpoint = Arc::new(FakeEndpoint::accepting());
        let tokens = manager(repo.clone(), endpoint.clone());

        let (a, b) = tokio::join!(tokens.get_valid_token(), tokens.get_valid_token());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(endpoint.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_requires_reauthorization() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() - Duration::minutes(1),
            "",
        ));
        let endpoint = Arc::new(FakeEndpoint::accepting());
        let tokens = manager(repo, endpoint.clone());

        let err = tokens.get_valid_token().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(endpoint.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn authorization_keeps_previous_refresh_token_when_omitted() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() - Duration::days(30),
            "long-lived-refresh",
        ));
        let tokens = manager(repo.clone(), Arc::new(FakeEndpoint::accepting()));

        let credential = tokens.authorize_with_code("abc").await.unwrap();
        assert_eq!(credential.access_token, "access-for-abc");
        assert_eq!(credential.refresh_token, "long-lived-refresh");

        let status = tokens.connection_status().unwrap();
        assert!(status.is_configured);
        assert_eq!(status.provider, PROVIDER_ZOHO_EXPENSE);
    }

    #[tokio::test]
    async fn authorization_rejects_empty_code() {
        let repo = Arc::new(InMemoryCredentials::default());
        let tokens = manager(repo, Arc::new(FakeEndpoint::accepting()));
        let err = tokens.authorize_with_code("  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn out_of_range_lifetime_is_rejected_without_storing() {
        let repo = Arc::new(InMemoryCredentials::with_credential(
            Utc::now() + Duration::seconds(30),
            "refresh-1",
        ));
        let endpoint = Arc::new(FakeEndpoint {
            expires_in: 10_000_000_000_000,
            ..FakeEndpoint::accepting()
        });
        let tokens = manager(repo.clone(), endpoint);

        let err = tokens.get_valid_token().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        assert_eq!(repo.updates.load(Ordering::SeqCst), 0);

        let err = tokens.authorize_with_code("abc").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        let stored = repo.get_credential(PROVIDER_ZOHO_EXPENSE).unwrap().unwrap();
        assert_eq!(stored.access_token, "stored-access");
    }

    #[tokio::test]
    async fn non_positive_lifetime_is_rejected() {
        let repo = Arc::new(InMemoryCredentials::default());
        let endpoint = Arc::new(FakeEndpoint {
            expires_in: -5,
            ..FakeEndpoint::accepting()
        });
        let tokens = manager(repo.clone(), endpoint);

        let err = tokens.authorize_with_code("abc").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(_)));
        assert!(repo.get_credential(PROVIDER_ZOHO_EXPENSE).unwrap().is_none());
    }
}
