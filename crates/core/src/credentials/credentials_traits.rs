use async_trait::async_trait;

use super::{NewOAuthCredential, OAuthCredential, RefreshedToken, User};
use crate::errors::Result;

/// Persistence contract for users and OAuth credentials.
#[async_trait]
pub trait CredentialRepositoryTrait: Send + Sync {
    /// Returns the credential stored for `provider`, if any.
    fn get_credential(&self, provider: &str) -> Result<Option<OAuthCredential>>;

    /// Returns the single owner user, creating it with `email` when absent.
    async fn ensure_owner_user(&self, email: String) -> Result<User>;

    /// Creates the credential for (user, provider) or replaces it in place.
    async fn upsert_credential(&self, credential: NewOAuthCredential) -> Result<OAuthCredential>;

    /// Replaces the access token and expiry of an existing credential. Committed immediately.
    async fn update_access_token(&self, credential_id: String, token: RefreshedToken)
        -> Result<()>;
}
