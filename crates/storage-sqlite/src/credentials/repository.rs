use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use expense_ledger_core::credentials::{
    CredentialRepositoryTrait, NewOAuthCredential, OAuthCredential, RefreshedToken, User,
};
use expense_ledger_core::{Error, Result};
use uuid::Uuid;

use super::cipher::TokenCipher;
use super::model::{OAuthCredentialDB, TokenRefreshChangeset, UserDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{oauth_credentials, users};
use crate::values::{timestamp_from_db, timestamp_to_db};

pub struct CredentialRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
    cipher: Arc<TokenCipher>,
}

fn to_domain(row: OAuthCredentialDB, cipher: &TokenCipher) -> Result<OAuthCredential> {
    Ok(OAuthCredential {
        access_token: cipher.decrypt(&row.access_token)?,
        refresh_token: cipher.decrypt(&row.refresh_token)?,
        expires_at: timestamp_from_db(&row.expires_at)?,
        created_at: timestamp_from_db(&row.created_at)?,
        updated_at: timestamp_from_db(&row.updated_at)?,
        id: row.id,
        user_id: row.user_id,
        provider: row.provider,
        scope: row.scope,
    })
}

impl CredentialRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
        cipher: Arc<TokenCipher>,
    ) -> Self {
        Self {
            pool,
            writer,
            cipher,
        }
    }
}

#[async_trait]
impl CredentialRepositoryTrait for CredentialRepository {
    fn get_credential(&self, provider: &str) -> Result<Option<OAuthCredential>> {
        let mut conn = get_connection(&self.pool)?;
        let row = oauth_credentials::table
            .filter(oauth_credentials::provider.eq(provider))
            .order(oauth_credentials::updated_at.desc())
            .select(OAuthCredentialDB::as_select())
            .first::<OAuthCredentialDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|row| to_domain(row, &self.cipher)).transpose()
    }

    async fn ensure_owner_user(&self, email: String) -> Result<User> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<User> {
                let existing = users::table
                    .filter(users::email.eq(&email))
                    .select(UserDB::as_select())
                    .first::<UserDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let row = match existing {
                    Some(row) => row,
                    None => diesel::insert_into(users::table)
                        .values(UserDB {
                            id: Uuid::new_v4().to_string(),
                            email,
                            created_at: timestamp_to_db(Utc::now()),
                        })
                        .returning(UserDB::as_returning())
                        .get_result(conn)
                        .map_err(StorageError::from)?,
                };
                Ok(User::try_from(row)?)
            })
            .await
    }

    async fn upsert_credential(&self, credential: NewOAuthCredential) -> Result<OAuthCredential> {
        let now = timestamp_to_db(Utc::now());
        let row = OAuthCredentialDB {
            id: Uuid::new_v4().to_string(),
            user_id: credential.user_id,
            provider: credential.provider,
            access_token: self.cipher.encrypt(&credential.access_token)?,
            refresh_token: self.cipher.encrypt(&credential.refresh_token)?,
            expires_at: timestamp_to_db(credential.expires_at),
            scope: credential.scope,
            created_at: now.clone(),
            updated_at: now,
        };
        let cipher = Arc::clone(&self.cipher);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<OAuthCredential> {
                let stored = diesel::insert_into(oauth_credentials::table)
                    .values(&row)
                    .on_conflict((oauth_credentials::user_id, oauth_credentials::provider))
                    .do_update()
                    .set((
                        oauth_credentials::access_token.eq(excluded(oauth_credentials::access_token)),
                        oauth_credentials::refresh_token
                            .eq(excluded(oauth_credentials::refresh_token)),
                        oauth_credentials::expires_at.eq(excluded(oauth_credentials::expires_at)),
                        oauth_credentials::scope.eq(excluded(oauth_credentials::scope)),
                        oauth_credentials::updated_at.eq(excluded(oauth_credentials::updated_at)),
                    ))
                    .returning(OAuthCredentialDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                to_domain(stored, &cipher)
            })
            .await
    }

    async fn update_access_token(&self, credential_id: String, token: RefreshedToken) -> Result<()> {
        let changes = TokenRefreshChangeset {
            access_token: self.cipher.encrypt(&token.access_token)?,
            refresh_token: token
                .refresh_token
                .as_deref()
                .map(|t| self.cipher.encrypt(t))
                .transpose()?,
            expires_at: timestamp_to_db(token.expires_at),
            updated_at: timestamp_to_db(Utc::now()),
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let updated = diesel::update(oauth_credentials::table.find(&credential_id))
                    .set(&changes)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("credential {}", credential_id)));
                }
                Ok(())
            })
            .await
    }
}
