//! Database models for users and OAuth credentials.

use diesel::prelude::*;
use expense_ledger_core::credentials::User;

use crate::errors::StorageError;
use crate::values::timestamp_from_db;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl TryFrom<UserDB> for User {
    type Error = StorageError;

    fn try_from(db: UserDB) -> Result<Self, Self::Error> {
        Ok(User {
            created_at: timestamp_from_db(&db.created_at)?,
            id: db.id,
            email: db.email,
        })
    }
}

/// Credential row. Token columns hold ciphertext.
#[derive(Queryable, Identifiable, Insertable, Selectable, Clone)]
#[diesel(table_name = crate::schema::oauth_credentials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OAuthCredentialDB {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
    pub scope: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Applied on refresh; a `None` refresh token leaves the stored one untouched.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::oauth_credentials)]
pub struct TokenRefreshChangeset {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: String,
    pub updated_at: String,
}
