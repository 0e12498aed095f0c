//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{Error, Result};

pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_DATABASE_URL: &str = "ledger.db";
pub const DEFAULT_ZOHO_BASE: &str = "https://www.zohoapis.com";
pub const DEFAULT_ZOHO_ACCOUNTS_BASE: &str = "https://accounts.zoho.com";
pub const DEFAULT_ZOHO_SCOPES: &str =
    "ZohoExpense.expenses.READ,ZohoExpense.reports.READ,ZohoExpense.files.READ";
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 15;
pub const DEFAULT_SYNC_LOCK_STALE_MINUTES: u64 = 60;
pub const DEFAULT_ADMIN_TOKEN: &str = "dev_admin_token";

/// OAuth client settings for the expense provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub accounts_base: String,
    pub scopes: String,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub app_base_url: String,
    /// Path of the SQLite database file.
    pub database_url: String,
    pub provider: ProviderSettings,
    pub encryption_key: String,
    pub sync_interval: Duration,
    pub sync_lock_stale_after: Duration,
    pub admin_token: String,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_url = |key: &str, default: &str| {
            get(key)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };
        let get_minutes = |key: &str, default: u64| -> Result<Duration> {
            let minutes = match get(key) {
                Some(raw) => raw.parse::<u64>().map_err(|_| {
                    Error::configuration(format!("{} must be a whole number of minutes", key))
                })?,
                None => default,
            };
            if minutes == 0 {
                return Err(Error::configuration(format!(
                    "{} must be greater than zero",
                    key
                )));
            }
            Ok(Duration::from_secs(minutes * 60))
        };

        Ok(Self {
            app_base_url: get_url("APP_BASE_URL", DEFAULT_APP_BASE_URL),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            provider: ProviderSettings {
                client_id: get("ZOHO_CLIENT_ID").unwrap_or_default(),
                client_secret: get("ZOHO_CLIENT_SECRET").unwrap_or_default(),
                api_base: get_url("ZOHO_BASE", DEFAULT_ZOHO_BASE),
                accounts_base: get_url("ZOHO_ACCOUNTS_BASE", DEFAULT_ZOHO_ACCOUNTS_BASE),
                scopes: get("ZOHO_SCOPES").unwrap_or_else(|| DEFAULT_ZOHO_SCOPES.to_string()),
            },
            encryption_key: get("ENCRYPTION_KEY").unwrap_or_default(),
            sync_interval: get_minutes("SYNC_INTERVAL_MINUTES", DEFAULT_SYNC_INTERVAL_MINUTES)?,
            sync_lock_stale_after: get_minutes(
                "SYNC_LOCK_STALE_MINUTES",
                DEFAULT_SYNC_LOCK_STALE_MINUTES,
            )?,
            admin_token: get("ADMIN_TOKEN").unwrap_or_else(|| DEFAULT_ADMIN_TOKEN.to_string()),
        })
    }

    /// Redirect URI registered with the provider for the OAuth callback.
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/oauth/zoho/callback", self.app_base_url)
    }

    /// Fails when the settings needed to reach the provider are missing.
    pub fn ensure_provider_configured(&self) -> Result<()> {
        if self.provider.client_id.is_empty() || self.provider.client_secret.is_empty() {
            return Err(Error::configuration(
                "ZOHO_CLIENT_ID and ZOHO_CLIENT_SECRET must be set",
            ));
        }
        if self.encryption_key.is_empty() {
            return Err(Error::configuration("ENCRYPTION_KEY not set"));
        }
        Ok(())
    }
}
