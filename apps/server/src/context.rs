//! Builds the storage, provider clients and services from `LedgerConfig`.

use std::sync::Arc;

use expense_ledger_core::credentials::TokenManager;
use expense_ledger_core::ledger::{ExpenseService, LedgerUpsertService};
use expense_ledger_core::reconciliation::ReconciliationService;
use expense_ledger_core::reports::ReportsService;
use expense_ledger_core::sync::{ManualSyncTrigger, SyncService, SyncStateRepositoryTrait};
use expense_ledger_core::{Error, LedgerConfig, Result};
use expense_ledger_storage_sqlite::{
    db, CredentialRepository, DbPool, LedgerRepository, SqliteSyncLock, SyncStateRepository,
    TokenCipher, WriteHandle,
};
use expense_ledger_zoho::{ZohoExpenseClient, ZohoOAuthClient};
use tracing::info;

pub struct AppContext {
    pub config: LedgerConfig,
    pool: Arc<DbPool>,
    writer: WriteHandle,
    ledger: Arc<LedgerRepository>,
    sync_state: Arc<SyncStateRepository>,
}

impl AppContext {
    /// Opens the database and applies pending migrations.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        info!("Opening ledger database at {}", config.database_url);
        let (pool, writer) = db::init(&config.database_url)?;
        let ledger = Arc::new(LedgerRepository::new(pool.clone(), writer.clone()));
        let sync_state = Arc::new(SyncStateRepository::new(pool.clone(), writer.clone()));
        Ok(Self {
            config,
            pool,
            writer,
            ledger,
            sync_state,
        })
    }

    pub fn sync_state(&self) -> Arc<dyn SyncStateRepositoryTrait> {
        self.sync_state.clone()
    }

    /// Needs the provider client settings and `ENCRYPTION_KEY`.
    pub fn token_manager(&self) -> Result<Arc<TokenManager>> {
        self.config.ensure_provider_configured()?;
        let cipher = Arc::new(TokenCipher::from_secret(&self.config.encryption_key)?);
        let credentials = Arc::new(CredentialRepository::new(
            self.pool.clone(),
            self.writer.clone(),
            cipher,
        ));
        let oauth = Arc::new(ZohoOAuthClient::new(
            &self.config.provider,
            self.config.oauth_redirect_uri(),
        )?);
        Ok(Arc::new(
            TokenManager::new(credentials, oauth).with_scope(self.config.provider.scopes.clone()),
        ))
    }

    pub fn sync_service(&self) -> Result<Arc<SyncService>> {
        let client = ZohoExpenseClient::new(&self.config.provider.api_base, self.token_manager()?)?;
        let stale_after = chrono::Duration::from_std(self.config.sync_lock_stale_after)
            .map_err(|e| Error::configuration(format!("SYNC_LOCK_STALE_MINUTES: {}", e)))?;
        let lock = SqliteSyncLock::new(self.writer.clone()).with_stale_after(stale_after);

        Ok(Arc::new(SyncService::new(
            Arc::new(client),
            LedgerUpsertService::new(self.ledger.clone()),
            self.sync_state(),
            Arc::new(lock),
        )))
    }

    pub fn manual_trigger(&self) -> Result<ManualSyncTrigger> {
        Ok(ManualSyncTrigger::new(
            self.sync_service()?,
            self.config.admin_token.clone(),
        ))
    }

    pub fn expense_service(&self) -> ExpenseService {
        ExpenseService::new(self.ledger.clone())
    }

    pub fn reports_service(&self) -> ReportsService {
        ReportsService::new(self.ledger.clone())
    }

    pub fn reconciliation_service(&self) -> ReconciliationService {
        ReconciliationService::new(self.ledger.clone())
    }
}
