//! Wiring of shared clients from configuration and environment secrets.
//!
//! One [`Services`] value is built per process: it owns the HTTP client,
//! the token cache shared by every request, the ledger, and the tracker.

use std::sync::Arc;

use reqwest::Client;

use crate::core::auth::{ServiceCredential, TokenCache};
use crate::core::http::build_client;
use crate::core::ledger::LedgerClient;
use crate::core::notify::Notifier;
use crate::core::pricing::PricingTable;
use crate::core::tracker::UsageTracker;
use crate::error::Result;
use crate::storage::{Config, Secrets};

pub struct Services {
    config: Config,
    secrets: Secrets,
    client: Client,
    pricing: Arc<PricingTable>,
    tokens: Arc<TokenCache>,
    ledger: Arc<LedgerClient>,
    tracker: UsageTracker,
}

impl Services {
    /// Build every shared client.
    ///
    /// Missing ledger settings leave telemetry disabled; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn build(config: Config, secrets: Secrets) -> Result<Self> {
        let client = build_client(config.timeout())?;
        let pricing = Arc::new(PricingTable::current().with_overrides(&config.pricing.rates));
        let tokens = Arc::new(
            TokenCache::new(client.clone())
                .with_scope(config.auth.scope.clone())
                .with_timeout(config.timeout()),
        );

        let settings = secrets.ledger_settings();
        if settings.is_none() {
            tracing::info!("ledger not configured, telemetry disabled");
        }
        let ledger = Arc::new(
            LedgerClient::new(client.clone(), Arc::clone(&tokens))
                .with_endpoint(config.ledger.endpoint.clone())
                .with_range(config.ledger.sheet_range.clone())
                .with_timeout(config.timeout())
                .with_settings(settings),
        );
        let tracker = UsageTracker::new(Arc::clone(&pricing), Arc::clone(&ledger));

        Ok(Self {
            config,
            secrets,
            client,
            pricing,
            tokens,
            ledger,
            tracker,
        })
    }

    /// Load config from disk and secrets from the environment, then build.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from [`Config::load`].
    pub fn from_env() -> Result<Self> {
        Self::build(Config::load()?, Secrets::from_env())
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerClient {
        &self.ledger
    }

    #[must_use]
    pub const fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    /// Notification client for the configured provider.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SpendlogError::EnvVarMissing`] if the sender
    /// address or provider key is not set.
    pub fn notifier(&self) -> Result<Notifier> {
        let credentials = self.secrets.notify_credentials()?;
        Ok(Notifier::new(self.client.clone(), credentials)
            .with_endpoint(self.config.notify.endpoint.clone())
            .with_policy(self.config.retry_policy())
            .with_timeout(self.config.timeout())
            .with_default_sender_name(self.config.notify.sender_name.clone()))
    }

    /// Service-account credential from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the variable is unset or the credential is unusable.
    pub fn service_credential(&self) -> Result<ServiceCredential> {
        self.secrets.service_credential()
    }
}
