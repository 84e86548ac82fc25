//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    Config, LedgerSettings, NotifyCredentials, Secrets, ENV_CONFIG, ENV_LEDGER_ID,
    ENV_SENDER_EMAIL, ENV_SENDER_NAME, ENV_SENDGRID_API_KEY, ENV_SERVICE_ACCOUNT,
};
pub use paths::AppPaths;
