//! Usage tracking, pricing, ledger, and notification infrastructure.

pub mod auth;
pub mod http;
pub mod ledger;
pub mod logging;
pub mod mime;
pub mod models;
pub mod notify;
pub mod pricing;
pub mod services;
pub mod tracker;

pub use auth::{CachedToken, ServiceCredential, TokenCache};
pub use ledger::LedgerClient;
pub use models::{Attachment, EmailMessage, LedgerRow, ModelUsage};
pub use notify::{DeliveryReceipt, Notifier, RetryPolicy};
pub use pricing::{ModelRate, PricedCall, PricingTable, estimate_tokens};
pub use services::Services;
pub use tracker::{
    ModelCallRecord, ScopeHandle, ScopeSummary, TokenInput, UsageTracker, current_scope,
    record_call, with_scope,
};
