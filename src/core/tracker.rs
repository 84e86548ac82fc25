//! Per-request usage tracking.
//!
//! A [`ScopeHandle`] accumulates model-call cost for one logical request.
//! Code that holds the handle records into it directly; code deep in shared
//! call paths uses [`record_call`], which finds the scope installed on the
//! current tokio task by [`with_scope`] or [`UsageTracker::run_scoped`].
//!
//! Task-local storage does not follow `tokio::spawn`. To attribute work in a
//! spawned task, wrap its future with `with_scope(handle, fut)`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::core::ledger::LedgerClient;
use crate::core::models::{LedgerRow, ModelUsage};
use crate::core::pricing::{PricingTable, estimate_tokens};

tokio::task_local! {
    static CURRENT_SCOPE: ScopeHandle;
}

// =============================================================================
// Token Input
// =============================================================================

/// Token usage for one side of a call: an exact count, or raw text to estimate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenInput {
    Count(u64),
    Text(String),
}

impl TokenInput {
    /// Token count, estimating from text when needed.
    #[must_use]
    pub fn tokens(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Text(text) => estimate_tokens(text),
        }
    }
}

impl From<u64> for TokenInput {
    fn from(n: u64) -> Self {
        Self::Count(n)
    }
}

impl From<u32> for TokenInput {
    fn from(n: u32) -> Self {
        Self::Count(u64::from(n))
    }
}

impl From<usize> for TokenInput {
    fn from(n: usize) -> Self {
        Self::Count(n as u64)
    }
}

impl From<&str> for TokenInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TokenInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for TokenInput {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Option<&str>> for TokenInput {
    fn from(text: Option<&str>) -> Self {
        text.map_or(Self::Count(0), Self::from)
    }
}

// =============================================================================
// Records and Summaries
// =============================================================================

/// One priced model invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCallRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Read-only view of a scope's totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeSummary {
    pub service: String,
    pub user: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub total_cost_usd: f64,
    pub total_calls: u64,
    pub breakdown: BTreeMap<String, ModelUsage>,
}

#[derive(Debug, Default)]
struct ScopeState {
    total_cost: f64,
    breakdown: BTreeMap<String, ModelUsage>,
    finished: bool,
}

#[derive(Debug)]
struct ScopeInner {
    service: String,
    user: String,
    inputs: Value,
    started_at: DateTime<Utc>,
    started: Instant,
    pricing: Arc<PricingTable>,
    state: Mutex<ScopeState>,
}

// =============================================================================
// Scope Handle
// =============================================================================

/// Cost accumulator for one logical request. Cheap to clone; clones share totals.
#[derive(Debug, Clone)]
pub struct ScopeHandle(Arc<ScopeInner>);

impl ScopeHandle {
    fn new(
        pricing: Arc<PricingTable>,
        service: impl Into<String>,
        user: impl Into<String>,
        inputs: Value,
    ) -> Self {
        Self(Arc::new(ScopeInner {
            service: service.into(),
            user: user.into(),
            inputs,
            started_at: Utc::now(),
            started: Instant::now(),
            pricing,
            state: Mutex::new(ScopeState::default()),
        }))
    }

    fn state(&self) -> MutexGuard<'_, ScopeState> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.0.service
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.0.user
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.0.started_at
    }

    /// Whether two handles refer to the same scope.
    #[must_use]
    pub fn same_scope(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Price a model call and add it to this scope.
    ///
    /// Calls recorded after the scope finished are priced but not counted.
    pub fn record_call(
        &self,
        model: &str,
        input: impl Into<TokenInput>,
        output: impl Into<TokenInput>,
    ) -> ModelCallRecord {
        let input_tokens = input.into().tokens();
        let output_tokens = output.into().tokens();
        let cost_usd = self.0.pricing.cost(model, input_tokens, output_tokens);

        {
            let mut state = self.state();
            if state.finished {
                tracing::warn!(
                    service = %self.0.service,
                    model,
                    "model call recorded after scope finished, ignoring"
                );
            } else {
                let usage = state.breakdown.entry(model.to_string()).or_default();
                usage.calls += 1;
                usage.cost += cost_usd;
                state.total_cost += cost_usd;
            }
        }

        tracing::trace!(
            service = %self.0.service,
            model,
            input_tokens,
            output_tokens,
            cost_usd,
            "model call recorded"
        );

        ModelCallRecord {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd,
        }
    }

    /// Current totals.
    #[must_use]
    pub fn snapshot(&self) -> ScopeSummary {
        let state = self.state();
        ScopeSummary {
            service: self.0.service.clone(),
            user: self.0.user.clone(),
            started_at: self.0.started_at,
            elapsed: self.0.started.elapsed(),
            total_cost_usd: state.total_cost,
            total_calls: state.breakdown.values().map(|u| u.calls).sum(),
            breakdown: state.breakdown.clone(),
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    /// Freeze the scope and produce its ledger row.
    ///
    /// Returns `None` if the scope was already finished.
    pub fn finalize(&self, results: Value) -> Option<LedgerRow> {
        let mut state = self.state();
        if state.finished {
            return None;
        }
        state.finished = true;
        Some(LedgerRow {
            timestamp: self.0.started_at,
            service: self.0.service.clone(),
            user: self.0.user.clone(),
            inputs: self.0.inputs.clone(),
            cost_usd: state.total_cost,
            duration: self.0.started.elapsed(),
            results,
            breakdown: state.breakdown.clone(),
        })
    }
}

// =============================================================================
// Ambient Scope
// =============================================================================

/// The scope installed on the current task, if any.
#[must_use]
pub fn current_scope() -> Option<ScopeHandle> {
    CURRENT_SCOPE.try_with(Clone::clone).ok()
}

/// Run `fut` with `scope` as the current task's ambient scope.
pub async fn with_scope<F: Future>(scope: ScopeHandle, fut: F) -> F::Output {
    CURRENT_SCOPE.scope(scope, fut).await
}

/// Record a call into the current task's scope.
///
/// Returns `None` when no scope is active; the call is then not accounted.
pub fn record_call(
    model: &str,
    input: impl Into<TokenInput>,
    output: impl Into<TokenInput>,
) -> Option<ModelCallRecord> {
    if let Some(scope) = current_scope() {
        Some(scope.record_call(model, input, output))
    } else {
        tracing::debug!(model, "no active usage scope, call not tracked");
        None
    }
}

// =============================================================================
// Usage Tracker
// =============================================================================

/// Opens scopes and ships finished ones to the ledger.
#[derive(Clone)]
pub struct UsageTracker {
    pricing: Arc<PricingTable>,
    ledger: Arc<LedgerClient>,
}

impl UsageTracker {
    #[must_use]
    pub const fn new(pricing: Arc<PricingTable>, ledger: Arc<LedgerClient>) -> Self {
        Self { pricing, ledger }
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Open a scope for one request.
    #[must_use]
    pub fn begin_scope(
        &self,
        service: impl Into<String>,
        user: impl Into<String>,
        inputs: Value,
    ) -> ScopeHandle {
        let scope = ScopeHandle::new(Arc::clone(&self.pricing), service, user, inputs);
        tracing::debug!(service = %scope.service(), user = %scope.user(), "usage scope opened");
        scope
    }

    /// Finish a scope and append its row to the ledger.
    ///
    /// Returns whether the row was persisted. Never fails: ledger problems are
    /// logged, and a second finish of the same scope is ignored.
    pub async fn finish_scope(&self, scope: &ScopeHandle, results: Value) -> bool {
        let Some(row) = scope.finalize(results) else {
            tracing::warn!(service = %scope.service(), "usage scope already finished");
            return false;
        };

        let calls: u64 = row.breakdown.values().map(|u| u.calls).sum();
        tracing::info!(
            service = %row.service,
            user = %row.user,
            cost_usd = row.cost_usd,
            calls,
            duration_ms = u64::try_from(row.duration.as_millis()).unwrap_or(u64::MAX),
            "request finished"
        );

        self.ledger.append(&row).await
    }

    /// Run `fut` inside a fresh scope and persist the scope when it completes.
    ///
    /// The future's output is serialized as the row's results.
    pub async fn run_scoped<F, T>(
        &self,
        service: impl Into<String>,
        user: impl Into<String>,
        inputs: Value,
        fut: F,
    ) -> T
    where
        F: Future<Output = T>,
        T: Serialize,
    {
        let scope = self.begin_scope(service, user, inputs);
        let output = with_scope(scope.clone(), fut).await;
        let results = serde_json::to_value(&output).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not serialize request results");
            Value::Null
        });
        self.finish_scope(&scope, results).await;
        output
    }
}
