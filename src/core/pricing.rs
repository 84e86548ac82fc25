//! Rate table and cost estimation for model calls.
//!
//! Rates are USD per 1000 tokens. Model names coming from callers are
//! ambiguous (dated snapshots, vendor prefixes, mixed case), so lookups fall
//! back to the longest table key contained in the lower-cased name.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Characters per token used when only raw text is available.
pub const CHARS_PER_TOKEN: u64 = 4;

/// Per-1K token pricing for one canonical model key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    /// USD per 1000 input tokens.
    pub input: f64,
    /// USD per 1000 output tokens.
    pub output: f64,
}

impl ModelRate {
    #[must_use]
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Cost of a call with the given token counts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input + (output_tokens as f64 / 1000.0) * self.output
    }
}

/// Estimate a token count from raw text: `ceil(chars / 4)`.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Result of pricing a single call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedCall {
    /// Table key the model name resolved to, if any.
    pub resolved: Option<String>,
    /// Cost in USD; zero when unresolved.
    pub cost_usd: f64,
}

/// Immutable model rate table, built once at startup.
#[derive(Debug, Clone)]
pub struct PricingTable {
    /// Lower-cased model key to rate.
    rates: HashMap<String, ModelRate>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::current()
    }
}

impl PricingTable {
    /// An empty table. Every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// The built-in rate table.
    #[must_use]
    pub fn current() -> Self {
        let mut table = Self::empty();

        // Anthropic
        table.insert("claude-opus-4-1", ModelRate::new(0.015, 0.075));
        table.insert("claude-opus-4", ModelRate::new(0.015, 0.075));
        table.insert("claude-sonnet-4-5", ModelRate::new(0.003, 0.015));
        table.insert("claude-sonnet-4", ModelRate::new(0.003, 0.015));
        table.insert("claude-haiku-4-5", ModelRate::new(0.001, 0.005));
        table.insert("claude-3-7-sonnet", ModelRate::new(0.003, 0.015));
        table.insert("claude-3-5-sonnet", ModelRate::new(0.003, 0.015));
        table.insert("claude-3-5-haiku", ModelRate::new(0.0008, 0.004));
        table.insert("claude-3-opus", ModelRate::new(0.015, 0.075));
        table.insert("claude-3-haiku", ModelRate::new(0.000_25, 0.001_25));

        // OpenAI
        table.insert("gpt-5", ModelRate::new(0.001_25, 0.01));
        table.insert("gpt-5-mini", ModelRate::new(0.000_25, 0.002));
        table.insert("gpt-4.1", ModelRate::new(0.002, 0.008));
        table.insert("gpt-4.1-mini", ModelRate::new(0.0004, 0.0016));
        table.insert("gpt-4.1-nano", ModelRate::new(0.0001, 0.0004));
        table.insert("gpt-4o", ModelRate::new(0.0025, 0.01));
        table.insert("gpt-4o-mini", ModelRate::new(0.000_15, 0.0006));
        // Two-character keys also match unrelated names that contain them
        // (`deepseek-r1-turbo1` prices as `o1`).
        table.insert("o1", ModelRate::new(0.015, 0.06));
        table.insert("o3", ModelRate::new(0.002, 0.008));
        table.insert("o3-mini", ModelRate::new(0.0011, 0.0044));
        table.insert("o4-mini", ModelRate::new(0.0011, 0.0044));

        // Google
        table.insert("gemini-2.5-pro", ModelRate::new(0.001_25, 0.01));
        table.insert("gemini-2.5-flash", ModelRate::new(0.0003, 0.0025));
        table.insert("gemini-2.5-flash-lite", ModelRate::new(0.0001, 0.0004));
        table.insert("gemini-2.0-flash", ModelRate::new(0.0001, 0.0004));
        table.insert("gemini-1.5-pro", ModelRate::new(0.001_25, 0.005));

        table
    }

    /// Add or replace an entry. Keys are stored lower-cased.
    ///
    /// Keys also match as substrings of requested model names, so very short
    /// keys can capture models they were not meant for.
    pub fn insert(&mut self, model: &str, rate: ModelRate) {
        self.rates.insert(model.trim().to_lowercase(), rate);
    }

    /// Apply operator overrides from the config file.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, ModelRate>) -> Self {
        for (model, rate) in overrides {
            self.insert(model, *rate);
        }
        self
    }

    /// Exact-key lookup.
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&ModelRate> {
        self.rates.get(model)
    }

    /// Resolve a model name to its table key and rate.
    ///
    /// Exact key match wins. Otherwise the longest key that occurs inside the
    /// lower-cased model name is used, so `gpt-4o-mini-2024-07-18` prices as
    /// `gpt-4o-mini` and not `gpt-4o`.
    #[must_use]
    pub fn resolve(&self, model: &str) -> Option<(&str, &ModelRate)> {
        if let Some((key, rate)) = self.rates.get_key_value(model) {
            return Some((key.as_str(), rate));
        }

        let lowered = model.to_lowercase();
        self.rates
            .iter()
            .filter(|(key, _)| !key.is_empty() && lowered.contains(key.as_str()))
            // Longest key first; ties broken alphabetically so results are stable.
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(|(key, rate)| (key.as_str(), rate))
    }

    /// Price a call. Unknown models cost zero and are reported as a warning.
    #[must_use]
    pub fn price(&self, model: &str, input_tokens: u64, output_tokens: u64) -> PricedCall {
        match self.resolve(model) {
            Some((key, rate)) => PricedCall {
                resolved: Some(key.to_string()),
                cost_usd: rate.cost(input_tokens, output_tokens),
            },
            None => {
                tracing::warn!(model, "no rate table entry for model, counting cost as 0");
                PricedCall {
                    resolved: None,
                    cost_usd: 0.0,
                }
            }
        }
    }

    /// Cost in USD of a call against `model`.
    #[must_use]
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.price(model, input_tokens, output_tokens).cost_usd
    }

    /// All entries, sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &ModelRate)> {
        let mut entries: Vec<_> = self.rates.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
