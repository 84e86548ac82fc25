//! Estimate command implementation.

use serde::Serialize;

use crate::cli::args::{EstimateArgs, OutputFormat};
use crate::cli::output::CommandOutput;
use crate::core::pricing::PricingTable;
use crate::error::Result;
use crate::util::{format_cost, format_tokens};

/// Priced estimate for one call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub model: String,
    pub resolved: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Price the call described by `args`.
#[must_use]
pub fn estimate(table: &PricingTable, args: &EstimateArgs) -> Estimate {
    let input_tokens = args.input().tokens();
    let output_tokens = args.output().tokens();
    let priced = table.price(&args.model, input_tokens, output_tokens);
    Estimate {
        model: args.model.clone(),
        resolved: priced.resolved,
        input_tokens,
        output_tokens,
        cost_usd: priced.cost_usd,
    }
}

/// Execute the estimate command.
///
/// # Errors
///
/// Returns error if JSON output cannot be serialized.
pub fn execute(
    table: &PricingTable,
    args: &EstimateArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let result = estimate(table, args);
    tracing::debug!(model = %result.model, resolved = ?result.resolved, "estimated call");

    match format {
        OutputFormat::Json => CommandOutput::new("estimate", result).print(pretty),
        OutputFormat::Human => {
            print!("{}", render_human(&result));
            Ok(())
        }
    }
}

fn render_human(result: &Estimate) -> String {
    let rate = result
        .resolved
        .as_deref()
        .map_or_else(|| "no rate (unknown model)".to_string(), |k| format!("rate {k}"));
    format!(
        "{}  ({rate})\n  input   {} tokens\n  output  {} tokens\n  cost    {}\n",
        result.model,
        format_tokens(result.input_tokens),
        format_tokens(result.output_tokens),
        format_cost(result.cost_usd),
    )
}
