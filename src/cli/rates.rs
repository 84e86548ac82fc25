//! Rates command implementation.

use serde::Serialize;

use crate::cli::args::{OutputFormat, RatesArgs};
use crate::cli::output::CommandOutput;
use crate::core::pricing::PricingTable;
use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct RateRow<'a> {
    pub model: &'a str,
    pub input: f64,
    pub output: f64,
}

/// Table entries, sorted by key and optionally filtered.
#[must_use]
pub fn rows<'a>(table: &'a PricingTable, filter: Option<&str>) -> Vec<RateRow<'a>> {
    let needle = filter.map(str::to_lowercase);
    table
        .entries()
        .into_iter()
        .filter(|(key, _)| needle.as_deref().is_none_or(|n| key.contains(n)))
        .map(|(model, rate)| RateRow {
            model,
            input: rate.input,
            output: rate.output,
        })
        .collect()
}

/// Execute the rates command.
///
/// # Errors
///
/// Returns error if JSON output cannot be serialized.
pub fn execute(
    table: &PricingTable,
    args: &RatesArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let rows = rows(table, args.filter.as_deref());
    match format {
        OutputFormat::Json => CommandOutput::new("rates", rows).print(pretty),
        OutputFormat::Human => {
            if rows.is_empty() {
                println!("No matching models.");
                return Ok(());
            }
            let width = rows.iter().map(|r| r.model.len()).max().unwrap_or(5).max(5);
            println!("{:<width$}  {:>10}  {:>10}", "Model", "Input/1K", "Output/1K");
            println!("{:-<width$}  {:->10}  {:->10}", "", "", "");
            for row in &rows {
                println!(
                    "{:<width$}  {:>10.5}  {:>10.5}",
                    row.model, row.input, row.output
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive() {
        let table = PricingTable::current();
        let all = rows(&table, None);
        assert_eq!(all.len(), table.len());

        let claude = rows(&table, Some("CLAUDE"));
        assert!(!claude.is_empty());
        assert!(claude.iter().all(|r| r.model.contains("claude")));
        assert!(claude.windows(2).all(|w| w[0].model <= w[1].model));
    }
}
