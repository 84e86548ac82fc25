//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::tracker::TokenInput;
use crate::error::{Result, SpendlogError};

/// Spendlog - AI spend estimation, ledger, and notification tooling.
#[derive(Parser, Debug)]
#[command(name = "spendlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Config file (defaults to SPENDLOG_CONFIG, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the cost of one model call
    Estimate(EstimateArgs),

    /// List the effective rate table
    Rates(RatesArgs),

    /// Send an HTML email through the notification provider
    Notify(NotifyArgs),

    /// Exchange the service-account credential for a bearer token
    Auth,
}

/// Arguments for the `estimate` command.
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Model name as reported by the provider
    #[arg(long, short)]
    pub model: String,

    /// Input tokens
    #[arg(long, value_name = "N", conflicts_with = "input_text")]
    pub input_tokens: Option<u64>,

    /// Input text; tokens are estimated from its length
    #[arg(long, value_name = "TEXT")]
    pub input_text: Option<String>,

    /// Output tokens
    #[arg(long, value_name = "N", conflicts_with = "output_text")]
    pub output_tokens: Option<u64>,

    /// Output text; tokens are estimated from its length
    #[arg(long, value_name = "TEXT")]
    pub output_text: Option<String>,
}

impl EstimateArgs {
    #[must_use]
    pub fn input(&self) -> TokenInput {
        side(self.input_tokens, self.input_text.as_deref())
    }

    #[must_use]
    pub fn output(&self) -> TokenInput {
        side(self.output_tokens, self.output_text.as_deref())
    }
}

fn side(tokens: Option<u64>, text: Option<&str>) -> TokenInput {
    tokens.map_or_else(|| TokenInput::from(text), TokenInput::Count)
}

/// Arguments for the `rates` command.
#[derive(Args, Debug)]
pub struct RatesArgs {
    /// Only list keys containing this text
    #[arg(long, value_name = "TEXT")]
    pub filter: Option<String>,
}

/// Arguments for the `notify` command.
#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Recipient address
    #[arg(long)]
    pub to: String,

    /// Subject line
    #[arg(long)]
    pub subject: String,

    /// HTML body
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// File containing the HTML body
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// File to attach (repeatable)
    #[arg(long = "attach", value_name = "PATH")]
    pub attachments: Vec<PathBuf>,

    /// Sender display name for this message
    #[arg(long, value_name = "NAME")]
    pub sender_name: Option<String>,

    /// Total attempts, overriding the config
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,
}

impl NotifyArgs {
    /// Validate argument combinations.
    ///
    /// # Errors
    ///
    /// Returns a config error if no body source is given or `--max-retries` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.body.is_none() && self.body_file.is_none() {
            return Err(SpendlogError::Config(
                "Either --body or --body-file is required".to_string(),
            ));
        }
        if self.max_retries == Some(0) {
            return Err(SpendlogError::Config(
                "--max-retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}
