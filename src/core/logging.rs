//! Diagnostic logging to stderr or a file.
//!
//! Command output goes to stdout; everything emitted through `tracing`
//! goes here so it never mixes with `--json` results.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_LEVEL_ENV: &str = "SPENDLOG_LOG";
const LOG_FORMAT_ENV: &str = "SPENDLOG_LOG_FORMAT";
const LOG_FILE_ENV: &str = "SPENDLOG_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Single line, terse.
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" => Some(Self::Human),
            "json" | "jsonl" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Verbosity requested on the command line or in the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "critical" => Some(Self::Error),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Resolved logging settings.
///
/// Precedence: command-line flags, then `SPENDLOG_LOG*` variables, then defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merge command-line choices with the process environment.
    #[must_use]
    pub fn resolve(
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
        verbose: bool,
    ) -> Self {
        Self::resolve_with(cli_level, cli_format, verbose, |k| std::env::var(k).ok())
    }

    /// Same as [`LogSettings::resolve`] with an explicit variable lookup.
    pub fn resolve_with(
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let level = cli_level
            .or_else(|| env(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v)))
            .unwrap_or_default();
        // --verbose only raises the default; an explicit level wins.
        let level = if verbose && cli_level.is_none() && level == LogLevel::Warn {
            LogLevel::Debug
        } else {
            level
        };

        Self {
            level,
            format: cli_format
                .or_else(|| env(LOG_FORMAT_ENV).and_then(|v| LogFormat::from_arg(&v)))
                .unwrap_or_default(),
            file: env(LOG_FILE_ENV).map(|v| PathBuf::from(v.trim())),
        }
    }

    /// Directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_directive(&self) -> String {
        format!("spendlog={}", self.level.as_filter())
    }
}

fn make_writer(file: Option<&std::fs::File>) -> BoxMakeWriter {
    if let Some(file) = file.and_then(|inner| inner.try_clone().ok()) {
        BoxMakeWriter::new(file)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(settings: &LogSettings) {
    let file = settings.file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    let make_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(settings.default_directive()))
    };

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .json()
                .with_writer(make_writer(file.as_ref()))
                .with_span_events(FmtSpan::CLOSE)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .compact()
                .with_writer(make_writer(file.as_ref()))
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(make_filter())
                .with_writer(make_writer(file.as_ref()))
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let settings = LogSettings::resolve_with(None, None, false, lookup(&[]));
        assert_eq!(settings, LogSettings::default());
        assert_eq!(settings.default_directive(), "spendlog=warn");
    }

    #[test]
    fn env_fills_gaps() {
        let settings = LogSettings::resolve_with(
            None,
            None,
            false,
            lookup(&[
                (LOG_LEVEL_ENV, "trace"),
                (LOG_FORMAT_ENV, "json"),
                (LOG_FILE_ENV, " /tmp/spendlog.log "),
            ]),
        );
        assert_eq!(settings.level, LogLevel::Trace);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/spendlog.log")));
    }

    #[test]
    fn cli_beats_env() {
        let settings = LogSettings::resolve_with(
            Some(LogLevel::Error),
            Some(LogFormat::Compact),
            true,
            lookup(&[(LOG_LEVEL_ENV, "trace"), (LOG_FORMAT_ENV, "json")]),
        );
        assert_eq!(settings.level, LogLevel::Error);
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn verbose_raises_default_level() {
        let settings = LogSettings::resolve_with(None, None, true, lookup(&[]));
        assert_eq!(settings.level, LogLevel::Debug);
    }

    #[test]
    fn blank_and_unknown_env_values_ignored() {
        let settings = LogSettings::resolve_with(
            None,
            None,
            false,
            lookup(&[(LOG_LEVEL_ENV, "loud"), (LOG_FORMAT_ENV, "  "), (LOG_FILE_ENV, "")]),
        );
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn level_aliases() {
        assert_eq!(LogLevel::from_arg("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_arg("verbose"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_arg("critical"), Some(LogLevel::Error));
        assert_eq!(LogLevel::Info.as_tracing_level(), Level::INFO);
    }
}
