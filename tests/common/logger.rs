//! Structured per-test logging.
#![allow(dead_code)]
//!
//! Each test creates a `TestLogger`, marks phases as it goes, and finishes
//! with `finish_ok`. Output goes to stderr, so it only shows for failing
//! tests or with `--nocapture`.
//!
//! # Environment Variables
//!
//! - `TEST_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `TEST_LOG_JSON` - "1" or "true" for one JSON object per line

use std::env;
use std::fmt::Display;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::log_capture::TestLogCapture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub test: String,
    pub phase: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

struct Settings {
    min_level: LogLevel,
    json: bool,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| Settings {
        min_level: env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(LogLevel::Info),
        json: env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
    })
}

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    current_phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            current_phase: Mutex::new("init".to_string()),
        };
        logger.emit(LogLevel::Info, "Test starting", None, None);
        logger
    }

    /// Logger plus a capture of `tracing` events for assertions.
    pub fn with_capture(test_name: &str) -> (Self, TestLogCapture) {
        let capture = TestLogCapture::start();
        (Self::new(test_name), capture)
    }

    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.current_phase.lock() {
            *current = phase.to_string();
        }
        self.emit(LogLevel::Debug, &format!("Phase: {phase}"), None, None);
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message, None, None);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message, None, None);
    }

    pub fn with_context(&self, level: LogLevel, message: &str, context: serde_json::Value) {
        self.emit(level, message, Some(context), None);
    }

    /// Note a mocked upstream and how many calls it expects.
    pub fn mock(&self, method: &str, path: &str, expected_calls: u64) {
        self.with_context(
            LogLevel::Debug,
            &format!("mock {method} {path}"),
            serde_json::json!({ "expected_calls": expected_calls }),
        );
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn finish_ok(&self) {
        let duration_ms = self.elapsed_ms();
        self.emit(
            LogLevel::Info,
            &format!("Test passed (duration: {duration_ms}ms)"),
            None,
            Some(duration_ms),
        );
    }

    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }
        let phase = self
            .current_phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();

        if settings.json {
            let entry = LogEntry {
                timestamp: Utc::now(),
                level,
                test: self.test_name.clone(),
                phase,
                message: message.to_string(),
                duration_ms,
                context,
            };
            if let Ok(json) = serde_json::to_string(&entry) {
                eprintln!("{json}");
            }
        } else {
            let ts = Utc::now().format("%H:%M:%S%.3f");
            let context = context.map(|c| format!(" {c}")).unwrap_or_default();
            eprintln!(
                "[{ts}] [{level}] [{}/{phase}] {message}{context}",
                self.test_name
            );
        }
    }
}
