//! Capture of `tracing` events for assertions in integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::layer::SubscriberExt;

/// Records every event on the current thread until dropped.
///
/// Uses a thread-local default subscriber, so it sees events from
/// `#[tokio::test]` bodies (current-thread runtime) but not from other
/// worker threads.
pub struct TestLogCapture {
    logs: Arc<Mutex<Vec<CapturedLog>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: tracing::Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedLog {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl TestLogCapture {
    pub fn start() -> Self {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            logs: Arc::clone(&logs),
        });
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            logs,
            _guard: guard,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedLog>> {
        self.logs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn logs(&self) -> Vec<CapturedLog> {
        self.lock().clone()
    }

    /// Events at `level` whose message contains `needle`.
    pub fn matching(&self, level: tracing::Level, needle: &str) -> Vec<CapturedLog> {
        self.lock()
            .iter()
            .filter(|l| l.level == level && l.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn assert_logged(&self, needle: &str) {
        let logs = self.lock();
        assert!(
            logs.iter().any(|l| l.message.contains(needle)),
            "Expected log containing '{needle}'. Logged: {:#?}",
            logs.iter().map(|l| &l.message).collect::<Vec<_>>()
        );
    }

    pub fn assert_logged_at_level(&self, level: tracing::Level, needle: &str) {
        assert!(
            !self.matching(level, needle).is_empty(),
            "Expected {level} log containing '{needle}'. Logged: {:#?}",
            self.logs()
        );
    }

    pub fn assert_no_errors(&self) {
        let errors = self
            .logs()
            .into_iter()
            .filter(|l| l.level == tracing::Level::ERROR)
            .collect::<Vec<_>>();
        assert!(errors.is_empty(), "Unexpected errors: {errors:#?}");
    }

    /// Assert no captured field value contains `secret`.
    pub fn assert_never_logged(&self, secret: &str) {
        let logs = self.lock();
        let leaked = logs.iter().any(|l| {
            l.message.contains(secret) || l.fields.iter().any(|(_, v)| v.contains(secret))
        });
        assert!(!leaked, "Secret value appeared in logs: {logs:#?}");
    }
}

struct CaptureLayer {
    logs: Arc<Mutex<Vec<CapturedLog>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let log = CapturedLog {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        };
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(log);
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field.name(), value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push(field.name(), value.to_string());
    }
}
