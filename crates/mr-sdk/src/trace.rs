/// Trace / logging abstraction used by every ModelRunner component: a
/// small interface for diagnostic output that test code can swap for a
/// collecting or null implementation without touching call sites.
pub trait TraceWriter: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log a verbose / debug message.
    fn verbose(&self, message: &str);

    /// Log a warning message.
    fn warning(&self, message: &str);

    /// Log an error message.
    fn error(&self, message: &str);
}

/// A trace writer that forwards to the `tracing` crate at matching levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTraceWriter;

impl TraceWriter for TracingTraceWriter {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// A no-op trace writer that discards all messages. Useful for benchmarks
/// and tests that don't care about log output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn info(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// A trace writer that collects every message into memory, for assertions
/// in tests.
#[derive(Debug, Default)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

/// The severity of a collected trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Verbose,
    Warning,
    Error,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of all collected messages, in emission order.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Whether any message at `level` contains `needle`.
    pub fn contains(&self, level: TraceLevel, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.messages.lock().push((TraceLevel::Info, message.to_string()));
    }

    fn verbose(&self, message: &str) {
        self.messages.lock().push((TraceLevel::Verbose, message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.messages.lock().push((TraceLevel::Warning, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages.lock().push((TraceLevel::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_writer_records_in_order() {
        let writer = CollectingTraceWriter::new();
        writer.info("hello");
        writer.warning("careful");
        writer.error("boom");
        let messages = writer.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], (TraceLevel::Info, "hello".to_string()));
        assert!(writer.contains(TraceLevel::Error, "boom"));
        assert!(!writer.contains(TraceLevel::Warning, "boom"));
    }

    #[test]
    fn null_writer_does_not_panic() {
        let writer = NullTraceWriter;
        writer.info("x");
        writer.verbose("x");
        writer.warning("x");
        writer.error("x");
    }
}
