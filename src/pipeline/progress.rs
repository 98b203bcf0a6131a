//! Progress reporting: a narrow two-operation capability interface, so the
//! orchestrator stays decoupled from whatever the host does with events.

use std::sync::Mutex;

/// Receiver for analysis progress events.
///
/// `update` percentages are non-decreasing; the terminal event is exactly
/// one of `update(100, "complete")` or `fail(reason)`.
pub trait ProgressSink: Send + Sync {
    fn update(&self, percentage: u8, step: &str);
    fn fail(&self, reason: &str);
}

/// Sink that drops every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _percentage: u8, _step: &str) {}
    fn fail(&self, _reason: &str) {}
}

/// One recorded progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Update { percentage: u8, step: String },
    Failed { reason: String },
}

/// Sink that records events, for tests and CLI output.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Update { percentage, .. } => Some(*percentage),
                ProgressEvent::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failed(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Failed { .. }))
    }
}

impl ProgressSink for CollectingSink {
    fn update(&self, percentage: u8, step: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent::Update {
                percentage,
                step: step.to_string(),
            });
        }
    }

    fn fail(&self, reason: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent::Failed {
                reason: reason.to_string(),
            });
        }
    }
}

/// Sink that logs events, used by the CLI.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, percentage: u8, step: &str) {
        log::info!("[{:>3}%] {}", percentage, step);
    }

    fn fail(&self, reason: &str) {
        log::error!("analysis failed: {}", reason);
    }
}
