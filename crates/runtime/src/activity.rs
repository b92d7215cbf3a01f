use serde::Serialize;
use serde_json::Value;

/// One user-activity record, as sent to the analytics backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    pub source: String,
    pub payload: Value,
    pub category: String,
}

/// Fire-and-forget activity sink.
///
/// Callers never depend on the outcome of logging, so this has no return value.
pub trait ActivityLog {
    fn log_activity(&mut self, name: &str, source: &str, payload: Value, category: &str);
}

/// In-memory activity log that keeps entries in arrival order.
#[derive(Debug, Default)]
pub struct ActivityRecorder {
    events: Vec<Activity>,
}

impl ActivityRecorder {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events(&self) -> &[Activity] {
        &self.events
    }

    /// Number of recorded entries with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name == name).count()
    }

    pub fn drain(&mut self) -> Vec<Activity> {
        std::mem::take(&mut self.events)
    }
}

impl ActivityLog for ActivityRecorder {
    fn log_activity(&mut self, name: &str, source: &str, payload: Value, category: &str) {
        tracing::debug!(name, source, category, %payload, "activity");
        self.events.push(Activity {
            name: name.to_string(),
            source: source.to_string(),
            payload,
            category: category.to_string(),
        });
    }
}

impl<T: ActivityLog + ?Sized> ActivityLog for &mut T {
    fn log_activity(&mut self, name: &str, source: &str, payload: Value, category: &str) {
        (**self).log_activity(name, source, payload, category);
    }
}
