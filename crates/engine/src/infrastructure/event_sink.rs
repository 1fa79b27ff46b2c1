//! Dialogue event sinks.

use taleweave_domain::DialogueEvent;

use crate::infrastructure::ports::DialogueEventSink;

/// Writes every dialogue event as a structured log record.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl DialogueEventSink for TracingEventSink {
    fn emit(&self, event: DialogueEvent) {
        tracing::info!(
            target: "taleweave::events",
            event = event.kind.as_str(),
            conversation_id = %event.conversation_id,
            player_id = %event.player_id,
            payload = %event.payload,
            "Dialogue event"
        );
    }
}

/// Keeps emitted events in memory so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: std::sync::Mutex<Vec<DialogueEvent>>,
}

#[cfg(test)]
impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DialogueEvent> {
        self.events.lock().expect("lock").clone()
    }

    pub fn kinds(&self) -> Vec<taleweave_domain::DialogueEventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }
}

#[cfg(test)]
impl DialogueEventSink for RecordingEventSink {
    fn emit(&self, event: DialogueEvent) {
        self.events.lock().expect("lock").push(event);
    }
}
