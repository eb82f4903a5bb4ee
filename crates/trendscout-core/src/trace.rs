use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub stage: String,
    pub message: String,
    pub timestamp_ms: u128,
}

impl TraceEvent {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self {
            stage: stage.into(),
            message: message.into(),
            timestamp_ms,
        }
    }
}

/// Ordered record of the stage transitions of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
    events: Vec<TraceEvent>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.events.push(TraceEvent::new(stage, message));
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn stages(&self) -> Vec<&str> {
        self.events.iter().map(|event| event.stage.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn render_markdown(&self) -> String {
        if self.events.is_empty() {
            return "No trace events recorded.".to_string();
        }
        let mut output = String::from("### Pipeline Trace\n");
        for (index, event) in self.events.iter().enumerate() {
            let _ = writeln!(output, "{}. {} -> {}", index + 1, event.stage, event.message);
        }
        output
    }
}
