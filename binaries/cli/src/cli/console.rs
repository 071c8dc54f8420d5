use std::io::Write;

use a4c_interface::{Event, LogEntry, OperationHandle, OperationStatus};
use a4c_monitor::{Outcome, ProgressSink};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// Final line printed for a monitored operation.
#[derive(Debug, Serialize)]
pub struct OutcomeReport {
    pub operation: String,
    pub status: String,
    pub succeeded: bool,
}

impl From<&Outcome> for OutcomeReport {
    fn from(outcome: &Outcome) -> Self {
        Self {
            operation: outcome.handle.to_string(),
            status: outcome.status.to_string(),
            succeeded: outcome.succeeded,
        }
    }
}

/// Prints progress as text lines, or as JSON lines when `json` is set.
pub struct ConsoleSink<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn message(&mut self, text: &str) {
        if self.json {
            self.emit(&json!({ "kind": "message", "text": text }).to_string());
        } else {
            self.emit(text);
        }
    }

    pub fn outcome(&mut self, outcome: &Outcome) {
        let report = OutcomeReport::from(outcome);
        if self.json {
            let line = json!({ "kind": "outcome", "outcome": report }).to_string();
            self.emit(&line);
        } else {
            let verdict = if report.succeeded { "succeeded" } else { "FAILED" };
            self.emit(&format!(
                "{} {verdict} (status: {})",
                report.operation, report.status
            ));
        }
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!("failed to write progress: {err}");
        }
    }
}

impl<W: Write> ProgressSink for ConsoleSink<W> {
    fn on_log(&mut self, entry: &LogEntry) {
        let line = if self.json {
            json!({
                "kind": "log",
                "timestamp": entry.timestamp.to_rfc3339(),
                "level": entry.level.to_string(),
                "node": entry.node_id,
                "instance": entry.instance_id,
                "interface": entry.interface_name,
                "operation": entry.operation_name,
                "execution": entry.execution_id,
                "content": entry.content,
            })
            .to_string()
        } else {
            format_log(entry)
        };
        self.emit(&line);
    }

    fn on_event(&mut self, event: &Event) {
        let line = if self.json {
            json!({
                "kind": "event",
                "node": event.node_template_id,
                "instance": event.instance_id,
                "state": event.instance_state,
            })
            .to_string()
        } else {
            match format_event(event) {
                Some(line) => line,
                None => return,
            }
        };
        self.emit(&line);
    }

    fn on_status(&mut self, handle: &OperationHandle, status: &OperationStatus) {
        if self.json {
            let line = json!({
                "kind": "status",
                "operation": handle.to_string(),
                "status": status.to_string(),
            })
            .to_string();
            self.emit(&line);
        } else {
            self.emit(&format!("status: {status}"));
        }
    }
}

/// `[timestamp][LEVEL][node/instance/interface.operation] content`
pub fn format_log(entry: &LogEntry) -> String {
    let mut context: Vec<String> = [&entry.node_id, &entry.instance_id]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    match (&entry.interface_name, &entry.operation_name) {
        (Some(interface), Some(operation)) => context.push(format!("{interface}.{operation}")),
        (None, Some(operation)) => context.push(operation.clone()),
        _ => {}
    }

    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    if context.is_empty() {
        format!("[{timestamp}][{}] {}", entry.level, entry.content)
    } else {
        format!(
            "[{timestamp}][{}][{}] {}",
            entry.level,
            context.join("/"),
            entry.content
        )
    }
}

/// Only instance state transitions are worth a line.
pub fn format_event(event: &Event) -> Option<String> {
    event.instance_state.as_ref().map(|state| {
        format!(
            "{}/{} -> {state}",
            event.node_template_id, event.instance_id
        )
    })
}
