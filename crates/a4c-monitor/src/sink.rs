use a4c_interface::{Event, LogEntry, LogLevel, OperationHandle, OperationStatus};
use tracing::{debug, error, info, warn};

/// Receives progress of a monitored operation, in the order it happened.
pub trait ProgressSink {
    fn on_log(&mut self, entry: &LogEntry);

    fn on_event(&mut self, event: &Event);

    /// Called whenever the polled status differs from the previous poll.
    fn on_status(&mut self, _handle: &OperationHandle, _status: &OperationStatus) {}
}

/// Forwards progress to `tracing` under the `a4c::progress` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_log(&mut self, entry: &LogEntry) {
        let node = entry.node_id.as_deref().unwrap_or("-");
        match entry.level {
            LogLevel::Error => error!(target: "a4c::progress", node, "{}", entry.content),
            LogLevel::Warn => warn!(target: "a4c::progress", node, "{}", entry.content),
            LogLevel::Info => info!(target: "a4c::progress", node, "{}", entry.content),
            LogLevel::Debug | LogLevel::Trace => {
                debug!(target: "a4c::progress", node, "{}", entry.content)
            }
        }
    }

    fn on_event(&mut self, event: &Event) {
        if let Some(state) = &event.instance_state {
            info!(
                target: "a4c::progress",
                node = %event.node_template_id,
                instance = %event.instance_id,
                %state,
                "instance state changed"
            );
        }
    }

    fn on_status(&mut self, handle: &OperationHandle, status: &OperationStatus) {
        info!(target: "a4c::progress", %handle, %status, "status changed");
    }
}
