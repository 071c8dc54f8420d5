use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_EVENT_BATCH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Fixed pause between two poll cycles. No backoff is applied.
    pub poll_interval: Duration,
    /// Overall limit for waiting on an operation, `None` waits forever.
    pub deadline: Option<Duration>,
    /// Number of newest events requested per cycle.
    pub event_batch: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            event_batch: DEFAULT_EVENT_BATCH,
        }
    }
}

impl MonitorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_event_batch(mut self, batch: usize) -> Self {
        self.event_batch = batch.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_human_paced_polling() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.deadline, None);
        assert_eq!(config.event_batch, 1000);
    }

    #[test]
    fn event_batch_is_never_zero() {
        let config = MonitorConfig::default().with_event_batch(0);
        assert_eq!(config.event_batch, 1);
    }
}
