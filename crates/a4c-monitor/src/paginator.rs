//! Cursors over the server's append-only log and event sequences.

use a4c_interface::{Event, EventService, LogEntry, LogFilter, LogService};
use tracing::{debug, warn};

use crate::error::Result;

/// Tracks how many log entries matching `filter` were already consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaginator {
    filter: LogFilter,
    cursor: usize,
}

impl LogPaginator {
    pub fn new(filter: LogFilter) -> Self {
        Self { filter, cursor: 0 }
    }

    /// Resume from an offset obtained earlier.
    pub fn starting_at(filter: LogFilter, cursor: usize) -> Self {
        Self { filter, cursor }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fetch the entries past the cursor, oldest first.
    ///
    /// The cursor advances by exactly the number of entries returned and is
    /// left untouched when the call fails.
    pub fn fetch_new(
        &mut self,
        logs: &dyn LogService,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Vec<LogEntry>> {
        let page = logs.logs(application_id, environment_id, &self.filter, self.cursor)?;
        let count = page.count();
        if count > 0 {
            self.cursor += count;
            debug!(count, cursor = self.cursor, "fetched new log entries");
        }
        Ok(page.entries)
    }
}

/// Tracks how many events of a deployment were already consumed.
///
/// The server answers newest first, so every cycle asks for the newest
/// `batch` events and keeps only the first `total - seen` of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPaginator {
    seen: usize,
    batch: usize,
}

impl EventPaginator {
    pub fn new(batch: usize) -> Self {
        Self {
            seen: 0,
            batch: batch.max(1),
        }
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Mark every event currently stored as already seen.
    pub fn prime(
        &mut self,
        events: &dyn EventService,
        application_id: &str,
        environment_id: &str,
    ) -> Result<()> {
        let page = events.events(application_id, environment_id, 0, 1)?;
        self.seen = self.seen.max(page.total);
        debug!(seen = self.seen, "event cursor primed");
        Ok(())
    }

    /// Fetch events emitted since the last call, in chronological order.
    pub fn fetch_new(
        &mut self,
        events: &dyn EventService,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Vec<Event>> {
        let page = events.events(application_id, environment_id, 0, self.batch)?;
        let fresh = page.total.saturating_sub(self.seen);
        if fresh == 0 {
            return Ok(Vec::new());
        }

        let available = fresh.min(page.events.len());
        if available < fresh {
            warn!(
                missed = fresh - available,
                batch = self.batch,
                "more new events than one batch holds, the oldest ones are skipped"
            );
        }
        self.seen = page.total;

        let mut fresh_events = page.events;
        fresh_events.truncate(available);
        fresh_events.reverse();
        Ok(fresh_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a4c_interface::{InterfaceError, LogLevel, MockEventService, MockLogService};

    fn entries(prefix: &str, count: usize) -> Vec<LogEntry> {
        (0..count)
            .map(|i| LogEntry::new(LogLevel::Info, format!("{prefix}-{i}")))
            .collect()
    }

    fn state(event: &Event) -> &str {
        event.instance_state.as_deref().unwrap_or_default()
    }

    #[test]
    fn log_cursor_is_sum_of_fetched_counts() {
        let logs = MockLogService::new();
        logs.push_page(entries("a", 3));
        logs.push_page(entries("b", 0));
        logs.push_page(entries("c", 5));

        let mut paginator = LogPaginator::new(LogFilter::execution("exec-1"));
        let mut total = 0;
        for _ in 0..3 {
            total += paginator.fetch_new(&logs, "app", "env").unwrap().len();
            assert_eq!(paginator.cursor(), total);
        }
        assert_eq!(paginator.cursor(), 8);

        let offsets: Vec<usize> = logs.requests().into_iter().map(|(_, from)| from).collect();
        assert_eq!(offsets, vec![0, 3, 3]);
        assert!(
            logs.requests()
                .iter()
                .all(|(filter, _)| filter.execution_id.as_deref() == Some("exec-1"))
        );
    }

    #[test]
    fn stable_cursor_returns_nothing_new() {
        let logs = MockLogService::new();
        let mut paginator = LogPaginator::starting_at(LogFilter::default(), 42);

        assert!(paginator.fetch_new(&logs, "app", "env").unwrap().is_empty());
        assert!(paginator.fetch_new(&logs, "app", "env").unwrap().is_empty());
        assert_eq!(paginator.cursor(), 42);
    }

    #[test]
    fn failed_log_fetch_leaves_cursor_alone() {
        let logs = MockLogService::new();
        logs.push_page(entries("a", 2));
        logs.push_error(InterfaceError::Remote("timeout".into()));
        logs.push_page(entries("b", 1));

        let mut paginator = LogPaginator::new(LogFilter::default());
        paginator.fetch_new(&logs, "app", "env").unwrap();
        assert!(paginator.fetch_new(&logs, "app", "env").is_err());
        assert_eq!(paginator.cursor(), 2);

        let resumed = paginator.fetch_new(&logs, "app", "env").unwrap();
        assert_eq!(resumed[0].content, "b-0");
        assert_eq!(paginator.cursor(), 3);
    }

    #[test]
    fn events_come_out_oldest_first_exactly_once() {
        let events = MockEventService::new();
        events.push_arrival(vec![
            Event::instance_state("web", "0", "initial"),
            Event::instance_state("web", "0", "creating"),
        ]);
        events.push_arrival(vec![Event::instance_state("web", "0", "started")]);

        let mut paginator = EventPaginator::new(100);
        let first = paginator.fetch_new(&events, "app", "env").unwrap();
        assert_eq!(first.iter().map(state).collect::<Vec<_>>(), ["initial", "creating"]);

        let second = paginator.fetch_new(&events, "app", "env").unwrap();
        assert_eq!(second.iter().map(state).collect::<Vec<_>>(), ["started"]);

        let third = paginator.fetch_new(&events, "app", "env").unwrap();
        assert!(third.is_empty());
        assert_eq!(paginator.seen(), 3);
    }

    #[test]
    fn exactly_one_new_event_after_history() {
        let events = MockEventService::new();
        events.preload(vec![
            Event::instance_state("db", "0", "started"),
            Event::instance_state("web", "0", "started"),
        ]);
        events.push_arrival(Vec::new());
        events.push_arrival(vec![Event::instance_state("web", "0", "stopping")]);

        let mut paginator = EventPaginator::new(10);
        paginator.prime(&events, "app", "env").unwrap();
        assert_eq!(paginator.seen(), 2);

        let fresh = paginator.fetch_new(&events, "app", "env").unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(state(&fresh[0]), "stopping");
        assert_eq!(fresh[0].node_template_id, "web");
    }

    #[test]
    fn small_batch_keeps_newest_in_order() {
        let events = MockEventService::new();
        events.push_arrival(vec![
            Event::instance_state("web", "0", "a"),
            Event::instance_state("web", "0", "b"),
            Event::instance_state("web", "0", "c"),
        ]);

        let mut paginator = EventPaginator::new(2);
        let fresh = paginator.fetch_new(&events, "app", "env").unwrap();
        assert_eq!(fresh.iter().map(state).collect::<Vec<_>>(), ["b", "c"]);
        assert_eq!(paginator.seen(), 3);
    }

    #[test]
    fn failed_event_fetch_keeps_seen_count() {
        let events = MockEventService::new();
        events.push_arrival(vec![Event::instance_state("web", "0", "a")]);
        events.push_error(InterfaceError::Remote("gateway timeout".into()));

        let mut paginator = EventPaginator::new(10);
        paginator.fetch_new(&events, "app", "env").unwrap();
        assert!(paginator.fetch_new(&events, "app", "env").is_err());
        assert_eq!(paginator.seen(), 1);
    }
}
