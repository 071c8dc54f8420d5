pub mod cli;

use std::{io::Write, time::Duration};

use a4c_monitor::{MonitorConfig, OperationMonitor};
use anyhow::Result;
use cli::{Command, ConnectionOverrides, ConsoleSink};

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub connection: ConnectionOverrides,
    pub poll_interval: Duration,
    /// Upper bound on any wait, unless a command sets its own timeout.
    pub deadline: Option<Duration>,
    pub json: bool,
}

impl RunOptions {
    pub fn monitor_config(&self) -> MonitorConfig {
        let config = MonitorConfig::default().with_poll_interval(self.poll_interval);
        match self.deadline {
            Some(deadline) => config.with_deadline(deadline),
            None => config,
        }
    }
}

/// Connect to the platform and run `command`, writing progress to `out`.
pub fn run<W: Write>(command: &Command, options: &RunOptions, out: W) -> Result<()> {
    let services = cli::default_service_bundle(&options.connection)?;
    let monitor = OperationMonitor::new(services, options.monitor_config());
    let mut console = ConsoleSink::new(out, options.json);
    cli::execute(command, &monitor, &mut console)
}
