//! Asynchronous operation monitoring for the orchestration platform.
//!
//! Deployments, undeployments and workflow executions run server side for
//! minutes. This crate tracks them to a terminal status while relaying the
//! deployment logs and events exactly once and in order:
//!
//! - [`LogPaginator`] and [`EventPaginator`] keep cursors into the server's
//!   append-only sequences and fetch only what is new.
//! - [`StatusPoller`] queries the status on a fixed interval with an optional
//!   deadline and knows which statuses end which operation.
//! - [`OperationMonitor`] composes both, either blocking the caller or
//!   reporting through a completion callback.
//!
//! # Example
//!
//! ```no_run
//! use a4c_monitor::{MonitorConfig, OperationMonitor, TracingSink};
//! # fn example(services: a4c_interface::ServiceBundle) -> Result<(), a4c_monitor::MonitorError> {
//! let monitor = OperationMonitor::new(services, MonitorConfig::default());
//! let outcome = monitor.deploy("shop", "shop-prod", "openstack", &mut TracingSink)?;
//! println!("deployment finished with {}", outcome.status);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod monitor;
mod paginator;
mod poller;
mod sink;

pub use config::{DEFAULT_EVENT_BATCH, DEFAULT_POLL_INTERVAL, MonitorConfig};
pub use error::{MonitorError, Result};
pub use monitor::{OperationMonitor, Outcome};
pub use paginator::{EventPaginator, LogPaginator};
pub use poller::{StatusPoller, terminal_outcome};
pub use sink::{ProgressSink, TracingSink};
