use std::{io::Write, path::PathBuf, time::Duration};

use a4c_interface::{LogFilter, ServiceBundle};
use a4c_monitor::{LogPaginator, OperationMonitor, Outcome, ProgressSink};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use super::console::ConsoleSink;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upload a CSAR archive to the catalog
    Upload {
        /// Path of the archive (zip)
        csar: PathBuf,
    },
    /// Create an application from a catalog topology
    CreateApp {
        #[arg(long)]
        name: String,
        /// Topology template version, e.g. `demo:1.0.0`
        #[arg(long)]
        topology: String,
    },
    /// Deploy an application environment and wait for the result
    Deploy {
        #[command(flatten)]
        target: Target,
        /// Location to deploy every node group on
        #[arg(long)]
        location: String,
    },
    /// Undeploy an application environment and wait for the result
    Undeploy {
        #[command(flatten)]
        target: Target,
    },
    /// Run a workflow on a deployed environment
    RunWorkflow {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        workflow: String,
        /// Give up after this long (e.g. `10m`)
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
        /// Wait through the completion callback while logs stream concurrently
        #[arg(long)]
        callback: bool,
    },
    /// Print the logs of the current deployment
    Logs {
        #[command(flatten)]
        target: Target,
        /// Only logs of this workflow execution
        #[arg(long)]
        execution: Option<String>,
    },
    /// Print the most recent deployment events, oldest first
    Events {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Delete an application
    DeleteApp {
        #[arg(long)]
        app: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct Target {
    /// Application identifier
    #[arg(long)]
    pub app: String,
    /// Environment identifier (default: the application's first environment)
    #[arg(long)]
    pub env: Option<String>,
}

impl Target {
    fn environment(&self, services: &ServiceBundle) -> Result<String> {
        match &self.env {
            Some(env) => Ok(env.clone()),
            None => services
                .applications
                .default_environment(&self.app)
                .with_context(|| format!("no environment found for application {}", self.app)),
        }
    }
}

/// Run one command to completion. A failed operation is an error.
pub fn execute<W: Write>(
    command: &Command,
    monitor: &OperationMonitor,
    console: &mut ConsoleSink<W>,
) -> Result<()> {
    let services = monitor.services();
    match command {
        Command::Upload { csar } => {
            let report = services
                .catalog
                .upload_csar(csar)
                .with_context(|| format!("upload of {} failed", csar.display()))?;
            for warning in &report.warnings {
                console.message(&format!("warning: {warning}"));
            }
            console.message(&format!(
                "uploaded {} {} ({})",
                report.name, report.version, report.archive_id
            ));
        }
        Command::CreateApp { name, topology } => {
            let application = services.applications.create_application(name, topology)?;
            console.message(&format!("created application {application}"));
        }
        Command::Deploy { target, location } => {
            let env = target.environment(services)?;
            info!(app = %target.app, %env, %location, "deploying");
            let outcome = monitor.deploy(&target.app, &env, location, console)?;
            finish(console, outcome)?;
        }
        Command::Undeploy { target } => {
            let env = target.environment(services)?;
            let outcome = monitor.undeploy(&target.app, &env, console)?;
            finish(console, outcome)?;
        }
        Command::RunWorkflow {
            target,
            workflow,
            timeout,
            callback,
        } => {
            let env = target.environment(services)?;
            let outcome = if *callback {
                monitor.watch_workflow(&target.app, &env, workflow, *timeout, console)?
            } else {
                monitor.run_workflow(&target.app, &env, workflow, *timeout, console)?
            };
            finish(console, outcome)?;
        }
        Command::Logs { target, execution } => {
            let env = target.environment(services)?;
            let filter = match execution {
                Some(execution) => LogFilter::execution(execution.clone()),
                None => LogFilter::default(),
            };
            let mut logs = LogPaginator::new(filter);
            // keep paging until the server has nothing past the cursor
            loop {
                let entries = logs.fetch_new(&*services.logs, &target.app, &env)?;
                if entries.is_empty() {
                    break;
                }
                for entry in &entries {
                    console.on_log(entry);
                }
            }
        }
        Command::Events { target, limit } => {
            let env = target.environment(services)?;
            // newest first on the wire
            let page = services.events.events(&target.app, &env, 0, *limit)?;
            for event in page.events.iter().take(*limit).rev() {
                console.on_event(event);
            }
        }
        Command::DeleteApp { app } => {
            services.applications.delete_application(app)?;
            console.message(&format!("deleted application {app}"));
        }
    }
    Ok(())
}

fn finish<W: Write>(console: &mut ConsoleSink<W>, outcome: Outcome) -> Result<()> {
    console.outcome(&outcome);
    outcome.into_result()?;
    Ok(())
}
