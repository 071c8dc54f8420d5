use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Duration,
};

use a4c_interface::{LogFilter, OperationHandle, OperationStatus, ServiceBundle};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::MonitorConfig,
    error::{MonitorError, Result},
    paginator::{EventPaginator, LogPaginator},
    poller::{StatusPoller, terminal_outcome},
    sink::ProgressSink,
};

/// Terminal result of a monitored operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub handle: OperationHandle,
    pub status: OperationStatus,
    pub succeeded: bool,
}

impl Outcome {
    /// Treat a failure status as an error.
    pub fn into_result(self) -> Result<Outcome> {
        if self.succeeded {
            Ok(self)
        } else {
            Err(MonitorError::OperationFailed {
                handle: self.handle,
                status: self.status,
            })
        }
    }
}

/// Drives deployments, undeployments and workflow executions to completion.
///
/// Blocking mode (`deploy`, `undeploy`, `wait`, `run_workflow`) alternates
/// sleep, log/event relay and status poll on the calling thread. Callback mode
/// (`run_workflow_async`, `watch_workflow`) waits for completion on a separate
/// thread that reports through a one-shot callback.
pub struct OperationMonitor {
    services: ServiceBundle,
    config: MonitorConfig,
}

impl OperationMonitor {
    pub fn new(services: ServiceBundle, config: MonitorConfig) -> Self {
        Self { services, config }
    }

    pub fn services(&self) -> &ServiceBundle {
        &self.services
    }

    fn poller(&self, timeout: Option<Duration>) -> StatusPoller {
        let poller = StatusPoller::new(
            self.services.deployments.clone(),
            self.services.workflows.clone(),
            self.config.poll_interval,
        );
        match timeout.or(self.config.deadline) {
            Some(timeout) => poller.with_timeout(timeout),
            None => poller,
        }
    }

    /// Start a deployment and block until it is deployed or in error.
    #[instrument(skip(self, sink))]
    pub fn deploy(
        &self,
        application_id: &str,
        environment_id: &str,
        location: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        self.services
            .deployments
            .start_deployment(application_id, environment_id, location)?;
        info!("deployment started");
        self.wait(
            &OperationHandle::deployment(application_id, environment_id),
            sink,
        )
    }

    /// Start an undeployment and block until it is undeployed or in error.
    #[instrument(skip(self, sink))]
    pub fn undeploy(
        &self,
        application_id: &str,
        environment_id: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        self.services
            .deployments
            .start_undeployment(application_id, environment_id)?;
        info!("undeployment started");
        self.wait(
            &OperationHandle::undeployment(application_id, environment_id),
            sink,
        )
    }

    /// Block until the operation behind `handle` reaches a terminal status.
    pub fn wait(&self, handle: &OperationHandle, sink: &mut dyn ProgressSink) -> Result<Outcome> {
        let poller = self.poller(None);
        let mut logs = LogPaginator::new(log_filter(handle));
        let mut events = EventPaginator::new(self.config.event_batch);
        self.poll_until_terminal(handle, &poller, &mut logs, &mut events, sink)
    }

    /// Launch a workflow and block until it succeeds, fails or `timeout` expires.
    #[instrument(skip(self, sink))]
    pub fn run_workflow(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
        timeout: Option<Duration>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        let mut events = EventPaginator::new(self.config.event_batch);
        events.prime(&*self.services.events, application_id, environment_id)?;

        let execution = self
            .services
            .workflows
            .start_workflow(application_id, environment_id, workflow)?;
        info!(%execution, "workflow started");

        let handle = OperationHandle::workflow(application_id, environment_id, execution);
        let poller = self.poller(timeout);
        let mut logs = LogPaginator::new(log_filter(&handle));
        self.poll_until_terminal(&handle, &poller, &mut logs, &mut events, sink)
    }

    /// Launch a workflow and return its execution identifier right away.
    ///
    /// `on_complete` is invoked exactly once, from a background thread, with
    /// the terminal outcome or the first error met while waiting.
    #[instrument(skip(self, on_complete))]
    pub fn run_workflow_async<F>(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
        timeout: Option<Duration>,
        on_complete: F,
    ) -> Result<String>
    where
        F: FnOnce(Result<Outcome>) + Send + 'static,
    {
        self.launch_with_completion(
            application_id,
            environment_id,
            workflow,
            timeout,
            Arc::new(AtomicBool::new(false)),
            on_complete,
        )
    }

    /// Start the workflow and wait for it on a background thread that stops
    /// polling as soon as `cancelled` is set.
    fn launch_with_completion<F>(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
        timeout: Option<Duration>,
        cancelled: Arc<AtomicBool>,
        on_complete: F,
    ) -> Result<String>
    where
        F: FnOnce(Result<Outcome>) + Send + 'static,
    {
        let execution = self
            .services
            .workflows
            .start_workflow(application_id, environment_id, workflow)?;
        info!(%execution, "workflow started");

        let handle = OperationHandle::workflow(application_id, environment_id, execution.clone());
        let poller = self.poller(timeout);
        thread::spawn(move || on_complete(await_terminal(&poller, &handle, &cancelled)));

        Ok(execution)
    }

    /// Launch a workflow and relay its logs and events until the completion
    /// callback reports the outcome.
    ///
    /// The relay loop races a single-slot completion channel against the poll
    /// interval; once the outcome is received no further fetch is made. If the
    /// relay fails, the completion thread is told to stop before returning.
    #[instrument(skip(self, sink))]
    pub fn watch_workflow(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
        timeout: Option<Duration>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        let mut events = EventPaginator::new(self.config.event_batch);
        events.prime(&*self.services.events, application_id, environment_id)?;

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let cancel = CancelOnDrop::default();
        let execution = self.launch_with_completion(
            application_id,
            environment_id,
            workflow,
            timeout,
            cancel.flag(),
            move |outcome| {
                // the receiver is gone only if the relay loop already failed
                let _ = done_tx.send(outcome);
            },
        )?;

        let mut logs = LogPaginator::new(LogFilter::execution(execution));
        loop {
            match done_rx.recv_timeout(self.config.poll_interval) {
                Ok(outcome) => return outcome,
                Err(RecvTimeoutError::Timeout) => self.relay(
                    application_id,
                    environment_id,
                    &mut logs,
                    &mut events,
                    sink,
                )?,
                Err(RecvTimeoutError::Disconnected) => return Err(MonitorError::CallbackDropped),
            }
        }
    }

    fn poll_until_terminal(
        &self,
        handle: &OperationHandle,
        poller: &StatusPoller,
        logs: &mut LogPaginator,
        events: &mut EventPaginator,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        let mut last_status: Option<OperationStatus> = None;
        loop {
            poller.wait_interval()?;
            self.relay(
                handle.application_id(),
                handle.environment_id(),
                logs,
                events,
                sink,
            )?;

            let status = poller.poll(handle)?;
            if last_status.as_ref() != Some(&status) {
                sink.on_status(handle, &status);
                last_status = Some(status.clone());
            }

            if let Some(succeeded) = terminal_outcome(handle.kind(), &status) {
                if succeeded {
                    info!(%handle, %status, "operation completed");
                } else {
                    warn!(%handle, %status, "operation failed");
                }
                return Ok(Outcome {
                    handle: handle.clone(),
                    status,
                    succeeded,
                });
            }
        }
    }

    /// Hand every new log entry, then every new event, to the sink.
    fn relay(
        &self,
        application_id: &str,
        environment_id: &str,
        logs: &mut LogPaginator,
        events: &mut EventPaginator,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        for entry in logs.fetch_new(&*self.services.logs, application_id, environment_id)? {
            sink.on_log(&entry);
        }
        for event in events.fetch_new(&*self.services.events, application_id, environment_id)? {
            sink.on_event(&event);
        }
        Ok(())
    }
}

fn log_filter(handle: &OperationHandle) -> LogFilter {
    match handle.execution_id() {
        Some(execution) => LogFilter::execution(execution),
        None => LogFilter::default(),
    }
}

/// Raises the shared flag when dropped, whichever way the owner returns.
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Status-only wait used by the completion thread.
fn await_terminal(
    poller: &StatusPoller,
    handle: &OperationHandle,
    cancelled: &AtomicBool,
) -> Result<Outcome> {
    loop {
        if cancelled.load(Ordering::Acquire) {
            debug!(%handle, "watch abandoned, completion wait stopped");
            return Err(MonitorError::CallbackDropped);
        }
        let status = poller.poll(handle)?;
        if let Some(succeeded) = terminal_outcome(handle.kind(), &status) {
            debug!(%handle, %status, succeeded, "completion detected");
            return Ok(Outcome {
                handle: handle.clone(),
                status,
                succeeded,
            });
        }
        poller.wait_interval()?;
    }
}
