use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use a4c_interface::{
    DeploymentService, InterfaceError, OperationHandle, OperationKind, OperationStatus,
    WorkflowService,
};
use tracing::debug;

use crate::error::{MonitorError, Result};

/// Whether `status` ends an operation of `kind`, and if so whether it succeeded.
pub fn terminal_outcome(kind: OperationKind, status: &OperationStatus) -> Option<bool> {
    match (kind, status) {
        (OperationKind::Deployment, OperationStatus::Deployed) => Some(true),
        (OperationKind::Deployment, OperationStatus::Failed) => Some(false),
        (OperationKind::Undeployment, OperationStatus::Undeployed) => Some(true),
        (OperationKind::Undeployment, OperationStatus::Failed) => Some(false),
        (OperationKind::WorkflowExecution, OperationStatus::WorkflowSucceeded) => Some(true),
        (OperationKind::WorkflowExecution, OperationStatus::WorkflowFailed) => Some(false),
        _ => None,
    }
}

/// Queries the status of tracked operations on a fixed interval.
#[derive(Clone)]
pub struct StatusPoller {
    deployments: Arc<dyn DeploymentService>,
    workflows: Arc<dyn WorkflowService>,
    interval: Duration,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl StatusPoller {
    pub fn new(
        deployments: Arc<dyn DeploymentService>,
        workflows: Arc<dyn WorkflowService>,
        interval: Duration,
    ) -> Self {
        Self {
            deployments,
            workflows,
            interval,
            timeout: None,
            deadline: None,
        }
    }

    /// Give up once `timeout` has elapsed from now. A timeout too large to
    /// represent as an instant means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self.timeout = self.deadline.map(|_| timeout);
        self
    }

    /// One status query. Errors are returned as is, never retried.
    pub fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus> {
        let raw = match handle.kind() {
            OperationKind::Deployment | OperationKind::Undeployment => self
                .deployments
                .deployment_status(handle.application_id(), handle.environment_id())?,
            OperationKind::WorkflowExecution => {
                let execution = handle.execution_id().ok_or_else(|| {
                    InterfaceError::NotFound(format!("execution identifier of {handle}"))
                })?;
                self.workflows.execution_status(execution)?
            }
        };
        let status = handle.kind().parse_status(&raw);
        debug!(%handle, %status, "polled status");
        Ok(status)
    }

    /// Sleep until the next poll, failing instead if the deadline has passed.
    pub fn wait_interval(&self) -> Result<()> {
        let pause = match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(MonitorError::Timeout(timeout));
                }
                self.interval.min(remaining)
            }
            _ => self.interval,
        };
        thread::sleep(pause);
        Ok(())
    }
}
