//! Domain types and service traits shared between the HTTP client, the
//! operation monitor and the CLI.
//!
//! Each remote capability of the platform gets its own trait so callers
//! depend only on what they use and tests can swap in the scripted doubles
//! from [`mock`] (behind the `test-utils` feature).

use std::{fmt, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use thiserror::Error;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{
    MockApplicationService, MockCatalogService, MockDeploymentService, MockEventService,
    MockLogService, MockWorkflowService,
};

/// Kind of long-running server-side operation a caller can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Deployment,
    Undeployment,
    WorkflowExecution,
}

impl OperationKind {
    /// Interpret a raw status string reported for this kind of operation.
    ///
    /// Matching is case-insensitive. Unknown values are preserved as
    /// [`OperationStatus::Other`] so they never end a monitor loop by accident.
    pub fn parse_status(self, raw: &str) -> OperationStatus {
        let lowered = raw.trim().to_lowercase();
        match self {
            OperationKind::Deployment | OperationKind::Undeployment => match lowered.as_str() {
                "init_deployment" => OperationStatus::Pending,
                "deployment_in_progress" => OperationStatus::Deploying,
                "deployed" => OperationStatus::Deployed,
                "undeployment_in_progress" => OperationStatus::Undeploying,
                "undeployed" => OperationStatus::Undeployed,
                "error" => OperationStatus::Failed,
                _ => OperationStatus::Other(lowered),
            },
            OperationKind::WorkflowExecution => match lowered.as_str() {
                "running" => OperationStatus::WorkflowRunning,
                "succeeded" => OperationStatus::WorkflowSucceeded,
                "failed" => OperationStatus::WorkflowFailed,
                _ => OperationStatus::Other(lowered),
            },
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationKind::Deployment => "deployment",
            OperationKind::Undeployment => "undeployment",
            OperationKind::WorkflowExecution => "workflow execution",
        };
        f.write_str(label)
    }
}

/// Status of a tracked operation, normalised from the platform's strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Pending,
    Deploying,
    Deployed,
    Undeploying,
    Undeployed,
    Failed,
    WorkflowRunning,
    WorkflowSucceeded,
    WorkflowFailed,
    Other(String),
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Deploying => "deploying",
            OperationStatus::Deployed => "deployed",
            OperationStatus::Undeploying => "undeploying",
            OperationStatus::Undeployed => "undeployed",
            OperationStatus::Failed => "error",
            OperationStatus::WorkflowRunning => "running",
            OperationStatus::WorkflowSucceeded => "succeeded",
            OperationStatus::WorkflowFailed => "failed",
            OperationStatus::Other(raw) => raw.as_str(),
        };
        f.write_str(label)
    }
}

/// Identifies one remote long-running operation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle {
    kind: OperationKind,
    application_id: String,
    environment_id: String,
    execution_id: Option<String>,
}

impl OperationHandle {
    pub fn deployment(application_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Deployment,
            application_id: application_id.into(),
            environment_id: environment_id.into(),
            execution_id: None,
        }
    }

    pub fn undeployment(
        application_id: impl Into<String>,
        environment_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: OperationKind::Undeployment,
            ..Self::deployment(application_id, environment_id)
        }
    }

    pub fn workflow(
        application_id: impl Into<String>,
        environment_id: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: OperationKind::WorkflowExecution,
            application_id: application_id.into(),
            environment_id: environment_id.into(),
            execution_id: Some(execution_id.into()),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {}/{}",
            self.kind, self.application_id, self.environment_id
        )?;
        if let Some(execution) = &self.execution_id {
            write!(f, " (execution {execution})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One unit of server-emitted diagnostic text. Never mutated client side.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub deployment_id: Option<String>,
    pub deployment_paas_id: Option<String>,
    pub workflow_id: Option<String>,
    pub execution_id: Option<String>,
    pub node_id: Option<String>,
    pub instance_id: Option<String>,
    pub interface_name: Option<String>,
    pub operation_name: Option<String>,
    pub content: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            deployment_id: None,
            deployment_paas_id: None,
            workflow_id: None,
            execution_id: None,
            node_id: None,
            instance_id: None,
            interface_name: None,
            operation_name: None,
            content: content.into(),
        }
    }
}

/// Restricts a log search. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub execution_id: Option<String>,
    pub workflow_id: Option<String>,
    pub levels: Vec<LogLevel>,
}

impl LogFilter {
    pub fn execution(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: Some(execution_id.into()),
            ..Default::default()
        }
    }
}

/// Entries found beyond the requested offset, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
}

impl LogPage {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// One state-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub node_template_id: String,
    pub instance_id: String,
    /// `None` when the event is not an instance state transition.
    pub instance_state: Option<String>,
    pub emitted_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn instance_state(
        node_template_id: impl Into<String>,
        instance_id: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            node_template_id: node_template_id.into(),
            instance_id: instance_id.into(),
            instance_state: Some(state.into()),
            emitted_at: None,
        }
    }

    pub fn is_instance_state_change(&self) -> bool {
        self.instance_state.is_some()
    }
}

/// A window of the event sequence. `events` is newest first, `total` is the
/// number of events the server holds for the deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Error,
    Warning,
    Info,
}

/// Parsing problem reported for an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIssue {
    pub file: String,
    pub level: IssueLevel,
    pub code: String,
    pub message: Option<String>,
}

impl ContentIssue {
    pub fn is_critical(&self) -> bool {
        self.level == IssueLevel::Error
    }
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} {}", self.file, self.level, self.code)?;
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

/// Outcome of an accepted archive upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsarReport {
    pub archive_id: String,
    pub name: String,
    pub version: String,
    /// Non-critical issues; the archive was stored regardless.
    pub warnings: Vec<ContentIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("archive rejected with {} critical parsing error(s)", .0.len())]
    Content(Vec<ContentIssue>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("operation not implemented")]
    Unimplemented,
    #[error("{0}")]
    Message(String),
}

pub trait DeploymentService: Send + Sync {
    /// Ask the platform to deploy `environment_id` of `application_id` on `location`.
    fn start_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        location: &str,
    ) -> Result<(), InterfaceError>;

    fn start_undeployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<(), InterfaceError>;

    /// Raw deployment status string of the environment.
    fn deployment_status(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<String, InterfaceError>;
}

pub trait WorkflowService: Send + Sync {
    /// Launch a workflow and return its execution identifier.
    fn start_workflow(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
    ) -> Result<String, InterfaceError>;

    fn execution_status(&self, execution_id: &str) -> Result<String, InterfaceError>;
}

pub trait LogService: Send + Sync {
    /// Entries of the environment's current deployment past offset `from`.
    fn logs(
        &self,
        application_id: &str,
        environment_id: &str,
        filter: &LogFilter,
        from: usize,
    ) -> Result<LogPage, InterfaceError>;
}

pub trait EventService: Send + Sync {
    /// Up to `size` events starting `from` positions below the newest one.
    fn events(
        &self,
        application_id: &str,
        environment_id: &str,
        from: usize,
        size: usize,
    ) -> Result<EventPage, InterfaceError>;
}

pub trait ApplicationService: Send + Sync {
    /// Create an application from a catalog topology and return its identifier.
    fn create_application(
        &self,
        name: &str,
        topology_template_version_id: &str,
    ) -> Result<String, InterfaceError>;

    fn default_environment(&self, application_id: &str) -> Result<String, InterfaceError>;

    fn delete_application(&self, application_id: &str) -> Result<(), InterfaceError>;
}

pub trait CatalogService: Send + Sync {
    /// Upload a CSAR. Critical parsing problems fail with [`InterfaceError::Content`].
    fn upload_csar(&self, archive: &Path) -> Result<CsarReport, InterfaceError>;
}

/// The full capability set, one shared handle per service.
#[derive(Clone)]
pub struct ServiceBundle {
    pub deployments: Arc<dyn DeploymentService>,
    pub workflows: Arc<dyn WorkflowService>,
    pub logs: Arc<dyn LogService>,
    pub events: Arc<dyn EventService>,
    pub applications: Arc<dyn ApplicationService>,
    pub catalog: Arc<dyn CatalogService>,
}
