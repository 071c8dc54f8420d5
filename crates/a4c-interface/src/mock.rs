//! Scripted test doubles for every service trait.
//!
//! Status doubles replay a queue of responses and keep repeating the last one
//! once the queue is drained, so a test only scripts the transitions it cares
//! about.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{
    ApplicationService, CatalogService, CsarReport, DeploymentService, Event, EventPage,
    EventService, InterfaceError, LogEntry, LogFilter, LogPage, LogService, WorkflowService,
};

type Scripted<T> = Mutex<VecDeque<Result<T, InterfaceError>>>;

fn replay<T: Clone>(queue: &Scripted<T>, empty: &str) -> Result<T, InterfaceError> {
    let mut queue = queue.lock().unwrap();
    match queue.len() {
        0 => Err(InterfaceError::Message(empty.to_string())),
        1 => queue[0].clone(),
        _ => queue.pop_front().unwrap(),
    }
}

#[derive(Default)]
pub struct MockDeploymentService {
    start_result: Mutex<Option<Result<(), InterfaceError>>>,
    undeploy_result: Mutex<Option<Result<(), InterfaceError>>>,
    statuses: Scripted<String>,
    start_calls: Mutex<Vec<(String, String, String)>>,
    undeploy_calls: Mutex<usize>,
    status_calls: Mutex<usize>,
}

impl MockDeploymentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_start_result(&self, result: Result<(), InterfaceError>) {
        *self.start_result.lock().unwrap() = Some(result);
    }

    pub fn set_undeploy_result(&self, result: Result<(), InterfaceError>) {
        *self.undeploy_result.lock().unwrap() = Some(result);
    }

    pub fn push_status(&self, status: impl Into<String>) {
        self.statuses.lock().unwrap().push_back(Ok(status.into()));
    }

    pub fn push_status_error(&self, err: InterfaceError) {
        self.statuses.lock().unwrap().push_back(Err(err));
    }

    pub fn start_calls(&self) -> Vec<(String, String, String)> {
        self.start_calls.lock().unwrap().clone()
    }

    pub fn undeploy_calls(&self) -> usize {
        *self.undeploy_calls.lock().unwrap()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

impl DeploymentService for MockDeploymentService {
    fn start_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        location: &str,
    ) -> Result<(), InterfaceError> {
        self.start_calls.lock().unwrap().push((
            application_id.to_string(),
            environment_id.to_string(),
            location.to_string(),
        ));
        self.start_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    fn start_undeployment(
        &self,
        _application_id: &str,
        _environment_id: &str,
    ) -> Result<(), InterfaceError> {
        *self.undeploy_calls.lock().unwrap() += 1;
        self.undeploy_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    fn deployment_status(
        &self,
        _application_id: &str,
        _environment_id: &str,
    ) -> Result<String, InterfaceError> {
        *self.status_calls.lock().unwrap() += 1;
        replay(&self.statuses, "no deployment status scripted")
    }
}

#[derive(Default)]
pub struct MockWorkflowService {
    start_result: Mutex<Option<Result<String, InterfaceError>>>,
    statuses: Scripted<String>,
    start_calls: Mutex<Vec<String>>,
    status_calls: Mutex<usize>,
}

impl MockWorkflowService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_start_result(&self, result: Result<String, InterfaceError>) {
        *self.start_result.lock().unwrap() = Some(result);
    }

    pub fn push_status(&self, status: impl Into<String>) {
        self.statuses.lock().unwrap().push_back(Ok(status.into()));
    }

    pub fn push_status_error(&self, err: InterfaceError) {
        self.statuses.lock().unwrap().push_back(Err(err));
    }

    /// Names of the workflows started so far.
    pub fn start_calls(&self) -> Vec<String> {
        self.start_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

impl WorkflowService for MockWorkflowService {
    fn start_workflow(
        &self,
        _application_id: &str,
        _environment_id: &str,
        workflow: &str,
    ) -> Result<String, InterfaceError> {
        self.start_calls.lock().unwrap().push(workflow.to_string());
        self.start_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("exec-1".to_string()))
    }

    fn execution_status(&self, _execution_id: &str) -> Result<String, InterfaceError> {
        *self.status_calls.lock().unwrap() += 1;
        replay(&self.statuses, "no execution status scripted")
    }
}

/// Serves scripted pages in order, then empty pages.
#[derive(Default)]
pub struct MockLogService {
    pages: Mutex<VecDeque<Result<Vec<LogEntry>, InterfaceError>>>,
    requests: Mutex<Vec<(LogFilter, usize)>>,
}

impl MockLogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, entries: Vec<LogEntry>) {
        self.pages.lock().unwrap().push_back(Ok(entries));
    }

    pub fn push_error(&self, err: InterfaceError) {
        self.pages.lock().unwrap().push_back(Err(err));
    }

    /// Filter and offset of every call, in call order.
    pub fn requests(&self) -> Vec<(LogFilter, usize)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LogService for MockLogService {
    fn logs(
        &self,
        _application_id: &str,
        _environment_id: &str,
        filter: &LogFilter,
        from: usize,
    ) -> Result<LogPage, InterfaceError> {
        self.requests.lock().unwrap().push((filter.clone(), from));
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(entries)) => Ok(LogPage { entries }),
            Some(Err(err)) => Err(err),
            None => Ok(LogPage::default()),
        }
    }
}

/// Simulates the server's event store.
///
/// Each call first appends the next scripted batch (oldest first) to the
/// stored sequence, then answers the query newest first like the platform does.
#[derive(Default)]
pub struct MockEventService {
    stored: Mutex<Vec<Event>>,
    arrivals: Mutex<VecDeque<Result<Vec<Event>, InterfaceError>>>,
    requests: Mutex<Vec<(usize, usize)>>,
}

impl MockEventService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events already stored before the first call.
    pub fn preload(&self, events: Vec<Event>) {
        self.stored.lock().unwrap().extend(events);
    }

    /// Events that arrive right before the next unanswered call.
    pub fn push_arrival(&self, events: Vec<Event>) {
        self.arrivals.lock().unwrap().push_back(Ok(events));
    }

    pub fn push_error(&self, err: InterfaceError) {
        self.arrivals.lock().unwrap().push_back(Err(err));
    }

    /// `(from, size)` of every call, in call order.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl EventService for MockEventService {
    fn events(
        &self,
        _application_id: &str,
        _environment_id: &str,
        from: usize,
        size: usize,
    ) -> Result<EventPage, InterfaceError> {
        self.requests.lock().unwrap().push((from, size));
        let mut stored = self.stored.lock().unwrap();
        match self.arrivals.lock().unwrap().pop_front() {
            Some(Ok(batch)) => stored.extend(batch),
            Some(Err(err)) => return Err(err),
            None => {}
        }
        let events = stored.iter().rev().skip(from).take(size).cloned().collect();
        Ok(EventPage {
            events,
            total: stored.len(),
        })
    }
}

#[derive(Default)]
pub struct MockApplicationService {
    create_result: Mutex<Option<Result<String, InterfaceError>>>,
    environment_result: Mutex<Option<Result<String, InterfaceError>>>,
    delete_result: Mutex<Option<Result<(), InterfaceError>>>,
    deleted: Mutex<Vec<String>>,
}

impl MockApplicationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_create_result(&self, result: Result<String, InterfaceError>) {
        *self.create_result.lock().unwrap() = Some(result);
    }

    pub fn set_environment_result(&self, result: Result<String, InterfaceError>) {
        *self.environment_result.lock().unwrap() = Some(result);
    }

    pub fn set_delete_result(&self, result: Result<(), InterfaceError>) {
        *self.delete_result.lock().unwrap() = Some(result);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl ApplicationService for MockApplicationService {
    fn create_application(
        &self,
        name: &str,
        _topology_template_version_id: &str,
    ) -> Result<String, InterfaceError> {
        self.create_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(name.to_string()))
    }

    fn default_environment(&self, application_id: &str) -> Result<String, InterfaceError> {
        self.environment_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(format!("{application_id}-env")))
    }

    fn delete_application(&self, application_id: &str) -> Result<(), InterfaceError> {
        self.deleted.lock().unwrap().push(application_id.to_string());
        self.delete_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct MockCatalogService {
    upload_result: Mutex<Option<Result<CsarReport, InterfaceError>>>,
    uploads: Mutex<Vec<PathBuf>>,
}

impl MockCatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_upload_result(&self, result: Result<CsarReport, InterfaceError>) {
        *self.upload_result.lock().unwrap() = Some(result);
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }
}

impl CatalogService for MockCatalogService {
    fn upload_csar(&self, archive: &Path) -> Result<CsarReport, InterfaceError> {
        self.uploads.lock().unwrap().push(archive.to_path_buf());
        self.upload_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(InterfaceError::Unimplemented))
    }
}
