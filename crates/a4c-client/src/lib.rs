mod config;
mod error;

use std::{path::Path, sync::Arc};

use a4c_interface::{
    ApplicationService, CatalogService, ContentIssue, CsarReport, DeploymentService,
    Event as UiEvent, EventPage, EventService, InterfaceError, IssueLevel,
    LogEntry as UiLogEntry, LogFilter, LogLevel as UiLogLevel, LogPage, LogService,
    ServiceBundle, WorkflowService,
};
use chrono::{TimeZone, Utc};
use reqwest::blocking::{Client, Response, multipart::Form};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};
use url::Url;

use a4c_protocol::{
    ActiveDeployment, ApplicationEnvironment, CreateApplicationRequest, CsarUploadResult,
    DeploymentEvent, DeploymentRequest, Envelope, Execution, LocationPoliciesRequest, LogEntry,
    LogFilters, LogLevel, LogSearchRequest, ParsingErrorLevel, SearchRequest, SearchResult,
    SortConfiguration,
};

pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::ProtocolClientError;

const API_PREFIX: [&str; 2] = ["rest", "latest"];

/// Page size requested from the log search endpoint.
const LOG_PAGE_SIZE: u64 = 1000;

#[derive(Clone)]
pub struct ProtocolClients {
    transport: Arc<Transport>,
}

impl ProtocolClients {
    pub fn new(config: &ClientConfig) -> Result<Self, ProtocolClientError> {
        let base = normalize_base_url(&config.base_url)?;
        let client = Client::builder()
            .no_proxy()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.skip_cert_verification)
            .build()?;
        Ok(Self {
            transport: Arc::new(Transport { client, base }),
        })
    }

    pub fn from_url(base_url: impl Into<String>) -> Result<Self, ProtocolClientError> {
        Self::new(&ClientConfig::new(base_url))
    }

    pub fn deployment_service(&self) -> Arc<dyn DeploymentService> {
        Arc::new(ProtocolDeploymentService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn workflow_service(&self) -> Arc<dyn WorkflowService> {
        Arc::new(ProtocolWorkflowService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn log_service(&self) -> Arc<dyn LogService> {
        Arc::new(ProtocolLogService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn event_service(&self) -> Arc<dyn EventService> {
        Arc::new(ProtocolEventService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn application_service(&self) -> Arc<dyn ApplicationService> {
        Arc::new(ProtocolApplicationService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn catalog_service(&self) -> Arc<dyn CatalogService> {
        Arc::new(ProtocolCatalogService {
            transport: Arc::clone(&self.transport),
        })
    }

    pub fn service_bundle(&self) -> ServiceBundle {
        ServiceBundle {
            deployments: self.deployment_service(),
            workflows: self.workflow_service(),
            logs: self.log_service(),
            events: self.event_service(),
            applications: self.application_service(),
            catalog: self.catalog_service(),
        }
    }
}

struct Transport {
    client: Client,
    base: Url,
}

impl Transport {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProtocolClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ProtocolClientError::Protocol(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send()?;
        require_data(read_envelope(response)?)
    }

    fn get_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send()?;
        read_envelope(response)
    }

    fn get_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ProtocolClientError> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        debug!(%url, "GET");
        let response = self.client.get(url).send()?;
        require_data(read_envelope(response)?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send()?;
        require_data(read_envelope(response)?)
    }

    fn post_unit<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(), ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.client.post(url).json(body).send()?;
        read_envelope::<serde_json::Value>(response).map(|_| ())
    }

    fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.client.post(url).send()?;
        require_data(read_envelope(response)?)
    }

    fn delete(&self, segments: &[&str]) -> Result<(), ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "DELETE");
        let response = self.client.delete(url).send()?;
        read_envelope::<serde_json::Value>(response).map(|_| ())
    }

    /// Multipart upload. The raw envelope is returned because a rejected
    /// archive still carries its parsing report in `data`.
    fn upload<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: Form,
    ) -> Result<Envelope<T>, ProtocolClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST multipart");
        let response = self.client.post(url).multipart(form).send()?;
        let status = response.status();
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|err| {
            if status.is_success() {
                ProtocolClientError::Deserialize(err)
            } else {
                ProtocolClientError::Api {
                    code: i32::from(status.as_u16()),
                    message: body,
                }
            }
        })
    }

    /// Identifier of the deployment currently bound to the environment, if any.
    fn active_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Option<String>, ProtocolClientError> {
        let active: Option<ActiveDeployment> = self.get_optional(&[
            "applications",
            application_id,
            "environments",
            environment_id,
            "active-deployment-monitored",
        ])?;
        Ok(active.map(|active| active.deployment.id))
    }
}

fn read_envelope<T: DeserializeOwned>(
    response: Response,
) -> Result<Option<T>, ProtocolClientError> {
    let status = response.status();
    let body = response.text()?;
    if body.trim().is_empty() {
        return if status.is_success() {
            Ok(None)
        } else {
            Err(ProtocolClientError::Api {
                code: i32::from(status.as_u16()),
                message: status.to_string(),
            })
        };
    }

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => {
            let data = envelope.into_data()?;
            if !status.is_success() {
                return Err(ProtocolClientError::Api {
                    code: i32::from(status.as_u16()),
                    message: body,
                });
            }
            Ok(data)
        }
        Err(err) if status.is_success() => Err(err.into()),
        Err(_) => Err(ProtocolClientError::Api {
            code: i32::from(status.as_u16()),
            message: body,
        }),
    }
}

fn require_data<T>(data: Option<T>) -> Result<T, ProtocolClientError> {
    data.ok_or_else(|| ProtocolClientError::Protocol("response carried no data".to_string()))
}

fn normalize_base_url(raw: &str) -> Result<Url, ProtocolClientError> {
    let mut parsed = Url::parse(raw)?;
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed)
}

#[derive(Clone)]
struct ProtocolDeploymentService {
    transport: Arc<Transport>,
}

impl DeploymentService for ProtocolDeploymentService {
    fn start_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        location: &str,
    ) -> Result<(), InterfaceError> {
        self.transport.post_unit(
            &[
                "applications",
                application_id,
                "environments",
                environment_id,
                "deployment-topology",
                "location-policies",
            ],
            &LocationPoliciesRequest::everything_on(location),
        )?;

        self.transport.post_unit(
            &["applications", "deployment"],
            &DeploymentRequest {
                application_id: application_id.to_string(),
                application_environment_id: environment_id.to_string(),
            },
        )?;
        info!(application_id, environment_id, location, "deployment requested");
        Ok(())
    }

    fn start_undeployment(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<(), InterfaceError> {
        self.transport.delete(&[
            "applications",
            application_id,
            "environments",
            environment_id,
            "deployment",
        ])?;
        info!(application_id, environment_id, "undeployment requested");
        Ok(())
    }

    fn deployment_status(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<String, InterfaceError> {
        let status: String = self.transport.get(&[
            "applications",
            application_id,
            "environments",
            environment_id,
            "status",
        ])?;
        Ok(status)
    }
}

#[derive(Clone)]
struct ProtocolWorkflowService {
    transport: Arc<Transport>,
}

impl WorkflowService for ProtocolWorkflowService {
    fn start_workflow(
        &self,
        application_id: &str,
        environment_id: &str,
        workflow: &str,
    ) -> Result<String, InterfaceError> {
        let execution_id: String = self.transport.post_empty(&[
            "applications",
            application_id,
            "environments",
            environment_id,
            "workflows",
            workflow,
        ])?;
        info!(application_id, environment_id, workflow, %execution_id, "workflow launched");
        Ok(execution_id)
    }

    fn execution_status(&self, execution_id: &str) -> Result<String, InterfaceError> {
        let execution: Execution = self.transport.get(&["executions", execution_id])?;
        Ok(execution.status)
    }
}

#[derive(Clone)]
struct ProtocolLogService {
    transport: Arc<Transport>,
}

impl LogService for ProtocolLogService {
    fn logs(
        &self,
        application_id: &str,
        environment_id: &str,
        filter: &LogFilter,
        from: usize,
    ) -> Result<LogPage, InterfaceError> {
        let Some(deployment_id) = self
            .transport
            .active_deployment(application_id, environment_id)?
        else {
            debug!(application_id, environment_id, "no active deployment, no logs");
            return Ok(LogPage::default());
        };

        let request = LogSearchRequest {
            from: from as u64,
            size: LOG_PAGE_SIZE,
            query: None,
            filters: map_filter_to_protocol(&deployment_id, filter),
            sort_configuration: SortConfiguration::oldest_first(),
        };
        let result: SearchResult<LogEntry> = self
            .transport
            .post(&["deployment", "logs", "search"], &request)?;

        Ok(LogPage {
            entries: result.data.into_iter().map(map_log_to_ui).collect(),
        })
    }
}

#[derive(Clone)]
struct ProtocolEventService {
    transport: Arc<Transport>,
}

impl EventService for ProtocolEventService {
    fn events(
        &self,
        application_id: &str,
        environment_id: &str,
        from: usize,
        size: usize,
    ) -> Result<EventPage, InterfaceError> {
        let Some(deployment_id) = self
            .transport
            .active_deployment(application_id, environment_id)?
        else {
            debug!(application_id, environment_id, "no active deployment, no events");
            return Ok(EventPage::default());
        };

        let result: SearchResult<DeploymentEvent> = self.transport.get_query(
            &["deployments", &deployment_id, "events"],
            &[("from", from.to_string()), ("size", size.to_string())],
        )?;

        Ok(EventPage {
            events: result.data.into_iter().map(map_event_to_ui).collect(),
            total: result.total_results as usize,
        })
    }
}

#[derive(Clone)]
struct ProtocolApplicationService {
    transport: Arc<Transport>,
}

impl ApplicationService for ProtocolApplicationService {
    fn create_application(
        &self,
        name: &str,
        topology_template_version_id: &str,
    ) -> Result<String, InterfaceError> {
        let request = CreateApplicationRequest {
            name: name.to_string(),
            archive_name: name.to_string(),
            topology_template_version_id: topology_template_version_id.to_string(),
        };
        let application_id: String = self.transport.post(&["applications"], &request)?;
        info!(%application_id, "application created");
        Ok(application_id)
    }

    fn default_environment(&self, application_id: &str) -> Result<String, InterfaceError> {
        let request = SearchRequest {
            from: 0,
            size: 1,
            query: None,
        };
        let result: SearchResult<ApplicationEnvironment> = self.transport.post(
            &["applications", application_id, "environments", "search"],
            &request,
        )?;
        result
            .data
            .into_iter()
            .next()
            .map(|environment| environment.id)
            .ok_or_else(|| {
                InterfaceError::NotFound(format!("environment of application {application_id}"))
            })
    }

    fn delete_application(&self, application_id: &str) -> Result<(), InterfaceError> {
        self.transport.delete(&["applications", application_id])?;
        info!(application_id, "application deleted");
        Ok(())
    }
}

#[derive(Clone)]
struct ProtocolCatalogService {
    transport: Arc<Transport>,
}

impl CatalogService for ProtocolCatalogService {
    fn upload_csar(&self, archive: &Path) -> Result<CsarReport, InterfaceError> {
        let form = Form::new()
            .file("file", archive)
            .map_err(ProtocolClientError::from)?;
        let envelope: Envelope<CsarUploadResult> = self.transport.upload(&["csars"], form)?;
        map_upload_to_report(envelope)
    }
}

fn map_filter_to_protocol(deployment_id: &str, filter: &LogFilter) -> LogFilters {
    LogFilters {
        deployment_id: vec![deployment_id.to_string()],
        execution_id: filter.execution_id.iter().cloned().collect(),
        workflow_id: filter.workflow_id.iter().cloned().collect(),
        level: filter.levels.iter().copied().map(map_level_to_protocol).collect(),
    }
}

fn map_level_to_protocol(level: UiLogLevel) -> LogLevel {
    match level {
        UiLogLevel::Trace => LogLevel::Trace,
        UiLogLevel::Debug => LogLevel::Debug,
        UiLogLevel::Info => LogLevel::Info,
        UiLogLevel::Warn => LogLevel::Warn,
        UiLogLevel::Error => LogLevel::Error,
    }
}

fn map_level_to_ui(level: LogLevel) -> UiLogLevel {
    match level {
        LogLevel::Trace => UiLogLevel::Trace,
        LogLevel::Debug => UiLogLevel::Debug,
        LogLevel::Info => UiLogLevel::Info,
        LogLevel::Warn => UiLogLevel::Warn,
        LogLevel::Error => UiLogLevel::Error,
    }
}

fn map_log_to_ui(entry: LogEntry) -> UiLogEntry {
    UiLogEntry {
        timestamp: entry.timestamp,
        level: map_level_to_ui(entry.level),
        deployment_id: entry.deployment_id,
        deployment_paas_id: entry.deployment_paas_id,
        workflow_id: entry.workflow_id,
        execution_id: entry.execution_id,
        node_id: entry.node_id,
        instance_id: entry.instance_id,
        interface_name: entry.interface_name,
        operation_name: entry.operation_name,
        content: entry.content,
    }
}

fn map_event_to_ui(event: DeploymentEvent) -> UiEvent {
    UiEvent {
        node_template_id: event.node_template_id.unwrap_or_default(),
        instance_id: event.instance_id.unwrap_or_default(),
        instance_state: event.instance_state.filter(|state| !state.is_empty()),
        emitted_at: Utc.timestamp_millis_opt(event.date).single(),
    }
}

fn map_upload_to_report(envelope: Envelope<CsarUploadResult>) -> Result<CsarReport, InterfaceError> {
    let Envelope { data, error } = envelope;
    let Some(result) = data else {
        return Err(match error {
            Some(error) => ProtocolClientError::from(error).into(),
            None => InterfaceError::Remote("upload response carried no data".to_string()),
        });
    };

    let mut issues: Vec<ContentIssue> = result
        .errors
        .into_iter()
        .flat_map(|(file, errors)| {
            errors.into_iter().map(move |error| ContentIssue {
                file: file.clone(),
                level: match error.error_level {
                    ParsingErrorLevel::Error => IssueLevel::Error,
                    ParsingErrorLevel::Warning => IssueLevel::Warning,
                    ParsingErrorLevel::Info => IssueLevel::Info,
                },
                code: error.error_code,
                message: error.problem.or(error.note),
            })
        })
        .collect();

    if issues.iter().any(ContentIssue::is_critical) {
        issues.retain(ContentIssue::is_critical);
        return Err(InterfaceError::Content(issues));
    }
    if let Some(error) = error {
        return Err(ProtocolClientError::from(error).into());
    }

    let csar = result
        .csar
        .ok_or_else(|| InterfaceError::Remote("upload accepted without an archive".to_string()))?;
    info!(archive = %csar.id, warnings = issues.len(), "archive uploaded");
    Ok(CsarReport {
        archive_id: csar.id,
        name: csar.name,
        version: csar.version,
        warnings: issues,
    })
}

impl From<ProtocolClientError> for InterfaceError {
    fn from(value: ProtocolClientError) -> Self {
        match value {
            ProtocolClientError::Api { code: 404, message } => InterfaceError::NotFound(message),
            other => InterfaceError::Remote(other.to_string()),
        }
    }
}
