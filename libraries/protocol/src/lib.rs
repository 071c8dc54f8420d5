//! Protocol data contracts for the orchestration platform REST API.
//!
//! These types mirror the JSON bodies exchanged with the `rest/latest` API
//! and are shared between the HTTP client and anything that needs to decode
//! raw payloads (fixtures, recorded sessions).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapping every REST response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> Envelope<T> {
    /// Split the envelope into its payload or the server-reported error.
    pub fn into_data(self) -> Result<Option<T>, ApiError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

/// Structured error reported by the platform inside an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Paged search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub to: u64,
}

/// Log severity levels exposed through the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One deployment log line as stored by the platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default, rename = "deploymentPaaSId")]
    pub deployment_paas_id: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub interface_name: Option<String>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Field filters applied to a log search. Every field is a list of accepted values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployment_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflow_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub level: Vec<LogLevel>,
}

/// Sort order for a log search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfiguration {
    pub sort_by: String,
    pub ascending: bool,
}

impl SortConfiguration {
    /// Oldest entries first, which is the order the log cursor assumes.
    pub fn oldest_first() -> Self {
        Self {
            sort_by: "timestamp".to_string(),
            ascending: true,
        }
    }
}

/// Request payload for `deployment/logs/search`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSearchRequest {
    pub from: u64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub filters: LogFilters,
    pub sort_configuration: SortConfiguration,
}

/// State-change notification emitted while a deployment runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub node_template_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Empty or missing for events that are not instance state transitions.
    #[serde(default)]
    pub instance_state: Option<String>,
    /// Emission time in epoch milliseconds.
    #[serde(default)]
    pub date: i64,
}

/// Workflow execution record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub end_date: Option<i64>,
}

/// Request payload for `applications/deployment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub application_id: String,
    pub application_environment_id: String,
}

/// Request payload binding every node group of a topology to one location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoliciesRequest {
    pub groups_to_locations: BTreeMap<String, String>,
}

impl LocationPoliciesRequest {
    /// Group name the platform uses to mean "all node groups".
    pub const ALL_GROUPS: &'static str = "_A4C_ALL";

    pub fn everything_on(location: &str) -> Self {
        let mut groups_to_locations = BTreeMap::new();
        groups_to_locations.insert(Self::ALL_GROUPS.to_string(), location.to_string());
        Self {
            groups_to_locations,
        }
    }
}

/// Request payload for creating an application from a catalog topology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub name: String,
    pub archive_name: String,
    pub topology_template_version_id: String,
}

/// Request payload for the generic `*/search` endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub from: u64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Environment attached to an application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEnvironment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Deployment currently bound to an environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default, rename = "orchestratorDeploymentId")]
    pub paas_id: Option<String>,
}

/// Payload of `active-deployment-monitored`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDeployment {
    pub deployment: Deployment,
}

/// Severity of a CSAR parsing problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsingErrorLevel {
    Error,
    Warning,
    Info,
}

/// Problem reported while parsing an uploaded archive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingError {
    pub error_level: ParsingErrorLevel,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mark: Option<Value>,
}

impl ParsingError {
    pub fn is_critical(&self) -> bool {
        self.error_level == ParsingErrorLevel::Error
    }
}

/// Archive identity returned by a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Csar {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// Payload of `csars` upload, keyed by archive file path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsarUploadResult {
    #[serde(default)]
    pub csar: Option<Csar>,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<ParsingError>>,
}

impl CsarUploadResult {
    pub fn has_critical_errors(&self) -> bool {
        self.errors.values().flatten().any(ParsingError::is_critical)
    }
}
