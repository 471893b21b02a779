//! Helpers for reading AutoRABIT response bodies.
//!
//! The client returns bodies untouched; these functions interpret the fields
//! callers usually care about.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of the status AutoRABIT reports when a quick deploy was accepted.
pub const QUICK_DEPLOY_ACCEPTED: &str = "Quick deploy initiated successfully";

/// Build or rollback status as reported by AutoRABIT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Inprogress,
    Completed,
    Success,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Inprogress" => JobStatus::Inprogress,
            "Completed" => JobStatus::Completed,
            "Success" => JobStatus::Success,
            "Failed" | "Failure" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }

    /// Reads the `status` field of a response.
    pub fn from_body(body: &Map<String, Value>) -> Option<Self> {
        body.get("status").and_then(Value::as_str).map(Self::parse)
    }

    /// Statuses that mean the build is healthy so far.
    pub fn is_ok(&self) -> bool {
        matches!(
            self,
            JobStatus::Inprogress | JobStatus::Completed | JobStatus::Success
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Inprogress)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Inprogress => "Inprogress",
            JobStatus::Completed => "Completed",
            JobStatus::Success => "Success",
            JobStatus::Failed => "Failed",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a rollback iteration, read from `rollbackstatus`.
pub fn rollback_status(body: &Map<String, Value>) -> Option<JobStatus> {
    body.get("rollbackstatus")
        .and_then(Value::as_str)
        .map(JobStatus::parse)
}

/// Whether a `cijobs.quick_deploy` response reports the deploy as started.
pub fn quick_deploy_accepted(body: &Map<String, Value>) -> bool {
    body.get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.starts_with(QUICK_DEPLOY_ACCEPTED))
}

/// Build number of a trigger or poll response (`cyclenum`), which AutoRABIT
/// sends either as a number or a string.
pub fn cycle_number(body: &Map<String, Value>) -> Option<u64> {
    match body.get("cyclenum")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One build in a `cijobs.history` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub org_project_name: Option<String>,
    #[serde(default)]
    pub build_number: Option<Value>,
    #[serde(rename = "overAllStatus", default)]
    pub overall_status: Option<JobStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extracts the builds listed under `ciJobHistoryList`.
///
/// Returns `None` when the list is missing or malformed.
pub fn history_entries(body: &Map<String, Value>) -> Option<Vec<HistoryEntry>> {
    let list = body.get("ciJobHistoryList")?;
    serde_json::from_value(list.clone()).ok()
}
