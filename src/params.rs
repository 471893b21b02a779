use std::collections::BTreeMap;

use serde_json::Value;

use crate::descriptor::{Operation, BUILD_NUMBER, DEFAULT_TRIGGER_TITLE, PROJECT_NAME};
use crate::error::{RabitError, Result};

/// Named parameters for one call, keyed by their wire names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for Params {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// Strongly-typed parameters bound to one operation.
pub trait OperationParams {
    const OPERATION: Operation;

    fn into_params(self) -> Params;
}

/// Build window for `cijobs.history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRange {
    from: i64,
    to: i64,
}

impl BuildRange {
    /// Every recorded build.
    pub fn all() -> Self {
        Self { from: -1, to: -1 }
    }

    pub fn single(build_number: u64) -> Self {
        let n = i64::try_from(build_number).unwrap_or(i64::MAX);
        Self { from: n, to: n }
    }

    /// # Errors
    ///
    /// Returns a validation error when `from` is past `to`.
    pub fn between(from: u64, to: u64) -> Result<Self> {
        if from > to {
            return Err(RabitError::validation(
                "from",
                format!("build {from} is after build {to}"),
            ));
        }
        Ok(Self {
            from: i64::try_from(from).unwrap_or(i64::MAX),
            to: i64::try_from(to).unwrap_or(i64::MAX),
        })
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }
}

impl Default for BuildRange {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryParams {
    pub project_name: String,
    pub range: BuildRange,
}

impl HistoryParams {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            range: BuildRange::all(),
        }
    }

    #[must_use]
    pub fn range(mut self, range: BuildRange) -> Self {
        self.range = range;
        self
    }
}

impl OperationParams for HistoryParams {
    const OPERATION: Operation = Operation::History;

    fn into_params(self) -> Params {
        Params::new()
            .with(PROJECT_NAME, self.project_name)
            .with("from", self.range.from)
            .with("to", self.range.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollParams {
    pub project_name: String,
    /// Latest build when `None`.
    pub build_number: Option<u64>,
}

impl PollParams {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            build_number: None,
        }
    }

    #[must_use]
    pub fn build(mut self, build_number: u64) -> Self {
        self.build_number = Some(build_number);
        self
    }
}

impl OperationParams for PollParams {
    const OPERATION: Operation = Operation::Poll;

    fn into_params(self) -> Params {
        project_and_build(self.project_name, self.build_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerParams {
    pub project_name: String,
    /// Build label shown in AutoRABIT.
    pub title: String,
}

impl TriggerParams {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            title: DEFAULT_TRIGGER_TITLE.to_string(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl OperationParams for TriggerParams {
    const OPERATION: Operation = Operation::Trigger;

    fn into_params(self) -> Params {
        Params::new()
            .with(PROJECT_NAME, self.project_name)
            .with("title", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickDeployParams {
    pub project_name: String,
    /// Last validated build when `None`.
    pub build_number: Option<u64>,
}

impl QuickDeployParams {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            build_number: None,
        }
    }

    #[must_use]
    pub fn build(mut self, build_number: u64) -> Self {
        self.build_number = Some(build_number);
        self
    }
}

impl OperationParams for QuickDeployParams {
    const OPERATION: Operation = Operation::QuickDeploy;

    fn into_params(self) -> Params {
        project_and_build(self.project_name, self.build_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateParams {
    pub project_name: String,
    pub baseline_revision: String,
}

impl UpdateParams {
    pub fn new(project_name: impl Into<String>, baseline_revision: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            baseline_revision: baseline_revision.into(),
        }
    }
}

impl OperationParams for UpdateParams {
    const OPERATION: Operation = Operation::Update;

    fn into_params(self) -> Params {
        Params::new()
            .with(PROJECT_NAME, self.project_name)
            .with("baseLineRevision", self.baseline_revision)
    }
}

/// Components to deploy or remove when rolling back, as returned by
/// `cijobs.rollback_details`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackManifest {
    pub constructive_changes: Option<Value>,
    pub destructive_changes_pre: Option<Value>,
    pub destructive_changes_post: Option<Value>,
}

impl RollbackManifest {
    pub(crate) const KEYS: [&'static str; 3] = [
        "constructiveChanges",
        "destructiveChangesPre",
        "destructiveChangesPost",
    ];

    /// Picks the manifest entries out of a rollback details body.
    pub fn from_details(details: &serde_json::Map<String, Value>) -> Self {
        let pick = |key: &str| details.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            constructive_changes: pick(Self::KEYS[0]),
            destructive_changes_pre: pick(Self::KEYS[1]),
            destructive_changes_post: pick(Self::KEYS[2]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constructive_changes.is_none()
            && self.destructive_changes_pre.is_none()
            && self.destructive_changes_post.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollbackParams {
    pub project_name: String,
    pub build_number: u64,
    /// Run the rollback as a validation only.
    pub validate_deployment: bool,
    pub manifest: RollbackManifest,
}

impl RollbackParams {
    pub fn new(project_name: impl Into<String>, build_number: u64) -> Self {
        Self {
            project_name: project_name.into(),
            build_number,
            validate_deployment: false,
            manifest: RollbackManifest::default(),
        }
    }

    #[must_use]
    pub fn validate_only(mut self, validate: bool) -> Self {
        self.validate_deployment = validate;
        self
    }

    #[must_use]
    pub fn manifest(mut self, manifest: RollbackManifest) -> Self {
        self.manifest = manifest;
        self
    }
}

impl OperationParams for RollbackParams {
    const OPERATION: Operation = Operation::Rollback;

    fn into_params(self) -> Params {
        let mut params = project_and_build(self.project_name, Some(self.build_number))
            .with("validateDeployment", self.validate_deployment);
        let RollbackManifest {
            constructive_changes,
            destructive_changes_pre,
            destructive_changes_post,
        } = self.manifest;
        let entries = [
            constructive_changes,
            destructive_changes_pre,
            destructive_changes_post,
        ];
        for (key, value) in RollbackManifest::KEYS.into_iter().zip(entries) {
            if let Some(value) = value {
                params.insert(key, value);
            }
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackDetailsParams {
    pub project_name: String,
    pub build_number: Option<u64>,
}

impl RollbackDetailsParams {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            build_number: None,
        }
    }

    #[must_use]
    pub fn build(mut self, build_number: u64) -> Self {
        self.build_number = Some(build_number);
        self
    }
}

impl OperationParams for RollbackDetailsParams {
    const OPERATION: Operation = Operation::RollbackDetails;

    fn into_params(self) -> Params {
        project_and_build(self.project_name, self.build_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackHistoryParams {
    pub project_name: String,
    pub build_number: u64,
}

impl RollbackHistoryParams {
    pub fn new(project_name: impl Into<String>, build_number: u64) -> Self {
        Self {
            project_name: project_name.into(),
            build_number,
        }
    }
}

impl OperationParams for RollbackHistoryParams {
    const OPERATION: Operation = Operation::RollbackHistory;

    fn into_params(self) -> Params {
        project_and_build(self.project_name, Some(self.build_number))
    }
}

fn project_and_build(project_name: String, build_number: Option<u64>) -> Params {
    let params = Params::new().with(PROJECT_NAME, project_name);
    match build_number {
        Some(n) => params.with(BUILD_NUMBER, n),
        None => params,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_range_rejects_inverted_window() {
        let err = BuildRange::between(12, 3).unwrap_err();
        assert!(err.is_validation());

        let range = BuildRange::between(3, 12).unwrap();
        assert_eq!((range.from(), range.to()), (3, 12));
        assert_eq!(BuildRange::single(7), BuildRange::between(7, 7).unwrap());
        assert_eq!((BuildRange::all().from(), BuildRange::all().to()), (-1, -1));
    }

    #[test]
    fn test_history_params_carry_open_bounds() {
        let params = HistoryParams::new("release-job").into_params();
        assert_eq!(params.get("projectName"), Some(&json!("release-job")));
        assert_eq!(params.get("from"), Some(&json!(-1)));
        assert_eq!(params.get("to"), Some(&json!(-1)));
    }

    #[test]
    fn test_poll_without_build_omits_build_number() {
        let params = PollParams::new("release-job").into_params();
        assert!(params.get("buildNumber").is_none());

        let params = PollParams::new("release-job").build(42).into_params();
        assert_eq!(params.get("buildNumber"), Some(&json!(42)));
    }

    #[test]
    fn test_trigger_defaults_title() {
        let params = TriggerParams::new("release-job").into_params();
        assert_eq!(params.get("title"), Some(&json!("automated-build")));
    }

    #[test]
    fn test_rollback_manifest_from_details() {
        let details = json!({
            "cyclenum": 9,
            "backupStatus": "Success",
            "constructiveChanges": {"ApexClass": ["Foo"]},
            "destructiveChangesPost": null,
        });
        let manifest = RollbackManifest::from_details(details.as_object().unwrap());
        assert_eq!(manifest.constructive_changes, Some(json!({"ApexClass": ["Foo"]})));
        assert!(manifest.destructive_changes_post.is_none());

        let params = RollbackParams::new("release-job", 9)
            .validate_only(true)
            .manifest(manifest)
            .into_params();
        let names: Vec<_> = params.names().collect();
        assert_eq!(
            names,
            vec![
                "buildNumber",
                "constructiveChanges",
                "projectName",
                "validateDeployment"
            ]
        );
        assert_eq!(params.get("validateDeployment"), Some(&json!(true)));
    }

    #[test]
    fn test_params_from_json_map() {
        let map = json!({"projectName": "a", "buildNumber": "12"});
        let params = Params::from(map.as_object().unwrap().clone());
        assert_eq!(params.get("buildNumber"), Some(&json!("12")));
        assert!(!params.is_empty());
    }
}
