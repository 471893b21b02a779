use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::RabitError;

/// Logical operations of the CI jobs API v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    History,
    Poll,
    Trigger,
    QuickDeploy,
    Update,
    Rollback,
    RollbackDetails,
    RollbackHistory,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::History,
        Operation::Poll,
        Operation::Trigger,
        Operation::QuickDeploy,
        Operation::Update,
        Operation::Rollback,
        Operation::RollbackDetails,
        Operation::RollbackHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::History => "cijobs.history",
            Operation::Poll => "cijobs.poll",
            Operation::Trigger => "cijobs.trigger",
            Operation::QuickDeploy => "cijobs.quick_deploy",
            Operation::Update => "cijobs.update",
            Operation::Rollback => "cijobs.rollback",
            Operation::RollbackDetails => "cijobs.rollback_details",
            Operation::RollbackHistory => "cijobs.rollback_history",
        }
    }

    pub fn descriptor(self) -> &'static OperationDescriptor {
        match self {
            Operation::History => &HISTORY,
            Operation::Poll => &POLL,
            Operation::Trigger => &TRIGGER,
            Operation::QuickDeploy => &QUICK_DEPLOY,
            Operation::Update => &UPDATE,
            Operation::Rollback => &ROLLBACK,
            Operation::RollbackDetails => &ROLLBACK_DETAILS,
            Operation::RollbackHistory => &ROLLBACK_HISTORY,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = RabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| RabitError::validation("operation", format!("unknown operation `{s}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// One piece of the endpoint path below `/api/cijobs/v1/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPart {
    Literal(&'static str),
    /// Filled from the named parameter; skipped when an optional one is absent.
    Param(&'static str),
}

/// Where a parameter travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Path,
    Query,
    Body,
}

/// Semantic type a parameter value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Non-empty string.
    Text,
    /// Non-empty string, cut to `MAX_REVISION_LEN` characters.
    Revision,
    /// Positive integer or a string of digits.
    BuildNumber,
    /// Integer `>= -1`, where `-1` leaves the bound open.
    BuildBound,
    Flag,
    /// Any non-null JSON value, forwarded as-is.
    Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Integer(i64),
    Flag(bool),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Text(s) => Value::from(s),
            DefaultValue::Integer(n) => Value::from(n),
            DefaultValue::Flag(b) => Value::from(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub location: Location,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

const fn required(name: &'static str, kind: ParamKind, location: Location) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        location,
        required: true,
        default: None,
    }
}

const fn optional(name: &'static str, kind: ParamKind, location: Location) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        location,
        required: false,
        default: None,
    }
}

const fn defaulted(
    name: &'static str,
    kind: ParamKind,
    location: Location,
    default: DefaultValue,
) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        location,
        required: false,
        default: Some(default),
    }
}

/// Static shape of one endpoint: method, path and accepted parameters.
#[derive(Debug)]
pub struct OperationDescriptor {
    pub operation: Operation,
    pub method: HttpMethod,
    pub path: &'static [PathPart],
    pub params: &'static [ParamSpec],
}

impl OperationDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
    }

    pub fn optional_params(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params
            .iter()
            .filter(|spec| !spec.required)
            .map(|spec| spec.name)
    }

    pub fn has_body(&self) -> bool {
        self.params.iter().any(|spec| spec.location == Location::Body)
    }
}

/// API v1 accepts baseline revisions of up to 10 characters.
pub const MAX_REVISION_LEN: usize = 10;

pub const DEFAULT_TRIGGER_TITLE: &str = "automated-build";

pub(crate) const PROJECT_NAME: &str = "projectName";
pub(crate) const BUILD_NUMBER: &str = "buildNumber";

use Location::{Body, Path, Query};
use ParamKind::{BuildBound, BuildNumber, Flag, Manifest, Revision, Text};
use PathPart::{Literal, Param};

static HISTORY: OperationDescriptor = OperationDescriptor {
    operation: Operation::History,
    method: HttpMethod::Get,
    path: &[Literal("history"), Param(PROJECT_NAME)],
    params: &[
        required(PROJECT_NAME, Text, Path),
        defaulted("from", BuildBound, Query, DefaultValue::Integer(-1)),
        defaulted("to", BuildBound, Query, DefaultValue::Integer(-1)),
    ],
};

static POLL: OperationDescriptor = OperationDescriptor {
    operation: Operation::Poll,
    method: HttpMethod::Get,
    path: &[Literal("pollstatus"), Param(PROJECT_NAME), Param(BUILD_NUMBER)],
    params: &[
        required(PROJECT_NAME, Text, Path),
        optional(BUILD_NUMBER, BuildNumber, Path),
    ],
};

static TRIGGER: OperationDescriptor = OperationDescriptor {
    operation: Operation::Trigger,
    method: HttpMethod::Post,
    path: &[Literal("trigger")],
    params: &[
        required(PROJECT_NAME, Text, Body),
        defaulted("title", Text, Body, DefaultValue::Text(DEFAULT_TRIGGER_TITLE)),
    ],
};

static QUICK_DEPLOY: OperationDescriptor = OperationDescriptor {
    operation: Operation::QuickDeploy,
    method: HttpMethod::Post,
    path: &[
        Literal("triggerquickdeploy"),
        Param(PROJECT_NAME),
        Param(BUILD_NUMBER),
    ],
    params: &[
        required(PROJECT_NAME, Text, Path),
        optional(BUILD_NUMBER, BuildNumber, Path),
    ],
};

static UPDATE: OperationDescriptor = OperationDescriptor {
    operation: Operation::Update,
    method: HttpMethod::Post,
    path: &[Literal("update"), Literal("baselinerevision")],
    params: &[
        required(PROJECT_NAME, Text, Body),
        required("baseLineRevision", Revision, Body),
    ],
};

static ROLLBACK: OperationDescriptor = OperationDescriptor {
    operation: Operation::Rollback,
    method: HttpMethod::Post,
    path: &[Literal("rollback"), Param(PROJECT_NAME), Param(BUILD_NUMBER)],
    params: &[
        required(PROJECT_NAME, Text, Path),
        required(BUILD_NUMBER, BuildNumber, Path),
        defaulted("validateDeployment", Flag, Body, DefaultValue::Flag(false)),
        optional("constructiveChanges", Manifest, Body),
        optional("destructiveChangesPre", Manifest, Body),
        optional("destructiveChangesPost", Manifest, Body),
    ],
};

static ROLLBACK_DETAILS: OperationDescriptor = OperationDescriptor {
    operation: Operation::RollbackDetails,
    method: HttpMethod::Get,
    path: &[
        Literal("rollbackdetails"),
        Param(PROJECT_NAME),
        Param(BUILD_NUMBER),
    ],
    params: &[
        required(PROJECT_NAME, Text, Path),
        optional(BUILD_NUMBER, BuildNumber, Path),
    ],
};

static ROLLBACK_HISTORY: OperationDescriptor = OperationDescriptor {
    operation: Operation::RollbackHistory,
    method: HttpMethod::Get,
    path: &[
        Literal("rollbackhistory"),
        Param(PROJECT_NAME),
        Param(BUILD_NUMBER),
    ],
    params: &[
        required(PROJECT_NAME, Text, Path),
        required(BUILD_NUMBER, BuildNumber, Path),
    ],
};
