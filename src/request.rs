use serde_json::{Map, Value};
use url::Url;

use crate::auth::Credentials;
use crate::descriptor::{
    HttpMethod, Location, Operation, OperationDescriptor, ParamKind, ParamSpec, PathPart,
    MAX_REVISION_LEN,
};
use crate::error::{RabitError, Result};
use crate::params::Params;

const API_PREFIX: [&str; 3] = ["api", "cijobs", "v1"];

/// A fully validated request, ready to be sent.
///
/// Only [`PreparedRequest::build`] can produce one, so every request the
/// client sends has passed the operation's descriptor and targets the
/// credentials' instance.
///
/// ```compile_fail
/// use rabit_cijobs::descriptor::{HttpMethod, Operation};
/// use rabit_cijobs::PreparedRequest;
///
/// let _ = PreparedRequest {
///     operation: Operation::Poll,
///     method: HttpMethod::Get,
///     url: url::Url::parse("https://elsewhere.example.com/").unwrap(),
///     query: Vec::new(),
///     body: None,
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub(crate) operation: Operation,
    pub(crate) method: HttpMethod,
    pub(crate) url: Url,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
}

impl PreparedRequest {
    /// Validates `params` against the operation's descriptor and lays them out
    /// as path segments, query pairs and JSON body.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending parameter when a
    /// required one is missing, an unknown one is given, or a value does not
    /// fit its kind.
    pub fn build(credentials: &Credentials, operation: Operation, params: Params) -> Result<Self> {
        let descriptor = operation.descriptor();
        let values = resolve(descriptor, params)?;

        let mut url = credentials.instance_url().clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| RabitError::validation("instance_url", "cannot be a base URL"))?;
            segments.pop_if_empty().extend(API_PREFIX);
            for part in descriptor.path {
                match part {
                    PathPart::Literal(literal) => {
                        segments.push(literal);
                    }
                    PathPart::Param(name) => {
                        if let Some(value) = values.iter().find(|(spec, _)| spec.name == *name) {
                            segments.push(&scalar_to_string(&value.1));
                        }
                    }
                }
            }
        }

        let mut query = Vec::new();
        let mut body = Map::new();
        for (spec, value) in values {
            match spec.location {
                Location::Path => {}
                Location::Query => query.push((spec.name.to_string(), scalar_to_string(&value))),
                Location::Body => {
                    body.insert(spec.name.to_string(), value);
                }
            }
        }

        Ok(Self {
            operation,
            method: descriptor.method,
            url,
            query,
            body: descriptor.has_body().then_some(Value::Object(body)),
        })
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Checks every supplied parameter, applies defaults and returns the final
/// values in descriptor order.
fn resolve(
    descriptor: &'static OperationDescriptor,
    mut params: Params,
) -> Result<Vec<(&'static ParamSpec, Value)>> {
    if let Some(unknown) = params.names().find(|name| descriptor.param(name).is_none()) {
        return Err(RabitError::validation(
            unknown,
            format!("not accepted by {}", descriptor.operation),
        ));
    }

    let mut values = Vec::with_capacity(descriptor.params.len());
    for spec in descriptor.params {
        let supplied = params.remove(spec.name).filter(|v| !v.is_null());
        let value = match (supplied, spec.default) {
            (Some(value), _) => normalize(spec, value)?,
            (None, Some(default)) => default.to_value(),
            (None, None) if spec.required => {
                return Err(RabitError::validation(
                    spec.name,
                    format!("is required by {}", descriptor.operation),
                ))
            }
            (None, None) => continue,
        };
        values.push((spec, value));
    }
    check_bounds(&values)?;
    Ok(values)
}

/// Rejects a build window whose lower bound is past its upper bound. `-1`
/// leaves a bound open and is never compared.
fn check_bounds(values: &[(&'static ParamSpec, Value)]) -> Result<()> {
    let mut bounds = values
        .iter()
        .filter(|(spec, _)| spec.kind == ParamKind::BuildBound)
        .filter_map(|(spec, value)| Some((spec.name, value.as_i64()?)));
    if let (Some((lower, from)), Some((_, to))) = (bounds.next(), bounds.next()) {
        if from != -1 && to != -1 && from > to {
            return Err(RabitError::validation(
                lower,
                format!("build {from} is after build {to}"),
            ));
        }
    }
    Ok(())
}

fn normalize(spec: &ParamSpec, value: Value) -> Result<Value> {
    let value = normalize_kind(spec, value)?;
    // `url` resolves dot segments, which would shift the remaining path.
    if spec.location == Location::Path && matches!(value.as_str(), Some("." | "..")) {
        return Err(RabitError::validation(
            spec.name,
            "cannot be `.` or `..` in a path segment",
        ));
    }
    Ok(value)
}

fn normalize_kind(spec: &ParamSpec, value: Value) -> Result<Value> {
    let invalid = |reason: &str| RabitError::validation(spec.name, reason);
    match spec.kind {
        ParamKind::Text => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(Value::String(s)),
            Value::String(_) => Err(invalid("must not be empty")),
            _ => Err(invalid("must be a string")),
        },
        ParamKind::Revision => match value {
            Value::String(s) if !s.trim().is_empty() => {
                Ok(Value::String(s.chars().take(MAX_REVISION_LEN).collect()))
            }
            Value::String(_) => Err(invalid("must not be empty")),
            _ => Err(invalid("must be a string")),
        },
        ParamKind::BuildNumber => match &value {
            Value::Number(n) if n.as_u64().is_some_and(|n| n > 0) => Ok(value),
            Value::String(s)
                if !s.is_empty()
                    && s.bytes().all(|b| b.is_ascii_digit())
                    && s.parse::<u64>().is_ok_and(|n| n > 0) =>
            {
                Ok(value)
            }
            _ => Err(invalid("must be a positive build number")),
        },
        ParamKind::BuildBound => match value.as_i64() {
            Some(n) if n >= -1 => Ok(value),
            _ => Err(invalid("must be a build number or -1")),
        },
        ParamKind::Flag => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(invalid("must be a boolean")),
        },
        ParamKind::Manifest => Ok(value),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
