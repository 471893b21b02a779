use std::fmt;

use url::Url;

use crate::error::{RabitError, Result};

/// AutoRABIT API token. Opaque; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Instance URL and token for one AutoRABIT instance.
///
/// Immutable once built. A client is constructed per credential set, so several
/// instances can be used side by side without any shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    instance_url: Url,
    api_token: Token,
}

impl Credentials {
    /// Validates and stores the instance URL and token.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is not an absolute `http`/`https`
    /// URL, or the token is empty or cannot be sent as a header value.
    pub fn new(instance_url: &str, api_token: impl Into<Token>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.as_str().trim().is_empty() {
            return Err(RabitError::validation("api_token", "must not be empty"));
        }
        if reqwest::header::HeaderValue::from_str(api_token.as_str()).is_err() {
            return Err(RabitError::validation(
                "api_token",
                "contains characters not allowed in a header",
            ));
        }

        let trimmed = instance_url.trim().trim_end_matches('/');
        let instance_url = Url::parse(trimmed)
            .map_err(|e| RabitError::validation("instance_url", format!("invalid URL: {e}")))?;

        if !matches!(instance_url.scheme(), "http" | "https") {
            return Err(RabitError::validation(
                "instance_url",
                format!("unsupported scheme `{}`", instance_url.scheme()),
            ));
        }
        if instance_url.cannot_be_a_base() || instance_url.host_str().is_none() {
            return Err(RabitError::validation("instance_url", "must include a host"));
        }

        Ok(Self {
            instance_url,
            api_token,
        })
    }

    pub fn instance_url(&self) -> &Url {
        &self.instance_url
    }

    pub fn token(&self) -> &Token {
        &self.api_token
    }
}
