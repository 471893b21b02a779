use std::fmt::Display;

use console::{style, StyledObject};
use rabit_cijobs::status::JobStatus;

/// Colour for a build that is still running.
pub fn running(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).yellow().bright()
}

/// Colour for a build that finished in `Completed` or `Success`.
pub fn succeeded(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).green().bright()
}

pub fn failed(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).red().bright()
}

pub fn faint(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// `label: status` coloured by where the build stands. A missing status
/// counts as a failure.
pub fn status_line(label: &str, status: Option<&JobStatus>) -> String {
    match status {
        Some(status) if status.is_running() => running(format!("{label}: {status}")).to_string(),
        Some(status) if status.is_ok() => succeeded(format!("{label}: {status} ✓")).to_string(),
        Some(status) => failed(format!("{label}: {status} ✗")).to_string(),
        None => failed(format!("{label}: no status reported")).to_string(),
    }
}
