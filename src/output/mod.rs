mod progress;
mod styling;
mod tables;

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use rabit_cijobs::status;
use rabit_cijobs::JsonObject;

use crate::config::OutputFormat;

pub use progress::WaitProgress;
use styling::{faint, title};

/// Prints the `rabit` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("🐇 rabit"),
        faint(env!("CARGO_PKG_VERSION")),
        faint("AutoRABIT CI jobs client")
    );
}

/// Renders a response body in the requested format.
///
/// Tables are only meaningful for history listings; other bodies fall back to
/// JSON.
pub fn render(body: &JsonObject, format: OutputFormat, pretty: bool) -> Result<String> {
    if format == OutputFormat::Table {
        if let Some(entries) = status::history_entries(body) {
            return Ok(tables::render_history(&entries));
        }
    }

    let rendered = if pretty {
        serde_json::to_string_pretty(body)?
    } else {
        serde_json::to_string(body)?
    };
    Ok(rendered)
}

/// Writes to `output` when given, stdout otherwise.
pub fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    if let Some(output_path) = output {
        std::fs::write(output_path, rendered)
            .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
        info!("Response written to: {}", output_path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}
