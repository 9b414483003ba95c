use serde::Serialize;

use campusmart_core::config::{AppConfig, LoadOptions, ResolvedConfig};

use crate::commands::{CommandResult, Failure};

#[derive(Debug, Serialize)]
struct ConfigReport {
    command: &'static str,
    status: &'static str,
    #[serde(flatten)]
    resolved: ResolvedConfig,
}

/// Prints the effective configuration and, per key, the layer that supplied it.
pub fn run() -> CommandResult {
    let resolved = match AppConfig::resolve(LoadOptions::default()) {
        Ok(resolved) => resolved,
        Err(error) => return CommandResult::failure("config", Failure::config(error)),
    };

    render(ConfigReport { command: "config", status: "ok", resolved })
}

fn render(report: ConfigReport) -> CommandResult {
    match serde_json::to_string_pretty(&report) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => {
            let message = format!("failed to render configuration: {error}");
            CommandResult::failure("config", Failure::new("serialization", 3, message))
        }
    }
}
