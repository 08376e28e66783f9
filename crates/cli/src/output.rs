use serde::Serialize;

use skillbox_skills::install::{InstallOutcome, InstallResult};

pub const RED: &str = "\x1b[31m";
pub const RESET: &str = "\x1b[0m";

/// Envelope for `--json` output. Every command emits exactly one of these.
#[derive(Debug, Serialize)]
pub struct JsonResult {
    pub ok: bool,
    pub command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

#[derive(Debug, Serialize)]
pub struct JsonError {
    pub message: String,
}

pub fn print_json(result: &JsonResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{RED}failed to encode JSON output: {e}{RESET}"),
    }
}

pub fn print_info(message: &str) {
    println!("{message}");
}

pub fn print_error(message: &str) {
    eprintln!("{RED}{message}{RESET}");
}

/// Report a command failure in whichever format the invocation asked for.
pub fn handle_command_error(json: bool, command: &'static str, error: &anyhow::Error) {
    if json {
        print_json(&JsonResult {
            ok: false,
            command,
            data: None,
            error: Some(JsonError {
                message: error.to_string(),
            }),
        });
        return;
    }
    print_error(&error.to_string());
}

/// Human-readable warnings for skipped symlink targets. Collisions with an
/// existing file or directory get the actionable hint; everything else
/// surfaces the raw error.
pub fn symlink_warnings(agent: &str, results: &[InstallResult]) -> Vec<String> {
    results
        .iter()
        .filter(|result| result.outcome == InstallOutcome::Skipped)
        .map(|result| {
            let skill = result
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let error = result.error.as_deref().unwrap_or("unknown error");
            if error.to_lowercase().contains("exists") {
                format!(
                    "  ⚠ {skill} ({agent}): already exists at target, remove manually or use --install-mode copy"
                )
            } else {
                format!("  ⚠ {skill} ({agent}): {error}")
            }
        })
        .collect()
}
