use crate::output::{JsonResult, print_info, print_json};

const AGENT_SNIPPET: &str = "\
skillbox: manage reusable skills for coding agents.

Inspect what is installed:
  skillbox list --json
  skillbox status --json

Keep skills fresh:
  skillbox update --json
  skillbox update <name> --json

Add new skills:
  skillbox add <url> [--name <name>]
  skillbox add <owner>/<repo> [--skill <name>] [--list]

When a URL is not a skill, convert it:
  skillbox convert <url> --agent
  skillbox add --ingest <json-file>

All commands accept --json for machine-readable output.";

pub fn handle_agent(json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&JsonResult {
            ok: true,
            command: "agent",
            data: Some(serde_json::json!({ "snippet": AGENT_SNIPPET })),
            error: None,
        });
        return Ok(());
    }
    print_info(AGENT_SNIPPET);
    Ok(())
}
