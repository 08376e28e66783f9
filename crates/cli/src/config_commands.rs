use {
    anyhow::bail,
    skillbox_agents::AgentId,
    skillbox_config::{InstallMode, Paths, Scope, load_config, save_config},
};

use crate::output::{self, JsonResult, print_info, print_json};

#[derive(Debug, clap::Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration.
    Get {
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Update configuration fields.
    Set {
        /// Replace the default agent list (repeatable).
        #[arg(long = "default-agent")]
        default_agents: Vec<String>,
        /// Append to the default agent list (repeatable).
        #[arg(long = "add-agent")]
        add_agents: Vec<String>,
        /// Default install scope ('user' or 'project').
        #[arg(long)]
        default_scope: Option<String>,
        /// Install mode ('symlink' or 'copy').
        #[arg(long)]
        install_mode: Option<String>,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    let json = match &action {
        ConfigAction::Get { json } | ConfigAction::Set { json, .. } => *json,
    };
    if let Err(e) = run_config(action) {
        output::handle_command_error(json, "config", &e);
    }
    Ok(())
}

fn run_config(action: ConfigAction) -> anyhow::Result<()> {
    let paths = Paths::resolve();
    match action {
        ConfigAction::Get { json } => {
            let config = load_config(&paths.config_path)?;
            if json {
                print_json(&JsonResult {
                    ok: true,
                    command: "config",
                    data: Some(serde_json::to_value(&config)?),
                    error: None,
                });
                return Ok(());
            }
            print_info(&serde_json::to_string_pretty(&config)?);
            Ok(())
        },
        ConfigAction::Set {
            default_agents,
            add_agents,
            default_scope,
            install_mode,
            json,
        } => {
            let mut config = load_config(&paths.config_path)?;

            if !default_agents.is_empty() {
                config.default_agents = validate_agents(&default_agents)?;
            }
            for agent in validate_agents(&add_agents)? {
                if !config.default_agents.contains(&agent) {
                    config.default_agents.push(agent);
                }
            }
            if let Some(scope) = default_scope {
                config.default_scope = scope.parse::<Scope>()?;
            }
            if let Some(mode) = install_mode {
                config.install_mode = mode.parse::<InstallMode>()?;
            }

            save_config(&paths.config_path, &config)?;

            if json {
                print_json(&JsonResult {
                    ok: true,
                    command: "config",
                    data: Some(serde_json::to_value(&config)?),
                    error: None,
                });
                return Ok(());
            }
            print_info("Config updated.");
            Ok(())
        },
    }
}

fn validate_agents(names: &[String]) -> anyhow::Result<Vec<String>> {
    let mut validated = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if AgentId::parse(trimmed).is_none() {
            bail!("unknown agent: {trimmed}");
        }
        if !validated.iter().any(|v| v == trimmed) {
            validated.push(trimmed.to_string());
        }
    }
    Ok(validated)
}
