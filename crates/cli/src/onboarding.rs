use std::io::{BufRead, IsTerminal, Write};

use {
    skillbox_agents::{ALL_AGENTS, detect_agents, parse_agent_list},
    skillbox_config::{Paths, load_config, save_config},
};

/// First-run prompt: when no default agents are configured and we are on a
/// terminal, ask which agents to target and persist the answer. Silent in
/// pipes and scripts.
pub fn run_onboarding() -> anyhow::Result<()> {
    let paths = Paths::resolve();
    let mut config = load_config(&paths.config_path)?;
    if !config.default_agents.is_empty() {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }

    let options = ALL_AGENTS
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    print!("Which agents do you use? (comma-separated) [{options}]: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;

    // Empty answer: prefer the agents whose directories exist on this
    // machine, fall back to all of them.
    let mut agents = parse_agent_list(&answer);
    if agents.is_empty() {
        agents = detect_agents();
    }
    if agents.is_empty() {
        agents = ALL_AGENTS.to_vec();
    }
    config.default_agents = agents.iter().map(|a| a.as_str().to_string()).collect();
    save_config(&paths.config_path, &config)?;
    tracing::debug!(agents = ?config.default_agents, "onboarding saved default agents");
    Ok(())
}
