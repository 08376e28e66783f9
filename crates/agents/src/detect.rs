use std::path::PathBuf;

use crate::{ALL_AGENTS, AgentId};

/// Root directories whose presence indicates an agent tool is in use.
fn agent_roots(agent: AgentId) -> Vec<PathBuf> {
    let home = skillbox_config::home_dir();
    match agent {
        AgentId::Opencode => vec![home.join(".config/opencode")],
        AgentId::Claude => vec![home.join(".claude")],
        AgentId::Cursor => vec![home.join(".cursor")],
        AgentId::Codex => vec![home.join(".codex")],
        AgentId::Amp => vec![home.join(".config/agents")],
        AgentId::Antigravity => vec![home.join(".gemini/antigravity")],
    }
}

/// Probe the home directory for installed agent tools.
pub fn detect_agents() -> Vec<AgentId> {
    ALL_AGENTS
        .into_iter()
        .filter(|agent| agent_roots(*agent).iter().any(|root| root.exists()))
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_cover_all_agents() {
        for agent in ALL_AGENTS {
            assert!(!agent_roots(agent).is_empty());
        }
    }
}
