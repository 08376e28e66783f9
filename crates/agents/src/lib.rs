//! The fixed set of supported agent tools and their skill directories.
//!
//! Several agents deliberately alias onto `.claude/skills` as a fallback so
//! that tools sharing that convention see one physical skill directory.

pub mod catalog;
pub mod detect;

pub use catalog::{AgentPathMap, agent_paths};
pub use detect::detect_agents;

use serde::{Deserialize, Serialize};

/// Identifier for one supported agent tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Opencode,
    Claude,
    Cursor,
    Codex,
    Amp,
    Antigravity,
}

/// All supported agents, in catalog order.
pub const ALL_AGENTS: [AgentId; 6] = [
    AgentId::Opencode,
    AgentId::Claude,
    AgentId::Cursor,
    AgentId::Codex,
    AgentId::Amp,
    AgentId::Antigravity,
];

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opencode => "opencode",
            Self::Claude => "claude",
            Self::Cursor => "cursor",
            Self::Codex => "codex",
            Self::Amp => "amp",
            Self::Antigravity => "antigravity",
        }
    }

    /// Parse a known agent id; unknown strings return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        ALL_AGENTS.iter().copied().find(|a| a.as_str() == value)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated agent list, dropping blanks and unknown ids.
pub fn parse_agent_list(value: &str) -> Vec<AgentId> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(AgentId::parse)
        .collect()
}

/// Resolve the effective agent selection: explicit `--agents` override wins,
/// then configured defaults, then every known agent.
pub fn resolve_agent_list(override_csv: Option<&str>, default_agents: &[String]) -> Vec<AgentId> {
    if let Some(csv) = override_csv {
        let parsed = parse_agent_list(csv);
        if !parsed.is_empty() {
            return parsed;
        }
    }
    let defaults: Vec<AgentId> = default_agents
        .iter()
        .filter_map(|a| AgentId::parse(a))
        .collect();
    if !defaults.is_empty() {
        return defaults;
    }
    ALL_AGENTS.to_vec()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_and_unknown() {
        assert_eq!(AgentId::parse("claude"), Some(AgentId::Claude));
        assert_eq!(AgentId::parse("Claude"), None);
        assert_eq!(AgentId::parse("vim"), None);
    }

    #[test]
    fn parse_agent_list_filters_junk() {
        let agents = parse_agent_list("claude, cursor,, vim ,codex");
        assert_eq!(agents, vec![AgentId::Claude, AgentId::Cursor, AgentId::Codex]);
    }

    #[test]
    fn resolve_prefers_override_then_defaults_then_all() {
        let defaults = vec!["codex".to_string()];
        assert_eq!(
            resolve_agent_list(Some("claude"), &defaults),
            vec![AgentId::Claude]
        );
        assert_eq!(resolve_agent_list(None, &defaults), vec![AgentId::Codex]);
        assert_eq!(resolve_agent_list(None, &[]), ALL_AGENTS.to_vec());
        // An override that parses to nothing falls through to defaults.
        assert_eq!(resolve_agent_list(Some("vim"), &defaults), vec![AgentId::Codex]);
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgentId::Antigravity).unwrap(),
            "\"antigravity\""
        );
    }
}
