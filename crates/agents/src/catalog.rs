use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::AgentId;

/// Candidate skill base directories for one agent, per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPathMap {
    pub user: Vec<PathBuf>,
    pub project: Vec<PathBuf>,
}

/// The static agent path catalog.
///
/// Pure: builds paths from the home directory and the given project root,
/// touching nothing on disk. The `.claude/skills` entries that appear under
/// several agents are the shared-directory compatibility aliasing; callers
/// must deduplicate physical paths when fanning out across agents.
pub fn agent_paths(project_root: &Path) -> BTreeMap<AgentId, AgentPathMap> {
    let home = skillbox_config::home_dir();
    let mut map = BTreeMap::new();

    map.insert(AgentId::Opencode, AgentPathMap {
        user: vec![
            home.join(".config/opencode/skills"),
            home.join(".claude/skills"),
        ],
        project: vec![
            project_root.join(".opencode/skills"),
            project_root.join(".claude/skills"),
        ],
    });
    map.insert(AgentId::Claude, AgentPathMap {
        user: vec![home.join(".claude/skills")],
        project: vec![project_root.join(".claude/skills")],
    });
    map.insert(AgentId::Cursor, AgentPathMap {
        user: vec![home.join(".cursor/skills"), home.join(".claude/skills")],
        project: vec![
            project_root.join(".cursor/skills"),
            project_root.join(".claude/skills"),
        ],
    });
    map.insert(AgentId::Codex, AgentPathMap {
        user: vec![home.join(".codex/skills")],
        project: vec![project_root.join(".codex/skills")],
    });
    map.insert(AgentId::Amp, AgentPathMap {
        user: vec![
            home.join(".config/agents/skills"),
            home.join(".claude/skills"),
        ],
        project: vec![
            project_root.join(".agents/skills"),
            project_root.join(".claude/skills"),
        ],
    });
    map.insert(AgentId::Antigravity, AgentPathMap {
        user: vec![home.join(".gemini/antigravity/skills")],
        project: vec![project_root.join(".agent/skills")],
    });

    map
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ALL_AGENTS;

    #[test]
    fn every_agent_has_catalog_entry() {
        let catalog = agent_paths(Path::new("/proj"));
        for agent in ALL_AGENTS {
            assert!(catalog.contains_key(&agent), "missing {agent}");
        }
    }

    #[test]
    fn claude_aliases_shared_for_cursor() {
        let catalog = agent_paths(Path::new("/proj"));
        let cursor = &catalog[&AgentId::Cursor];
        assert_eq!(cursor.project, vec![
            PathBuf::from("/proj/.cursor/skills"),
            PathBuf::from("/proj/.claude/skills"),
        ]);
        let claude = &catalog[&AgentId::Claude];
        assert_eq!(claude.project, vec![PathBuf::from("/proj/.claude/skills")]);
    }

    #[test]
    fn antigravity_has_distinct_roots() {
        let catalog = agent_paths(Path::new("/proj"));
        let entry = &catalog[&AgentId::Antigravity];
        assert_eq!(entry.project, vec![PathBuf::from("/proj/.agent/skills")]);
        assert_eq!(entry.user, vec![
            skillbox_config::home_dir().join(".gemini/antigravity/skills")
        ]);
    }
}
