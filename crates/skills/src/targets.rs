use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    skillbox_agents::{AgentId, catalog::agent_paths},
    skillbox_config::Scope,
};

/// One install destination: the base directory an agent reads skills from.
/// The skill name is appended by the install engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub agent: AgentId,
    pub base: PathBuf,
}

/// Compute the install targets for a (scope, agent list, project) triple.
///
/// Project-scope path lists can be replaced per agent by registry
/// overrides; user-scope lists never are. Identical physical directories
/// shared between agents (the `.claude/skills` aliasing) are emitted once,
/// in first-seen order, so no path receives two install attempts.
pub fn resolve_targets(
    project_root: &Path,
    scope: Scope,
    agents: &[AgentId],
    overrides: Option<&BTreeMap<String, Vec<PathBuf>>>,
) -> Vec<ResolvedTarget> {
    let catalog = agent_paths(project_root);
    let mut seen: Vec<PathBuf> = Vec::new();
    let mut targets = Vec::new();

    for agent in agents {
        let Some(entry) = catalog.get(agent) else {
            continue;
        };
        let bases: Vec<PathBuf> = match scope {
            Scope::User => entry.user.clone(),
            Scope::Project => overrides
                .and_then(|map| map.get(agent.as_str()))
                .cloned()
                .unwrap_or_else(|| entry.project.clone()),
        };
        for base in bases {
            if seen.contains(&base) {
                continue;
            }
            seen.push(base.clone());
            targets.push(ResolvedTarget { agent: *agent, base });
        }
    }

    targets
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_claude_dir_appears_once() {
        let targets = resolve_targets(
            Path::new("/w"),
            Scope::Project,
            &[AgentId::Claude, AgentId::Cursor],
            None,
        );
        let bases: Vec<&Path> = targets.iter().map(|t| t.base.as_path()).collect();
        assert_eq!(bases, vec![
            Path::new("/w/.claude/skills"),
            Path::new("/w/.cursor/skills"),
        ]);
    }

    #[test]
    fn first_seen_agent_claims_the_shared_path() {
        let targets = resolve_targets(
            Path::new("/w"),
            Scope::Project,
            &[AgentId::Cursor, AgentId::Claude],
            None,
        );
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].agent, AgentId::Cursor);
        assert_eq!(targets[0].base, PathBuf::from("/w/.cursor/skills"));
        assert_eq!(targets[1].agent, AgentId::Cursor);
        assert_eq!(targets[1].base, PathBuf::from("/w/.claude/skills"));
    }

    #[test]
    fn overrides_replace_project_paths_for_that_agent() {
        let mut overrides = BTreeMap::new();
        overrides.insert("claude".to_string(), vec![PathBuf::from("/w/custom/skills")]);

        let targets = resolve_targets(
            Path::new("/w"),
            Scope::Project,
            &[AgentId::Claude, AgentId::Codex],
            Some(&overrides),
        );
        let bases: Vec<&Path> = targets.iter().map(|t| t.base.as_path()).collect();
        assert_eq!(bases, vec![
            Path::new("/w/custom/skills"),
            Path::new("/w/.codex/skills"),
        ]);
    }

    #[test]
    fn user_scope_ignores_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("claude".to_string(), vec![PathBuf::from("/w/custom")]);

        let targets = resolve_targets(
            Path::new("/w"),
            Scope::User,
            &[AgentId::Claude],
            Some(&overrides),
        );
        assert_eq!(targets, vec![ResolvedTarget {
            agent: AgentId::Claude,
            base: skillbox_config::home_dir().join(".claude/skills"),
        }]);
    }

    #[test]
    fn caller_order_is_preserved() {
        let targets = resolve_targets(
            Path::new("/w"),
            Scope::Project,
            &[AgentId::Codex, AgentId::Antigravity],
            None,
        );
        let agents: Vec<AgentId> = targets.iter().map(|t| t.agent).collect();
        assert_eq!(agents, vec![AgentId::Codex, AgentId::Antigravity]);
    }
}
