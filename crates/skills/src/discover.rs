use std::path::{Path, PathBuf};

use skillbox_agents::{AgentId, catalog::agent_paths};

/// A skill directory found on disk outside the canonical store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSkill {
    pub name: String,
    pub skill_dir: PathBuf,
    pub skill_file: PathBuf,
}

/// Scan base directories one level deep for `<dir>/SKILL.md`. Missing
/// bases are skipped silently.
pub fn discover_skills(paths: &[PathBuf]) -> Vec<DiscoveredSkill> {
    let mut results = Vec::new();
    for root in paths {
        let Ok(entries) = std::fs::read_dir(root) else {
            continue;
        };
        let mut found: Vec<DiscoveredSkill> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let skill_dir = entry.path();
                let skill_file = skill_dir.join("SKILL.md");
                if !skill_file.exists() {
                    return None;
                }
                Some(DiscoveredSkill {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    skill_dir,
                    skill_file,
                })
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        results.extend(found);
    }
    results
}

/// A skill present in some agent's user directory, with every directory
/// it was seen in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSkill {
    pub name: String,
    pub installs: Vec<(AgentId, PathBuf)>,
}

/// Scan every selected agent's user-scope directories for skills that are
/// on disk, whether or not the index knows about them.
pub fn discover_global_skills(project_root: &Path, agents: &[AgentId]) -> Vec<GlobalSkill> {
    let catalog = agent_paths(project_root);
    let mut skills: Vec<GlobalSkill> = Vec::new();

    for agent in agents {
        let Some(entry) = catalog.get(agent) else {
            continue;
        };
        for base in &entry.user {
            for found in discover_skills(std::slice::from_ref(base)) {
                match skills.iter_mut().find(|s| s.name == found.name) {
                    Some(existing) => {
                        if !existing.installs.iter().any(|(_, p)| *p == found.skill_dir) {
                            existing.installs.push((*agent, found.skill_dir));
                        }
                    },
                    None => skills.push(GlobalSkill {
                        name: found.name,
                        installs: vec![(*agent, found.skill_dir)],
                    }),
                }
            }
        }
    }
    skills
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn seed(base: &Path, name: &str) {
        let dir = base.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), "---\nname: x\n---\nbody\n").unwrap();
    }

    #[test]
    fn finds_only_dirs_with_skill_file() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path(), "alpha");
        std::fs::create_dir_all(tmp.path().join("not-a-skill")).unwrap();
        std::fs::write(tmp.path().join("loose.md"), "x").unwrap();

        let found = discover_skills(&[tmp.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "alpha");
        assert_eq!(found[0].skill_file, tmp.path().join("alpha/SKILL.md"));
    }

    #[test]
    fn missing_base_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let found = discover_skills(&[tmp.path().join("nope")]);
        assert!(found.is_empty());
    }

    #[test]
    fn results_are_sorted_per_base() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path(), "zeta");
        seed(tmp.path(), "alpha");
        let names: Vec<String> = discover_skills(&[tmp.path().to_path_buf()])
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
