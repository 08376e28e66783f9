use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    skillbox_agents::{AgentId, resolve_agent_list},
    skillbox_config::{Paths, Scope, SkillboxConfig, load_config},
    skillbox_projects::{ProjectStore, find_project_root},
    skillbox_skills::{
        IndexStore, InstallRecord, SkillStore,
        install::install_to_targets,
        targets::resolve_targets,
    },
};

use crate::output;

/// Flags shared by every command that installs or scans skills.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOptions {
    pub global: bool,
    pub agents: Option<String>,
}

/// Per-invocation context: resolved paths, settings, the effective scope
/// and agent selection. Built once per command and passed by value.
pub struct Runtime {
    pub paths: Paths,
    pub config: SkillboxConfig,
    pub project_root: PathBuf,
    pub scope: Scope,
    pub agents: Vec<AgentId>,
}

/// The outcome of fanning one skill out to the resolved targets.
pub struct RuntimeInstall {
    pub installs: Vec<InstallRecord>,
    pub scope: Scope,
    pub warnings: Vec<String>,
}

impl Runtime {
    pub fn resolve(options: &RuntimeOptions) -> anyhow::Result<Self> {
        let paths = Paths::resolve();
        let config = load_config(&paths.config_path)?;
        let cwd = std::env::current_dir()?;
        let project_root = find_project_root(&cwd);
        let scope = if options.global {
            Scope::User
        } else {
            config.default_scope
        };
        let agents = resolve_agent_list(options.agents.as_deref(), &config.default_agents);
        Ok(Self {
            paths,
            config,
            project_root,
            scope,
            agents,
        })
    }

    pub fn skill_store(&self) -> SkillStore {
        SkillStore::new(self.paths.skills_dir.clone())
    }

    pub fn index_store(&self) -> IndexStore {
        IndexStore::new(self.paths.index_path.clone())
    }

    pub fn project_store(&self) -> ProjectStore {
        ProjectStore::new(self.paths.projects_path.clone())
    }

    /// For project scope, make sure the current project root is registered
    /// and return its per-agent path overrides. User scope has neither.
    pub fn ensure_project_registered(
        &self,
    ) -> anyhow::Result<Option<BTreeMap<String, Vec<PathBuf>>>> {
        if self.scope != Scope::Project {
            return Ok(None);
        }
        let store = self.project_store();
        let mut registry = store.load()?;
        if registry.find(&self.project_root).is_none() {
            registry.upsert_root(&self.project_root);
            store.save(&registry)?;
            tracing::debug!(root = %self.project_root.display(), "registered project");
        }
        Ok(registry
            .find(&self.project_root)
            .and_then(|entry| entry.agent_paths.clone()))
    }

    /// Install one skill into every resolved target and describe the
    /// result as index install records.
    ///
    /// Records are built for every target, including skipped ones: the
    /// warning tells the user about the collision, but the install intent
    /// is still tracked.
    pub async fn install_skill(&self, name: &str) -> anyhow::Result<RuntimeInstall> {
        let overrides = self.ensure_project_registered()?;
        let targets = resolve_targets(
            &self.project_root,
            self.scope,
            &self.agents,
            overrides.as_ref(),
        );

        let source_dir = self.paths.skill_dir(name);
        let bases: Vec<PathBuf> = targets.iter().map(|t| t.base.clone()).collect();
        let results =
            install_to_targets(&source_dir, name, &bases, self.config.install_mode).await;

        let mut warnings = Vec::new();
        for (target, result) in targets.iter().zip(&results) {
            warnings.extend(output::symlink_warnings(
                target.agent.as_str(),
                std::slice::from_ref(result),
            ));
        }

        let installs = targets
            .iter()
            .map(|target| InstallRecord {
                scope: self.scope,
                agent: target.agent.as_str().to_string(),
                path: target.base.join(name),
                project_root: (self.scope == Scope::Project)
                    .then(|| self.project_root.clone()),
            })
            .collect();

        Ok(RuntimeInstall {
            installs,
            scope: self.scope,
            warnings,
        })
    }
}

/// Resolve a user-supplied project path the way the index records roots.
pub fn resolve_project_arg(path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(candidate))
            .unwrap_or_else(|_| candidate.to_path_buf())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use skillbox_skills::SkillSource;

    fn test_runtime(root: &Path, project_root: &Path) -> Runtime {
        Runtime {
            paths: Paths::under(root.to_path_buf()),
            config: SkillboxConfig::default(),
            project_root: project_root.to_path_buf(),
            scope: Scope::Project,
            agents: vec![AgentId::Claude],
        }
    }

    async fn seed_skill(runtime: &Runtime, name: &str) {
        let text = format!("---\nname: {name}\ndescription: d\n---\nbody\n");
        let parsed = skillbox_skills::parse::parse_skill_markdown(&text);
        let manifest =
            skillbox_skills::parse::build_manifest(&parsed, SkillSource::Local, None).unwrap();
        runtime.skill_store().write(name, &text, &manifest).await.unwrap();
    }

    #[tokio::test]
    async fn install_skill_records_project_scope_installs() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("proj");
        std::fs::create_dir_all(&project).unwrap();
        let runtime = test_runtime(&tmp.path().join("home"), &project);
        seed_skill(&runtime, "demo").await;

        let result = runtime.install_skill("demo").await.unwrap();
        assert_eq!(result.scope, Scope::Project);
        assert_eq!(result.installs.len(), 1);
        assert_eq!(
            result.installs[0].path,
            project.join(".claude/skills/demo")
        );
        assert_eq!(result.installs[0].project_root.as_deref(), Some(project.as_path()));
        assert!(result.warnings.is_empty());
        assert!(project.join(".claude/skills/demo/SKILL.md").exists());
    }

    #[tokio::test]
    async fn install_skill_registers_the_project() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("proj");
        std::fs::create_dir_all(&project).unwrap();
        let runtime = test_runtime(&tmp.path().join("home"), &project);
        seed_skill(&runtime, "demo").await;

        runtime.install_skill("demo").await.unwrap();
        let registry = runtime.project_store().load().unwrap();
        assert!(registry.find(&project).is_some());
    }

    #[tokio::test]
    async fn collision_produces_warning_but_still_records() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("proj");
        // Real directory where the symlink should go.
        std::fs::create_dir_all(project.join(".claude/skills/demo")).unwrap();
        let runtime = test_runtime(&tmp.path().join("home"), &project);
        seed_skill(&runtime, "demo").await;

        let result = runtime.install_skill("demo").await.unwrap();
        assert_eq!(result.installs.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("already exists"));
    }
}
