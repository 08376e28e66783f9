use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// One registered project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub root: PathBuf,
    /// Per-agent replacement for the project-scope catalog paths. User-scope
    /// paths are never overridden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_paths: Option<BTreeMap<String, Vec<PathBuf>>>,
}

/// Top-level registry persisted as `projects.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRegistry {
    pub version: u32,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self {
            version: 1,
            projects: Vec::new(),
        }
    }
}

impl ProjectRegistry {
    pub fn find(&self, root: &Path) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.root == root)
    }

    pub fn find_mut(&mut self, root: &Path) -> Option<&mut ProjectEntry> {
        self.projects.iter_mut().find(|p| p.root == root)
    }

    /// Register a root if it is not already present.
    pub fn upsert_root(&mut self, root: &Path) -> &mut ProjectEntry {
        if let Some(idx) = self.projects.iter().position(|p| p.root == root) {
            return &mut self.projects[idx];
        }
        self.projects.push(ProjectEntry {
            root: root.to_path_buf(),
            agent_paths: None,
        });
        let last = self.projects.len() - 1;
        &mut self.projects[last]
    }

    /// Merge per-agent override lists into a project's entry, registering
    /// the root first when needed. Overrides for an agent replace any
    /// previously stored list for that agent.
    pub fn set_agent_paths(&mut self, root: &Path, overrides: BTreeMap<String, Vec<PathBuf>>) {
        let entry = self.upsert_root(root);
        if overrides.is_empty() {
            return;
        }
        let paths = entry.agent_paths.get_or_insert_with(BTreeMap::new);
        for (agent, dirs) in overrides {
            paths.insert(agent, dirs);
        }
    }
}

/// JSON-file persistence for the registry. Saves go through a temp file +
/// rename; loads tolerate a missing file and upgrade version-less content.
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<ProjectRegistry> {
        if !self.path.exists() {
            return Ok(ProjectRegistry::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let value: serde_json::Value = serde_json::from_str(&data)
            .map_err(|e| anyhow::anyhow!("invalid registry at {}: {e}", self.path.display()))?;
        upgrade(value)
    }

    pub fn save(&self, registry: &ProjectRegistry) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(registry)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Lift older on-disk shapes to the current version. Files written before
/// the version discriminant existed are treated as v1 content.
fn upgrade(mut value: serde_json::Value) -> anyhow::Result<ProjectRegistry> {
    let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    match version {
        0 => {
            tracing::debug!("upgrading version-less projects.json to v1");
            if let Some(obj) = value.as_object_mut() {
                obj.insert("version".into(), serde_json::json!(1));
            }
            Ok(serde_json::from_value(value)?)
        },
        1 => Ok(serde_json::from_value(value)?),
        other => anyhow::bail!("unsupported projects.json version {other}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(tmp.path().join("projects.json"));
        let registry = store.load().unwrap();
        assert_eq!(registry.version, 1);
        assert!(registry.projects.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(tmp.path().join("projects.json"));

        let mut registry = ProjectRegistry::default();
        registry.upsert_root(Path::new("/work/app"));
        store.save(&registry).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.projects.len(), 1);
        assert_eq!(loaded.projects[0].root, PathBuf::from("/work/app"));
    }

    #[test]
    fn upsert_root_is_idempotent() {
        let mut registry = ProjectRegistry::default();
        registry.upsert_root(Path::new("/a"));
        registry.upsert_root(Path::new("/a"));
        assert_eq!(registry.projects.len(), 1);
    }

    #[test]
    fn set_agent_paths_merges_per_agent() {
        let mut registry = ProjectRegistry::default();
        let root = Path::new("/a");

        let mut first = BTreeMap::new();
        first.insert("claude".to_string(), vec![PathBuf::from("/a/custom")]);
        registry.set_agent_paths(root, first);

        let mut second = BTreeMap::new();
        second.insert("cursor".to_string(), vec![PathBuf::from("/a/other")]);
        registry.set_agent_paths(root, second);

        let entry = registry.find(root).unwrap();
        let paths = entry.agent_paths.as_ref().unwrap();
        assert_eq!(paths["claude"], vec![PathBuf::from("/a/custom")]);
        assert_eq!(paths["cursor"], vec![PathBuf::from("/a/other")]);
    }

    #[test]
    fn versionless_file_upgrades_to_v1() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("projects.json");
        std::fs::write(&path, r#"{"projects":[{"root":"/legacy"}]}"#).unwrap();

        let registry = ProjectStore::new(path).load().unwrap();
        assert_eq!(registry.version, 1);
        assert_eq!(registry.projects[0].root, PathBuf::from("/legacy"));
    }

    #[test]
    fn future_version_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("projects.json");
        std::fs::write(&path, r#"{"version":9,"projects":[]}"#).unwrap();
        assert!(ProjectStore::new(path).load().is_err());
    }
}
