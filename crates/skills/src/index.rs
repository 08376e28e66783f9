use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    anyhow::{anyhow, bail},
    chrono::{DateTime, Utc},
};

use crate::types::{IndexedSkill, InstallRecord, SkillIndex, SkillSource};

/// A partial update for one skill. `None` scalar fields leave the existing
/// value untouched; installs are merged by their (scope, agent, projectRoot)
/// key rather than replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct SkillPatch {
    pub source: Option<SkillSource>,
    pub checksum: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub namespace: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub installs: Vec<InstallRecord>,
}

impl SkillIndex {
    /// Insert or merge a skill record.
    ///
    /// Installing skill X for agent A must never erase a previously
    /// recorded install of X for agent B: existing installs survive unless
    /// a patch install shares their exact key, in which case the patch
    /// entry replaces it (picking up a possibly-changed path).
    pub fn upsert(&mut self, name: &str, patch: SkillPatch) {
        let Some(existing) = self.find_mut(name) else {
            self.skills.push(IndexedSkill {
                name: name.to_string(),
                source: patch.source.unwrap_or(SkillSource::Local),
                checksum: patch.checksum.unwrap_or_default(),
                updated_at: patch.updated_at.unwrap_or_else(Utc::now),
                last_checked: patch.last_checked,
                last_sync: patch.last_sync,
                namespace: patch.namespace,
                categories: patch.categories,
                tags: patch.tags,
                installs: dedup_installs(patch.installs),
            });
            return;
        };

        if let Some(source) = patch.source {
            existing.source = source;
        }
        if let Some(checksum) = patch.checksum {
            existing.checksum = checksum;
        }
        if let Some(updated_at) = patch.updated_at {
            existing.updated_at = updated_at;
        }
        if let Some(last_checked) = patch.last_checked {
            existing.last_checked = Some(last_checked);
        }
        if let Some(last_sync) = patch.last_sync {
            existing.last_sync = Some(last_sync);
        }
        if let Some(namespace) = patch.namespace {
            existing.namespace = Some(namespace);
        }
        if let Some(categories) = patch.categories {
            existing.categories = Some(categories);
        }
        if let Some(tags) = patch.tags {
            existing.tags = Some(tags);
        }

        for install in patch.installs {
            match existing.installs.iter_mut().find(|i| i.key() == install.key()) {
                Some(slot) => *slot = install,
                None => existing.installs.push(install),
            }
        }
    }

    /// Drop a skill's installs matching a scope and optional project root.
    /// Returns the records that were removed.
    pub fn remove_installs(
        &mut self,
        name: &str,
        scope: skillbox_config::Scope,
        project_root: Option<&Path>,
    ) -> Vec<InstallRecord> {
        let Some(skill) = self.find_mut(name) else {
            return Vec::new();
        };
        let (removed, kept) = skill.installs.drain(..).partition(|install| {
            install.scope == scope
                && (project_root.is_none() || install.project_root.as_deref() == project_root)
        });
        skill.installs = kept;
        removed
    }

    /// Map project root -> skill names with a project-scope install there.
    pub fn project_skills(&self) -> BTreeMap<PathBuf, Vec<String>> {
        let mut map: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for skill in &self.skills {
            for install in &skill.installs {
                let Some(root) = project_install_root(install) else {
                    continue;
                };
                let names = map.entry(root.to_path_buf()).or_default();
                if !names.contains(&skill.name) {
                    names.push(skill.name.clone());
                }
            }
        }
        for names in map.values_mut() {
            names.sort();
        }
        map
    }

    /// Map skill name -> recorded install paths within one project.
    pub fn project_install_paths(&self, project_root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
        let mut map = BTreeMap::new();
        for skill in &self.skills {
            let paths: Vec<PathBuf> = skill
                .installs
                .iter()
                .filter(|i| project_install_root(i) == Some(project_root))
                .map(|i| i.path.clone())
                .collect();
            if !paths.is_empty() {
                map.insert(skill.name.clone(), paths);
            }
        }
        map
    }
}

fn project_install_root(install: &InstallRecord) -> Option<&Path> {
    if install.scope == skillbox_config::Scope::Project {
        install.project_root.as_deref()
    } else {
        None
    }
}

fn dedup_installs(installs: Vec<InstallRecord>) -> Vec<InstallRecord> {
    let mut out: Vec<InstallRecord> = Vec::with_capacity(installs.len());
    for install in installs {
        match out.iter_mut().find(|i| i.key() == install.key()) {
            Some(slot) => *slot = install,
            None => out.push(install),
        }
    }
    out
}

/// JSON-file persistence for the index. Loads tolerate a missing file and
/// version-less content; saves are name-sorted and go through a temp file
/// + rename. Concurrent invocations are not coordinated: last writer wins.
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<SkillIndex> {
        if !self.path.exists() {
            return Ok(SkillIndex::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let value: serde_json::Value = serde_json::from_str(&data)
            .map_err(|e| anyhow!("invalid index at {}: {e}", self.path.display()))?;
        upgrade(value)
    }

    pub fn save(&self, index: &SkillIndex) -> anyhow::Result<()> {
        let mut index = index.clone();
        index.sort_by_name();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut data = serde_json::to_string_pretty(&index)?;
        data.push('\n');
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), skills = index.skills.len(), "saved index");
        Ok(())
    }
}

/// Lift older on-disk shapes to the current version. Files written before
/// the version discriminant existed are treated as v1 content.
fn upgrade(mut value: serde_json::Value) -> anyhow::Result<SkillIndex> {
    let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    match version {
        0 => {
            tracing::debug!("upgrading version-less index.json to v1");
            if let Some(obj) = value.as_object_mut() {
                obj.insert("version".into(), serde_json::json!(1));
            }
            Ok(serde_json::from_value(value)?)
        },
        1 => Ok(serde_json::from_value(value)?),
        other => bail!("unsupported index.json version {other}"),
    }
}
