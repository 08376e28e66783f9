use std::path::{Path, PathBuf};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    skillbox_config::Scope,
};

/// Where a skill came from. Drives `status` and `update` behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SkillSource {
    Url {
        url: String,
    },
    Git {
        repo: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "ref")]
        git_ref: Option<String>,
    },
    Local,
    Convert {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl SkillSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url { .. } => "url",
            Self::Git { .. } => "git",
            Self::Local => "local",
            Self::Convert { .. } => "convert",
        }
    }
}

/// One materialized install of a skill into an agent directory.
///
/// The (scope, agent, projectRoot) triple is the identity within a skill's
/// install list; `path` is derived from the agent path catalog and is not
/// part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    pub scope: Scope,
    pub agent: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
}

impl InstallRecord {
    pub fn key(&self) -> (Scope, &str, Option<&Path>) {
        (self.scope, self.agent.as_str(), self.project_root.as_deref())
    }
}

/// A skill as recorded in `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedSkill {
    pub name: String,
    pub source: SkillSource,
    pub checksum: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installs: Vec<InstallRecord>,
}

/// Top-level structure persisted as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillIndex {
    pub version: u32,
    #[serde(default)]
    pub skills: Vec<IndexedSkill>,
}

impl Default for SkillIndex {
    fn default() -> Self {
        Self {
            version: 1,
            skills: Vec::new(),
        }
    }
}

impl SkillIndex {
    pub fn find(&self, name: &str) -> Option<&IndexedSkill> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut IndexedSkill> {
        self.skills.iter_mut().find(|s| s.name == name)
    }

    /// Remove a skill entirely. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s.name != name);
        self.skills.len() != before
    }

    pub fn sort_by_name(&mut self) {
        self.skills.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// Per-skill sidecar metadata, stored as `skill.json` next to SKILL.md.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub source: SkillSource,
    pub checksum: String,
    pub updated_at: DateTime<Utc>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_serializes_with_type_tag() {
        let url = SkillSource::Url {
            url: "https://example.com/SKILL.md".into(),
        };
        let json = serde_json::to_value(&url).unwrap();
        assert_eq!(json["type"], "url");
        assert_eq!(json["url"], "https://example.com/SKILL.md");

        let local = serde_json::to_value(SkillSource::Local).unwrap();
        assert_eq!(local, serde_json::json!({"type": "local"}));
    }

    #[test]
    fn git_source_uses_ref_key() {
        let git = SkillSource::Git {
            repo: "owner/repo".into(),
            path: Some("skills/foo".into()),
            git_ref: Some("master".into()),
        };
        let json = serde_json::to_value(&git).unwrap();
        assert_eq!(json["ref"], "master");

        let back: SkillSource = serde_json::from_value(json).unwrap();
        assert_eq!(back, git);
    }

    #[test]
    fn install_record_omits_absent_project_root() {
        let record = InstallRecord {
            scope: Scope::User,
            agent: "claude".into(),
            path: PathBuf::from("/h/.claude/skills/a"),
            project_root: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("projectRoot").is_none());
    }

    #[test]
    fn indexed_skill_round_trips_camel_case() {
        let raw = r#"{
            "name": "a",
            "source": {"type": "local"},
            "checksum": "abc",
            "updatedAt": "2026-01-02T03:04:05Z",
            "installs": [
                {"scope": "project", "agent": "cursor", "path": "/w/.cursor/skills/a", "projectRoot": "/w"}
            ]
        }"#;
        let skill: IndexedSkill = serde_json::from_str(raw).unwrap();
        assert_eq!(skill.installs.len(), 1);
        assert_eq!(skill.installs[0].scope, Scope::Project);
        assert_eq!(
            skill.installs[0].project_root.as_deref(),
            Some(Path::new("/w"))
        );

        let json = serde_json::to_value(&skill).unwrap();
        assert_eq!(json["updatedAt"], "2026-01-02T03:04:05Z");
        assert_eq!(json["installs"][0]["projectRoot"], "/w");
    }
}
