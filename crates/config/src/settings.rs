use std::path::Path;

use serde::{Deserialize, Serialize};

/// Whether an install targets the user's home directory or a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Project,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            other => anyhow::bail!("defaultScope must be 'project' or 'user', got '{other}'"),
        }
    }
}

/// How skills are materialized into agent directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    Symlink,
    Copy,
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symlink => write!(f, "symlink"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

impl std::str::FromStr for InstallMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symlink" => Ok(Self::Symlink),
            "copy" => Ok(Self::Copy),
            other => anyhow::bail!("installMode must be 'symlink' or 'copy', got '{other}'"),
        }
    }
}

fn default_install_mode() -> InstallMode {
    // Symlink creation needs elevated privileges on Windows.
    if cfg!(windows) {
        InstallMode::Copy
    } else {
        InstallMode::Symlink
    }
}

/// Persistent settings, stored as `config.json` under the data root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillboxConfig {
    pub version: u32,
    #[serde(default)]
    pub default_agents: Vec<String>,
    #[serde(default = "SkillboxConfig::default_scope")]
    pub default_scope: Scope,
    #[serde(default = "default_install_mode")]
    pub install_mode: InstallMode,
}

impl Default for SkillboxConfig {
    fn default() -> Self {
        Self {
            version: 1,
            default_agents: Vec::new(),
            default_scope: Scope::User,
            install_mode: default_install_mode(),
        }
    }
}

impl SkillboxConfig {
    fn default_scope() -> Scope {
        Scope::User
    }
}

/// Load settings from `path`, returning defaults when the file is missing.
pub fn load_config(path: &Path) -> anyhow::Result<SkillboxConfig> {
    if !path.exists() {
        return Ok(SkillboxConfig::default());
    }
    let data = std::fs::read_to_string(path)?;
    let config: SkillboxConfig = serde_json::from_str(&data)
        .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Save settings, creating the data root as needed.
pub fn save_config(path: &Path, config: &SkillboxConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data)?;
    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(&tmp.path().join("config.json")).unwrap();
        assert_eq!(config.version, 1);
        assert!(config.default_agents.is_empty());
        assert_eq!(config.default_scope, Scope::User);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let config = SkillboxConfig {
            version: 1,
            default_agents: vec!["claude".into(), "cursor".into()],
            default_scope: Scope::Project,
            install_mode: InstallMode::Copy,
        };
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.default_agents, vec!["claude", "cursor"]);
        assert_eq!(loaded.default_scope, Scope::Project);
        assert_eq!(loaded.install_mode, InstallMode::Copy);
    }

    #[test]
    fn camel_case_field_names_on_disk() {
        let config = SkillboxConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("defaultAgents"));
        assert!(json.contains("defaultScope"));
        assert!(json.contains("installMode"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"version":1}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.default_agents.is_empty());
        assert_eq!(config.default_scope, Scope::User);
    }
}
