//! Skillbox paths and the `config.json` settings file.
//!
//! All persistent state lives under a single data root, `~/.skillbox` by
//! default (`SKILLBOX_HOME` overrides it). Settings are loaded once per
//! invocation and passed by value to whatever needs them; there is no
//! process-global config state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod settings;

pub use settings::{InstallMode, Scope, SkillboxConfig, load_config, save_config};

/// The skillbox data root: `$SKILLBOX_HOME`, or `~/.skillbox`.
pub fn data_root() -> PathBuf {
    if let Some(home) = std::env::var_os("SKILLBOX_HOME") {
        return PathBuf::from(home);
    }
    home_dir().join(".skillbox")
}

/// The user's home directory, falling back to `.` when it cannot be
/// determined (containers with no passwd entry).
pub fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Paths resolved once at startup and threaded through commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub root: PathBuf,
    pub skills_dir: PathBuf,
    pub index_path: PathBuf,
    pub projects_path: PathBuf,
    pub config_path: PathBuf,
    pub tmp_dir: PathBuf,
}

impl Paths {
    /// Resolve the standard layout under the default data root.
    pub fn resolve() -> Self {
        Self::under(data_root())
    }

    /// Resolve the standard layout under an explicit root (tests).
    pub fn under(root: PathBuf) -> Self {
        Self {
            skills_dir: root.join("skills"),
            index_path: root.join("index.json"),
            projects_path: root.join("projects.json"),
            config_path: root.join("config.json"),
            tmp_dir: root.join("tmp"),
            root,
        }
    }

    /// Canonical directory for one skill: `<skills dir>/<name>`.
    pub fn skill_dir(&self, name: &str) -> PathBuf {
        self.skills_dir.join(name)
    }
}
