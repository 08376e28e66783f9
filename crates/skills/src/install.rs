use std::path::{Path, PathBuf};

use skillbox_config::InstallMode;

/// What happened at one install target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Symlink,
    Copy,
    Skipped,
}

/// Per-target result. `error` is populated only for `Skipped`.
#[derive(Debug, Clone)]
pub struct InstallResult {
    pub path: PathBuf,
    pub outcome: InstallOutcome,
    pub error: Option<String>,
}

/// Materialize a skill into every target base directory.
///
/// Returns exactly one result per base, in input order. Failures at one
/// target never abort the batch: a collision (target exists and is not the
/// expected symlink) or an I/O error is recorded as `Skipped` and the next
/// target proceeds.
pub async fn install_to_targets(
    source_dir: &Path,
    skill_name: &str,
    bases: &[PathBuf],
    mode: InstallMode,
) -> Vec<InstallResult> {
    let mut results = Vec::with_capacity(bases.len());
    for base in bases {
        let target = base.join(skill_name);
        match install_one(source_dir, base, &target, mode).await {
            Ok(outcome) => results.push(InstallResult {
                path: target,
                outcome,
                error: None,
            }),
            Err(e) => {
                tracing::debug!(target = %target.display(), error = %e, "install skipped");
                results.push(InstallResult {
                    path: target,
                    outcome: InstallOutcome::Skipped,
                    error: Some(e.to_string()),
                });
            },
        }
    }
    results
}

async fn install_one(
    source_dir: &Path,
    base: &Path,
    target: &Path,
    mode: InstallMode,
) -> anyhow::Result<InstallOutcome> {
    tokio::fs::create_dir_all(base).await?;
    match mode {
        InstallMode::Symlink => {
            if is_symlink_to(target, source_dir).await {
                return Ok(InstallOutcome::Symlink);
            }
            symlink_dir(source_dir, target).await?;
            Ok(InstallOutcome::Symlink)
        },
        InstallMode::Copy => {
            tokio::fs::create_dir_all(target).await?;
            copy_files_flat(source_dir, target).await?;
            Ok(InstallOutcome::Copy)
        },
    }
}

/// Copy only the top-level files of `source_dir` into `target_dir`.
/// Subdirectories are intentionally not copied; copy-mode installs carry
/// the primary document and root-level siblings only.
pub async fn copy_files_flat(source_dir: &Path, target_dir: &Path) -> anyhow::Result<()> {
    let mut entries = tokio::fs::read_dir(source_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            continue;
        }
        tokio::fs::copy(entry.path(), target_dir.join(entry.file_name())).await?;
    }
    Ok(())
}

/// Copy a skill into explicit directories (no skill-name segment appended).
/// Used by project sync to refresh recorded install paths.
pub async fn copy_to_install_paths(source_dir: &Path, paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        tokio::fs::create_dir_all(path).await?;
        copy_files_flat(source_dir, path).await?;
    }
    Ok(())
}

async fn is_symlink_to(target: &Path, expected_source: &Path) -> bool {
    let Ok(meta) = tokio::fs::symlink_metadata(target).await else {
        return false;
    };
    if !meta.is_symlink() {
        return false;
    }
    match tokio::fs::read_link(target).await {
        Ok(link) => link == expected_source,
        Err(_) => false,
    }
}

#[cfg(unix)]
async fn symlink_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(source, target).await
}

#[cfg(windows)]
async fn symlink_dir(source: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_dir(source, target).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn seed_skill(dir: &Path) {
        std::fs::create_dir_all(dir.join("references")).unwrap();
        std::fs::write(dir.join("SKILL.md"), "---\nname: a\n---\nbody\n").unwrap();
        std::fs::write(dir.join("skill.json"), "{}\n").unwrap();
        std::fs::write(dir.join("references/deep.md"), "deep\n").unwrap();
    }

    #[tokio::test]
    async fn symlink_install_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("store/a");
        let base = tmp.path().join("agent/skills");
        seed_skill(&source);

        let first =
            install_to_targets(&source, "a", &[base.clone()], InstallMode::Symlink).await;
        assert_eq!(first[0].outcome, InstallOutcome::Symlink);
        assert!(first[0].error.is_none());

        let second =
            install_to_targets(&source, "a", &[base.clone()], InstallMode::Symlink).await;
        assert_eq!(second[0].outcome, InstallOutcome::Symlink);
        assert!(second[0].error.is_none());

        assert_eq!(std::fs::read_link(base.join("a")).unwrap(), source);
    }

    #[tokio::test]
    async fn symlink_collision_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("store/a");
        seed_skill(&source);

        let colliding = tmp.path().join("one/skills");
        let clean = tmp.path().join("two/skills");
        // Pre-existing real directory at the target path.
        std::fs::create_dir_all(colliding.join("a")).unwrap();

        let results = install_to_targets(
            &source,
            "a",
            &[colliding.clone(), clean.clone()],
            InstallMode::Symlink,
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome, InstallOutcome::Skipped);
        assert!(results[0].error.is_some());
        assert_eq!(results[1].outcome, InstallOutcome::Symlink);
        assert!(clean.join("a").is_symlink());
    }

    #[tokio::test]
    async fn copy_mode_copies_top_level_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("store/a");
        let base = tmp.path().join("agent/skills");
        seed_skill(&source);

        let results =
            install_to_targets(&source, "a", &[base.clone()], InstallMode::Copy).await;
        assert_eq!(results[0].outcome, InstallOutcome::Copy);

        let installed = base.join("a");
        assert!(installed.join("SKILL.md").exists());
        assert!(installed.join("skill.json").exists());
        assert!(!installed.join("references").exists());
    }

    #[tokio::test]
    async fn copy_to_install_paths_targets_exact_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("store/a");
        seed_skill(&source);

        let dest = tmp.path().join("proj/.claude/skills/a");
        copy_to_install_paths(&source, &[dest.clone()]).await.unwrap();
        assert!(dest.join("SKILL.md").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wrong_symlink_is_a_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("store/a");
        let other = tmp.path().join("store/other");
        let base = tmp.path().join("agent/skills");
        seed_skill(&source);
        seed_skill(&other);

        std::fs::create_dir_all(&base).unwrap();
        std::os::unix::fs::symlink(&other, base.join("a")).unwrap();

        let results =
            install_to_targets(&source, "a", &[base.clone()], InstallMode::Symlink).await;
        assert_eq!(results[0].outcome, InstallOutcome::Skipped);
        // The pre-existing link is left alone.
        assert_eq!(std::fs::read_link(base.join("a")).unwrap(), other);
    }
}
