use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    sha2::{Digest, Sha256},
};

use crate::{
    parse::{self, build_manifest},
    types::{SkillManifest, SkillSource},
};

/// SHA-256 hex digest of raw document text. Used for change detection only.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The canonical skill store: one directory per skill under the data root,
/// holding `SKILL.md` plus a `skill.json` sidecar.
pub struct SkillStore {
    skills_dir: PathBuf,
}

impl SkillStore {
    pub fn new(skills_dir: PathBuf) -> Self {
        Self { skills_dir }
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    pub fn skill_dir(&self, name: &str) -> PathBuf {
        self.skills_dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.skill_dir(name).join("SKILL.md").exists()
    }

    /// Write a skill's document and sidecar, creating the directory as
    /// needed. Not transactional: a crash mid-write can leave a partial
    /// sidecar behind.
    pub async fn write(
        &self,
        name: &str,
        markdown: &str,
        manifest: &SkillManifest,
    ) -> anyhow::Result<()> {
        let dir = self.skill_dir(name);
        tokio::fs::create_dir_all(&dir).await?;
        let mut document = markdown.to_string();
        if !document.ends_with('\n') {
            document.push('\n');
        }
        tokio::fs::write(dir.join("SKILL.md"), document).await?;
        self.write_manifest(name, manifest).await?;
        tracing::debug!(skill = name, dir = %dir.display(), "wrote skill to store");
        Ok(())
    }

    pub async fn read_manifest(&self, name: &str) -> anyhow::Result<SkillManifest> {
        let path = self.skill_dir(name).join("skill.json");
        let data = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("no metadata for skill '{name}'"))?;
        Ok(serde_json::from_str(&data)
            .with_context(|| format!("invalid skill.json at {}", path.display()))?)
    }

    pub async fn write_manifest(&self, name: &str, manifest: &SkillManifest) -> anyhow::Result<()> {
        let dir = self.skill_dir(name);
        tokio::fs::create_dir_all(&dir).await?;
        let mut data = serde_json::to_string_pretty(manifest)?;
        data.push('\n');
        tokio::fs::write(dir.join("skill.json"), data).await?;
        Ok(())
    }

    /// Delete the skill's canonical directory. Missing directories are fine.
    pub async fn remove(&self, name: &str) -> anyhow::Result<()> {
        let dir = self.skill_dir(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ingest a SKILL.md found on disk (project discovery, `import`).
    /// Returns `None` when the document lacks a description; such files
    /// are skipped rather than half-imported.
    pub async fn import_from_file(
        &self,
        skill_file: &Path,
        fallback_name: &str,
    ) -> anyhow::Result<Option<SkillManifest>> {
        let markdown = tokio::fs::read_to_string(skill_file)
            .await
            .with_context(|| format!("cannot read {}", skill_file.display()))?;
        let parsed = parse::parse_skill_markdown(&markdown);
        if parsed.description.is_none() {
            tracing::debug!(file = %skill_file.display(), "skipping import, no description");
            return Ok(None);
        }
        let override_name = parsed.name.is_none().then_some(fallback_name);
        let manifest = build_manifest(&parsed, SkillSource::Local, override_name)?;
        self.write(&manifest.name, &markdown, &manifest).await?;
        Ok(Some(manifest))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manifest(name: &str, text: &str) -> SkillManifest {
        SkillManifest {
            name: name.into(),
            version: "0.1.0".into(),
            description: Some("test".into()),
            entry: "SKILL.md".into(),
            namespace: None,
            categories: None,
            tags: None,
            source: SkillSource::Local,
            checksum: checksum(text),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn checksum_is_stable_hex() {
        let a = checksum("hello");
        assert_eq!(a.len(), 64);
        assert_eq!(a, checksum("hello"));
        assert_ne!(a, checksum("hello "));
    }

    #[tokio::test]
    async fn write_read_remove_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SkillStore::new(tmp.path().join("skills"));
        let text = "---\nname: a\ndescription: d\n---\nbody\n";

        store.write("a", text, &manifest("a", text)).await.unwrap();
        assert!(store.exists("a"));

        let loaded = store.read_manifest("a").await.unwrap();
        assert_eq!(loaded.name, "a");
        assert_eq!(loaded.checksum, checksum(text));

        store.remove("a").await.unwrap();
        assert!(!store.exists("a"));
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn write_appends_missing_trailing_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SkillStore::new(tmp.path().to_path_buf());
        store.write("a", "body", &manifest("a", "body")).await.unwrap();
        let on_disk = std::fs::read_to_string(store.skill_dir("a").join("SKILL.md")).unwrap();
        assert_eq!(on_disk, "body\n");
    }

    #[tokio::test]
    async fn import_skips_documents_without_description() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SkillStore::new(tmp.path().join("skills"));
        let file = tmp.path().join("SKILL.md");

        std::fs::write(&file, "# bare\n").unwrap();
        assert!(store.import_from_file(&file, "bare").await.unwrap().is_none());

        std::fs::write(&file, "---\nname: real\ndescription: d\n---\nbody\n").unwrap();
        let manifest = store.import_from_file(&file, "real").await.unwrap().unwrap();
        assert_eq!(manifest.name, "real");
        assert!(store.exists("real"));
    }
}
