use {anyhow::bail, serde::Deserialize};

use crate::{fetch::fetch_json, fetch::fetch_text, store::SkillStore, types::SkillSource};

/// A parsed GitHub repository reference, optionally scoped to a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    pub path: Option<String>,
}

/// A skill directory found inside a repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSkill {
    pub name: String,
    /// Path of the skill directory relative to the search base ("" for a
    /// repo-root skill).
    pub path: String,
    pub skill_file: String,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

/// Directory prefixes that mark skill collections in arbitrary repos.
const SKILL_ROOTS: [&str; 9] = [
    "skills",
    "skill",
    ".skills",
    ".skill",
    "agents/skills",
    ".claude/skills",
    ".codex/skills",
    ".cursor/skills",
    ".opencode/skills",
];

/// Parse `owner/repo` shorthand, a repository URL, or a `/tree/<ref>/<path>`
/// URL. Returns `None` for anything else.
pub fn parse_repo_ref(input: &str) -> Option<RepoRef> {
    let input = input.trim().trim_end_matches('/');

    if input.contains("github.com") && input.contains("/tree/") {
        let rest = strip_github_prefix(input)?;
        let mut parts = rest.splitn(5, '/');
        let owner = parts.next()?;
        let repo = parts.next()?;
        if parts.next()? != "tree" {
            return None;
        }
        let git_ref = parts.next()?;
        let path = parts.next()?;
        if owner.is_empty() || repo.is_empty() || git_ref.is_empty() || path.is_empty() {
            return None;
        }
        return Some(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
            path: Some(path.to_string()),
        });
    }

    if !input.contains("github.com") && input.contains('/') {
        let mut parts = input.split('/');
        let (owner, repo) = (parts.next()?, parts.next()?);
        if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
            return None;
        }
        return Some(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: "main".to_string(),
            path: None,
        });
    }

    if input.contains("github.com") {
        let rest = strip_github_prefix(input)?;
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let mut parts = rest.split('/');
        let (owner, repo) = (parts.next()?, parts.next()?);
        if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
            return None;
        }
        return Some(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: "main".to_string(),
            path: None,
        });
    }

    None
}

fn strip_github_prefix(input: &str) -> Option<&str> {
    if !input.starts_with("http://") && !input.starts_with("https://") {
        return None;
    }
    let idx = input.find("github.com/")?;
    Some(&input[idx + "github.com/".len()..])
}

pub fn raw_url(repo: &RepoRef, file_path: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{file_path}",
        repo.owner, repo.repo, repo.git_ref
    )
}

fn tree_url(repo: &RepoRef) -> String {
    format!(
        "https://api.github.com/repos/{}/{}/git/trees/{}?recursive=1",
        repo.owner, repo.repo, repo.git_ref
    )
}

/// The index `source` entry for a skill pulled from this repository.
pub fn git_source(repo: &RepoRef, skill_path: &str) -> SkillSource {
    SkillSource::Git {
        repo: format!("{}/{}", repo.owner, repo.repo),
        path: (!skill_path.is_empty()).then(|| skill_path.to_string()),
        git_ref: Some(repo.git_ref.clone()),
    }
}

async fn fetch_tree(repo: &RepoRef) -> anyhow::Result<TreeResponse> {
    fetch_json(&tree_url(repo)).await
}

/// Resolve a ref against the live repository, falling back from the default
/// `main` to `master` for older repos.
pub async fn normalize_repo_ref(repo: RepoRef) -> anyhow::Result<RepoRef> {
    if fetch_tree(&repo).await.is_ok() {
        return Ok(repo);
    }
    if repo.git_ref == "main" {
        let fallback = RepoRef {
            git_ref: "master".to_string(),
            ..repo
        };
        if fetch_tree(&fallback).await.is_ok() {
            tracing::debug!(repo = %fallback.repo, "fell back to master ref");
            return Ok(fallback);
        }
    }
    bail!("unable to resolve repository ref")
}

fn normalize_skill_path(file_path: &str, base_path: Option<&str>) -> Option<RepoSkill> {
    if !file_path.ends_with("/SKILL.md") && file_path != "SKILL.md" {
        return None;
    }
    let normalized = match base_path {
        Some(base) => file_path
            .strip_prefix(&format!("{base}/"))
            .unwrap_or(file_path),
        None => file_path,
    };
    let segments: Vec<&str> = normalized.split('/').collect();
    if segments.len() == 1 {
        let name = base_path
            .and_then(|base| base.split('/').filter(|s| !s.is_empty()).next_back())
            .unwrap_or("root");
        return Some(RepoSkill {
            name: name.to_string(),
            path: String::new(),
            skill_file: normalized.to_string(),
        });
    }
    Some(RepoSkill {
        name: segments[segments.len() - 2].to_string(),
        path: segments[..segments.len() - 1].join("/"),
        skill_file: normalized.to_string(),
    })
}

/// Pick skill directories out of a repository tree. Without a base path,
/// only repo-root skills and well-known skill roots qualify, unless
/// `include_all` lifts the restriction (repos literally named "skills").
fn filter_skills(entries: &[TreeEntry], base_path: Option<&str>, include_all: bool) -> Vec<RepoSkill> {
    let mut skills = Vec::new();
    for entry in entries {
        if entry.kind != "blob" {
            continue;
        }
        if let Some(base) = base_path
            && !entry.path.starts_with(&format!("{base}/"))
            && entry.path != format!("{base}/SKILL.md")
        {
            continue;
        }
        if let Some(skill) = normalize_skill_path(&entry.path, base_path) {
            skills.push(skill);
        }
    }

    if base_path.is_some() || include_all {
        return skills;
    }
    skills
        .into_iter()
        .filter(|skill| {
            skill.skill_file == "SKILL.md"
                || SKILL_ROOTS.iter().any(|root| skill.path.starts_with(root))
        })
        .collect()
}

/// Enumerate every skill in a repository (or its `/tree/...` subtree).
pub async fn list_repo_skills(input: &str) -> anyhow::Result<(RepoRef, Vec<RepoSkill>)> {
    let Some(parsed) = parse_repo_ref(input) else {
        bail!("unsupported repo URL or shorthand: {input}");
    };
    let repo = normalize_repo_ref(parsed).await?;

    let tree = fetch_tree(&repo).await?;
    let include_all = repo.repo.eq_ignore_ascii_case("skills") && repo.path.is_none();
    let skills = filter_skills(&tree.tree, repo.path.as_deref(), include_all);
    if skills.is_empty() {
        bail!("no skills found in repository");
    }
    Ok((repo, skills))
}

/// All blob paths belonging to one skill directory, relative to the search
/// base. Falls back to the SKILL.md itself for an empty listing.
pub async fn list_repo_files(repo: &RepoRef, skill: &RepoSkill) -> anyhow::Result<Vec<String>> {
    let tree = fetch_tree(repo).await?;
    let base = repo.path.as_deref();
    let prefix = match base {
        Some(base) if !skill.path.is_empty() => format!("{base}/{}", skill.path),
        Some(base) => base.to_string(),
        None => skill.path.clone(),
    };

    let files: Vec<String> = tree
        .tree
        .iter()
        .filter(|entry| entry.kind == "blob")
        .map(|entry| entry.path.as_str())
        .filter(|path| prefix.is_empty() || path.starts_with(&format!("{prefix}/")))
        .map(|path| match base {
            Some(base) => path.strip_prefix(&format!("{base}/")).unwrap_or(path).to_string(),
            None => path.to_string(),
        })
        .collect();

    if files.is_empty() {
        return Ok(vec![skill.skill_file.clone()]);
    }
    Ok(files)
}

pub async fn fetch_repo_file(repo: &RepoRef, file_path: &str) -> anyhow::Result<String> {
    fetch_text(&raw_url(repo, file_path)).await
}

/// Download a whole skill directory into the canonical store, preserving
/// its internal structure.
pub async fn write_repo_skill_directory(
    store: &SkillStore,
    repo: &RepoRef,
    skill_path: &str,
    skill_name: &str,
) -> anyhow::Result<()> {
    let skill_path = skill_path.trim_end_matches('/');
    let skill = RepoSkill {
        name: skill_name.to_string(),
        path: skill_path.to_string(),
        skill_file: if skill_path.is_empty() {
            "SKILL.md".to_string()
        } else {
            format!("{skill_path}/SKILL.md")
        },
    };
    let files = list_repo_files(repo, &skill).await?;

    let target_dir = store.skill_dir(skill_name);
    tokio::fs::create_dir_all(&target_dir).await?;

    for file in files {
        let remote = match repo.path.as_deref() {
            Some(base) => format!("{base}/{file}"),
            None => file.clone(),
        };
        let content = fetch_repo_file(repo, &remote).await?;
        let relative = if skill_path.is_empty() {
            file.as_str()
        } else {
            file.strip_prefix(&format!("{skill_path}/")).unwrap_or(&file)
        };
        let target = target_dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, content).await?;
    }
    tracing::info!(skill = skill_name, repo = %repo.repo, "fetched skill directory");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: "blob".to_string(),
        }
    }

    #[test]
    fn parses_shorthand() {
        let repo = parse_repo_ref("acme/skills").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.repo, "skills");
        assert_eq!(repo.git_ref, "main");
        assert!(repo.path.is_none());
    }

    #[test]
    fn parses_repo_url_with_git_suffix() {
        let repo = parse_repo_ref("https://github.com/acme/toolkit.git/").unwrap();
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.repo, "toolkit");
    }

    #[test]
    fn parses_tree_url_with_subpath() {
        let repo =
            parse_repo_ref("https://github.com/acme/toolkit/tree/dev/agents/skills").unwrap();
        assert_eq!(repo.git_ref, "dev");
        assert_eq!(repo.path.as_deref(), Some("agents/skills"));
    }

    #[test]
    fn rejects_junk() {
        assert!(parse_repo_ref("not-a-repo").is_none());
        assert!(parse_repo_ref("a/b/c").is_none());
        assert!(parse_repo_ref("https://github.com/only-owner").is_none());
        assert!(parse_repo_ref("https://github.com/acme/toolkit/tree/dev").is_none());
    }

    #[test]
    fn builds_urls() {
        let repo = parse_repo_ref("acme/toolkit").unwrap();
        assert_eq!(
            raw_url(&repo, "skills/a/SKILL.md"),
            "https://raw.githubusercontent.com/acme/toolkit/main/skills/a/SKILL.md"
        );
        assert_eq!(
            tree_url(&repo),
            "https://api.github.com/repos/acme/toolkit/git/trees/main?recursive=1"
        );
    }

    #[test]
    fn git_source_drops_empty_path() {
        let repo = parse_repo_ref("acme/toolkit").unwrap();
        assert_eq!(git_source(&repo, ""), SkillSource::Git {
            repo: "acme/toolkit".into(),
            path: None,
            git_ref: Some("main".into()),
        });
    }

    #[test]
    fn filters_to_known_skill_roots() {
        let entries = vec![
            blob("skills/alpha/SKILL.md"),
            blob("docs/beta/SKILL.md"),
            blob("SKILL.md"),
            blob(".claude/skills/gamma/SKILL.md"),
            blob("skills/alpha/references/extra.md"),
        ];
        let skills = filter_skills(&entries, None, false);
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "root", "gamma"]);
    }

    #[test]
    fn include_all_lifts_root_restriction() {
        let entries = vec![blob("docs/beta/SKILL.md")];
        assert!(filter_skills(&entries, None, false).is_empty());
        let skills = filter_skills(&entries, None, true);
        assert_eq!(skills[0].name, "beta");
    }

    #[test]
    fn base_path_scopes_and_renames() {
        let entries = vec![
            blob("agents/skills/delta/SKILL.md"),
            blob("agents/skills/SKILL.md"),
            blob("other/SKILL.md"),
        ];
        let skills = filter_skills(&entries, Some("agents/skills"), false);
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0], RepoSkill {
            name: "delta".into(),
            path: "delta".into(),
            skill_file: "delta/SKILL.md".into(),
        });
        // A SKILL.md directly at the base is named after the base dir.
        assert_eq!(skills[1].name, "skills");
        assert_eq!(skills[1].path, "");
    }
}
