use std::path::{Path, PathBuf};

use {
    anyhow::bail,
    chrono::Utc,
    serde::Serialize,
    skillbox_skills::{
        IndexedSkill, SkillPatch, SkillSource,
        fetch::fetch_text,
        github::{self, RepoRef},
        install::install_to_targets,
        parse::{build_manifest, parse_skill_markdown},
    },
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions, resolve_project_arg},
};

#[derive(Debug, clap::Args)]
pub struct UpdateArgs {
    /// Skill name (all trackable skills when omitted).
    pub name: Option<String>,
    /// Only reinstall into installs recorded for this project.
    #[arg(long)]
    pub project: Option<String>,
    /// JSON output.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateResult {
    name: String,
    source: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn handle_update(args: UpdateArgs) -> anyhow::Result<()> {
    let json = args.json;
    if let Err(e) = run_update(&args).await {
        output::handle_command_error(json, "update", &e);
    }
    Ok(())
}

async fn run_update(args: &UpdateArgs) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;

    let targets: Vec<String> = match &args.name {
        Some(name) => {
            if index.find(name).is_none() {
                bail!("skill not found: {name}");
            }
            vec![name.clone()]
        },
        None => index.skills.iter().map(|s| s.name.clone()).collect(),
    };

    let project_root = args.project.as_deref().map(resolve_project_arg);
    let show_progress = !args.json;

    if show_progress && !targets.is_empty() {
        let plural = if targets.len() == 1 { "" } else { "s" };
        print_info(&format!("Updating {} skill{plural}...\n", targets.len()));
    }

    let mut results: Vec<UpdateResult> = Vec::with_capacity(targets.len());
    for name in &targets {
        let Some(skill) = index.find(name).cloned() else {
            continue;
        };
        let kind = skill.source.kind();
        let outcome = match &skill.source {
            SkillSource::Url { .. } => {
                Some(update_url_skill(&runtime, &mut index, &skill, project_root.as_deref()).await)
            },
            SkillSource::Git { .. } => {
                Some(update_git_skill(&runtime, &mut index, &skill, project_root.as_deref()).await)
            },
            _ => None,
        };
        match outcome {
            Some(Ok(())) => {
                results.push(UpdateResult {
                    name: name.clone(),
                    source: kind,
                    status: "updated",
                    error: None,
                });
                if show_progress {
                    print_info(&format!("  ✓ {name}"));
                }
            },
            Some(Err(e)) => {
                results.push(UpdateResult {
                    name: name.clone(),
                    source: kind,
                    status: "failed",
                    error: Some(e.to_string()),
                });
                if show_progress {
                    print_info(&format!("  ✗ {name} ({e})"));
                }
            },
            None => {
                results.push(UpdateResult {
                    name: name.clone(),
                    source: kind,
                    status: "skipped",
                    error: None,
                });
                if show_progress {
                    print_info(&format!("  - {name} (skipped)"));
                }
            },
        }
    }

    index_store.save(&index)?;

    let updated = results.iter().filter(|r| r.status == "updated").count();
    let failed = results.iter().filter(|r| r.status == "failed").count();
    let skipped = results.iter().filter(|r| r.status == "skipped").count();
    let trackable = results.iter().filter(|r| r.source != "local").count();

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "update",
            data: Some(serde_json::json!({
                "name": args.name,
                "project": project_root,
                "total": results.len(),
                "updated": updated,
                "failed": failed,
                "skipped": skipped,
                "results": results,
            })),
            error: None,
        });
        return Ok(());
    }

    if results.is_empty() {
        print_info("No skills to update.");
        return Ok(());
    }
    let plural = if trackable == 1 { "" } else { "s" };
    if failed > 0 {
        print_info(&format!(
            "\nUpdated {updated} of {trackable} trackable skill{plural} ({failed} failed)."
        ));
    } else if updated > 0 {
        print_info(&format!("\nUpdated {updated} of {trackable} trackable skill{plural}."));
    } else if skipped > 0 && trackable == 0 {
        print_info("\nNo trackable skills to update.");
    }
    Ok(())
}

/// Recorded install paths for a skill, narrowed to one project when asked.
fn install_bases(skill: &IndexedSkill, project_root: Option<&Path>) -> Vec<PathBuf> {
    skill
        .installs
        .iter()
        .filter(|i| match project_root {
            Some(root) => i.project_root.as_deref() == Some(root),
            None => true,
        })
        .filter_map(|i| i.path.parent().map(Path::to_path_buf))
        .collect()
}

async fn reinstall(
    runtime: &Runtime,
    skill: &IndexedSkill,
    project_root: Option<&Path>,
) -> anyhow::Result<()> {
    let bases = install_bases(skill, project_root);
    if bases.is_empty() {
        return Ok(());
    }
    let source_dir = runtime.paths.skill_dir(&skill.name);
    let results =
        install_to_targets(&source_dir, &skill.name, &bases, runtime.config.install_mode).await;
    for warning in output::symlink_warnings("update", &results) {
        print_info(&warning);
    }
    Ok(())
}

async fn update_url_skill(
    runtime: &Runtime,
    index: &mut skillbox_skills::SkillIndex,
    skill: &IndexedSkill,
    project_root: Option<&Path>,
) -> anyhow::Result<()> {
    let SkillSource::Url { url } = &skill.source else {
        return Ok(());
    };

    let markdown = fetch_text(url).await?;
    let parsed = parse_skill_markdown(&markdown);
    if parsed.description.is_none() {
        bail!("skill {} is missing a description after update", skill.name);
    }

    let manifest = build_manifest(&parsed, skill.source.clone(), Some(&skill.name))?;
    runtime
        .skill_store()
        .write(&skill.name, &markdown, &manifest)
        .await?;
    reinstall(runtime, skill, project_root).await?;

    index.upsert(&skill.name, SkillPatch {
        source: Some(skill.source.clone()),
        checksum: Some(parsed.checksum),
        updated_at: Some(manifest.updated_at),
        last_sync: Some(Utc::now()),
        ..SkillPatch::default()
    });
    Ok(())
}

async fn update_git_skill(
    runtime: &Runtime,
    index: &mut skillbox_skills::SkillIndex,
    skill: &IndexedSkill,
    project_root: Option<&Path>,
) -> anyhow::Result<()> {
    let SkillSource::Git { repo, path, git_ref } = &skill.source else {
        return Ok(());
    };
    let Some((owner, repo_name)) = repo.split_once('/') else {
        bail!("invalid git source repo: {repo}");
    };

    let skill_path = path
        .as_deref()
        .map(|p| p.trim_end_matches('/').to_string())
        .unwrap_or_default();
    let repo_ref = github::normalize_repo_ref(RepoRef {
        owner: owner.to_string(),
        repo: repo_name.to_string(),
        git_ref: git_ref.clone().unwrap_or_else(|| "main".to_string()),
        path: None,
    })
    .await?;

    let skill_file = if skill_path.is_empty() {
        "SKILL.md".to_string()
    } else {
        format!("{skill_path}/SKILL.md")
    };
    let markdown = github::fetch_repo_file(&repo_ref, &skill_file).await?;
    let parsed = parse_skill_markdown(&markdown);
    if parsed.description.is_none() {
        bail!("skill {} is missing a description after update", skill.name);
    }

    github::write_repo_skill_directory(&runtime.skill_store(), &repo_ref, &skill_path, &skill.name)
        .await?;

    let source = SkillSource::Git {
        repo: repo.clone(),
        path: (!skill_path.is_empty()).then_some(skill_path),
        git_ref: Some(repo_ref.git_ref.clone()),
    };
    let manifest = build_manifest(&parsed, source.clone(), Some(&skill.name))?;
    runtime
        .skill_store()
        .write_manifest(&skill.name, &manifest)
        .await?;
    reinstall(runtime, skill, project_root).await?;

    index.upsert(&skill.name, SkillPatch {
        source: Some(source),
        checksum: Some(parsed.checksum),
        updated_at: Some(manifest.updated_at),
        last_sync: Some(Utc::now()),
        ..SkillPatch::default()
    });
    Ok(())
}
