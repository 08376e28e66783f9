use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    anyhow::bail,
    skillbox_agents::catalog::agent_paths,
    skillbox_config::Scope,
    skillbox_skills::{
        InstallRecord, SkillPatch, SkillSource,
        discover::discover_skills,
        install::copy_to_install_paths,
    },
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions, resolve_project_arg},
};

#[derive(Debug, clap::Subcommand)]
pub enum ProjectAction {
    /// Register a project and import skills from its skill directories.
    Add {
        /// Project path.
        path: String,
        /// Agent path override as agent=path (repeatable).
        #[arg(long = "agent-path")]
        agent_paths: Vec<String>,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// List registered projects and their skills.
    List {
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Show one project's configuration and skills.
    Inspect {
        /// Project path.
        path: String,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
    /// Re-copy every recorded skill into a project's install paths.
    Sync {
        /// Project path.
        path: String,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_project(action: ProjectAction) -> anyhow::Result<()> {
    let (json, command) = match &action {
        ProjectAction::Add { json, .. } => (*json, "project add"),
        ProjectAction::List { json } => (*json, "project list"),
        ProjectAction::Inspect { json, .. } => (*json, "project inspect"),
        ProjectAction::Sync { json, .. } => (*json, "project sync"),
    };
    if let Err(e) = run_project(action).await {
        output::handle_command_error(json, command, &e);
    }
    Ok(())
}

async fn run_project(action: ProjectAction) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    match action {
        ProjectAction::Add {
            path,
            agent_paths,
            json,
        } => run_add(&runtime, &path, &agent_paths, json).await,
        ProjectAction::List { json } => run_list(&runtime, json),
        ProjectAction::Inspect { path, json } => run_inspect(&runtime, &path, json),
        ProjectAction::Sync { path, json } => run_sync(&runtime, &path, json).await,
    }
}

/// Parse repeated `agent=path` override flags, ignoring malformed entries.
fn parse_agent_path_overrides(entries: &[String]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut overrides: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for entry in entries {
        let Some((agent, path)) = entry.split_once('=') else {
            continue;
        };
        if agent.is_empty() || path.is_empty() {
            continue;
        }
        overrides
            .entry(agent.to_string())
            .or_default()
            .push(PathBuf::from(path));
    }
    overrides
}

/// The generic `skills/` directory plus every agent's project-scope paths.
fn project_skill_dirs(project_root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![project_root.join("skills")];
    for entry in agent_paths(project_root).values() {
        for path in &entry.project {
            if !dirs.contains(path) {
                dirs.push(path.clone());
            }
        }
    }
    dirs
}

async fn run_add(
    runtime: &Runtime,
    path: &str,
    agent_path_flags: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let root = resolve_project_arg(path);
    let store = runtime.project_store();
    let mut registry = store.load()?;
    registry.upsert_root(&root);
    registry.set_agent_paths(&root, parse_agent_path_overrides(agent_path_flags));
    store.save(&registry)?;

    // Skills already sitting in the project's skill directories are pulled
    // into the canonical store and indexed in place.
    let mut imported = Vec::new();
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    for discovered in discover_skills(&project_skill_dirs(&root)) {
        let Some(manifest) = runtime
            .skill_store()
            .import_from_file(&discovered.skill_file, &discovered.name)
            .await?
        else {
            continue;
        };
        index.upsert(&manifest.name, SkillPatch {
            source: Some(SkillSource::Local),
            checksum: Some(manifest.checksum.clone()),
            updated_at: Some(manifest.updated_at),
            installs: vec![InstallRecord {
                scope: Scope::Project,
                agent: "claude".into(),
                path: discovered.skill_dir.clone(),
                project_root: Some(root.clone()),
            }],
            ..SkillPatch::default()
        });
        imported.push(manifest.name);
    }
    if !imported.is_empty() {
        index_store.save(&index)?;
    }

    if json {
        let agent_path_value = registry
            .find(&root)
            .and_then(|entry| entry.agent_paths.clone())
            .unwrap_or_default();
        print_json(&JsonResult {
            ok: true,
            command: "project add",
            data: Some(serde_json::json!({
                "path": root,
                "agentPaths": agent_path_value,
                "skills": imported,
            })),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!("Project registered: {}", root.display()));
    if !imported.is_empty() {
        print_info(&format!(
            "Discovered {} skill(s): {}",
            imported.len(),
            imported.join(", ")
        ));
    }
    Ok(())
}

fn run_list(runtime: &Runtime, json: bool) -> anyhow::Result<()> {
    let registry = runtime.project_store().load()?;
    let index = runtime.index_store().load()?;
    let project_skills = index.project_skills();

    if json {
        let projects: Vec<serde_json::Value> = registry
            .projects
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "root": entry.root,
                    "agentPaths": entry.agent_paths,
                    "skills": project_skills.get(&entry.root).cloned().unwrap_or_default(),
                })
            })
            .collect();
        print_json(&JsonResult {
            ok: true,
            command: "project list",
            data: Some(serde_json::json!({ "projects": projects })),
            error: None,
        });
        return Ok(());
    }

    print_info(&format!("Projects: {}", registry.projects.len()));
    for entry in &registry.projects {
        let skills = project_skills.get(&entry.root).cloned().unwrap_or_default();
        let label = if skills.is_empty() {
            String::new()
        } else {
            format!(" ({} skills)", skills.len())
        };
        print_info(&format!("- {}{label}", entry.root.display()));
        for name in &skills {
            print_info(&format!("  - {name}"));
        }
    }
    Ok(())
}

fn run_inspect(runtime: &Runtime, path: &str, json: bool) -> anyhow::Result<()> {
    let root = resolve_project_arg(path);
    let registry = runtime.project_store().load()?;
    let Some(entry) = registry.find(&root) else {
        bail!("project not registered: {}", root.display());
    };
    let index = runtime.index_store().load()?;
    let skills = index.project_skills().remove(&root).unwrap_or_default();

    if json {
        print_json(&JsonResult {
            ok: true,
            command: "project inspect",
            data: Some(serde_json::json!({
                "root": entry.root,
                "agentPaths": entry.agent_paths.clone().unwrap_or_default(),
                "skills": skills,
            })),
            error: None,
        });
        return Ok(());
    }

    print_info(&format!("Project: {}", entry.root.display()));
    match &entry.agent_paths {
        None => print_info("Agent paths: default"),
        Some(paths) if paths.is_empty() => print_info("Agent paths: default"),
        Some(paths) => {
            print_info("Agent paths:");
            for (agent, dirs) in paths {
                let joined = dirs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                print_info(&format!("- {agent}: {joined}"));
            }
        },
    }
    if skills.is_empty() {
        print_info("Skills: none");
    } else {
        print_info("Skills:");
        for name in &skills {
            print_info(&format!("- {name}"));
        }
    }
    Ok(())
}

async fn run_sync(runtime: &Runtime, path: &str, json: bool) -> anyhow::Result<()> {
    let root = resolve_project_arg(path);
    let index = runtime.index_store().load()?;
    let install_paths = index.project_install_paths(&root);
    if install_paths.is_empty() {
        bail!("no skills recorded for project: {}", root.display());
    }

    for (name, paths) in &install_paths {
        let source_dir = runtime.paths.skill_dir(name);
        copy_to_install_paths(&source_dir, paths).await?;
    }

    if json {
        print_json(&JsonResult {
            ok: true,
            command: "project sync",
            data: Some(serde_json::json!({
                "root": root,
                "skills": install_paths.keys().collect::<Vec<_>>(),
            })),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!(
        "Synced {} skill(s) for {}",
        install_paths.len(),
        root.display()
    ));
    Ok(())
}
