use std::path::Path;

use {anyhow::bail, skillbox_config::Scope};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions, resolve_project_arg},
};

#[derive(Debug, clap::Args)]
pub struct RemoveArgs {
    /// Skill name.
    pub name: String,
    /// Only remove installs recorded for this project.
    #[arg(long)]
    pub project: Option<String>,
    /// JSON output.
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_remove(args: RemoveArgs) -> anyhow::Result<()> {
    let json = args.json;
    if let Err(e) = run_remove(&args).await {
        output::handle_command_error(json, "remove", &e);
    }
    Ok(())
}

async fn run_remove(args: &RemoveArgs) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    if index.find(&args.name).is_none() {
        bail!("skill not found: {}", args.name);
    }

    if let Some(project) = &args.project {
        let root = resolve_project_arg(project);
        let removed = index.remove_installs(&args.name, Scope::Project, Some(&root));
        if removed.is_empty() {
            bail!("no installs found for {} in {}", args.name, root.display());
        }
        for install in &removed {
            remove_path(&install.path)?;
        }
        index_store.save(&index)?;

        if args.json {
            print_json(&JsonResult {
                ok: true,
                command: "remove",
                data: Some(serde_json::json!({
                    "name": args.name,
                    "projectRoot": root,
                    "removed": removed,
                })),
                error: None,
            });
            return Ok(());
        }
        print_info(&format!(
            "Removed {} install(s) for {} in {}.",
            removed.len(),
            args.name,
            root.display()
        ));
        return Ok(());
    }

    let installs = index
        .find(&args.name)
        .map(|skill| skill.installs.clone())
        .unwrap_or_default();
    for install in &installs {
        remove_path(&install.path)?;
    }
    runtime.skill_store().remove(&args.name).await?;
    index.remove(&args.name);
    index_store.save(&index)?;

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "remove",
            data: Some(serde_json::json!({
                "name": args.name,
                "removed": installs,
            })),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!(
        "Removed {} and {} install(s).",
        args.name,
        installs.len()
    ));
    Ok(())
}

/// Delete an install path. Symlinks are unlinked without following; a
/// missing path is not an error.
fn remove_path(path: &Path) -> anyhow::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    tracing::debug!(path = %path.display(), "removed install");
    Ok(())
}
