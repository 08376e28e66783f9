use std::io::Read;

use {
    anyhow::{Context, bail},
    skillbox_skills::{
        SkillPatch, SkillSource,
        fetch::fetch_text,
        github::{self, RepoRef, RepoSkill},
        ingest,
        parse::{infer_name_from_url, parse_skill_markdown},
    },
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions},
};

#[derive(Debug, clap::Args)]
pub struct AddArgs {
    /// Skill URL or repo.
    pub input: Option<String>,
    /// Override skill name.
    #[arg(long)]
    pub name: Option<String>,
    /// Install to user scope.
    #[arg(long)]
    pub global: bool,
    /// Comma-separated agent list.
    #[arg(long)]
    pub agents: Option<String>,
    /// Skill name to install (repeatable).
    #[arg(long = "skill")]
    pub skills: Vec<String>,
    /// List skills in repo without installing.
    #[arg(long)]
    pub list: bool,
    /// Ingest agent conversion JSON (use '-' for stdin).
    #[arg(long)]
    pub ingest: Option<String>,
    /// JSON output.
    #[arg(long)]
    pub json: bool,
}

impl AddArgs {
    fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            global: self.global,
            agents: self.agents.clone(),
        }
    }
}

pub async fn handle_add(args: AddArgs) -> anyhow::Result<()> {
    let result = run_add(&args).await;
    if let Err(e) = result {
        output::handle_command_error(args.json, "add", &e);
    }
    Ok(())
}

async fn run_add(args: &AddArgs) -> anyhow::Result<()> {
    if let Some(ingest_path) = &args.ingest {
        return run_ingest(args, ingest_path).await;
    }

    let Some(input) = &args.input else {
        bail!("missing required argument: url or repo");
    };

    if args.list || !args.skills.is_empty() || github::parse_repo_ref(input).is_some() {
        return run_repo_add(args, input).await;
    }

    let markdown = match fetch_text(input).await {
        Ok(markdown) => markdown,
        Err(e) if e.to_string().contains("failed to fetch") => {
            print_prompt_fallback(args, input);
            return Ok(());
        },
        Err(e) => return Err(e),
    };

    let parsed = parse_skill_markdown(&markdown);
    let inferred = infer_name_from_url(input);
    let name = args.name.clone().or(inferred).or_else(|| parsed.name.clone());

    // A document with no frontmatter name and no explicit override is not
    // a skill; hand the user the ingest prompt instead.
    let Some(name) = name else {
        print_prompt_fallback(args, input);
        return Ok(());
    };
    if parsed.description.is_none() || (parsed.name.is_none() && args.name.is_none()) {
        print_prompt_fallback(args, input);
        return Ok(());
    }

    let source = SkillSource::Url { url: input.clone() };
    let manifest =
        skillbox_skills::parse::build_manifest(&parsed, source.clone(), Some(&name))?;

    let runtime = Runtime::resolve(&args.runtime_options())?;
    runtime.skill_store().write(&name, &markdown, &manifest).await?;

    let install = runtime.install_skill(&name).await?;
    for warning in &install.warnings {
        print_info(warning);
    }

    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    index.upsert(&name, SkillPatch {
        source: Some(source.clone()),
        checksum: Some(parsed.checksum.clone()),
        updated_at: Some(manifest.updated_at),
        installs: install.installs.clone(),
        ..SkillPatch::default()
    });
    index_store.save(&index)?;

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "add",
            data: Some(serde_json::json!({
                "name": name,
                "source": source,
                "scope": install.scope,
                "installs": install.installs,
            })),
            error: None,
        });
        return Ok(());
    }

    print_info(&format!("Skill Added: {name}"));
    print_info("");
    print_info("Source: url");
    print_info(&format!("  {input}"));
    print_installed_to(&install.installs);
    Ok(())
}

fn print_installed_to(installs: &[skillbox_skills::InstallRecord]) {
    if installs.is_empty() {
        print_info("");
        print_info("No agent targets were updated.");
        return;
    }
    print_info("");
    print_info("Installed to:");
    for install in installs {
        let scope_label = match &install.project_root {
            Some(root) => format!("project:{}", root.display()),
            None => "user".to_string(),
        };
        print_info(&format!("  ✓ {scope_label}/{}", install.agent));
    }
}

fn print_prompt_fallback(args: &AddArgs, input: &str) {
    let prompt = ingest::build_ingest_prompt(input);
    if args.json {
        print_json(&JsonResult {
            ok: false,
            command: "add",
            data: Some(serde_json::json!({
                "ingest": true,
                "prompt": prompt,
                "next": "skillbox add --ingest <json>",
            })),
            error: Some(output::JsonError {
                message: "Input does not appear to be a valid skill.".into(),
            }),
        });
        return;
    }
    print_info("This URL does not appear to be a valid skill.");
    print_info("Use an agent to extract and return JSON using the schema below.");
    print_info("Then run: skillbox add --ingest <json>");
    print_info("");
    print_info(&prompt);
}

// ── repo install ────────────────────────────────────────────────────────────

struct RepoSummary {
    installed: Vec<String>,
    updated: Vec<String>,
    skipped: Vec<String>,
    failed: Vec<(String, String)>,
}

async fn run_repo_add(args: &AddArgs, input: &str) -> anyhow::Result<()> {
    let (repo, skills) = github::list_repo_skills(input).await?;

    let mut names: Vec<String> = skills.iter().map(|s| s.name.clone()).collect();
    names.sort();

    if args.list {
        if args.json {
            print_json(&JsonResult {
                ok: true,
                command: "add",
                data: Some(serde_json::json!({"repo": input, "skills": names})),
                error: None,
            });
            return Ok(());
        }
        print_info(&format!("Repo Skills: {}/{}", repo.owner, repo.repo));
        print_info("");
        print_info(&format!("Found {} skill(s):", names.len()));
        for name in &names {
            print_info(&format!("  - {name}"));
        }
        return Ok(());
    }

    let selected: Vec<&RepoSkill> = if args.skills.is_empty() {
        skills.iter().collect()
    } else {
        skills.iter().filter(|s| args.skills.contains(&s.name)).collect()
    };
    if selected.is_empty() {
        bail!("no matching skills found. Use --list to see available skills.");
    }

    let runtime = Runtime::resolve(&args.runtime_options())?;
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    let mut summary = RepoSummary {
        installed: Vec::new(),
        updated: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };
    let show_progress = !args.json;
    let total = selected.len();

    if show_progress && total > 0 {
        let plural = if total == 1 { "" } else { "s" };
        print_info(&format!(
            "Adding {total} skill{plural} from {}/{}...\n",
            repo.owner, repo.repo
        ));
    }

    for skill in selected {
        let already_indexed = index.find(&skill.name).is_some();
        match add_one_repo_skill(&runtime, &mut index, &repo, skill).await {
            Ok(true) => {
                if already_indexed {
                    summary.updated.push(skill.name.clone());
                    if show_progress {
                        print_info(&format!("  ✓ {} (updated)", skill.name));
                    }
                } else {
                    summary.installed.push(skill.name.clone());
                    if show_progress {
                        print_info(&format!("  ✓ {}", skill.name));
                    }
                }
            },
            Ok(false) => {
                summary.skipped.push(skill.name.clone());
                if show_progress {
                    print_info(&format!("  - {} (skipped: missing description)", skill.name));
                }
            },
            Err(e) => {
                summary.failed.push((skill.name.clone(), e.to_string()));
                if show_progress {
                    print_info(&format!("  ✗ {} ({e})", skill.name));
                }
            },
        }
    }

    index_store.save(&index)?;

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "add",
            data: Some(serde_json::json!({
                "repo": format!("{}/{}", repo.owner, repo.repo),
                "installed": summary.installed,
                "updated": summary.updated,
                "skipped": summary.skipped,
                "failed": summary.failed.iter()
                    .map(|(name, reason)| serde_json::json!({"name": name, "reason": reason}))
                    .collect::<Vec<_>>(),
            })),
            error: None,
        });
        return Ok(());
    }

    let added = summary.installed.len() + summary.updated.len();
    let failed = summary.failed.len();
    let skipped = summary.skipped.len();
    let plural = if added == 1 { "" } else { "s" };
    if added > 0 && failed == 0 && skipped == 0 {
        print_info(&format!(
            "\nAdded {added} skill{plural} from {}/{}.",
            repo.owner, repo.repo
        ));
    } else if added > 0 {
        let mut parts = Vec::new();
        if failed > 0 {
            parts.push(format!("{failed} failed"));
        }
        if skipped > 0 {
            parts.push(format!("{skipped} skipped"));
        }
        print_info(&format!("\nAdded {added} skill{plural} ({}).", parts.join(", ")));
    } else {
        print_info("\nNo skills were added.");
    }
    Ok(())
}

/// Fetch, store, and install one repo skill. `Ok(false)` means skipped for
/// a missing description.
async fn add_one_repo_skill(
    runtime: &Runtime,
    index: &mut skillbox_skills::SkillIndex,
    repo: &RepoRef,
    skill: &RepoSkill,
) -> anyhow::Result<bool> {
    let remote_file = match repo.path.as_deref() {
        Some(base) => format!("{base}/{}", skill.skill_file),
        None => skill.skill_file.clone(),
    };
    let markdown = github::fetch_repo_file(repo, &remote_file).await?;
    let parsed = parse_skill_markdown(&markdown);
    if parsed.description.is_none() {
        return Ok(false);
    }

    github::write_repo_skill_directory(&runtime.skill_store(), repo, &skill.path, &skill.name)
        .await?;

    let source_path: String = [repo.path.as_deref(), Some(skill.path.as_str())]
        .iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    let source = github::git_source(repo, &source_path);
    let manifest =
        skillbox_skills::parse::build_manifest(&parsed, source.clone(), Some(&skill.name))?;
    runtime.skill_store().write_manifest(&skill.name, &manifest).await?;

    let install = runtime.install_skill(&skill.name).await?;
    for warning in &install.warnings {
        print_info(warning);
    }

    index.upsert(&skill.name, SkillPatch {
        source: Some(source),
        checksum: Some(parsed.checksum),
        updated_at: Some(manifest.updated_at),
        installs: install.installs,
        ..SkillPatch::default()
    });
    Ok(true)
}

// ── ingest ──────────────────────────────────────────────────────────────────

async fn run_ingest(args: &AddArgs, ingest_path: &str) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&args.runtime_options())?;
    let content = if ingest_path == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        if buffer.trim().is_empty() {
            bail!("ingest stdin is empty");
        }
        // Piped payloads are kept on disk so a failed parse can be inspected.
        std::fs::create_dir_all(&runtime.paths.tmp_dir)?;
        std::fs::write(runtime.paths.tmp_dir.join("ingest-stdin.json"), &buffer)?;
        buffer
    } else {
        std::fs::read_to_string(ingest_path)
            .with_context(|| format!("cannot read ingest file {ingest_path}"))?
    };

    let ingest = ingest::parse_ingest(&content)?;
    let markdown = ingest::build_skill_markdown(&ingest);
    let manifest = ingest::build_ingest_manifest(&ingest, &markdown)?;

    ingest::write_ingested_skill(&runtime.skill_store(), &ingest, &markdown, &manifest).await?;

    let install = runtime.install_skill(&manifest.name).await?;
    for warning in &install.warnings {
        print_info(warning);
    }

    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    index.upsert(&manifest.name, SkillPatch {
        source: Some(manifest.source.clone()),
        checksum: Some(manifest.checksum.clone()),
        updated_at: Some(manifest.updated_at),
        namespace: manifest.namespace.clone(),
        categories: manifest.categories.clone(),
        tags: manifest.tags.clone(),
        installs: install.installs.clone(),
        ..SkillPatch::default()
    });
    index_store.save(&index)?;

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "add",
            data: Some(serde_json::json!({
                "name": manifest.name,
                "source": manifest.source,
                "scope": install.scope,
                "installs": install.installs,
                "ingest": true,
            })),
            error: None,
        });
        return Ok(());
    }

    print_info(&format!("Skill Added: {}", manifest.name));
    print_info("");
    print_info("Source: convert");
    if let SkillSource::Convert { value, .. } = &manifest.source {
        print_info(&format!("  {value}"));
    }
    print_installed_to(&install.installs);
    Ok(())
}
