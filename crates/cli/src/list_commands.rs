use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    serde::Serialize,
    skillbox_config::Scope,
    skillbox_skills::{InstallRecord, SkillSource, discover::discover_global_skills},
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions},
};

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// JSON output.
    #[arg(long)]
    pub json: bool,
    /// List user-scope skills only.
    #[arg(long)]
    pub global: bool,
    /// Comma-separated list of agents to scan.
    #[arg(long)]
    pub agents: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    name: String,
    source: SkillSource,
    installs: Vec<InstallRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    subcommands: Vec<String>,
}

/// Extra `.md` files next to SKILL.md act as subcommands of the skill.
fn detect_subcommands(skill_path: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(skill_path) else {
        return Vec::new();
    };
    let mut subcommands: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "SKILL.md" {
                return None;
            }
            name.strip_suffix(".md").map(str::to_string)
        })
        .collect();
    subcommands.sort();
    subcommands
}

fn entry_subcommands(installs: &[InstallRecord]) -> Vec<String> {
    installs
        .first()
        .map(|install| detect_subcommands(&install.path))
        .unwrap_or_default()
}

const LIST_SOURCE_ORDER: [&str; 4] = ["local", "git", "url", "convert"];

fn group_by_source(mut entries: Vec<ListEntry>) -> Vec<(&'static str, Vec<ListEntry>)> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    let mut groups = Vec::new();
    for source in LIST_SOURCE_ORDER {
        let (matched, rest): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.source.kind() == source);
        entries = rest;
        if !matched.is_empty() {
            groups.push((source, matched));
        }
    }
    groups
}

fn print_entry(entry: &ListEntry, indent: &str) {
    print_info(&format!("{indent}{}", entry.name));
    if !entry.subcommands.is_empty() {
        print_info(&format!("{indent}  → {}", entry.subcommands.join(", ")));
    }
}

fn project_roots(entry: &ListEntry) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for install in &entry.installs {
        if install.scope == Scope::Project
            && let Some(root) = &install.project_root
            && !roots.contains(root)
        {
            roots.push(root.clone());
        }
    }
    roots
}

pub async fn handle_list(args: ListArgs) -> anyhow::Result<()> {
    let json = args.json;
    if let Err(e) = run_list(&args).await {
        output::handle_command_error(json, "list", &e);
    }
    Ok(())
}

async fn run_list(args: &ListArgs) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&RuntimeOptions {
        global: args.global,
        agents: args.agents.clone(),
    })?;
    let index = runtime.index_store().load()?;

    // Skills present in agent directories but unknown to the index still
    // show up, as local entries.
    let discovered = discover_global_skills(&runtime.project_root, &runtime.agents)
        .into_iter()
        .filter(|skill| index.find(&skill.name).is_none())
        .map(|skill| ListEntry {
            name: skill.name,
            source: SkillSource::Local,
            installs: skill
                .installs
                .into_iter()
                .map(|(agent, path)| InstallRecord {
                    scope: Scope::User,
                    agent: agent.as_str().to_string(),
                    path,
                    project_root: None,
                })
                .collect(),
            subcommands: Vec::new(),
        });

    let agent_filter: Option<Vec<String>> = args
        .agents
        .as_ref()
        .map(|_| runtime.agents.iter().map(|a| a.as_str().to_string()).collect());

    let mut entries: Vec<ListEntry> = index
        .skills
        .iter()
        .filter(|skill| match &agent_filter {
            Some(agents) => skill.installs.iter().any(|i| agents.contains(&i.agent)),
            None => true,
        })
        .map(|skill| ListEntry {
            name: skill.name.clone(),
            source: skill.source.clone(),
            installs: skill.installs.clone(),
            subcommands: Vec::new(),
        })
        .collect();
    entries.extend(discovered);
    for entry in &mut entries {
        entry.subcommands = entry_subcommands(&entry.installs);
    }

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "list",
            data: Some(serde_json::json!({ "skills": entries })),
            error: None,
        });
        return Ok(());
    }

    let mut global_entries = Vec::new();
    let mut project_entries = Vec::new();
    for entry in entries {
        let has_project = entry.installs.iter().any(|i| i.scope == Scope::Project);
        let has_user = entry.installs.iter().any(|i| i.scope == Scope::User);
        if has_project {
            project_entries.push(entry.clone());
        }
        if has_user || !has_project {
            global_entries.push(entry);
        }
    }

    if global_entries.is_empty() && project_entries.is_empty() {
        if let Some(agents) = &agent_filter {
            print_info(&format!("No skills found for agent(s): {}", agents.join(", ")));
        } else {
            print_info("No skills installed.");
        }
        return Ok(());
    }

    let mut printed_any = false;
    if !global_entries.is_empty() {
        print_info(&format!("Global Skills ({})", global_entries.len()));
        for (source, group) in group_by_source(global_entries) {
            print_info("");
            print_info(source);
            for entry in &group {
                print_entry(entry, "  ");
            }
        }
        printed_any = true;
    }

    if !project_entries.is_empty() {
        if printed_any {
            print_info("");
        }
        print_info(&format!("Project Skills ({})", project_entries.len()));

        let mut by_root: BTreeMap<PathBuf, Vec<ListEntry>> = BTreeMap::new();
        for entry in &project_entries {
            for root in project_roots(entry) {
                by_root.entry(root).or_default().push(entry.clone());
            }
        }
        for (root, group) in by_root {
            print_info("");
            print_info(&root.display().to_string());
            for (source, skills) in group_by_source(group) {
                print_info(&format!("  {source}"));
                for entry in &skills {
                    print_entry(entry, "    ");
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, source: SkillSource) -> ListEntry {
        ListEntry {
            name: name.into(),
            source,
            installs: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    #[test]
    fn sources_grouped_local_first() {
        let groups = group_by_source(vec![
            entry("a", SkillSource::Url { url: "https://x".into() }),
            entry("b", SkillSource::Local),
        ]);
        assert_eq!(groups[0].0, "local");
        assert_eq!(groups[1].0, "url");
    }

    #[test]
    fn subcommands_are_sibling_markdown_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("SKILL.md"), "x").unwrap();
        std::fs::write(tmp.path().join("review.md"), "x").unwrap();
        std::fs::write(tmp.path().join("deploy.md"), "x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let subs = detect_subcommands(tmp.path());
        assert_eq!(subs, vec!["deploy", "review"]);
    }

    #[test]
    fn project_roots_dedup() {
        let mut e = entry("a", SkillSource::Local);
        e.installs = vec![
            InstallRecord {
                scope: Scope::Project,
                agent: "claude".into(),
                path: PathBuf::from("/w/.claude/skills/a"),
                project_root: Some(PathBuf::from("/w")),
            },
            InstallRecord {
                scope: Scope::Project,
                agent: "cursor".into(),
                path: PathBuf::from("/w/.cursor/skills/a"),
                project_root: Some(PathBuf::from("/w")),
            },
        ];
        assert_eq!(project_roots(&e), vec![PathBuf::from("/w")]);
    }
}
