use {anyhow::bail, skillbox_skills::SkillPatch};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions},
};

#[derive(Debug, clap::Subcommand)]
pub enum MetaAction {
    /// Set namespace, categories, or tags on an indexed skill.
    Set {
        /// Skill name.
        name: String,
        /// Category (repeatable, replaces existing).
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Tag (repeatable, replaces existing).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Namespace.
        #[arg(long)]
        namespace: Option<String>,
        /// JSON output.
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_meta(action: MetaAction) -> anyhow::Result<()> {
    let MetaAction::Set { json, .. } = &action;
    let json = *json;
    if let Err(e) = run_meta(action) {
        output::handle_command_error(json, "meta", &e);
    }
    Ok(())
}

fn run_meta(action: MetaAction) -> anyhow::Result<()> {
    let MetaAction::Set {
        name,
        categories,
        tags,
        namespace,
        json,
    } = action;

    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    if index.find(&name).is_none() {
        bail!("skill not found: {name}");
    }

    index.upsert(&name, SkillPatch {
        namespace,
        categories: (!categories.is_empty()).then_some(categories),
        tags: (!tags.is_empty()).then_some(tags),
        ..SkillPatch::default()
    });
    index_store.save(&index)?;

    let skill = index.find(&name);
    if json {
        print_json(&JsonResult {
            ok: true,
            command: "meta",
            data: Some(serde_json::to_value(skill)?),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!("Metadata updated: {name}"));
    Ok(())
}
