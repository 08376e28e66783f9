use std::path::Path;

use {
    anyhow::{Context, bail},
    skillbox_skills::{
        SkillPatch, SkillSource,
        parse::{build_manifest, parse_skill_markdown},
    },
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions},
};

pub async fn handle_import(path: &str, json: bool) -> anyhow::Result<()> {
    if let Err(e) = run_import(path, json).await {
        output::handle_command_error(json, "import", &e);
    }
    Ok(())
}

async fn run_import(path: &str, json: bool) -> anyhow::Result<()> {
    let skill_dir = Path::new(path);
    let skill_file = skill_dir.join("SKILL.md");
    let markdown = std::fs::read_to_string(&skill_file)
        .with_context(|| format!("cannot read {}", skill_file.display()))?;

    let parsed = parse_skill_markdown(&markdown);
    if parsed.description.is_none() {
        bail!("skill frontmatter is missing a description");
    }

    let fallback = skill_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let override_name = parsed.name.is_none().then_some(fallback.as_deref()).flatten();
    let manifest = build_manifest(&parsed, SkillSource::Local, override_name)?;

    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    runtime
        .skill_store()
        .write(&manifest.name, &markdown, &manifest)
        .await?;

    let index_store = runtime.index_store();
    let mut index = index_store.load()?;
    index.upsert(&manifest.name, SkillPatch {
        source: Some(SkillSource::Local),
        checksum: Some(parsed.checksum),
        updated_at: Some(manifest.updated_at),
        ..SkillPatch::default()
    });
    index_store.save(&index)?;

    if json {
        print_json(&JsonResult {
            ok: true,
            command: "import",
            data: Some(serde_json::json!({
                "name": manifest.name,
                "source": "local",
            })),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!("Imported skill: {}", manifest.name));
    Ok(())
}
