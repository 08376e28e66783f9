use std::path::PathBuf;

use {
    anyhow::bail,
    chrono::Utc,
    skillbox_skills::{
        SkillManifest, SkillSource, ingest,
        parse::infer_name_from_url,
    },
};

use crate::output::{self, JsonResult, print_info, print_json};

#[derive(Debug, clap::Args)]
pub struct ConvertArgs {
    /// Source URL.
    pub url: String,
    /// Skill name for the draft.
    #[arg(long)]
    pub name: Option<String>,
    /// Output directory (defaults to ./skillbox-convert/<name>).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Print an agent conversion prompt instead of writing a draft.
    #[arg(long)]
    pub agent: bool,
    /// JSON output.
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let json = args.json;
    if let Err(e) = run_convert(&args).await {
        output::handle_command_error(json, "convert", &e);
    }
    Ok(())
}

async fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    if args.agent {
        let prompt = ingest::build_ingest_prompt(&args.url);
        if args.json {
            print_json(&JsonResult {
                ok: true,
                command: "convert",
                data: Some(serde_json::json!({
                    "prompt": prompt,
                    "next": "skillbox add --ingest <json>",
                })),
                error: None,
            });
            return Ok(());
        }
        print_info(&prompt);
        print_info("");
        print_info("Then run: skillbox add --ingest <json>");
        return Ok(());
    }

    let content = skillbox_skills::fetch::fetch_text(&args.url).await?;

    let name = match args.name.clone().or_else(|| infer_name_from_url(&args.url)) {
        Some(name) => name,
        None => bail!("unable to infer skill name. Use --name to specify it."),
    };

    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?
            .join("skillbox-convert")
            .join(&name),
    };
    std::fs::create_dir_all(&output_dir)?;

    std::fs::write(output_dir.join("source.txt"), &content)?;

    let draft = format!(
        "---\nname: {name}\ndescription: Draft skill generated from source content.\n---\n\n\
# {name}\n\n\
TODO: Summarize the workflow this skill captures.\n\n\
## Steps\n\n\
TODO: Extract the concrete steps from source.txt.\n\n\
## Notes\n\n\
TODO: Record caveats and prerequisites.\n"
    );
    std::fs::write(output_dir.join("SKILL.md"), &draft)?;

    let manifest = SkillManifest {
        name: name.clone(),
        version: "0.1.0".into(),
        description: Some("Draft skill generated from source content.".into()),
        entry: "SKILL.md".into(),
        namespace: None,
        categories: None,
        tags: None,
        source: SkillSource::Convert {
            value: args.url.clone(),
            url: Some(args.url.clone()),
        },
        checksum: "draft".into(),
        updated_at: Utc::now(),
    };
    let mut manifest_json = serde_json::to_string_pretty(&manifest)?;
    manifest_json.push('\n');
    std::fs::write(output_dir.join("skill.json"), manifest_json)?;

    if args.json {
        print_json(&JsonResult {
            ok: true,
            command: "convert",
            data: Some(serde_json::json!({
                "name": name,
                "output": output_dir,
            })),
            error: None,
        });
        return Ok(());
    }
    print_info(&format!("Draft created: {}", output_dir.display()));
    print_info("Edit SKILL.md, then run: skillbox import <dir>");
    print_info("Or let an agent do it: skillbox convert <url> --agent");
    Ok(())
}
