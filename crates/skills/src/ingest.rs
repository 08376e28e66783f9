use std::path::{Component, Path};

use {
    anyhow::{Context, bail},
    serde::{Deserialize, Serialize},
};

use crate::{
    parse::{build_manifest, parse_skill_markdown, validate_name},
    store::SkillStore,
    types::{SkillManifest, SkillSource},
};

/// Frontmatter keys an agent tool will accept, in emit order.
const FRONTMATTER_ORDER: [&str; 10] = [
    "name",
    "description",
    "argument-hint",
    "disable-model-invocation",
    "user-invocable",
    "allowed-tools",
    "model",
    "context",
    "agent",
    "hooks",
];

/// The JSON document accepted by `add --ingest`. Unknown fields are
/// rejected so a malformed generator output fails loudly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSkill {
    pub name: String,
    pub description: String,
    pub body: String,
    pub source: IngestSource,
    #[serde(default)]
    pub frontmatter: Option<IngestFrontmatter>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub subcommands: Vec<IngestSubcommand>,
    #[serde(default)]
    pub supporting_files: Vec<IngestSupportingFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestFrontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "argument-hint", skip_serializing_if = "Option::is_none")]
    pub argument_hint: Option<String>,
    #[serde(
        default,
        rename = "disable-model-invocation",
        skip_serializing_if = "Option::is_none"
    )]
    pub disable_model_invocation: Option<bool>,
    #[serde(default, rename = "user-invocable", skip_serializing_if = "Option::is_none")]
    pub user_invocable: Option<bool>,
    #[serde(default, rename = "allowed-tools", skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSubcommand {
    pub name: String,
    pub body: String,
    #[serde(default)]
    pub frontmatter: Option<IngestFrontmatter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSupportingFile {
    pub path: String,
    pub contents: String,
}

/// Parse and validate an ingest JSON document.
pub fn parse_ingest(content: &str) -> anyhow::Result<IngestSkill> {
    let ingest: IngestSkill =
        serde_json::from_str(content).context("invalid ingest JSON")?;

    if !validate_name(&ingest.name) {
        bail!("skill names must be kebab-case: {}", ingest.name);
    }
    if ingest.description.trim().is_empty() {
        bail!("ingest description must not be empty");
    }
    if ingest.body.trim().is_empty() {
        bail!("ingest body must not be empty");
    }
    if ingest.body.trim_start().starts_with("---") {
        bail!("ingest body must not include YAML frontmatter");
    }
    if ingest.source.kind.is_empty() || ingest.source.value.is_empty() {
        bail!("ingest source requires type and value");
    }
    for sub in &ingest.subcommands {
        if !validate_name(&sub.name) {
            bail!("subcommand names must be kebab-case: {}", sub.name);
        }
        if sub.body.trim().is_empty() {
            bail!("subcommand body must not be empty: {}", sub.name);
        }
    }
    validate_supporting_files(&ingest.supporting_files)?;
    Ok(ingest)
}

fn validate_supporting_files(files: &[IngestSupportingFile]) -> anyhow::Result<()> {
    for file in files {
        let path = Path::new(&file.path);
        if file.path.is_empty() || path.is_absolute() {
            bail!("supporting file path must be relative: {}", file.path);
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            bail!("supporting file path cannot traverse directories: {}", file.path);
        }
        if file.path.ends_with("SKILL.md") || file.path.ends_with("skill.json") {
            bail!(
                "supporting file cannot overwrite SKILL.md or skill.json: {}",
                file.path
            );
        }
    }
    Ok(())
}

/// Render the final SKILL.md for an ingested skill: ordered frontmatter
/// (the top-level name/description always win) plus the body.
pub fn build_skill_markdown(ingest: &IngestSkill) -> String {
    let mut values = frontmatter_values(ingest.frontmatter.as_ref());
    values.insert("name".into(), serde_json::json!(ingest.name));
    values.insert("description".into(), serde_json::json!(ingest.description));
    format!("{}\n\n{}\n", render_frontmatter(&values), ingest.body.trim())
}

pub fn build_subcommand_markdown(subcommand: &IngestSubcommand) -> String {
    let Some(frontmatter) = subcommand.frontmatter.as_ref() else {
        return format!("{}\n", subcommand.body.trim());
    };
    let mut values = frontmatter_values(Some(frontmatter));
    values.insert("name".into(), serde_json::json!(subcommand.name));
    format!(
        "{}\n\n{}\n",
        render_frontmatter(&values),
        subcommand.body.trim()
    )
}

fn frontmatter_values(
    frontmatter: Option<&IngestFrontmatter>,
) -> serde_json::Map<String, serde_json::Value> {
    frontmatter
        .and_then(|fm| serde_json::to_value(fm).ok())
        .and_then(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

fn render_frontmatter(values: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut lines = vec!["---".to_string()];
    for key in FRONTMATTER_ORDER {
        let Some(value) = values.get(key) else {
            continue;
        };
        match value {
            serde_json::Value::Array(items) => {
                lines.push(format!("{key}:"));
                for item in items {
                    lines.push(format!("  - {}", format_yaml_value(item)));
                }
            },
            other => lines.push(format!("{key}: {}", format_yaml_value(other))),
        }
    }
    lines.push("---".to_string());
    lines.join("\n")
}

fn format_yaml_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => value.to_string(),
        // Strings and anything nested are emitted JSON-encoded.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// The index `source` entry for an ingested skill.
pub fn build_ingest_source(ingest: &IngestSkill) -> SkillSource {
    SkillSource::Convert {
        value: ingest.source.value.clone(),
        url: (ingest.source.kind == "url").then(|| ingest.source.value.clone()),
    }
}

/// Sidecar metadata for an ingested skill, derived from the rendered
/// markdown so the checksum matches what lands on disk.
pub fn build_ingest_manifest(
    ingest: &IngestSkill,
    skill_markdown: &str,
) -> anyhow::Result<SkillManifest> {
    let parsed = parse_skill_markdown(skill_markdown);
    if parsed.description.is_none() {
        bail!("ingested skill is missing a description");
    }
    let mut manifest = build_manifest(&parsed, build_ingest_source(ingest), Some(&ingest.name))?;
    manifest.namespace = ingest.namespace.clone();
    manifest.categories = ingest.categories.clone();
    manifest.tags = ingest.tags.clone();
    Ok(manifest)
}

/// Write an ingested skill into the store: SKILL.md, sidecar, subcommand
/// documents, and supporting files. Refuses to overwrite an existing skill.
pub async fn write_ingested_skill(
    store: &SkillStore,
    ingest: &IngestSkill,
    skill_markdown: &str,
    manifest: &SkillManifest,
) -> anyhow::Result<()> {
    let target_dir = store.skill_dir(&ingest.name);
    if target_dir.exists() {
        bail!("skill already exists: {}. Use a different name.", ingest.name);
    }

    store.write(&ingest.name, skill_markdown, manifest).await?;

    for subcommand in &ingest.subcommands {
        let path = target_dir.join(format!("{}.md", subcommand.name));
        tokio::fs::write(path, build_subcommand_markdown(subcommand)).await?;
    }
    for file in &ingest.supporting_files {
        let path = target_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &file.contents).await?;
    }
    tracing::info!(skill = %ingest.name, "ingested skill written");
    Ok(())
}

const INGEST_SCHEMA_TEXT: &str = "Required JSON fields:\n\
- name (kebab-case)\n\
- description\n\
- body (markdown)\n\
- source { type, value }\n\
\n\
Optional fields:\n\
- frontmatter (agent-allowed keys only)\n\
- namespace\n\
- categories, tags\n\
- subcommands [{ name, body, frontmatter? }]\n\
- supporting_files [{ path, contents }]\n\
\n\
Rules:\n\
- SKILL.md frontmatter must include name + description\n\
- Subcommands are written as <name>.md in skill root\n\
- supporting_files paths must be relative (no .. or absolute paths)\n\
- Write JSON to ~/.skillbox/tmp/<name>.json or /tmp/skillbox-<name>.json\n\
- Or pipe JSON into: cat <file> | skillbox add --ingest -\n\
- Delete the JSON file after a successful ingest\n\
- Return JSON only (no markdown fences)";

const INGEST_GUIDANCE: &str = "Follow these skill-authoring patterns:\n\
- Keep SKILL.md concise (<500 lines); put deep detail in references/\n\
- Use scripts/ only for deterministic repeated tasks\n\
- Avoid README, changelog, installation guides\n\
- Put \"when to use\" guidance in the frontmatter description\n\
- Use progressive disclosure: link to references from SKILL.md\n\
- Body must not include YAML frontmatter (only use the frontmatter object)\n\
- Include sections: Quick start, Core workflow, Key concepts, Examples, References";

/// The prompt printed when a source cannot be fetched directly and the
/// user's agent should synthesize an ingest document instead.
pub fn build_ingest_prompt(input: &str) -> String {
    [
        "You are converting a source into a skillbox skill.",
        &format!("Input: {input}"),
        "",
        "Task:",
        "1) Fetch the page and follow relevant documentation links.",
        "2) Synthesize a high-quality skill from the content.",
        "3) Return strict JSON matching the schema below.",
        "4) Save the JSON to ~/.skillbox/tmp/<name>.json or /tmp/skillbox-<name>.json.",
        "5) Or pipe JSON into: cat <file> | skillbox add --ingest -",
        "6) After a successful ingest, delete the JSON file.",
        "",
        INGEST_GUIDANCE,
        "",
        "Schema:",
        INGEST_SCHEMA_TEXT,
    ]
    .join("\n")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(name: &str) -> String {
        format!(
            r##"{{"name":"{name}","description":"Does things","body":"# Body","source":{{"type":"url","value":"https://x.dev/doc"}}}}"##
        )
    }

    #[test]
    fn parses_minimal_document() {
        let ingest = parse_ingest(&minimal("my-skill")).unwrap();
        assert_eq!(ingest.name, "my-skill");
        assert!(ingest.subcommands.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"{"name":"a","description":"d","body":"b","source":{"type":"url","value":"v"},"extra":1}"#;
        assert!(parse_ingest(raw).is_err());
    }

    #[test]
    fn rejects_bad_names_and_frontmatter_in_body() {
        assert!(parse_ingest(&minimal("Bad Name")).is_err());

        let raw = r#"{"name":"a","description":"d","body":"---\nname: sneaky\n---\nb","source":{"type":"url","value":"v"}}"#;
        assert!(parse_ingest(raw).is_err());
    }

    #[test]
    fn rejects_unsafe_supporting_files() {
        for path in ["/abs/file.md", "../escape.md", "refs/../../up.md", "nested/SKILL.md"] {
            let raw = format!(
                r##"{{"name":"a","description":"d","body":"b","source":{{"type":"url","value":"v"}},"supporting_files":[{{"path":"{path}","contents":"x"}}]}}"##
            );
            assert!(parse_ingest(&raw).is_err(), "accepted {path}");
        }
    }

    #[test]
    fn markdown_emits_ordered_frontmatter() {
        let raw = r##"{
            "name": "my-skill",
            "description": "Does things",
            "body": "# Body",
            "source": {"type": "url", "value": "https://x.dev"},
            "frontmatter": {
                "allowed-tools": ["Bash(git:*)", "Read"],
                "user-invocable": true,
                "model": "fast"
            }
        }"##;
        let ingest = parse_ingest(raw).unwrap();
        let markdown = build_skill_markdown(&ingest);
        assert_eq!(
            markdown,
            "---\n\
             name: \"my-skill\"\n\
             description: \"Does things\"\n\
             user-invocable: true\n\
             allowed-tools:\n\
             \x20 - \"Bash(git:*)\"\n\
             \x20 - \"Read\"\n\
             model: \"fast\"\n\
             ---\n\n# Body\n"
        );
    }

    #[test]
    fn subcommand_without_frontmatter_is_bare_body() {
        let sub = IngestSubcommand {
            name: "sub".into(),
            body: "  # Sub\n".into(),
            frontmatter: None,
        };
        assert_eq!(build_subcommand_markdown(&sub), "# Sub\n");
    }

    #[test]
    fn manifest_carries_convert_source_and_meta() {
        let raw = r##"{
            "name": "my-skill",
            "description": "Does things",
            "body": "# Body",
            "source": {"type": "url", "value": "https://x.dev"},
            "namespace": "x",
            "tags": ["docs"]
        }"##;
        let ingest = parse_ingest(raw).unwrap();
        let markdown = build_skill_markdown(&ingest);
        let manifest = build_ingest_manifest(&ingest, &markdown).unwrap();
        assert_eq!(manifest.name, "my-skill");
        assert_eq!(manifest.namespace.as_deref(), Some("x"));
        assert_eq!(manifest.source, SkillSource::Convert {
            value: "https://x.dev".into(),
            url: Some("https://x.dev".into()),
        });
    }

    #[tokio::test]
    async fn write_refuses_existing_skill_and_writes_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SkillStore::new(tmp.path().join("skills"));

        let raw = r##"{
            "name": "my-skill",
            "description": "Does things",
            "body": "# Body",
            "source": {"type": "url", "value": "https://x.dev"},
            "subcommands": [{"name": "sub", "body": "# Sub"}],
            "supporting_files": [{"path": "references/api.md", "contents": "# API"}]
        }"##;
        let ingest = parse_ingest(raw).unwrap();
        let markdown = build_skill_markdown(&ingest);
        let manifest = build_ingest_manifest(&ingest, &markdown).unwrap();

        write_ingested_skill(&store, &ingest, &markdown, &manifest).await.unwrap();
        let dir = store.skill_dir("my-skill");
        assert!(dir.join("SKILL.md").exists());
        assert!(dir.join("skill.json").exists());
        assert!(dir.join("sub.md").exists());
        assert!(dir.join("references/api.md").exists());

        let err = write_ingested_skill(&store, &ingest, &markdown, &manifest)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
