use std::collections::BTreeMap;

use {anyhow::bail, chrono::Utc};

use crate::{
    store::checksum,
    types::{SkillManifest, SkillSource},
};

/// A frontmatter value: a flat scalar or a list of scalars. Nested
/// structures are not part of the skill frontmatter contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

/// Result of parsing a SKILL.md document. `name`/`description` come from
/// frontmatter when present; `checksum` is always computed over the raw
/// text, frontmatter or not.
#[derive(Debug, Clone)]
pub struct ParsedSkill {
    pub name: Option<String>,
    pub description: Option<String>,
    pub checksum: String,
}

/// Validate a skill name: lowercase ASCII, digits, hyphens, 1-64 chars.
pub fn validate_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}

/// Split a document at `---` fences into (frontmatter, body). A document
/// without an opening fence is all body.
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(after_open) = content.strip_prefix("---\n") else {
        return (None, content);
    };
    match after_open.find("\n---") {
        Some(close) => {
            let body = after_open[close + 4..].trim_start_matches('\n');
            (Some(&after_open[..close]), body)
        },
        None => (None, content),
    }
}

/// Parse frontmatter lines into a flat map. Supported shapes are
/// `key: scalar`, `key: [a, b]`, and block lists:
///
/// ```text
/// key:
///   - item
/// ```
///
/// Unrecognized lines are skipped rather than rejected; skill files in the
/// wild carry all sorts of extra keys.
pub fn parse_frontmatter(frontmatter: &str) -> BTreeMap<String, FrontmatterValue> {
    let mut fields = BTreeMap::new();
    let mut pending_list: Option<(String, Vec<String>)> = None;

    for line in frontmatter.lines() {
        let trimmed = line.trim_start();
        if let Some((key, items)) = pending_list.as_mut() {
            if let Some(item) = trimmed.strip_prefix("- ") {
                items.push(unquote(item.trim()).to_string());
                continue;
            }
            let (key, items) = (key.clone(), std::mem::take(items));
            fields.insert(key, FrontmatterValue::List(items));
            pending_list = None;
        }

        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.starts_with('-') || line.starts_with(char::is_whitespace) {
            continue;
        }
        let value = rest.trim();
        if value.is_empty() {
            pending_list = Some((key.to_string(), Vec::new()));
        } else if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            let items = inner
                .split(',')
                .map(|item| unquote(item.trim()).to_string())
                .filter(|item| !item.is_empty())
                .collect();
            fields.insert(key.to_string(), FrontmatterValue::List(items));
        } else {
            fields.insert(key.to_string(), FrontmatterValue::Scalar(unquote(value).to_string()));
        }
    }

    if let Some((key, items)) = pending_list {
        fields.insert(key, FrontmatterValue::List(items));
    }
    fields
}

fn unquote(value: &str) -> &str {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value)
}

fn scalar(fields: &BTreeMap<String, FrontmatterValue>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(FrontmatterValue::Scalar(value)) => Some(value.clone()),
        _ => None,
    }
}

/// Parse a SKILL.md document. Never fails: a malformed or absent
/// frontmatter block simply yields no name/description.
pub fn parse_skill_markdown(markdown: &str) -> ParsedSkill {
    let (frontmatter, _body) = split_frontmatter(markdown);
    let fields = frontmatter.map(parse_frontmatter).unwrap_or_default();
    ParsedSkill {
        name: scalar(&fields, "name"),
        description: scalar(&fields, "description"),
        checksum: checksum(markdown),
    }
}

/// Derive a skill name from the last meaningful URL path segment.
/// `.../my-skill/SKILL.md` names the skill `my-skill`.
pub fn infer_name_from_url(url: &str) -> Option<String> {
    let cleaned = url.split(['?', '#']).next().unwrap_or(url);
    let parts: Vec<&str> = cleaned.split('/').filter(|p| !p.is_empty()).collect();
    let last = parts.last()?;
    let base = last.to_lowercase();
    if base == "skill.md" || base == "skill" || base == "skill.json" {
        if parts.len() < 2 {
            return None;
        }
        return Some(parts[parts.len() - 2].to_string());
    }
    Some(last.strip_suffix(".md").unwrap_or(last).to_string())
}

/// Build sidecar metadata for a freshly parsed skill. The name override
/// (from a URL or `--name` flag) wins over the frontmatter name.
pub fn build_manifest(
    parsed: &ParsedSkill,
    source: SkillSource,
    name_override: Option<&str>,
) -> anyhow::Result<SkillManifest> {
    let Some(name) = name_override.map(str::to_string).or_else(|| parsed.name.clone()) else {
        bail!("skill metadata requires a name");
    };
    Ok(SkillManifest {
        name,
        version: "0.1.0".into(),
        description: parsed.description.clone(),
        entry: "SKILL.md".into(),
        namespace: None,
        categories: None,
        tags: None,
        source,
        checksum: parsed.checksum.clone(),
        updated_at: Utc::now(),
    })
}
