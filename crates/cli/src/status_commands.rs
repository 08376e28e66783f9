use {
    chrono::Utc,
    serde::Serialize,
    skillbox_skills::{IndexedSkill, checksum, fetch::fetch_text},
};

use crate::{
    output::{self, JsonResult, print_info, print_json},
    runtime::{Runtime, RuntimeOptions},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillStatus {
    name: String,
    source: &'static str,
    trackable: bool,
    outdated: bool,
    local_checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Only url sources are actually compared against the remote; git sources
/// are trackable through `update` but a status check would need a full
/// tree walk, so they are reported as-is.
async fn check_skill(skill: &IndexedSkill) -> SkillStatus {
    let kind = skill.source.kind();
    let trackable = matches!(kind, "url" | "git");

    let skillbox_skills::SkillSource::Url { url } = &skill.source else {
        return SkillStatus {
            name: skill.name.clone(),
            source: kind,
            trackable,
            outdated: false,
            local_checksum: skill.checksum.clone(),
            remote_checksum: None,
            error: None,
        };
    };

    match fetch_text(url).await {
        Ok(remote_text) => {
            let remote_checksum = checksum(&remote_text);
            let outdated = remote_checksum != skill.checksum;
            SkillStatus {
                name: skill.name.clone(),
                source: kind,
                trackable: true,
                outdated,
                local_checksum: skill.checksum.clone(),
                remote_checksum: Some(remote_checksum),
                error: None,
            }
        },
        Err(e) => SkillStatus {
            name: skill.name.clone(),
            source: kind,
            trackable: true,
            outdated: false,
            local_checksum: skill.checksum.clone(),
            remote_checksum: None,
            error: Some(e.to_string()),
        },
    }
}

const SOURCE_ORDER: [&str; 4] = ["url", "git", "local", "convert"];

struct SourceGroup {
    source: &'static str,
    skills: Vec<SkillStatus>,
    trackable: bool,
    outdated_count: usize,
}

fn group_by_source(mut statuses: Vec<SkillStatus>) -> Vec<SourceGroup> {
    statuses.sort_by(|a, b| a.name.cmp(&b.name));
    let mut groups = Vec::new();
    for source in SOURCE_ORDER {
        let (matched, rest): (Vec<_>, Vec<_>) =
            statuses.into_iter().partition(|s| s.source == source);
        statuses = rest;
        if matched.is_empty() {
            continue;
        }
        let trackable = matched.iter().any(|s| s.trackable);
        let outdated_count = matched.iter().filter(|s| s.outdated).count();
        groups.push(SourceGroup {
            source,
            skills: matched,
            trackable,
            outdated_count,
        });
    }
    groups
}

fn print_source_group(group: &SourceGroup) {
    let count = group.skills.len();
    let skill_word = if count == 1 { "skill" } else { "skills" };
    if !group.trackable {
        print_info(&format!("{} ({count} {skill_word} - not tracked)", group.source));
    } else if group.outdated_count > 0 {
        print_info(&format!(
            "{} ({count} {skill_word}, {} outdated)",
            group.source, group.outdated_count
        ));
    } else {
        print_info(&format!("{} ({count} {skill_word})", group.source));
    }

    for skill in &group.skills {
        if !group.trackable {
            print_info(&format!("  {}", skill.name));
        } else if let Some(error) = &skill.error {
            print_info(&format!("  ? {} ({error})", skill.name));
        } else if skill.outdated {
            print_info(&format!("  ✗ {} (outdated)", skill.name));
        } else {
            print_info(&format!("  ✓ {}", skill.name));
        }
    }
}

pub async fn handle_status(json: bool) -> anyhow::Result<()> {
    if let Err(e) = run_status(json).await {
        output::handle_command_error(json, "status", &e);
    }
    Ok(())
}

async fn run_status(json: bool) -> anyhow::Result<()> {
    let runtime = Runtime::resolve(&RuntimeOptions::default())?;
    let index_store = runtime.index_store();
    let mut index = index_store.load()?;

    let mut statuses = Vec::with_capacity(index.skills.len());
    for skill in &index.skills {
        statuses.push(check_skill(skill).await);
    }
    let now = Utc::now();
    for (skill, status) in index.skills.iter_mut().zip(&statuses) {
        if status.trackable && status.error.is_none() {
            skill.last_checked = Some(now);
        }
    }
    index_store.save(&index)?;

    let total_outdated = statuses.iter().filter(|s| s.outdated).count();
    let total_trackable = statuses.iter().filter(|s| s.trackable).count();
    let total_up_to_date = statuses
        .iter()
        .filter(|s| s.trackable && !s.outdated && s.error.is_none())
        .count();
    let total = statuses.len();
    let groups = group_by_source(statuses);

    if json {
        print_json(&JsonResult {
            ok: true,
            command: "status",
            data: Some(serde_json::json!({
                "total": total,
                "outdated": total_outdated,
                "upToDate": total_up_to_date,
                "trackable": total_trackable,
                "skills": groups.iter().flat_map(|g| &g.skills).collect::<Vec<_>>(),
            })),
            error: None,
        });
        return Ok(());
    }

    print_info("Skill Status");
    for group in &groups {
        print_info("");
        print_source_group(group);
    }
    if total_outdated > 0 {
        print_info("");
        print_info(&format!(
            "Run 'skillbox update' to update {total_outdated} outdated skill(s)."
        ));
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, source: &'static str, trackable: bool, outdated: bool) -> SkillStatus {
        SkillStatus {
            name: name.into(),
            source,
            trackable,
            outdated,
            local_checksum: "c".into(),
            remote_checksum: None,
            error: None,
        }
    }

    #[test]
    fn groups_follow_source_order() {
        let groups = group_by_source(vec![
            status("a", "local", false, false),
            status("b", "url", true, true),
            status("c", "git", true, false),
        ]);
        let order: Vec<&str> = groups.iter().map(|g| g.source).collect();
        assert_eq!(order, vec!["url", "git", "local"]);
        assert_eq!(groups[0].outdated_count, 1);
        assert!(!groups[2].trackable);
    }

    #[test]
    fn skills_sorted_within_group() {
        let groups = group_by_source(vec![
            status("zeta", "url", true, false),
            status("alpha", "url", true, false),
        ]);
        assert_eq!(groups[0].skills[0].name, "alpha");
        assert_eq!(groups[0].skills[1].name, "zeta");
    }
}
