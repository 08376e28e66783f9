//! Skill management: canonical store, frontmatter parsing, the install
//! index, target resolution, symlink/copy installs, and GitHub fetching.

pub mod discover;
pub mod fetch;
pub mod github;
pub mod index;
pub mod ingest;
pub mod install;
pub mod parse;
pub mod store;
pub mod targets;
pub mod types;

pub use {
    index::{IndexStore, SkillPatch},
    store::{SkillStore, checksum},
    types::{IndexedSkill, InstallRecord, SkillIndex, SkillManifest, SkillSource},
};
