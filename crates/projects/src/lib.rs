//! Project registry: which project roots skillbox knows about, and any
//! per-agent path overrides they carry.

pub mod root;
pub mod store;

pub use root::find_project_root;
pub use store::{ProjectEntry, ProjectRegistry, ProjectStore};
