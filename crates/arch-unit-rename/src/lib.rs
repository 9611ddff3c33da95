//! Renames a symbol identified by a pattern: resolves exactly one target
//! node, collects every inbound call reference plus the declaration site,
//! and applies the edits atomically per file.

pub mod apply;
pub mod error;
pub mod plan;

pub use apply::{apply_rename, RenameReport};
pub use error::RenameError;
pub use plan::{plan_rename, Edit, RenamePlan};

use arch_unit_core::store::AstCache;

/// Plans and, optionally, applies a rename in one call.
pub struct Renamer<'a> {
    cache: &'a dyn AstCache,
}

impl<'a> Renamer<'a> {
    pub fn new(cache: &'a dyn AstCache) -> Self {
        Renamer { cache }
    }

    /// Resolve `old_pattern` and compute its edits without touching disk.
    pub fn plan(&self, old_pattern: &str, new_name: &str) -> Result<RenamePlan, RenameError> {
        plan_rename(self.cache, old_pattern, new_name)
    }

    /// Plan and apply in one step.
    pub fn rename(&self, old_pattern: &str, new_name: &str, backup: bool) -> Result<RenameReport, RenameError> {
        let plan = self.plan(old_pattern, new_name)?;
        apply_rename(&plan, backup)
    }
}
