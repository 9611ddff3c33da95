//! Shared setup every command needs: the working directory, the loaded
//! config, and handles onto the three sqlite-backed caches.

use std::path::PathBuf;

use arch_unit_core::config::{CachePaths, Config};
use arch_unit_core::sqlite::SqliteAstCache;
use arch_unit_core::store::AstCache;
use arch_unit_core::violations::ViolationCache;
use arch_unit_runner::StatsStore;

pub struct CliContext {
    pub cwd: PathBuf,
    pub config: Config,
    pub paths: CachePaths,
}

impl CliContext {
    pub fn load(path: Option<&str>) -> Result<Self, String> {
        let cwd = match path {
            Some(p) => PathBuf::from(p),
            None => std::env::current_dir().map_err(|e| format!("failed to get current directory: {e}"))?,
        };
        let config = Config::load(&cwd);
        let paths = CachePaths::resolve();
        Ok(CliContext { cwd, config, paths })
    }

    pub fn open_ast_cache(&self) -> Result<SqliteAstCache, String> {
        SqliteAstCache::open(&self.paths.ast_db).map_err(|e| format!("failed to open AST cache: {e}"))
    }

    pub fn open_ast_cache_boxed(&self) -> Result<Box<dyn AstCache + Send>, String> {
        Ok(Box::new(self.open_ast_cache()?))
    }

    pub fn open_violations(&self) -> Result<ViolationCache, String> {
        ViolationCache::open(&self.paths.violations_db).map_err(|e| format!("failed to open violation cache: {e}"))
    }

    pub fn open_stats(&self) -> Result<StatsStore, String> {
        StatsStore::open(&self.paths.stats_db).map_err(|e| format!("failed to open stats store: {e}"))
    }
}

/// True iff `path`, relative to `root`, is excluded by a simple prefix/glob
/// list (used by `check --include/--exclude`, which operate on top of
/// whatever the cache already has rather than re-walking the filesystem).
pub fn path_matches_any(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| arch_unit_query::pattern::glob_match(p, path))
}
