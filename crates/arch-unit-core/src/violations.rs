//! Violation cache: the durable record of rule-engine
//! findings, independent of the AST cache so that `violations list` works
//! without re-running analysis.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::types::CacheError;

/// A single rule-engine finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub id: u64,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    /// The linter/rule source that produced this, e.g. `"imports"`, or a
    /// third-party linter name for passthrough findings.
    pub source: String,
    pub rule_id: Option<String>,
    pub message: String,
    pub called_package: Option<String>,
    pub called_method: Option<String>,
    pub fixable: bool,
    pub fix_applicability: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// SQLite-backed violation cache, keyed by its own database file
/// (`~/.cache/arch-unit/violations.db`).
pub struct ViolationCache {
    conn: Connection,
}

impl ViolationCache {
    pub fn open(path: &std::path::Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Database(format!("creating cache dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        let cache = ViolationCache { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let cache = ViolationCache { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS violations (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                line INTEGER NOT NULL,
                column_no INTEGER NOT NULL,
                source TEXT NOT NULL,
                rule_id TEXT,
                message TEXT NOT NULL,
                called_package TEXT,
                called_method TEXT,
                fixable INTEGER NOT NULL DEFAULT 0,
                fix_applicability TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (file_path, line, column_no, source, message)
            );
            CREATE INDEX IF NOT EXISTS idx_violations_file ON violations(file_path);
            CREATE INDEX IF NOT EXISTS idx_violations_source ON violations(source);",
        )?;
        Ok(())
    }

    /// Store violations for one file, scoped to one `source` (a linter name
    /// or `"arch-unit"`). Overwrites whatever that `(file_path, source)` pair
    /// owned before; violations from other sources against the same file are
    /// untouched, so a rule-engine rescan never clobbers a linter's findings
    /// and vice versa.
    pub fn store_violations(
        &mut self,
        file_path: &str,
        source: &str,
        violations: &[Violation],
    ) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM violations WHERE file_path = ?1 AND source = ?2",
            params![file_path, source],
        )?;
        for v in violations {
            tx.execute(
                "INSERT OR IGNORE INTO violations (file_path, line, column_no, source, rule_id, \
                 message, called_package, called_method, fixable, fix_applicability, created_at) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                params![
                    v.file_path,
                    v.line,
                    v.column,
                    v.source,
                    v.rule_id,
                    v.message,
                    v.called_package,
                    v.called_method,
                    v.fixable as i32,
                    v.fix_applicability,
                    v.created_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_all_violations(&self) -> Result<Vec<Violation>, CacheError> {
        let mut stmt = self.conn.prepare("SELECT * FROM violations ORDER BY file_path, line")?;
        let rows = stmt.query_map([], row_to_violation)?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    pub fn get_violations_by_source(&self, source: &str) -> Result<Vec<Violation>, CacheError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM violations WHERE source = ?1 ORDER BY file_path, line")?;
        let rows = stmt.query_map(params![source], row_to_violation)?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    pub fn get_violations_by_sources(&self, sources: &[String]) -> Result<Vec<Violation>, CacheError> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = sources.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT * FROM violations WHERE source IN ({placeholders}) ORDER BY file_path, line"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            sources.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(param_refs.as_slice(), row_to_violation)?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    /// Clear violations, optionally scoped by age and/or a file-path glob.
    pub fn clear_violations(
        &mut self,
        older_than: Option<chrono::Duration>,
        path_glob: Option<&globset::GlobMatcher>,
    ) -> Result<u64, CacheError> {
        let cutoff = older_than.map(|d| (chrono::Utc::now() - d).to_rfc3339());
        let mut stmt = self.conn.prepare("SELECT id, file_path, created_at FROM violations")?;
        let candidates: Vec<(u64, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .filter_map(Result::ok)
            .collect();
        drop(stmt);

        let mut removed = 0u64;
        let tx = self.conn.transaction()?;
        for (id, file_path, created_at) in candidates {
            if let Some(ref cutoff) = cutoff {
                if created_at.as_str() >= cutoff.as_str() {
                    continue;
                }
            }
            if let Some(glob) = path_glob {
                if !glob.is_match(&file_path) {
                    continue;
                }
            }
            tx.execute("DELETE FROM violations WHERE id = ?1", params![id])?;
            removed += 1;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Purge every violation owned by `file_path`, across all sources. Used
    /// when a file is deleted from disk and rescanned away.
    pub fn purge_file(&mut self, file_path: &str) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM violations WHERE file_path = ?1", params![file_path])?;
        Ok(())
    }
}

fn row_to_violation(row: &rusqlite::Row) -> rusqlite::Result<Violation> {
    let created_at: String = row.get("created_at")?;
    Ok(Violation {
        id: row.get("id")?,
        file_path: row.get("file_path")?,
        line: row.get("line")?,
        column: row.get("column_no")?,
        source: row.get("source")?,
        rule_id: row.get("rule_id")?,
        message: row.get("message")?,
        called_package: row.get("called_package")?,
        called_method: row.get("called_method")?,
        fixable: row.get::<_, i32>("fixable")? != 0,
        fix_applicability: row.get("fix_applicability")?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(file: &str, line: u32, source: &str, message: &str) -> Violation {
        Violation {
            id: 0,
            file_path: file.to_string(),
            line,
            column: 1,
            source: source.to_string(),
            rule_id: None,
            message: message.to_string(),
            called_package: None,
            called_method: None,
            fixable: false,
            fix_applicability: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_store_and_get_all() {
        let mut cache = ViolationCache::in_memory().unwrap();
        cache
            .store_violations("a.go", "imports", &[violation("a.go", 1, "imports", "forbidden import")])
            .unwrap();
        let all = cache.get_all_violations().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].message, "forbidden import");
    }

    #[test]
    fn test_store_violations_replaces_same_source_only() {
        let mut cache = ViolationCache::in_memory().unwrap();
        cache
            .store_violations("a.go", "imports", &[violation("a.go", 1, "imports", "old finding")])
            .unwrap();
        cache
            .store_violations(
                "a.go",
                "golangci-lint",
                &[violation("a.go", 2, "golangci-lint", "lint finding")],
            )
            .unwrap();
        cache
            .store_violations("a.go", "imports", &[violation("a.go", 3, "imports", "new finding")])
            .unwrap();
        let all = cache.get_all_violations().unwrap();
        assert_eq!(all.len(), 2, "rescanning one source must not drop another source's findings");
        assert!(all.iter().any(|v| v.message == "new finding"));
        assert!(all.iter().any(|v| v.message == "lint finding"));
        assert!(!all.iter().any(|v| v.message == "old finding"));
    }

    #[test]
    fn test_get_violations_by_source() {
        let mut cache = ViolationCache::in_memory().unwrap();
        cache
            .store_violations("a.go", "imports", &[violation("a.go", 1, "imports", "m1")])
            .unwrap();
        cache
            .store_violations(
                "a.go",
                "golangci-lint",
                &[violation("a.go", 2, "golangci-lint", "m2")],
            )
            .unwrap();
        let imports = cache.get_violations_by_source("imports").unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].message, "m1");
    }

    #[test]
    fn test_dedup_identical_tuples() {
        let mut cache = ViolationCache::in_memory().unwrap();
        let v = violation("a.go", 1, "imports", "dup");
        cache.store_violations("a.go", "imports", &[v.clone(), v]).unwrap();
        assert_eq!(cache.get_all_violations().unwrap().len(), 1);
    }

    #[test]
    fn test_purge_file_removes_all_sources() {
        let mut cache = ViolationCache::in_memory().unwrap();
        cache
            .store_violations("a.go", "imports", &[violation("a.go", 1, "imports", "m1")])
            .unwrap();
        cache
            .store_violations("a.go", "golangci-lint", &[violation("a.go", 2, "golangci-lint", "m2")])
            .unwrap();
        cache.purge_file("a.go").unwrap();
        assert!(cache.get_all_violations().unwrap().is_empty());
    }

    #[test]
    fn test_clear_violations_by_glob() {
        let mut cache = ViolationCache::in_memory().unwrap();
        cache
            .store_violations("internal/a.go", "imports", &[violation("internal/a.go", 1, "imports", "m")])
            .unwrap();
        cache
            .store_violations("cmd/b.go", "imports", &[violation("cmd/b.go", 1, "imports", "n")])
            .unwrap();

        let glob = globset::Glob::new("internal/**").unwrap().compile_matcher();
        let removed = cache.clear_violations(None, Some(&glob)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.get_all_violations().unwrap().len(), 1);
    }
}
