//! Execution history for the debounce contract (§4.7.2): one row per
//! `(analyzer, workdir)` pair, tracking the running average duration and the
//! adaptation state debounce is derived from.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use arch_unit_core::types::CacheError;

/// Recorded history for one `(analyzer, workdir)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionHistory {
    pub analyzer: String,
    pub workdir: String,
    pub last_run_at: chrono::DateTime<chrono::Utc>,
    pub avg_duration_ms: f64,
    pub run_count: u64,
    pub consecutive_no_violations: u32,
    pub consecutive_violations: u32,
    pub adaptation_factor: f64,
}

impl ExecutionHistory {
    fn fresh(analyzer: &str, workdir: &str) -> Self {
        ExecutionHistory {
            analyzer: analyzer.to_string(),
            workdir: workdir.to_string(),
            last_run_at: chrono::DateTime::<chrono::Utc>::from_timestamp(0, 0).unwrap(),
            avg_duration_ms: 0.0,
            run_count: 0,
            consecutive_no_violations: 0,
            consecutive_violations: 0,
            adaptation_factor: 1.0,
        }
    }
}

/// SQLite-backed store for analyzer execution history
/// (`~/.cache/arch-unit-stats.db`).
pub struct StatsStore {
    conn: Connection,
}

impl StatsStore {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let store = StatsStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let store = StatsStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS execution_history (
                analyzer TEXT NOT NULL,
                workdir TEXT NOT NULL,
                last_run_at TEXT NOT NULL,
                avg_duration_ms REAL NOT NULL,
                run_count INTEGER NOT NULL,
                consecutive_no_violations INTEGER NOT NULL,
                consecutive_violations INTEGER NOT NULL,
                adaptation_factor REAL NOT NULL,
                PRIMARY KEY (analyzer, workdir)
            );",
        )?;
        Ok(())
    }

    /// History for `(analyzer, workdir)`, or a fresh zero-run record if none
    /// exists yet.
    pub fn get(&self, analyzer: &str, workdir: &str) -> Result<ExecutionHistory, CacheError> {
        let row = self.conn.query_row(
            "SELECT last_run_at, avg_duration_ms, run_count, consecutive_no_violations, \
             consecutive_violations, adaptation_factor FROM execution_history \
             WHERE analyzer = ?1 AND workdir = ?2",
            params![analyzer, workdir],
            |row| {
                let last_run_at: String = row.get(0)?;
                Ok(ExecutionHistory {
                    analyzer: analyzer.to_string(),
                    workdir: workdir.to_string(),
                    last_run_at: chrono::DateTime::parse_from_rfc3339(&last_run_at)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .unwrap_or_else(|_| chrono::Utc::now()),
                    avg_duration_ms: row.get(1)?,
                    run_count: row.get(2)?,
                    consecutive_no_violations: row.get(3)?,
                    consecutive_violations: row.get(4)?,
                    adaptation_factor: row.get(5)?,
                })
            },
        );
        match row {
            Ok(h) => Ok(h),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(ExecutionHistory::fresh(analyzer, workdir)),
            Err(e) => Err(e.into()),
        }
    }

    /// Record one execution, updating the running average duration and the
    /// adaptation counters per §4.7.2.
    pub fn record(
        &mut self,
        analyzer: &str,
        workdir: &str,
        duration_ms: f64,
        had_violations: bool,
    ) -> Result<ExecutionHistory, CacheError> {
        let mut history = self.get(analyzer, workdir)?;
        history.avg_duration_ms = if history.run_count == 0 {
            duration_ms
        } else {
            // Exponential moving average over the trailing runs.
            history.avg_duration_ms * 0.7 + duration_ms * 0.3
        };
        history.run_count += 1;
        history.last_run_at = chrono::Utc::now();

        if had_violations {
            history.consecutive_violations += 1;
            history.consecutive_no_violations = 0;
            if history.consecutive_violations >= 3 {
                history.adaptation_factor = (history.adaptation_factor * 0.9).max(0.5);
                history.consecutive_violations = 0;
            }
        } else {
            history.consecutive_no_violations += 1;
            history.consecutive_violations = 0;
            if history.consecutive_no_violations >= 5 {
                history.adaptation_factor = (history.adaptation_factor * 1.1).min(2.0);
                history.consecutive_no_violations = 0;
            }
        }

        self.conn.execute(
            "INSERT INTO execution_history (analyzer, workdir, last_run_at, avg_duration_ms, \
             run_count, consecutive_no_violations, consecutive_violations, adaptation_factor) \
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8) \
             ON CONFLICT(analyzer, workdir) DO UPDATE SET \
             last_run_at = excluded.last_run_at, avg_duration_ms = excluded.avg_duration_ms, \
             run_count = excluded.run_count, \
             consecutive_no_violations = excluded.consecutive_no_violations, \
             consecutive_violations = excluded.consecutive_violations, \
             adaptation_factor = excluded.adaptation_factor",
            params![
                analyzer,
                workdir,
                history.last_run_at.to_rfc3339(),
                history.avg_duration_ms,
                history.run_count,
                history.consecutive_no_violations,
                history.consecutive_violations,
                history.adaptation_factor,
            ],
        )?;
        Ok(history)
    }

    /// All recorded `(analyzer, workdir)` histories, for `stats`.
    pub fn all(&self) -> Result<Vec<ExecutionHistory>, CacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT analyzer, workdir, last_run_at, avg_duration_ms, run_count, \
             consecutive_no_violations, consecutive_violations, adaptation_factor \
             FROM execution_history ORDER BY analyzer, workdir",
        )?;
        let rows = stmt.query_map([], |row| {
            let analyzer: String = row.get(0)?;
            let workdir: String = row.get(1)?;
            let last_run_at: String = row.get(2)?;
            Ok(ExecutionHistory {
                analyzer,
                workdir,
                last_run_at: chrono::DateTime::parse_from_rfc3339(&last_run_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
                avg_duration_ms: row.get(3)?,
                run_count: row.get(4)?,
                consecutive_no_violations: row.get(5)?,
                consecutive_violations: row.get(6)?,
                adaptation_factor: row.get(7)?,
            })
        })?;
        Ok(rows.filter_map(Result::ok).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_history_has_factor_one() {
        let store = StatsStore::in_memory().unwrap();
        let h = store.get("imports", "/repo").unwrap();
        assert_eq!(h.adaptation_factor, 1.0);
        assert_eq!(h.run_count, 0);
    }

    #[test]
    fn five_clean_runs_bump_factor() {
        let mut store = StatsStore::in_memory().unwrap();
        let mut last = None;
        for _ in 0..5 {
            last = Some(store.record("imports", "/repo", 10.0, false).unwrap());
        }
        let h = last.unwrap();
        assert!((h.adaptation_factor - 1.1).abs() < 1e-9);
        assert_eq!(h.consecutive_no_violations, 0);
    }

    #[test]
    fn three_dirty_runs_drop_factor() {
        let mut store = StatsStore::in_memory().unwrap();
        let mut last = None;
        for _ in 0..3 {
            last = Some(store.record("imports", "/repo", 10.0, true).unwrap());
        }
        assert!((last.unwrap().adaptation_factor - 0.9).abs() < 1e-9);
    }

    #[test]
    fn factor_caps_and_floors() {
        let mut store = StatsStore::in_memory().unwrap();
        let mut last = None;
        for _ in 0..50 {
            last = Some(store.record("imports", "/repo", 10.0, false).unwrap());
        }
        assert!(last.unwrap().adaptation_factor <= 2.0);
    }
}
