//! Dependency store: persists scanned manifests' dependency lists, replacing
//! per-manifest-file exactly as `ViolationCache` replaces per-file
//! violations. Kept as its own store, outside the frozen `AstCache`
//! contract, the same way violations live outside it.

use rusqlite::{params, Connection};

use arch_unit_core::types::CacheError;

use crate::manifest::{Dependency, DependencyKind, Ecosystem};

pub struct DependencyStore {
    conn: Connection,
}

impl DependencyStore {
    pub fn open(path: &std::path::Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let store = DependencyStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let store = DependencyStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS dependencies (
                id INTEGER PRIMARY KEY,
                manifest_path TEXT NOT NULL,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                kind TEXT NOT NULL,
                ecosystem TEXT NOT NULL,
                git TEXT,
                UNIQUE (manifest_path, name, version, kind)
            );
            CREATE INDEX IF NOT EXISTS idx_dependencies_manifest ON dependencies(manifest_path);",
        )?;
        Ok(())
    }

    /// Replace all dependencies recorded for `manifest_path`.
    pub fn store_dependencies(&mut self, manifest_path: &str, deps: &[Dependency]) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM dependencies WHERE manifest_path = ?1", params![manifest_path])?;
        for dep in deps {
            tx.execute(
                "INSERT OR IGNORE INTO dependencies (manifest_path, name, version, kind, ecosystem, git) \
                 VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    manifest_path,
                    dep.name,
                    dep.version,
                    kind_str(dep.kind),
                    ecosystem_str(dep.ecosystem),
                    dep.git,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_all_dependencies(&self) -> Result<Vec<Dependency>, CacheError> {
        let mut stmt = self
            .conn
            .prepare("SELECT manifest_path, name, version, kind, ecosystem, git FROM dependencies ORDER BY manifest_path, name")?;
        let rows = stmt.query_map([], row_to_dependency)?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    pub fn get_dependencies_for_manifest(&self, manifest_path: &str) -> Result<Vec<Dependency>, CacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT manifest_path, name, version, kind, ecosystem, git FROM dependencies \
             WHERE manifest_path = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![manifest_path], row_to_dependency)?;
        Ok(rows.filter_map(Result::ok).collect())
    }
}

fn kind_str(kind: DependencyKind) -> &'static str {
    match kind {
        DependencyKind::Runtime => "runtime",
        DependencyKind::Dev => "dev",
        DependencyKind::Build => "build",
    }
}

fn ecosystem_str(ecosystem: Ecosystem) -> &'static str {
    match ecosystem {
        Ecosystem::Go => "go",
        Ecosystem::Npm => "npm",
        Ecosystem::Python => "python",
        Ecosystem::Helm => "helm",
        Ecosystem::Docker => "docker",
    }
}

fn row_to_dependency(row: &rusqlite::Row) -> rusqlite::Result<Dependency> {
    let kind: String = row.get(3)?;
    let ecosystem: String = row.get(4)?;
    Ok(Dependency {
        name: row.get(1)?,
        version: row.get(2)?,
        kind: match kind.as_str() {
            "dev" => DependencyKind::Dev,
            "build" => DependencyKind::Build,
            _ => DependencyKind::Runtime,
        },
        ecosystem: match ecosystem.as_str() {
            "npm" => Ecosystem::Npm,
            "python" => Ecosystem::Python,
            "helm" => Ecosystem::Helm,
            "docker" => Ecosystem::Docker,
            _ => Ecosystem::Go,
        },
        git: row.get(5)?,
        manifest_path: row.get(0)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(manifest: &str, name: &str) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: "1.0".to_string(),
            kind: DependencyKind::Runtime,
            ecosystem: Ecosystem::Npm,
            git: None,
            manifest_path: manifest.to_string(),
        }
    }

    #[test]
    fn store_replaces_per_manifest() {
        let mut store = DependencyStore::in_memory().unwrap();
        store.store_dependencies("package.json", &[dep("package.json", "left-pad")]).unwrap();
        store.store_dependencies("go.mod", &[dep("go.mod", "errors")]).unwrap();
        store.store_dependencies("package.json", &[dep("package.json", "chalk")]).unwrap();

        let all = store.get_all_dependencies().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|d| d.name == "chalk"));
        assert!(!all.iter().any(|d| d.name == "left-pad"));
        assert!(all.iter().any(|d| d.name == "errors"));
    }
}
