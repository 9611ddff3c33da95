//! SQLite-backed implementation of [`AstCache`].

use rusqlite::{params, Connection, Row};

use crate::store::AstCache;
use crate::types::{
    AstNode, CacheError, EdgeDirection, FileMetadata, IdentityKey, Language, LibraryNode,
    LibraryRelationship, NodeChange, NodeKind, Parameter, Relationship, RelationshipChange,
    RelationshipKind,
};

const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed [`AstCache`]. One instance owns one connection; callers
/// serialize writes externally (the runner holds the only writer at a time).
pub struct SqliteAstCache {
    conn: Connection,
}

impl SqliteAstCache {
    /// Open or create an AST cache database at `path` (typically
    /// `~/.cache/arch-unit/ast.db`).
    pub fn open(path: &std::path::Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Database(format!("creating cache dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let cache = SqliteAstCache { conn };
        cache.initialize_schema()?;
        cache.check_integrity()?;
        Ok(cache)
    }

    /// In-memory cache, for tests and ephemeral scans.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let cache = SqliteAstCache { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS arch_unit_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ast_nodes (
                id INTEGER PRIMARY KEY,
                identity_key TEXT NOT NULL UNIQUE,
                file_path TEXT NOT NULL,
                language TEXT NOT NULL,
                package_name TEXT,
                type_name TEXT,
                method_name TEXT,
                field_name TEXT,
                node_type TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                line_count INTEGER NOT NULL,
                cyclomatic_complexity INTEGER NOT NULL DEFAULT 0,
                parameter_count INTEGER NOT NULL DEFAULT 0,
                return_count INTEGER NOT NULL DEFAULT 0,
                summary TEXT,
                field_type TEXT,
                default_value TEXT,
                parent_id INTEGER REFERENCES ast_nodes(id) ON DELETE SET NULL,
                parameters_json TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_ast_nodes_file ON ast_nodes(file_path);
            CREATE INDEX IF NOT EXISTS idx_ast_nodes_package ON ast_nodes(package_name);
            CREATE INDEX IF NOT EXISTS idx_ast_nodes_type ON ast_nodes(type_name);
            CREATE INDEX IF NOT EXISTS idx_ast_nodes_kind ON ast_nodes(node_type);

            CREATE TABLE IF NOT EXISTS ast_relationships (
                id INTEGER PRIMARY KEY,
                from_id INTEGER NOT NULL REFERENCES ast_nodes(id) ON DELETE CASCADE,
                to_id INTEGER REFERENCES ast_nodes(id) ON DELETE SET NULL,
                to_text TEXT,
                line_no INTEGER NOT NULL,
                column_no INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('call', 'import', 'inherits', 'implements'))
            );
            CREATE INDEX IF NOT EXISTS idx_rel_from ON ast_relationships(from_id);
            CREATE INDEX IF NOT EXISTS idx_rel_to ON ast_relationships(to_id);
            CREATE INDEX IF NOT EXISTS idx_rel_kind ON ast_relationships(kind);

            CREATE TABLE IF NOT EXISTS library_nodes (
                id INTEGER PRIMARY KEY,
                framework TEXT NOT NULL,
                package TEXT NOT NULL,
                symbol TEXT NOT NULL,
                UNIQUE (framework, package, symbol)
            );

            CREATE TABLE IF NOT EXISTS library_relationships (
                id INTEGER PRIMARY KEY,
                from_id INTEGER NOT NULL REFERENCES ast_nodes(id) ON DELETE CASCADE,
                library_id INTEGER NOT NULL REFERENCES library_nodes(id) ON DELETE CASCADE,
                line_no INTEGER NOT NULL,
                column_no INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_libedge_from ON library_relationships(from_id);

            CREATE TABLE IF NOT EXISTS file_metadata (
                file_path TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                language TEXT NOT NULL,
                last_scanned_at TEXT NOT NULL
            );
            ",
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO arch_unit_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Surfaces a [`CacheError::Corruption`] if `PRAGMA integrity_check`
    /// reports anything other than `ok`.
    fn check_integrity(&self) -> Result<(), CacheError> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if result != "ok" {
            return Err(CacheError::Corruption(result));
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32, CacheError> {
        let version: String = self.conn.query_row(
            "SELECT value FROM arch_unit_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| CacheError::Database(format!("invalid schema version: {e}")))
    }

    fn row_to_node(row: &Row) -> rusqlite::Result<AstNode> {
        let node_type: String = row.get("node_type")?;
        let language: String = row.get("language")?;
        let params_json: String = row.get("parameters_json")?;
        Ok(AstNode {
            id: row.get("id")?,
            node_type: NodeKind::from_str(&node_type).unwrap_or(NodeKind::Function),
            file_path: row.get("file_path")?,
            language: Language::from_str(&language).unwrap_or(Language::Go),
            package: row.get("package_name")?,
            type_name: row.get("type_name")?,
            method: row.get("method_name")?,
            field: row.get("field_name")?,
            start_line: row.get("start_line")?,
            end_line: row.get("end_line")?,
            line_count: row.get("line_count")?,
            cyclomatic_complexity: row.get("cyclomatic_complexity")?,
            parameter_count: row.get("parameter_count")?,
            return_count: row.get("return_count")?,
            parent_id: row.get("parent_id")?,
            summary: row.get("summary")?,
            field_type: row.get("field_type")?,
            default_value: row.get("default_value")?,
            parameters: serde_json::from_str::<Vec<Parameter>>(&params_json).unwrap_or_default(),
        })
    }

    /// Upsert one node on its identity key, preserving the row's internal id
    /// across re-extraction of unchanged declarations.
    fn store_node(conn: &Connection, node: &AstNode) -> Result<u64, CacheError> {
        let key = node.identity_key().as_key_string();
        let existing_id: Option<u64> = conn
            .query_row(
                "SELECT id FROM ast_nodes WHERE identity_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .ok();

        let params_json = serde_json::to_string(&node.parameters)
            .map_err(|e| CacheError::Database(format!("serializing parameters: {e}")))?;

        if let Some(id) = existing_id {
            conn.execute(
                "UPDATE ast_nodes SET file_path=?1, language=?2, package_name=?3, type_name=?4, \
                 method_name=?5, field_name=?6, node_type=?7, start_line=?8, end_line=?9, \
                 line_count=?10, cyclomatic_complexity=?11, parameter_count=?12, return_count=?13, \
                 summary=?14, field_type=?15, default_value=?16, parent_id=?17, parameters_json=?18 \
                 WHERE id=?19",
                params![
                    node.file_path,
                    node.language.as_str(),
                    node.package,
                    node.type_name,
                    node.method,
                    node.field,
                    node.node_type.as_str(),
                    node.start_line,
                    node.end_line,
                    node.line_count,
                    node.cyclomatic_complexity,
                    node.parameter_count,
                    node.return_count,
                    node.summary,
                    node.field_type,
                    node.default_value,
                    node.parent_id,
                    params_json,
                    id,
                ],
            )?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO ast_nodes (identity_key, file_path, language, package_name, \
                 type_name, method_name, field_name, node_type, start_line, end_line, \
                 line_count, cyclomatic_complexity, parameter_count, return_count, summary, \
                 field_type, default_value, parent_id, parameters_json) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
                params![
                    key,
                    node.file_path,
                    node.language.as_str(),
                    node.package,
                    node.type_name,
                    node.method,
                    node.field,
                    node.node_type.as_str(),
                    node.start_line,
                    node.end_line,
                    node.line_count,
                    node.cyclomatic_complexity,
                    node.parameter_count,
                    node.return_count,
                    node.summary,
                    node.field_type,
                    node.default_value,
                    node.parent_id,
                    params_json,
                ],
            )?;
            Ok(conn.last_insert_rowid() as u64)
        }
    }

    fn store_library_node(conn: &Connection, lib: &LibraryNode) -> Result<u64, CacheError> {
        conn.execute(
            "INSERT INTO library_nodes (framework, package, symbol) VALUES (?1,?2,?3) \
             ON CONFLICT(framework, package, symbol) DO UPDATE SET framework=excluded.framework",
            params![lib.framework, lib.package, lib.symbol],
        )?;
        let id: u64 = conn.query_row(
            "SELECT id FROM library_nodes WHERE framework=?1 AND package=?2 AND symbol=?3",
            params![lib.framework, lib.package, lib.symbol],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

impl AstCache for SqliteAstCache {
    fn get_node_by_identity(
        &self,
        file_path: &str,
        package: Option<&str>,
        type_name: Option<&str>,
        method: Option<&str>,
        field: Option<&str>,
        node_type: NodeKind,
    ) -> Option<AstNode> {
        let key = IdentityKey {
            file_path: file_path.to_string(),
            package: package.map(String::from),
            type_name: type_name.map(String::from),
            method: method.map(String::from),
            field: field.map(String::from),
            node_type,
        }
        .as_key_string();
        self.conn
            .query_row(
                "SELECT * FROM ast_nodes WHERE identity_key = ?1",
                params![key],
                Self::row_to_node,
            )
            .ok()
    }

    fn get_node_by_id(&self, id: u64) -> Option<AstNode> {
        self.conn
            .query_row(
                "SELECT * FROM ast_nodes WHERE id = ?1",
                params![id],
                Self::row_to_node,
            )
            .ok()
    }

    fn get_nodes_in_file(&self, file_path: &str) -> Vec<AstNode> {
        let mut stmt = match self
            .conn
            .prepare("SELECT * FROM ast_nodes WHERE file_path = ?1 ORDER BY start_line")
        {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![file_path], Self::row_to_node)
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    fn get_all_packages(&self) -> Vec<AstNode> {
        let mut stmt = match self
            .conn
            .prepare("SELECT * FROM ast_nodes WHERE node_type = 'package' ORDER BY file_path")
        {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], Self::row_to_node)
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    fn get_relationships(&self, node_id: u64, direction: EdgeDirection) -> Vec<Relationship> {
        let query = match direction {
            EdgeDirection::Incoming => "SELECT * FROM ast_relationships WHERE to_id = ?1",
            EdgeDirection::Outgoing => "SELECT * FROM ast_relationships WHERE from_id = ?1",
            EdgeDirection::Both => {
                "SELECT * FROM ast_relationships WHERE from_id = ?1 OR to_id = ?1"
            }
        };
        let mut stmt = match self.conn.prepare(query) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![node_id], row_to_relationship)
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    fn get_relationships_by_kind(
        &self,
        node_id: u64,
        kind: RelationshipKind,
        direction: EdgeDirection,
    ) -> Vec<Relationship> {
        self.get_relationships(node_id, direction)
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    fn get_library_relationships(&self, node_id: u64) -> Vec<(LibraryRelationship, LibraryNode)> {
        let mut stmt = match self.conn.prepare(
            "SELECT lr.id, lr.from_id, lr.library_id, lr.line_no, lr.column_no, \
             ln.id, ln.framework, ln.package, ln.symbol \
             FROM library_relationships lr JOIN library_nodes ln ON ln.id = lr.library_id \
             WHERE lr.from_id = ?1",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![node_id], |row| {
            Ok((
                LibraryRelationship {
                    id: row.get(0)?,
                    from_id: row.get(1)?,
                    library_id: row.get(2)?,
                    line_no: row.get(3)?,
                    column_no: row.get(4)?,
                },
                LibraryNode {
                    id: row.get(5)?,
                    framework: row.get(6)?,
                    package: row.get(7)?,
                    symbol: row.get(8)?,
                },
            ))
        })
        .map(|rows| rows.filter_map(Result::ok).collect())
        .unwrap_or_default()
    }

    fn replace_file(
        &mut self,
        file_path: &str,
        nodes: Vec<AstNode>,
        relationships: Vec<Relationship>,
        library_relationships: Vec<(LibraryRelationship, LibraryNode)>,
        metadata: FileMetadata,
    ) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;

        let keep_keys: std::collections::HashSet<String> = nodes
            .iter()
            .map(|n| n.identity_key().as_key_string())
            .collect();
        {
            let mut stmt = tx.prepare("SELECT identity_key FROM ast_nodes WHERE file_path = ?1")?;
            let stale: Vec<String> = stmt
                .query_map(params![file_path], |row| row.get::<_, String>(0))?
                .filter_map(Result::ok)
                .filter(|k| !keep_keys.contains(k))
                .collect();
            for key in stale {
                tx.execute("DELETE FROM ast_nodes WHERE identity_key = ?1", params![key])?;
            }
        }

        // Relationships rooted in this file are always superseded; they're
        // re-derived wholesale from the new parse.
        tx.execute(
            "DELETE FROM ast_relationships WHERE from_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
            params![file_path],
        )?;
        tx.execute(
            "DELETE FROM library_relationships WHERE from_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
            params![file_path],
        )?;

        let mut id_remap: std::collections::HashMap<u64, u64> = std::collections::HashMap::new();
        for node in &nodes {
            let placeholder = node.id;
            // Parents are always emitted before their children (package,
            // then types, then methods/fields), so `parent_id` is already
            // in `id_remap` by the time a child is stored.
            let mut node = node.clone();
            node.parent_id = node.parent_id.map(|p| *id_remap.get(&p).unwrap_or(&p));
            let stable_id = Self::store_node(&tx, &node)?;
            id_remap.insert(placeholder, stable_id);
        }

        for rel in &relationships {
            let from_id = *id_remap.get(&rel.from_id).unwrap_or(&rel.from_id);
            let to_id = rel.to_id.map(|t| *id_remap.get(&t).unwrap_or(&t));
            tx.execute(
                "INSERT INTO ast_relationships (from_id, to_id, to_text, line_no, column_no, kind) \
                 VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    from_id,
                    to_id,
                    rel.to_text,
                    rel.line_no,
                    rel.column_no,
                    rel.kind.as_str(),
                ],
            )?;
        }

        for (libedge, libnode) in &library_relationships {
            let lib_id = Self::store_library_node(&tx, libnode)?;
            let from_id = *id_remap.get(&libedge.from_id).unwrap_or(&libedge.from_id);
            tx.execute(
                "INSERT INTO library_relationships (from_id, library_id, line_no, column_no) \
                 VALUES (?1,?2,?3,?4)",
                params![from_id, lib_id, libedge.line_no, libedge.column_no],
            )?;
        }

        tx.execute(
            "INSERT INTO file_metadata (file_path, content_hash, size, mtime, language, last_scanned_at) \
             VALUES (?1,?2,?3,?4,?5,?6) \
             ON CONFLICT(file_path) DO UPDATE SET content_hash=excluded.content_hash, \
             size=excluded.size, mtime=excluded.mtime, language=excluded.language, \
             last_scanned_at=excluded.last_scanned_at",
            params![
                metadata.file_path,
                metadata.content_hash,
                metadata.size as i64,
                metadata.mtime,
                metadata.language.as_str(),
                metadata.last_scanned_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn remove_file(&mut self, file_path: &str) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        // Explicit, not relied on cascading alone: mirrors `replace_file`'s
        // own relationships-then-nodes deletion order.
        tx.execute(
            "DELETE FROM ast_relationships WHERE from_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
            params![file_path],
        )?;
        tx.execute(
            "DELETE FROM library_relationships WHERE from_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
            params![file_path],
        )?;
        tx.execute("DELETE FROM ast_nodes WHERE file_path = ?1", params![file_path])?;
        tx.execute(
            "DELETE FROM file_metadata WHERE file_path = ?1",
            params![file_path],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_nodes(&mut self, changes: Vec<NodeChange>) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        for change in changes {
            match change {
                NodeChange::Add(node) | NodeChange::Update(node) => {
                    Self::store_node(&tx, &node)?;
                }
                NodeChange::Remove(id) => {
                    tx.execute("DELETE FROM ast_nodes WHERE id = ?1", params![id])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_relationships(&mut self, changes: Vec<RelationshipChange>) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        for change in changes {
            match change {
                RelationshipChange::Add(rel) => {
                    tx.execute(
                        "INSERT INTO ast_relationships (from_id, to_id, to_text, line_no, column_no, kind) \
                         VALUES (?1,?2,?3,?4,?5,?6)",
                        params![
                            rel.from_id,
                            rel.to_id,
                            rel.to_text,
                            rel.line_no,
                            rel.column_no,
                            rel.kind.as_str(),
                        ],
                    )?;
                }
                RelationshipChange::Remove(id) => {
                    tx.execute("DELETE FROM ast_relationships WHERE id = ?1", params![id])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn needs_rescan(&self, file_path: &str) -> bool {
        let bytes = match std::fs::read(file_path) {
            Ok(b) => b,
            Err(_) => return true,
        };
        let current_hash = crate::hash::content_hash(&bytes);
        match self.get_file_metadata(file_path) {
            Some(meta) => meta.content_hash != current_hash,
            None => true,
        }
    }

    fn get_file_metadata(&self, file_path: &str) -> Option<FileMetadata> {
        self.conn
            .query_row(
                "SELECT file_path, content_hash, size, mtime, language, last_scanned_at \
                 FROM file_metadata WHERE file_path = ?1",
                params![file_path],
                |row| {
                    let lang: String = row.get(4)?;
                    let scanned: String = row.get(5)?;
                    Ok(FileMetadata {
                        file_path: row.get(0)?,
                        content_hash: row.get(1)?,
                        size: row.get::<_, i64>(2)? as u64,
                        mtime: row.get(3)?,
                        language: Language::from_str(&lang).unwrap_or(Language::Go),
                        last_scanned_at: chrono::DateTime::parse_from_rfc3339(&scanned)
                            .map(|dt| dt.with_timezone(&chrono::Utc))
                            .unwrap_or_else(|_| chrono::Utc::now()),
                    })
                },
            )
            .ok()
    }

    fn all_cached_files(&self) -> Vec<String> {
        let mut stmt = match self.conn.prepare("SELECT file_path FROM file_metadata") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], |row| row.get(0))
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    fn query_raw(
        &self,
        predicate_sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<AstNode>, CacheError> {
        let sql = format!("SELECT * FROM ast_nodes WHERE {predicate_sql}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_node)?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    fn rebuild(&mut self) -> Result<(), CacheError> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS ast_relationships;
             DROP TABLE IF EXISTS library_relationships;
             DROP TABLE IF EXISTS library_nodes;
             DROP TABLE IF EXISTS ast_nodes;
             DROP TABLE IF EXISTS file_metadata;
             DROP TABLE IF EXISTS arch_unit_meta;",
        )?;
        self.initialize_schema()
    }
}

fn row_to_relationship(row: &Row) -> rusqlite::Result<Relationship> {
    let kind: String = row.get("kind")?;
    Ok(Relationship {
        id: row.get("id")?,
        from_id: row.get("from_id")?,
        to_id: row.get("to_id")?,
        to_text: row.get("to_text")?,
        line_no: row.get("line_no")?,
        column_no: row.get("column_no")?,
        kind: RelationshipKind::from_str(&kind).unwrap_or(RelationshipKind::Call),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, file: &str, method: &str, node_type: NodeKind) -> AstNode {
        AstNode {
            id,
            node_type,
            file_path: file.to_string(),
            language: Language::Go,
            package: Some("main".to_string()),
            type_name: None,
            method: Some(method.to_string()),
            field: None,
            start_line: 1,
            end_line: 10,
            line_count: 10,
            cyclomatic_complexity: 1,
            parameter_count: 0,
            return_count: 0,
            parent_id: None,
            summary: None,
            field_type: None,
            default_value: None,
            parameters: vec![],
        }
    }

    fn meta(file: &str, hash: &str) -> FileMetadata {
        FileMetadata {
            file_path: file.to_string(),
            content_hash: hash.to_string(),
            size: 10,
            mtime: 0,
            language: Language::Go,
            last_scanned_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_replace_file_then_read_back() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let n = node(0, "src/a.go", "DoThing", NodeKind::Method);
        cache
            .replace_file("src/a.go", vec![n], vec![], vec![], meta("src/a.go", "h1"))
            .unwrap();

        let nodes = cache.get_nodes_in_file("src/a.go");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].method.as_deref(), Some("DoThing"));
    }

    #[test]
    fn test_identity_stable_across_reextraction() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let n1 = node(0, "src/a.go", "DoThing", NodeKind::Method);
        cache
            .replace_file("src/a.go", vec![n1], vec![], vec![], meta("src/a.go", "h1"))
            .unwrap();
        let first_id = cache.get_nodes_in_file("src/a.go")[0].id;

        let n2 = node(0, "src/a.go", "DoThing", NodeKind::Method);
        cache
            .replace_file("src/a.go", vec![n2], vec![], vec![], meta("src/a.go", "h2"))
            .unwrap();
        let second_id = cache.get_nodes_in_file("src/a.go")[0].id;

        assert_eq!(first_id, second_id, "stable id across re-extraction");
    }

    #[test]
    fn test_replace_file_drops_removed_nodes() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let n1 = node(0, "src/a.go", "Keep", NodeKind::Method);
        let n2 = node(0, "src/a.go", "Drop", NodeKind::Method);
        cache
            .replace_file(
                "src/a.go",
                vec![n1.clone(), n2],
                vec![],
                vec![],
                meta("src/a.go", "h1"),
            )
            .unwrap();
        assert_eq!(cache.get_nodes_in_file("src/a.go").len(), 2);

        cache
            .replace_file("src/a.go", vec![n1], vec![], vec![], meta("src/a.go", "h2"))
            .unwrap();
        let remaining = cache.get_nodes_in_file("src/a.go");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].method.as_deref(), Some("Keep"));
    }

    #[test]
    fn test_needs_rescan_missing_file() {
        let cache = SqliteAstCache::in_memory().unwrap();
        assert!(cache.needs_rescan("/nonexistent/path.go"));
    }

    #[test]
    fn test_relationships_roundtrip() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let caller = node(0, "src/a.go", "Caller", NodeKind::Method);
        let callee = node(0, "src/a.go", "Callee", NodeKind::Method);
        cache
            .replace_file(
                "src/a.go",
                vec![caller, callee],
                vec![],
                vec![],
                meta("src/a.go", "h1"),
            )
            .unwrap();
        let nodes = cache.get_nodes_in_file("src/a.go");
        let caller_id = nodes
            .iter()
            .find(|n| n.method.as_deref() == Some("Caller"))
            .unwrap()
            .id;
        let callee_id = nodes
            .iter()
            .find(|n| n.method.as_deref() == Some("Callee"))
            .unwrap()
            .id;

        cache
            .update_relationships(vec![RelationshipChange::Add(Relationship {
                id: 0,
                from_id: caller_id,
                to_id: Some(callee_id),
                to_text: None,
                line_no: 5,
                column_no: 2,
                kind: RelationshipKind::Call,
            })])
            .unwrap();

        let outgoing = cache.get_relationships(caller_id, EdgeDirection::Outgoing);
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].to_id, Some(callee_id));

        let incoming = cache.get_relationships(callee_id, EdgeDirection::Incoming);
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn test_parent_id_remapped_to_stable_row_id() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let mut pkg = node(0, "src/a.go", "pkg", NodeKind::Package);
        pkg.method = None;
        pkg.package = Some("main".to_string());
        let mut method = node(1, "src/a.go", "DoThing", NodeKind::Method);
        method.parent_id = Some(0);
        cache
            .replace_file(
                "src/a.go",
                vec![pkg, method],
                vec![],
                vec![],
                meta("src/a.go", "h1"),
            )
            .unwrap();

        let nodes = cache.get_nodes_in_file("src/a.go");
        let pkg_row = nodes.iter().find(|n| n.node_type == NodeKind::Package).unwrap();
        let method_row = nodes.iter().find(|n| n.method.as_deref() == Some("DoThing")).unwrap();
        assert_eq!(method_row.parent_id, Some(pkg_row.id), "parent_id must point at the stored row id, not the placeholder");
        assert!(cache.get_node_by_id(method_row.parent_id.unwrap()).is_some());
    }

    #[test]
    fn test_schema_version() {
        let cache = SqliteAstCache::in_memory().unwrap();
        assert_eq!(cache.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_rebuild_clears_state() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let n = node(0, "src/a.go", "DoThing", NodeKind::Method);
        cache
            .replace_file("src/a.go", vec![n], vec![], vec![], meta("src/a.go", "h1"))
            .unwrap();
        assert_eq!(cache.get_nodes_in_file("src/a.go").len(), 1);

        cache.rebuild().unwrap();
        assert_eq!(cache.get_nodes_in_file("src/a.go").len(), 0);
    }
}
