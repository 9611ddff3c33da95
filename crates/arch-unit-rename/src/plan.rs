//! Resolves a rename target and turns its references into per-file textual
//! edits, without touching disk.

use std::collections::BTreeMap;

use arch_unit_core::store::AstCache;
use arch_unit_core::types::{AstNode, EdgeDirection, RelationshipKind};
use arch_unit_query::pattern::Pattern;

use crate::error::RenameError;

/// One textual substitution: replace `old` with `new` at a zero-based
/// `column` on `line` (both 1-based, matching the cache's convention) of
/// `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub old: String,
    pub new: String,
}

/// The resolved target plus every edit location derived from it, not yet
/// applied.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub target: AstNode,
    pub old_name: String,
    pub new_name: String,
    pub edits: Vec<Edit>,
}

/// The identifier text a node's occurrences carry — the innermost non-empty
/// name segment, since that's what call sites and the declaration site both
/// spell out verbatim.
fn target_identifier(node: &AstNode) -> Option<&str> {
    node.field
        .as_deref()
        .or(node.method.as_deref())
        .or(node.type_name.as_deref())
        .or(node.package.as_deref())
}

/// Resolve `old_pattern` to exactly one node and collect every location that
/// needs editing: the declaration site plus every inbound call reference.
pub fn plan_rename(
    cache: &dyn AstCache,
    old_pattern: &str,
    new_name: &str,
) -> Result<RenamePlan, RenameError> {
    let pattern = Pattern::parse(old_pattern)?;
    let compiled = pattern.compile(None);
    let matches = cache.query_raw(&compiled.predicate_sql, compiled.param_refs().as_slice())?;

    let target = match matches.len() {
        0 => return Err(RenameError::NotFound(old_pattern.to_string())),
        1 => matches.into_iter().next().unwrap(),
        n => return Err(RenameError::Ambiguous { pattern: old_pattern.to_string(), count: n }),
    };

    let old_name = target_identifier(&target)
        .ok_or_else(|| RenameError::NotFound(old_pattern.to_string()))?
        .to_string();

    let mut locations: BTreeMap<(String, u32, u32), Edit> = BTreeMap::new();

    locations.insert(
        (target.file_path.clone(), target.start_line, 0),
        Edit {
            file: target.file_path.clone(),
            line: target.start_line,
            column: 0,
            old: old_name.clone(),
            new: new_name.to_string(),
        },
    );

    for rel in cache.get_relationships(target.id, EdgeDirection::Incoming) {
        if rel.kind != RelationshipKind::Call || rel.to_id != Some(target.id) {
            continue;
        }
        let Some(caller) = cache.get_node_by_id(rel.from_id) else { continue };
        locations
            .entry((caller.file_path.clone(), rel.line_no, rel.column_no))
            .or_insert(Edit {
                file: caller.file_path,
                line: rel.line_no,
                column: rel.column_no,
                old: old_name.clone(),
                new: new_name.to_string(),
            });
    }

    Ok(RenamePlan { target, old_name, new_name: new_name.to_string(), edits: locations.into_values().collect() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::sqlite::SqliteAstCache;
    use arch_unit_core::types::{FileMetadata, Language, NodeKind, Relationship};

    fn node(id: u64, file: &str, method: &str, line: u32) -> AstNode {
        AstNode {
            id,
            node_type: NodeKind::Method,
            file_path: file.to_string(),
            language: Language::Go,
            package: Some("billing".to_string()),
            type_name: None,
            method: Some(method.to_string()),
            field: None,
            start_line: line,
            end_line: line + 5,
            line_count: 5,
            cyclomatic_complexity: 1,
            parameter_count: 0,
            return_count: 0,
            parent_id: None,
            summary: None,
            field_type: None,
            default_value: None,
            parameters: Vec::new(),
        }
    }

    fn meta(file: &str) -> FileMetadata {
        FileMetadata {
            file_path: file.to_string(),
            content_hash: "h".to_string(),
            size: 0,
            mtime: 0,
            language: Language::Go,
            last_scanned_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn resolves_single_target_and_its_callers() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let target = node(1, "billing/charge.go", "Charge", 10);
        cache.replace_file("billing/charge.go", vec![target.clone()], Vec::new(), Vec::new(), meta("billing/charge.go")).unwrap();

        let caller = node(2, "billing/invoice.go", "Bill", 20);
        let call = Relationship { id: 0, from_id: 2, to_id: Some(1), to_text: None, line_no: 22, column_no: 8, kind: RelationshipKind::Call };
        cache.replace_file("billing/invoice.go", vec![caller], vec![call], Vec::new(), meta("billing/invoice.go")).unwrap();

        let plan = plan_rename(&cache, "billing::Charge", "ChargeCard").unwrap();
        assert_eq!(plan.old_name, "Charge");
        assert_eq!(plan.edits.len(), 2);
        assert!(plan.edits.iter().any(|e| e.file == "billing/charge.go" && e.line == 10));
        assert!(plan.edits.iter().any(|e| e.file == "billing/invoice.go" && e.line == 22 && e.column == 8));
    }

    #[test]
    fn ambiguous_pattern_is_rejected() {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let a = node(1, "a.go", "Run", 1);
        let b = node(2, "b.go", "Run", 1);
        cache.replace_file("a.go", vec![a], Vec::new(), Vec::new(), meta("a.go")).unwrap();
        cache.replace_file("b.go", vec![b], Vec::new(), Vec::new(), meta("b.go")).unwrap();

        let err = plan_rename(&cache, "*:Run", "Execute").unwrap_err();
        assert!(matches!(err, RenameError::Ambiguous { count: 2, .. }));
    }
}
