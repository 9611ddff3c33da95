//! Hierarchical rule engine for imports and calls.
//!
//! Every directory between the scanned root and a source file may carry an
//! `.ARCHUNIT` file; `arch-unit.yml`'s top-level `rules` map contributes
//! further glob-scoped entries rooted at the scan root. For a given
//! call/import, the engine walks candidate rules file-glob-scoped first
//! (innermost directory to outermost), then unscoped (innermost to
//! outermost), and the first rule whose pattern matches decides the
//! outcome — `!pattern` denies, `+pattern` overrides (cancels) a denial
//! inherited from an ancestor scope, and a bare pattern is documentation
//! only (it never produces a violation on its own).

use std::path::{Path, PathBuf};

use arch_unit_core::config::Config;
use arch_unit_core::store::AstCache;
use arch_unit_core::types::{EdgeDirection, RelationshipKind};
use arch_unit_core::violations::Violation;
use walkdir::WalkDir;

use crate::error::RuleError;
use crate::rulefile::{parse_rule_file, RuleAction, RuleEntry};

const RULE_FILE_NAME: &str = ".ARCHUNIT";

/// Holds every `.ARCHUNIT` rule discovered under a scanned root. Config-file
/// rules (`arch-unit.yml`'s `rules` map) are folded in per-call since the
/// config can change between runs without needing a re-walk.
pub struct RuleEngine {
    root: PathBuf,
    archunit_entries: Vec<RuleEntry>,
}

impl RuleEngine {
    /// Walk `root` collecting every `.ARCHUNIT` file.
    pub fn new(root: PathBuf) -> Result<Self, RuleError> {
        let mut archunit_entries = Vec::new();
        for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() && entry.file_name() == RULE_FILE_NAME {
                let contents = std::fs::read_to_string(entry.path()).map_err(|source| {
                    RuleError::Walk { path: entry.path().to_path_buf(), source }
                })?;
                let scope_dir = entry.path().parent().unwrap_or(&root).to_path_buf();
                archunit_entries.extend(parse_rule_file(entry.path(), &scope_dir, &contents));
            }
        }
        Ok(RuleEngine { root, archunit_entries })
    }

    /// Rule entries contributed by `arch-unit.yml`'s `rules` map: each glob
    /// key scopes its import list to files under the scan root matching
    /// that glob, rooted at `self.root` (so it sorts as the outermost
    /// file-glob-scoped entry unless a closer `.ARCHUNIT` overrides it).
    fn config_entries(&self, config: &Config) -> Vec<RuleEntry> {
        let mut out = Vec::new();
        for (glob, rule_set) in &config.rules {
            for line in &rule_set.imports {
                if let Some(entry) =
                    parse_rule_file(Path::new("arch-unit.yml"), &self.root, line).into_iter().next()
                {
                    out.push(RuleEntry { file_glob: Some(glob.clone()), ..entry });
                }
            }
        }
        out
    }

    /// Depth of `dir` relative to the scan root, used to order entries
    /// innermost-to-outward. Deeper (more components) sorts first.
    fn depth(&self, dir: &Path) -> usize {
        dir.strip_prefix(&self.root).map(|p| p.components().count()).unwrap_or(0)
    }

    /// True iff `scope_dir` is `file_dir` or an ancestor of it.
    fn in_scope(&self, scope_dir: &Path, file_dir: &Path) -> bool {
        file_dir.starts_with(scope_dir)
    }

    /// Build the ordered candidate list for `file_path`: file-glob-scoped
    /// entries innermost-to-outward, then unscoped entries innermost-to-outward.
    fn effective_entries(&self, config: &Config, file_path: &str) -> Vec<RuleEntry> {
        let file_dir =
            self.root.join(file_path).parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        let mut candidates: Vec<RuleEntry> = self
            .archunit_entries
            .iter()
            .cloned()
            .chain(self.config_entries(config))
            .filter(|e| self.in_scope(&e.scope_dir, &file_dir) && e.applies_to_file(file_path))
            .collect();

        candidates.sort_by(|a, b| {
            let a_scoped = a.file_glob.is_some();
            let b_scoped = b.file_glob.is_some();
            b_scoped.cmp(&a_scoped).then_with(|| self.depth(&b.scope_dir).cmp(&self.depth(&a.scope_dir)))
        });
        candidates
    }

    /// Evaluate every call and import relationship originating from nodes
    /// in `file_path`, producing one violation per denied edge.
    pub fn evaluate_file(&self, cache: &dyn AstCache, config: &Config, file_path: &str) -> Vec<Violation> {
        let entries = self.effective_entries(config, file_path);
        let mut violations = Vec::new();

        for node in cache.get_nodes_in_file(file_path) {
            for rel in cache.get_relationships_by_kind(node.id, RelationshipKind::Call, EdgeDirection::Outgoing) {
                let (package, method) = match rel.to_id.and_then(|id| cache.get_node_by_id(id)) {
                    Some(callee) => (callee.package.clone(), callee.method.clone().or(callee.type_name.clone())),
                    None => match &rel.to_text {
                        Some(text) => split_qualified(text),
                        None => continue,
                    },
                };
                if let Some(entry) = first_call_match(&entries, package.as_deref(), method.as_deref()) {
                    if entry.action == RuleAction::Deny {
                        violations.push(call_violation(file_path, rel.line_no, rel.column_no, entry, package, method));
                    }
                }
            }

            for (lib_rel, lib_node) in cache.get_library_relationships(node.id) {
                let package = Some(lib_node.package.clone());
                let method = Some(lib_node.symbol.clone());
                if let Some(entry) = first_call_match(&entries, package.as_deref(), method.as_deref()) {
                    if entry.action == RuleAction::Deny {
                        violations.push(call_violation(
                            file_path,
                            lib_rel.line_no,
                            lib_rel.column_no,
                            entry,
                            package,
                            method,
                        ));
                    }
                }
            }

            for rel in cache.get_relationships_by_kind(node.id, RelationshipKind::Import, EdgeDirection::Outgoing) {
                let import_path = match rel
                    .to_text
                    .clone()
                    .or_else(|| rel.to_id.and_then(|id| cache.get_node_by_id(id)).and_then(|n| n.package))
                {
                    Some(p) => p,
                    None => continue,
                };
                if let Some(entry) = entries.iter().find(|e| e.matches_import(&import_path)) {
                    if entry.action == RuleAction::Deny {
                        violations.push(import_violation(file_path, rel.line_no, rel.column_no, entry, &import_path));
                    }
                }
            }
        }

        violations
    }
}

fn first_call_match<'a>(
    entries: &'a [RuleEntry],
    package: Option<&str>,
    method: Option<&str>,
) -> Option<&'a RuleEntry> {
    entries.iter().find(|e| e.matches_call(package, method))
}

fn split_qualified(text: &str) -> (Option<String>, Option<String>) {
    match text.rsplit_once('.') {
        Some((pkg, meth)) => (Some(pkg.to_string()), Some(meth.to_string())),
        None => (None, Some(text.to_string())),
    }
}

fn call_violation(
    file_path: &str,
    line: u32,
    column: u32,
    entry: &RuleEntry,
    package: Option<String>,
    method: Option<String>,
) -> Violation {
    let target = match (&package, &method) {
        (Some(p), Some(m)) => format!("{p}.{m}"),
        (Some(p), None) => p.clone(),
        (None, Some(m)) => m.clone(),
        (None, None) => "<unknown>".to_string(),
    };
    Violation {
        id: 0,
        file_path: file_path.to_string(),
        line,
        column,
        source: "arch-unit".to_string(),
        rule_id: Some(entry.raw.clone()),
        message: format!("call to {target} is forbidden by rule `{}` ({})", entry.raw, entry.source_file.display()),
        called_package: package,
        called_method: method,
        fixable: false,
        fix_applicability: None,
        created_at: chrono::Utc::now(),
    }
}

fn import_violation(file_path: &str, line: u32, column: u32, entry: &RuleEntry, import_path: &str) -> Violation {
    Violation {
        id: 0,
        file_path: file_path.to_string(),
        line,
        column,
        source: "arch-unit".to_string(),
        rule_id: Some(entry.raw.clone()),
        message: format!(
            "import of \"{import_path}\" is forbidden by rule `{}` ({})",
            entry.raw,
            entry.source_file.display()
        ),
        called_package: Some(import_path.to_string()),
        called_method: None,
        fixable: false,
        fix_applicability: None,
        created_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::sqlite::SqliteAstCache;
    use arch_unit_core::types::{AstNode, FileMetadata, Language, NodeKind, Relationship};
    use std::collections::HashMap;

    fn pkg_node(id: u64, file: &str, name: &str) -> AstNode {
        AstNode {
            id,
            node_type: NodeKind::Package,
            file_path: file.to_string(),
            language: Language::Go,
            package: Some(name.to_string()),
            type_name: None,
            method: None,
            field: None,
            start_line: 1,
            end_line: 1,
            line_count: 1,
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

    fn call_rel(id: u64, from: u64, text: &str, line: u32) -> Relationship {
        Relationship {
            id,
            from_id: from,
            to_id: None,
            to_text: Some(text.to_string()),
            line_no: line,
            column_no: 1,
            kind: RelationshipKind::Call,
        }
    }

    fn setup_cache(file: &str, calls: Vec<&str>) -> SqliteAstCache {
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let node = pkg_node(1, file, "main");
        let relationships: Vec<Relationship> =
            calls.iter().enumerate().map(|(i, c)| call_rel(i as u64 + 1, 1, c, i as u32 + 1)).collect();
        cache
            .replace_file(
                file,
                vec![node],
                relationships,
                Vec::new(),
                FileMetadata {
                    file_path: file.to_string(),
                    content_hash: "h".to_string(),
                    size: 0,
                    mtime: 0,
                    language: Language::Go,
                    last_scanned_at: chrono::Utc::now(),
                },
            )
            .unwrap();
        cache
    }

    fn write_rule_file(dir: &Path, contents: &str) {
        std::fs::write(dir.join(".ARCHUNIT"), contents).unwrap();
    }

    #[test]
    fn denies_forbidden_call() {
        let tmp = tempfile::tempdir().unwrap();
        write_rule_file(tmp.path(), "!fmt:Println");
        let engine = RuleEngine::new(tmp.path().to_path_buf()).unwrap();
        let cache = setup_cache("main.go", vec!["fmt.Println"]);
        let config = Config::default();
        let violations = engine.evaluate_file(&cache, &config, "main.go");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].source, "arch-unit");
        assert_eq!(violations[0].called_package.as_deref(), Some("fmt"));
    }

    #[test]
    fn file_scoped_override_cancels_outer_deny() {
        let tmp = tempfile::tempdir().unwrap();
        write_rule_file(tmp.path(), "!fmt:Println");
        std::fs::create_dir(tmp.path().join("tests")).unwrap();
        write_rule_file(&tmp.path().join("tests"), "[*_test.go] +fmt:Println");
        let engine = RuleEngine::new(tmp.path().to_path_buf()).unwrap();
        let cache = setup_cache("tests/main_test.go", vec!["fmt.Println"]);
        let config = Config::default();
        let violations = engine.evaluate_file(&cache, &config, "tests/main_test.go");
        assert!(violations.is_empty());
    }

    #[test]
    fn config_rules_deny_imports() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = SqliteAstCache::in_memory().unwrap();
        let node = pkg_node(1, "internal/foo.go", "foo");
        let import_rel = Relationship {
            id: 1,
            from_id: 1,
            to_id: None,
            to_text: Some("net/http".to_string()),
            line_no: 1,
            column_no: 1,
            kind: RelationshipKind::Import,
        };
        cache
            .replace_file(
                "internal/foo.go",
                vec![node],
                vec![import_rel],
                Vec::new(),
                FileMetadata {
                    file_path: "internal/foo.go".to_string(),
                    content_hash: "h".to_string(),
                    size: 0,
                    mtime: 0,
                    language: Language::Go,
                    last_scanned_at: chrono::Utc::now(),
                },
            )
            .unwrap();

        let mut rules = HashMap::new();
        rules.insert(
            "internal/**".to_string(),
            arch_unit_core::config::RuleSetConfig { imports: vec!["!net/http".to_string()] },
        );
        let config = Config { rules, ..Config::default() };

        let engine = RuleEngine::new(tmp.path().to_path_buf()).unwrap();
        let violations = engine.evaluate_file(&cache, &config, "internal/foo.go");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].source, "arch-unit");
    }
}
