//! Python extractor: tree-sitter structural extraction with
//! methods attached to their enclosing class by lexical containment.

use std::path::Path;
use std::sync::Mutex;

use arch_unit_core::types::Language;

use crate::lowering::lower;
use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};
use crate::treesitter::TreeSitterParser;

const PYTHON_STDLIB: &[&str] = &[
    "os", "sys", "re", "json", "time", "datetime", "collections", "itertools", "functools",
    "typing", "pathlib", "logging", "asyncio", "subprocess", "unittest", "dataclasses",
    "contextlib", "io", "math", "random", "socket", "threading", "multiprocessing", "enum",
    "abc", "copy", "hashlib", "uuid", "sqlite3", "argparse",
];

fn python_library_lookup(name: &str) -> Option<(String, String, String)> {
    let root = name.split('.').next().unwrap_or(name);
    PYTHON_STDLIB
        .iter()
        .find(|p| **p == root)
        .map(|p| ("python-stdlib".to_string(), p.to_string(), "*".to_string()))
}

pub struct PythonExtractor {
    parser: Mutex<TreeSitterParser>,
}

impl PythonExtractor {
    pub fn new() -> Self {
        Self {
            parser: Mutex::new(TreeSitterParser::new()),
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let mut parser = self.parser.lock().expect("treesitter parser mutex poisoned");
        let parsed = parser
            .parse_file("python", path, source)
            .map_err(|e| ExtractError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        drop(parser);

        let package_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "module".to_string());

        Ok(lower(
            Language::Python,
            &path.to_string_lossy(),
            parsed,
            &package_name,
            &python_library_lookup,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::types::NodeKind;

    #[test]
    fn extracts_class_and_method() {
        let extractor = PythonExtractor::new();
        let source = br#"
class Repo:
    def save(self, path):
        return path
"#;
        let out = extractor.extract(Path::new("repo.py"), source).unwrap();
        let method = out
            .nodes
            .iter()
            .find(|n| n.node_type == NodeKind::Method)
            .unwrap();
        assert_eq!(method.type_name.as_deref(), Some("Repo"));
    }

    #[test]
    fn self_call_resolves_within_same_class() {
        let extractor = PythonExtractor::new();
        let source = br#"
class Repo:
    def save(self, path):
        self.validate(path)
        return path

    def validate(self, path):
        return True
"#;
        let out = extractor.extract(Path::new("repo.py"), source).unwrap();
        let validate_id = out
            .nodes
            .iter()
            .find(|n| n.method.as_deref() == Some("validate"))
            .unwrap()
            .id;
        assert!(out
            .relationships
            .iter()
            .any(|r| r.to_id == Some(validate_id)));
    }
}
