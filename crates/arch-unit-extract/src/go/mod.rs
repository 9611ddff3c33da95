//! Go extractor: tree-sitter structural extraction plus
//! the receiver-type heuristic that attaches a method to its struct by name
//! rather than by lexical nesting (Go methods aren't declared inside the
//! struct body).

use std::path::Path;
use std::sync::Mutex;

use arch_unit_core::types::Language;

use crate::lowering::lower;
use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};
use crate::treesitter::TreeSitterParser;

/// Standard library packages, keyed by import path / package alias, that
/// should be recorded as [`arch_unit_core::types::LibraryNode`]s rather than
/// left as dangling `to_text` relationships.
const GO_STDLIB: &[&str] = &[
    "fmt", "os", "io", "io/ioutil", "strings", "strconv", "time", "context", "errors", "sync",
    "sync/atomic", "net", "net/http", "net/url", "encoding/json", "encoding/xml", "bytes",
    "bufio", "path", "path/filepath", "regexp", "sort", "math", "math/rand", "log", "testing",
    "reflect", "runtime", "unicode", "unicode/utf8",
];

fn go_library_lookup(name: &str) -> Option<(String, String, String)> {
    let pkg = name.rsplit('/').next().unwrap_or(name);
    GO_STDLIB
        .iter()
        .find(|p| **p == name || p.rsplit('/').next() == Some(pkg))
        .map(|p| ("go-stdlib".to_string(), p.to_string(), "*".to_string()))
}

pub struct GoExtractor {
    parser: Mutex<TreeSitterParser>,
}

impl GoExtractor {
    pub fn new() -> Self {
        Self {
            parser: Mutex::new(TreeSitterParser::new()),
        }
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let mut parser = self.parser.lock().expect("treesitter parser mutex poisoned");
        let parsed = parser
            .parse_file("go", path, source)
            .map_err(|e| ExtractError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        drop(parser);

        let package_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());

        Ok(lower(
            Language::Go,
            &path.to_string_lossy(),
            parsed,
            &package_name,
            &go_library_lookup,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_struct_and_method() {
        let extractor = GoExtractor::new();
        let source = br#"
package user

type UserController struct {
    db string
}

func (c *UserController) Save(id string) error {
    return nil
}
"#;
        let out = extractor
            .extract(Path::new("user/controller.go"), source)
            .unwrap();
        let method = out
            .nodes
            .iter()
            .find(|n| n.node_type == arch_unit_core::types::NodeKind::Method)
            .unwrap();
        assert_eq!(method.type_name.as_deref(), Some("UserController"));
        assert_eq!(method.method.as_deref(), Some("Save"));
    }

    #[test]
    fn known_stdlib_import_becomes_library_relationship() {
        let extractor = GoExtractor::new();
        let source = br#"
package main

import "fmt"

func main() {
    fmt.Println("hi")
}
"#;
        let out = extractor.extract(Path::new("main.go"), source).unwrap();
        assert!(out
            .library_relationships
            .iter()
            .any(|(_, lib)| lib.package == "fmt"));
        assert!(out.relationships.iter().all(|r| r.to_text.as_deref() != Some("fmt")));
    }
}
