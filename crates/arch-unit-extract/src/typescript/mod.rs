//! TypeScript/JavaScript extractor: tree-sitter structural
//! extraction with methods attached to their enclosing class by lexical
//! containment; free functions (including arrow functions bound to a
//! `const`) have no parent type.

use std::path::Path;
use std::sync::Mutex;

use arch_unit_core::types::Language;

use crate::lowering::lower;
use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};
use crate::treesitter::TreeSitterParser;

const JS_BUILTINS: &[&str] = &[
    "react", "react-dom", "express", "lodash", "axios", "fs", "path", "http", "https", "url",
    "crypto", "util", "events", "stream", "child_process", "os", "assert", "zod", "vue",
    "@angular/core", "next", "rxjs",
];

fn js_library_lookup(name: &str) -> Option<(String, String, String)> {
    if name.starts_with('.') {
        return None;
    }
    let root = if name.starts_with('@') {
        name.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
    } else {
        name.split('/').next().unwrap_or(name).to_string()
    };
    JS_BUILTINS
        .iter()
        .find(|p| **p == root)
        .map(|p| ("npm".to_string(), p.to_string(), "*".to_string()))
}

pub struct TypeScriptExtractor {
    parser: Mutex<TreeSitterParser>,
    javascript: bool,
}

impl TypeScriptExtractor {
    pub fn new() -> Self {
        Self {
            parser: Mutex::new(TreeSitterParser::new()),
            javascript: false,
        }
    }

    /// The same grammar family drives both languages; `javascript` and
    /// `typescript` are tracked as distinct [`Language`] values.
    pub fn javascript() -> Self {
        Self {
            parser: Mutex::new(TreeSitterParser::new()),
            javascript: true,
        }
    }
}

impl Default for TypeScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for TypeScriptExtractor {
    fn language(&self) -> Language {
        if self.javascript {
            Language::Javascript
        } else {
            Language::Typescript
        }
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError> {
        let source = std::str::from_utf8(bytes).map_err(|e| ExtractError::Parse {
            path: path.display().to_string(),
            reason: format!("not valid utf-8: {e}"),
        })?;
        let lang_name = match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") | Some("jsx") => "tsx",
            _ => "typescript",
        };
        let mut parser = self.parser.lock().expect("treesitter parser mutex poisoned");
        let parsed = parser
            .parse_file(lang_name, path, source)
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
            self.language(),
            &path.to_string_lossy(),
            parsed,
            &package_name,
            &js_library_lookup,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::types::NodeKind;

    #[test]
    fn extracts_class_method_and_arrow_function() {
        let extractor = TypeScriptExtractor::new();
        let source = br#"
export class UserService {
    save(id: string): void {}
}

const helper = (x: number): number => x + 1;
"#;
        let out = extractor.extract(Path::new("service.ts"), source).unwrap();
        assert!(out
            .nodes
            .iter()
            .any(|n| n.node_type == NodeKind::Method && n.type_name.as_deref() == Some("UserService")));
        assert!(out
            .nodes
            .iter()
            .any(|n| n.node_type == NodeKind::Function && n.method.as_deref() == Some("helper")));
    }

    #[test]
    fn known_npm_import_becomes_library_relationship() {
        let extractor = TypeScriptExtractor::new();
        let source = br#"import express from "express";"#;
        let out = extractor.extract(Path::new("app.ts"), source).unwrap();
        assert!(out
            .library_relationships
            .iter()
            .any(|(_, lib)| lib.package == "express"));
    }
}
