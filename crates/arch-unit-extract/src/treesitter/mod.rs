//! Tree-sitter driven structural extraction shared by the Go, Python, and
//! TypeScript/JavaScript extractors. Each language contributes a
//! query (see [`crate::queries`]) written against the capture-name
//! convention below; this module turns the query matches into the
//! language-neutral [`Definition`]/[`Reference`]/[`Import`] values the
//! lowering layer consumes.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor, Tree};

use crate::queries;
use crate::resolver::{DefKind, Definition, Import, ParseResult, Reference};

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn parse(&mut self, lang_name: &str, source: &[u8]) -> Result<Tree, ParseError> {
        let lang = language_for_name(lang_name)?;
        self.parser
            .set_language(&lang)
            .map_err(|e| ParseError::Language(format!("{e}")))?;
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed)
    }

    pub fn parse_file(
        &mut self,
        lang_name: &str,
        path: &Path,
        source: &str,
    ) -> Result<ParseResult, ParseError> {
        let lang = language_for_name(lang_name)?;
        let query = queries::query_for_language(&lang, lang_name).map_err(ParseError::Query)?;
        self.parser
            .set_language(&lang)
            .map_err(|e| ParseError::Language(format!("{e}")))?;
        let tree = self
            .parser
            .parse(source.as_bytes(), None)
            .ok_or(ParseError::ParseFailed)?;

        let file_path = path.to_string_lossy().to_string();
        let bytes = source.as_bytes();
        let root = tree.root_node();

        let definitions = extract_definitions(&query, root, bytes);
        let references = extract_references(&query, root, bytes);
        let imports = extract_imports(&query, root, bytes);

        Ok(ParseResult {
            definitions,
            references,
            imports,
        })
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("language error: {0}")]
    Language(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("parse failed")]
    ParseFailed,
}

fn language_for_name(name: &str) -> Result<Language, ParseError> {
    match name {
        "typescript" | "javascript" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        "python" => Ok(tree_sitter_python::LANGUAGE.into()),
        "go" => Ok(tree_sitter_go::LANGUAGE.into()),
        other => Err(ParseError::UnsupportedLanguage(other.to_string())),
    }
}

fn node_text<'a>(node: tree_sitter::Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn extract_definitions(query: &Query, root: tree_sitter::Node<'_>, source: &[u8]) -> Vec<Definition> {
    let mut cursor = QueryCursor::new();
    let mut defs = Vec::new();
    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, root, source);

    while let Some(m) = matches.next() {
        let mut name = None;
        let mut kind = None;
        let mut params_text = String::new();
        let mut return_text = String::new();
        let mut body_text = String::new();
        let mut receiver_hint = None;
        let mut line_start = 0u32;
        let mut line_end = 0u32;

        for cap in m.captures {
            let cap_name = capture_names[cap.index as usize];
            match cap_name {
                "def.func.name" | "def.method.name" => {
                    name = Some(node_text(cap.node, source).to_string());
                    kind = Some(DefKind::Method);
                }
                "def.type.name" => {
                    name = Some(node_text(cap.node, source).to_string());
                    kind = Some(DefKind::Type);
                }
                "def.enum.name" => {
                    name = Some(node_text(cap.node, source).to_string());
                    kind = Some(DefKind::Enum);
                }
                "def.method.receiver" => {
                    receiver_hint = Some(node_text(cap.node, source).to_string());
                }
                "def.func.params" | "def.method.params" => {
                    params_text = node_text(cap.node, source).to_string();
                }
                "def.func.return_type" | "def.method.return_type" => {
                    return_text = node_text(cap.node, source).to_string();
                }
                "def.func.body" | "def.method.body" => {
                    body_text = node_text(cap.node, source).to_string();
                }
                "def.func" | "def.method" | "def.type" | "def.enum" => {
                    line_start = cap.node.start_position().row as u32 + 1;
                    line_end = cap.node.end_position().row as u32 + 1;
                }
                _ => {}
            }
        }

        if let (Some(n), Some(k)) = (name, kind) {
            defs.push(Definition {
                name: n,
                kind: k,
                line_start,
                line_end,
                params_text,
                return_text,
                body_text,
                receiver_hint,
            });
        }
    }
    // decorated/nested patterns (e.g. the two Go type_spec alternatives for
    // struct vs interface) can both match the same node.
    defs.dedup_by(|a, b| a.name == b.name && a.line_start == b.line_start);
    defs
}

fn extract_references(query: &Query, root: tree_sitter::Node<'_>, source: &[u8]) -> Vec<Reference> {
    let mut cursor = QueryCursor::new();
    let mut refs = Vec::new();
    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, root, source);

    while let Some(m) = matches.next() {
        let mut callee = None;
        let mut receiver = None;
        let mut line = 0u32;
        let mut column = 0u32;

        for cap in m.captures {
            let cap_name = capture_names[cap.index as usize];
            match cap_name {
                "ref.call.name" => {
                    callee = Some(node_text(cap.node, source).to_string());
                }
                "ref.call.receiver" => {
                    receiver = Some(node_text(cap.node, source).to_string());
                }
                "ref.call" => {
                    line = cap.node.start_position().row as u32 + 1;
                    column = cap.node.start_position().column as u32 + 1;
                }
                _ => {}
            }
        }

        if let Some(callee) = callee {
            refs.push(Reference {
                callee,
                receiver,
                line,
                column,
            });
        }
    }
    refs
}

fn extract_imports(query: &Query, root: tree_sitter::Node<'_>, source: &[u8]) -> Vec<Import> {
    let mut cursor = QueryCursor::new();
    let mut imports = Vec::new();
    let capture_names = query.capture_names();
    let mut matches = cursor.matches(query, root, source);

    while let Some(m) = matches.next() {
        let mut source_path = None;
        let mut line = 0u32;
        let mut column = 0u32;

        for cap in m.captures {
            let cap_name = capture_names[cap.index as usize];
            match cap_name {
                "ref.import.source" => {
                    let raw = node_text(cap.node, source);
                    source_path = Some(raw.trim_matches('"').trim_matches('\'').to_string());
                }
                "ref.import" => {
                    line = cap.node.start_position().row as u32 + 1;
                    column = cap.node.start_position().column as u32 + 1;
                }
                _ => {}
            }
        }

        if let Some(src) = source_path {
            imports.push(Import {
                source: src,
                line,
                column,
            });
        }
    }
    imports.dedup_by(|a, b| a.source == b.source && a.line == b.line);
    imports
}

pub fn detect_language(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "js" | "mjs" | "cjs" => Some("javascript"),
        "jsx" => Some("tsx"),
        "py" | "pyi" => Some("python"),
        "go" => Some("go"),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
