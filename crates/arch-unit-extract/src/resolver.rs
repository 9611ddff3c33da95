//! Language-neutral intermediate representation produced by the tree-sitter
//! layer, and the `ExtractFile` contract every per-language extractor
//! implements.

use std::path::Path;

use arch_unit_core::types::{AstNode, Language, LibraryNode, LibraryRelationship, Relationship};

/// A structural declaration found in a source file, before it has been
/// lowered into an [`AstNode`] with identity and parent assigned.
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    pub kind: DefKind,
    /// First line of the definition (1-based, inclusive).
    pub line_start: u32,
    /// Last line of the definition (1-based, inclusive).
    pub line_end: u32,
    /// Raw parameter list text, e.g. `"(id string, force bool)"`.
    pub params_text: String,
    /// Raw return-type text, empty when the language/def has none.
    pub return_text: String,
    /// The full source text of the definition's body, used for cyclomatic
    /// complexity and line counting.
    pub body_text: String,
    /// Go only: the raw receiver clause text, e.g. `"(c *UserController)"`,
    /// used to attach a method to its receiver type.
    pub receiver_hint: Option<String>,
}

/// What a [`Definition`] lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Type,
    Method,
    Enum,
}

/// A call expression found inside some method body.
#[derive(Debug, Clone)]
pub struct Reference {
    /// The callee name as written, e.g. `Println`, `self.save`, `fmt.Println`.
    pub callee: String,
    /// The receiver/qualifier, if the call was qualified (`fmt` in
    /// `fmt.Println`, `self` in `self.save()`), split out from `callee`.
    pub receiver: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// An import/use statement.
#[derive(Debug, Clone)]
pub struct Import {
    /// The module specifier exactly as written (import path, package name).
    pub source: String,
    pub line: u32,
    pub column: u32,
}

/// Everything the tree-sitter layer extracted from one file, before lowering.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
    pub imports: Vec<Import>,
}

/// Output of [`LanguageExtractor::extract`]: ready to hand to
/// [`arch_unit_core::store::AstCache::replace_file`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOutput {
    pub nodes: Vec<AstNode>,
    pub relationships: Vec<Relationship>,
    pub library_relationships: Vec<(LibraryRelationship, LibraryNode)>,
}

/// Errors an extractor can raise for a single file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// `ExtractFile(path, bytes) -> (nodes[], relationships[], library_relationships[], error?)`
///. One implementation per [`Language`].
pub trait LanguageExtractor: Send + Sync {
    fn language(&self) -> Language;

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractOutput, ExtractError>;
}
