use serde::{Deserialize, Serialize};

/// The kind of entity an [`AstNode`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Package,
    Type,
    Method,
    Field,
    Variable,
    Table,
    View,
    Column,
    StoredProc,
    Function,
    HttpEndpoint,
    HttpSchema,
    Index,
    ForeignKey,
    Enum,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Package => "package",
            NodeKind::Type => "type",
            NodeKind::Method => "method",
            NodeKind::Field => "field",
            NodeKind::Variable => "variable",
            NodeKind::Table => "table",
            NodeKind::View => "view",
            NodeKind::Column => "column",
            NodeKind::StoredProc => "stored_proc",
            NodeKind::Function => "function",
            NodeKind::HttpEndpoint => "http_endpoint",
            NodeKind::HttpSchema => "http_schema",
            NodeKind::Index => "index",
            NodeKind::ForeignKey => "foreign_key",
            NodeKind::Enum => "enum",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "package" => NodeKind::Package,
            "type" => NodeKind::Type,
            "method" => NodeKind::Method,
            "field" => NodeKind::Field,
            "variable" => NodeKind::Variable,
            "table" => NodeKind::Table,
            "view" => NodeKind::View,
            "column" => NodeKind::Column,
            "stored_proc" => NodeKind::StoredProc,
            "function" => NodeKind::Function,
            "http_endpoint" => NodeKind::HttpEndpoint,
            "http_schema" => NodeKind::HttpSchema,
            "index" => NodeKind::Index,
            "foreign_key" => NodeKind::ForeignKey,
            "enum" => NodeKind::Enum,
            _ => return None,
        })
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source language a node/file was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Python,
    Javascript,
    Typescript,
    Markdown,
    Sql,
    Openapi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Markdown => "markdown",
            Language::Sql => "sql",
            Language::Openapi => "openapi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "go" => Language::Go,
            "python" => Language::Python,
            "javascript" => Language::Javascript,
            "typescript" => Language::Typescript,
            "markdown" => Language::Markdown,
            "sql" => Language::Sql,
            "openapi" => Language::Openapi,
            _ => return None,
        })
    }

    /// Extension table used by the source scanner. Returns `None`
    /// for extensions that require content sniffing (e.g. `.yaml`, which may
    /// or may not be an OpenAPI document).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "go" => Language::Go,
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::Javascript,
            "ts" | "tsx" | "mts" | "cts" => Language::Typescript,
            "md" | "markdown" => Language::Markdown,
            "sql" => Language::Sql,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge kind between two [`AstNode`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Call,
    Import,
    Inherits,
    Implements,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Call => "call",
            RelationshipKind::Import => "import",
            RelationshipKind::Inherits => "inherits",
            RelationshipKind::Implements => "implements",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "call" => RelationshipKind::Call,
            "import" => RelationshipKind::Import,
            "inherits" => RelationshipKind::Inherits,
            "implements" => RelationshipKind::Implements,
            _ => return None,
        })
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter of a method or HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
}

/// A structural unit extracted from source: package, type, method, field,
/// variable, or a schema-like node for SQL/OpenAPI sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    /// Stable internal id, assigned by the cache on first insert.
    pub id: u64,
    pub node_type: NodeKind,
    pub file_path: String,
    pub language: Language,
    pub package: Option<String>,
    pub type_name: Option<String>,
    pub method: Option<String>,
    pub field: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub line_count: u32,
    pub cyclomatic_complexity: u32,
    pub parameter_count: u32,
    pub return_count: u32,
    pub parent_id: Option<u64>,
    pub summary: Option<String>,
    pub field_type: Option<String>,
    pub default_value: Option<String>,
    pub parameters: Vec<Parameter>,
}

impl AstNode {
    /// The identity key used for cross-run stability.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            file_path: self.file_path.clone(),
            package: self.package.clone(),
            type_name: self.type_name.clone(),
            method: self.method.clone(),
            field: self.field.clone(),
            node_type: self.node_type,
        }
    }

    /// Fully-qualified name used by pattern matching (`pkg:type:method:field`).
    pub fn qualified_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(p) = &self.package {
            parts.push(p.clone());
        }
        if let Some(t) = &self.type_name {
            parts.push(t.clone());
        }
        if let Some(m) = &self.method {
            parts.push(m.clone());
        }
        if let Some(f) = &self.field {
            parts.push(f.clone());
        }
        parts.join(":")
    }
}

/// The `(file_path, package, type, method, field, node_type)` identity tuple.
/// Two extractions of the same source must produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub file_path: String,
    pub package: Option<String>,
    pub type_name: Option<String>,
    pub method: Option<String>,
    pub field: Option<String>,
    pub node_type: NodeKind,
}

impl IdentityKey {
    /// A flattened string form suitable for a `UNIQUE` SQL column. `\x1f`
    /// (unit separator) can't appear in any of the source components, so
    /// joining with it can't produce a collision between distinct tuples.
    pub fn as_key_string(&self) -> String {
        format!(
            "{}\x1f{}\x1f{}\x1f{}\x1f{}\x1f{}",
            self.file_path,
            self.package.as_deref().unwrap_or(""),
            self.type_name.as_deref().unwrap_or(""),
            self.method.as_deref().unwrap_or(""),
            self.field.as_deref().unwrap_or(""),
            self.node_type.as_str(),
        )
    }
}

/// A directed edge between two nodes, or a node and unresolved external text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: u64,
    pub from_id: u64,
    pub to_id: Option<u64>,
    pub to_text: Option<String>,
    pub line_no: u32,
    pub column_no: u32,
    pub kind: RelationshipKind,
}

/// An external symbol not extractable from the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryNode {
    pub id: u64,
    pub framework: String,
    pub package: String,
    pub symbol: String,
}

/// A relationship from a local node to a [`LibraryNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryRelationship {
    pub id: u64,
    pub from_id: u64,
    pub library_id: u64,
    pub line_no: u32,
    pub column_no: u32,
}

/// Per-file staleness metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_path: String,
    pub content_hash: String,
    pub size: u64,
    pub mtime: i64,
    pub language: Language,
    pub last_scanned_at: chrono::DateTime<chrono::Utc>,
}

/// A node change to apply via [`crate::store::AstCache::update_nodes`].
#[derive(Debug, Clone)]
pub enum NodeChange {
    Add(AstNode),
    Update(AstNode),
    Remove(u64),
}

/// An edge change to apply via [`crate::store::AstCache::update_relationships`].
#[derive(Debug, Clone)]
pub enum RelationshipChange {
    Add(Relationship),
    Remove(u64),
}

/// Direction for edge traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Incoming,
    Outgoing,
    Both,
}

/// Errors raised by the AST/violation cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error(
        "identity collision: key {key} already mapped to node {existing}, refusing to merge with {new_node}"
    )]
    IdentityCollision {
        key: String,
        existing: u64,
        new_node: String,
    },

    #[error("schema migration required: v{from} -> v{to}")]
    SchemaMigration { from: u32, to: u32 },

    #[error("cache corruption detected: {0}")]
    Corruption(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}
