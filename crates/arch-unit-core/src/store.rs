use crate::types::{
    AstNode, CacheError, EdgeDirection, FileMetadata, LibraryNode, LibraryRelationship,
    NodeChange, Relationship, RelationshipChange,
};

/// FROZEN CONTRACT — AstCache trait.
///
/// The extraction pipeline, the AQL layer, the rule engine, and the renamer
/// all consume this trait; none of them may depend on the concrete storage
/// backend. Do not change this signature without updating every consumer.
pub trait AstCache {
    /// Look up a node by its identity key's components. Returns `None` if no
    /// node with that exact `(file_path, package, type, method, field,
    /// node_type)` tuple is cached.
    fn get_node_by_identity(
        &self,
        file_path: &str,
        package: Option<&str>,
        type_name: Option<&str>,
        method: Option<&str>,
        field: Option<&str>,
        node_type: crate::types::NodeKind,
    ) -> Option<AstNode>;

    /// Look up a node by its internal id.
    fn get_node_by_id(&self, id: u64) -> Option<AstNode>;

    /// All nodes belonging to `file_path`.
    fn get_nodes_in_file(&self, file_path: &str) -> Vec<AstNode>;

    /// All nodes whose `node_type` is `package`.
    fn get_all_packages(&self) -> Vec<AstNode>;

    /// Relationships touching `node_id` in the given direction.
    fn get_relationships(&self, node_id: u64, direction: EdgeDirection) -> Vec<Relationship>;

    /// Relationships of a specific kind touching `node_id` in the given
    /// direction.
    fn get_relationships_by_kind(
        &self,
        node_id: u64,
        kind: crate::types::RelationshipKind,
        direction: EdgeDirection,
    ) -> Vec<Relationship>;

    /// Library relationships originating from `node_id`.
    fn get_library_relationships(&self, node_id: u64) -> Vec<(LibraryRelationship, LibraryNode)>;

    /// Replace all cached state for `file_path` atomically: the prior nodes,
    /// relationships, and library relationships for the file are gone and the
    /// new ones are visible, or none of the replacement happened.
    fn replace_file(
        &mut self,
        file_path: &str,
        nodes: Vec<AstNode>,
        relationships: Vec<Relationship>,
        library_relationships: Vec<(LibraryRelationship, LibraryNode)>,
        metadata: FileMetadata,
    ) -> Result<(), CacheError>;

    /// Remove all cached state for a file (the file was deleted from disk).
    fn remove_file(&mut self, file_path: &str) -> Result<(), CacheError>;

    /// Apply a batch of node changes outside the `replace_file` path (used by
    /// the renamer to patch a single node in place).
    fn update_nodes(&mut self, changes: Vec<NodeChange>) -> Result<(), CacheError>;

    /// Apply a batch of relationship changes outside `replace_file`.
    fn update_relationships(&mut self, changes: Vec<RelationshipChange>) -> Result<(), CacheError>;

    /// True iff `file_path`'s on-disk content hash differs from the recorded
    /// one, or the file has never been scanned. Returns `true` (force rescan) if the file can't be read.
    fn needs_rescan(&self, file_path: &str) -> bool;

    /// Recorded metadata for a file, if any.
    fn get_file_metadata(&self, file_path: &str) -> Option<FileMetadata>;

    /// Every file path the cache currently has nodes for.
    fn all_cached_files(&self) -> Vec<String>;

    /// Run an arbitrary read-only SQL predicate against the `ast_nodes` view
    /// — the single escape hatch pattern compilation targets. `params` are
    /// bound positionally.
    fn query_raw(&self, predicate_sql: &str, params: &[&dyn rusqlite::ToSql])
        -> Result<Vec<AstNode>, CacheError>;

    /// Drop and recreate the schema (used by `ast analyze --no-cache` and
    /// cache-corruption recovery).
    fn rebuild(&mut self) -> Result<(), CacheError>;
}
