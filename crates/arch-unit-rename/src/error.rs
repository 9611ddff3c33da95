/// Errors raised while planning or applying a rename.
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("pattern `{0}` did not match any node")]
    NotFound(String),

    #[error("pattern `{pattern}` matched {count} nodes; rename requires exactly one")]
    Ambiguous { pattern: String, count: usize },

    #[error("{0}")]
    Pattern(#[from] arch_unit_query::pattern::PatternError),

    #[error("cache error: {0}")]
    Cache(#[from] arch_unit_core::types::CacheError),

    #[error("{file}:{line}:{column}: expected `{expected}`, cache is stale")]
    StaleEdit {
        file: String,
        line: u32,
        column: u32,
        expected: String,
    },

    #[error("reading {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
