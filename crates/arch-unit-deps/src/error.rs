/// Errors raised by manifest parsing and recursive resolution.
#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    #[error("reading {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {message}")]
    Parse { path: std::path::PathBuf, message: String },

    #[error("git fetch of {url}: {source}")]
    Git {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("cache error: {0}")]
    Cache(#[from] arch_unit_core::types::CacheError),
}
