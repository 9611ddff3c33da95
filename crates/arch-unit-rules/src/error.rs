/// Errors raised while discovering or parsing rule files.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("walking {path}: {source}")]
    Walk {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache error: {0}")]
    Cache(#[from] arch_unit_core::types::CacheError),
}
