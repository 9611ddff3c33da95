/// Errors raised by the scheduler and child-process execution.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("spawning {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("waiting on child process: {0}")]
    Wait(std::io::Error),

    #[error("building thread pool: {0}")]
    Pool(String),

    #[error("cache error: {0}")]
    Cache(#[from] arch_unit_core::types::CacheError),

    #[error("rule engine error: {0}")]
    Rule(#[from] arch_unit_rules::RuleError),
}
