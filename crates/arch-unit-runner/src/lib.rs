//! Bounded-parallelism analyzer scheduling and execution-history-driven
//! debounce for arch-unit.

pub mod child;
pub mod debounce;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use child::CancelToken;
pub use error::RunError;
pub use scheduler::{AnalyzerResult, AnalyzerSpec, Runner};
pub use stats::{ExecutionHistory, StatsStore};
