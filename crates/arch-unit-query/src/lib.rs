//! Pattern grammar and AQL (metric/structural query) evaluation over the
//! AST cache.
//!
//! - [`pattern`] — the `[language:][path-clause]name-parts` pattern grammar,
//!   compiled to a SQL predicate against [`arch_unit_core::store::AstCache::query_raw`]
//! - [`aql`] — `RULE { FORBID(...) LIMIT(...) }` rule documents built on top
//!   of patterns

pub mod aql;
pub mod pattern;
