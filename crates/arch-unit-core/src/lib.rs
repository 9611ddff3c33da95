//! Core data model, AST cache, violation cache, and configuration for arch-unit.
//!
//! - [`types`] — the AST node/relationship/library data model
//! - [`store`] — the [`store::AstCache`] trait consumed by extraction, query, rules, and rename
//! - [`sqlite`] — SQLite-backed [`store::AstCache`] implementation
//! - [`violations`] — the durable violation cache
//! - [`config`] — `arch-unit.yml` loading and cache path resolution
//! - [`hash`] — content hashing for staleness detection and call-site caching

pub mod config;
pub mod hash;
pub mod sqlite;
pub mod store;
pub mod types;
pub mod violations;
