//! Rule engine for import and call contracts (`.ARCHUNIT` files and
//! `arch-unit.yml`'s `rules` map).

pub mod engine;
pub mod error;
pub mod rulefile;

pub use engine::RuleEngine;
pub use error::RuleError;
pub use rulefile::{RuleAction, RuleEntry};
