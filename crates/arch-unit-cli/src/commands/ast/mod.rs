//! `arch-unit ast` subcommand dispatch.

pub mod analyze;
pub mod graph;
pub mod query;
pub mod rename;

use crate::cli_args::AstCommands;

pub fn run(json: bool, verbose: bool, command: AstCommands) -> i32 {
    match command {
        AstCommands::Query { pattern, format, complexity, calls, threshold } => query::run(json, pattern, format, complexity, calls, threshold),
        AstCommands::Analyze { path, no_cache, languages, max_workers, cache_ttl } => analyze::run(verbose, json, path, no_cache, languages, max_workers, cache_ttl),
        AstCommands::Rename { old, new, dry_run, show_diff, backup } => rename::run(json, old, new, dry_run, show_diff, backup),
        AstCommands::Graph { pattern, format, depth, root_only } => graph::run(json, pattern, format, depth, root_only),
    }
}
