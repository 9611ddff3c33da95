//! `arch-unit ast graph [pattern]` — call graph rooted at the nodes a
//! pattern selects.

use std::collections::HashSet;

use arch_unit_core::store::AstCache;
use arch_unit_core::types::{AstNode, EdgeDirection, RelationshipKind};
use arch_unit_query::pattern::Pattern;

use crate::cli_args::exit_code;
use crate::commands::context::CliContext;

pub fn run(json: bool, pattern: String, format: String, depth: u32, root_only: bool) -> i32 {
    let ctx = match CliContext::load(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast graph: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let parsed = match Pattern::parse(&pattern) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("arch-unit ast graph: invalid pattern `{pattern}`: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let cache = match ctx.open_ast_cache() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast graph: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let compiled = parsed.compile(None);
    let roots = match cache.query_raw(&compiled.predicate_sql, compiled.param_refs().as_slice()) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("arch-unit ast graph: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if roots.is_empty() {
        eprintln!("arch-unit ast graph: pattern `{pattern}` matched no nodes");
        return exit_code::ANALYSIS_ERROR;
    }

    let effective_format = if json { "json" } else { format.as_str() };
    let mut edges: Vec<(AstNode, AstNode)> = Vec::new();
    let mut visited: HashSet<u64> = HashSet::new();

    for root in &roots {
        walk(&cache, root, depth, root_only, &mut visited, &mut edges);
    }

    match effective_format {
        "dot" => print_dot(&roots, &edges),
        "json" => print_json(&edges),
        _ => print_tree(&roots, &cache, depth, root_only),
    }

    exit_code::SUCCESS
}

fn walk(cache: &dyn AstCache, node: &AstNode, remaining_depth: u32, root_only: bool, visited: &mut HashSet<u64>, edges: &mut Vec<(AstNode, AstNode)>) {
    if !visited.insert(node.id) {
        return;
    }
    if remaining_depth == 0 {
        return;
    }
    let callees = cache.get_relationships_by_kind(node.id, RelationshipKind::Call, EdgeDirection::Outgoing);
    for rel in callees {
        let Some(to_id) = rel.to_id else { continue };
        let Some(callee) = cache.get_node_by_id(to_id) else { continue };
        edges.push((node.clone(), callee.clone()));
        if !root_only {
            walk(cache, &callee, remaining_depth - 1, root_only, visited, edges);
        }
    }
}

fn label(node: &AstNode) -> String {
    node.method
        .clone()
        .or_else(|| node.field.clone())
        .or_else(|| node.type_name.clone())
        .or_else(|| node.package.clone())
        .unwrap_or_else(|| node.file_path.clone())
}

fn print_dot(roots: &[AstNode], edges: &[(AstNode, AstNode)]) {
    println!("digraph calls {{");
    let mut seen = HashSet::new();
    for (from, to) in edges {
        if seen.insert((from.id, to.id)) {
            println!("  \"{}\" -> \"{}\";", label(from), label(to));
        }
    }
    for root in roots {
        println!("  \"{}\" [shape=box];", label(root));
    }
    println!("}}");
}

fn print_json(edges: &[(AstNode, AstNode)]) {
    let payload: Vec<_> = edges
        .iter()
        .map(|(from, to)| serde_json::json!({ "from": label(from), "to": label(to), "to_file": to.file_path, "line": to.start_line }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}

fn print_tree(roots: &[AstNode], cache: &dyn AstCache, depth: u32, root_only: bool) {
    for root in roots {
        println!("{}", label(root));
        let mut visited = HashSet::new();
        print_tree_node(root, cache, depth, root_only, 1, &mut visited);
    }
}

fn print_tree_node(node: &AstNode, cache: &dyn AstCache, remaining_depth: u32, root_only: bool, indent: usize, visited: &mut HashSet<u64>) {
    if remaining_depth == 0 || !visited.insert(node.id) {
        return;
    }
    let callees = cache.get_relationships_by_kind(node.id, RelationshipKind::Call, EdgeDirection::Outgoing);
    for rel in callees {
        let Some(to_id) = rel.to_id else { continue };
        let Some(callee) = cache.get_node_by_id(to_id) else { continue };
        println!("{}{}", "  ".repeat(indent), label(&callee));
        if !root_only {
            print_tree_node(&callee, cache, remaining_depth - 1, root_only, indent + 1, visited);
        }
    }
}
