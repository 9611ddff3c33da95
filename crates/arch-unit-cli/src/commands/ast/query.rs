//! `arch-unit ast [pattern]` — query the cached AST.

use arch_unit_core::types::{AstNode, EdgeDirection, RelationshipKind};
use arch_unit_query::pattern::Pattern;

use crate::cli_args::exit_code;
use crate::commands::context::CliContext;

#[allow(clippy::too_many_arguments)]
pub fn run(json: bool, pattern: String, format: String, complexity: bool, calls: bool, threshold: Option<u32>) -> i32 {
    let ctx = match CliContext::load(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let parsed = match Pattern::parse(&pattern) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("arch-unit ast: invalid pattern `{pattern}`: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let cache = match ctx.open_ast_cache() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let compiled = parsed.compile(None);
    let mut nodes = match arch_unit_core::store::AstCache::query_raw(&cache, &compiled.predicate_sql, compiled.param_refs().as_slice()) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("arch-unit ast: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if let Some(threshold) = threshold {
        nodes.retain(|n| n.cyclomatic_complexity >= threshold);
    }
    nodes.sort_by(|a, b| (a.file_path.as_str(), a.start_line).cmp(&(b.file_path.as_str(), b.start_line)));

    let call_counts: Vec<usize> = if calls {
        nodes
            .iter()
            .map(|n| arch_unit_core::store::AstCache::get_relationships_by_kind(&cache, n.id, RelationshipKind::Call, EdgeDirection::Outgoing).len())
            .collect()
    } else {
        Vec::new()
    };

    let effective_format = if json { "json" } else { format.as_str() };
    match effective_format {
        "json" => print_json(&nodes, complexity, calls, &call_counts),
        "table" => print_table(&nodes, complexity, calls, &call_counts),
        "template" => print_template(&nodes, complexity, calls, &call_counts),
        _ => print_tree(&nodes, complexity, calls, &call_counts),
    }

    exit_code::SUCCESS
}

fn qualified_name(node: &AstNode) -> String {
    let mut parts = Vec::new();
    if let Some(p) = &node.package {
        parts.push(p.clone());
    }
    if let Some(t) = &node.type_name {
        parts.push(t.clone());
    }
    if let Some(m) = &node.method {
        parts.push(m.clone());
    }
    if let Some(f) = &node.field {
        parts.push(f.clone());
    }
    if parts.is_empty() {
        node.file_path.clone()
    } else {
        parts.join(".")
    }
}

fn print_json(nodes: &[AstNode], complexity: bool, calls: bool, call_counts: &[usize]) {
    let payload: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let mut obj = serde_json::json!({
                "file": n.file_path,
                "line": n.start_line,
                "name": qualified_name(n),
                "kind": format!("{:?}", n.node_type),
            });
            if complexity {
                obj["complexity"] = serde_json::json!(n.cyclomatic_complexity);
            }
            if calls {
                obj["calls"] = serde_json::json!(call_counts[i]);
            }
            obj
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}

fn print_table(nodes: &[AstNode], complexity: bool, calls: bool, call_counts: &[usize]) {
    for (i, n) in nodes.iter().enumerate() {
        let mut line = format!("{}\t{}\t{}\t{}", n.file_path, n.start_line, format!("{:?}", n.node_type), qualified_name(n));
        if complexity {
            line.push_str(&format!("\t{}", n.cyclomatic_complexity));
        }
        if calls {
            line.push_str(&format!("\t{}", call_counts[i]));
        }
        println!("{line}");
    }
}

fn print_template(nodes: &[AstNode], complexity: bool, calls: bool, call_counts: &[usize]) {
    for (i, n) in nodes.iter().enumerate() {
        let mut line = format!("{}:{}: {}", n.file_path, n.start_line, qualified_name(n));
        if complexity {
            line.push_str(&format!(" (complexity={})", n.cyclomatic_complexity));
        }
        if calls {
            line.push_str(&format!(" (calls={})", call_counts[i]));
        }
        println!("{line}");
    }
}

fn print_tree(nodes: &[AstNode], complexity: bool, calls: bool, call_counts: &[usize]) {
    let mut current_file: Option<&str> = None;
    for (i, n) in nodes.iter().enumerate() {
        if current_file != Some(n.file_path.as_str()) {
            println!("{}", n.file_path);
            current_file = Some(n.file_path.as_str());
        }
        let mut line = format!("  {} {} (line {})", format!("{:?}", n.node_type).to_lowercase(), qualified_name(n), n.start_line);
        if complexity {
            line.push_str(&format!(" complexity={}", n.cyclomatic_complexity));
        }
        if calls {
            line.push_str(&format!(" calls={}", call_counts[i]));
        }
        println!("{line}");
    }
}
