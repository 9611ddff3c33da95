//! `arch-unit deps` — dependency tree / conflict report.

use arch_unit_deps::{fetch_or_update, resolve_recursive, scan_manifests};

use crate::cli_args::exit_code;

pub fn run(json: bool, path_or_git_url: Option<String>, depth: u32, show_conflicts: bool, git_cache_dir: Option<String>) -> i32 {
    let cwd = match std::env::current_dir() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit deps: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let cache_dir = git_cache_dir.clone().map(std::path::PathBuf::from).unwrap_or_else(|| cwd.join(".arch-unit-deps-cache"));

    let root = match &path_or_git_url {
        Some(target) if target.starts_with("http://") || target.starts_with("https://") || target.starts_with("git@") => {
            match fetch_or_update(target, &cache_dir) {
                Ok(dir) => dir,
                Err(e) => {
                    eprintln!("arch-unit deps: {e}");
                    return exit_code::ANALYSIS_ERROR;
                }
            }
        }
        Some(target) => std::path::PathBuf::from(target),
        None => cwd.clone(),
    };

    let root_deps = match scan_manifests(&root) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("arch-unit deps: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let (resolved, conflicts) = match resolve_recursive(root_deps, depth, &cache_dir) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("arch-unit deps: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if json {
        let payload = serde_json::json!({ "dependencies": resolved.iter().map(|r| &r.dependency).collect::<Vec<_>>(), "conflicts": conflicts.iter().map(|c| serde_json::json!({ "name": c.dependency_name, "paths": c.paths })).collect::<Vec<_>>() });
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        return exit_code::SUCCESS;
    }

    if show_conflicts {
        if conflicts.is_empty() {
            println!("no version conflicts");
        }
        for conflict in &conflicts {
            println!("{}:", conflict.dependency_name);
            for (path, version) in &conflict.paths {
                println!("  {path} -> {version}");
            }
        }
        return exit_code::SUCCESS;
    }

    for r in &resolved {
        println!("{} {} ({}) via {}", r.dependency.name, r.dependency.version, r.dependency.manifest_path, r.resolution_path.join(" > "));
    }
    if !conflicts.is_empty() {
        eprintln!("{} version conflict(s); re-run with --show-conflicts for detail", conflicts.len());
    }

    exit_code::SUCCESS
}
