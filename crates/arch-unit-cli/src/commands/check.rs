//! `arch-unit check` — run the rule engine and any enabled external linters.

use arch_unit_core::config::parse_duration;
use arch_unit_runner::{AnalyzerResult, AnalyzerSpec, CancelToken, Runner};

use crate::cli_args::exit_code;
use crate::commands::context::{path_matches_any, CliContext};

#[allow(clippy::too_many_arguments)]
pub fn run(
    verbose: bool,
    json: bool,
    path: Option<String>,
    files: Vec<String>,
    linters: String,
    fix: bool,
    fail_on_violation: bool,
    no_cache: bool,
    include: Vec<String>,
    exclude: Vec<String>,
) -> i32 {
    let ctx = match CliContext::load(path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    if fix {
        eprintln!("arch-unit check: --fix is only honored by linters that report fix_applicability; arch-unit's own rule engine has no auto-fixable findings");
    }

    let cache = match ctx.open_ast_cache_boxed() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };
    let violations = match ctx.open_violations() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };
    let stats = match ctx.open_stats() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let runner = match Runner::new(ctx.cwd.clone(), cache, violations, stats) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let specs = selected_analyzers(&linters, &ctx.config);
    if specs.is_empty() {
        if verbose {
            eprintln!("arch-unit check: no analyzers selected");
        }
        return exit_code::SUCCESS;
    }

    let cancel = CancelToken::new();
    let mut results = match runner.run(specs, &ctx.config, &cancel, no_cache) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("arch-unit check: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    filter_violations(&mut results, &files, &include, &exclude);

    let any_failed = results.iter().any(|r| !r.success);
    let total_violations: usize = results.iter().map(|r| r.violations.len()).sum();

    if json {
        let payload: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "analyzer": r.analyzer,
                    "workdir": r.workdir,
                    "success": r.success,
                    "skipped": r.skipped,
                    "duration_ms": r.duration.as_millis(),
                    "violations": r.violations,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        for result in &results {
            let status = if result.skipped { "skipped (debounced)" } else if result.success { "ok" } else { "failed" };
            if verbose || !result.violations.is_empty() || !result.success {
                eprintln!("{}: {} ({} violation(s))", result.analyzer, status, result.violations.len());
            }
            for v in &result.violations {
                println!("{}:{}:{}: [{}] {}", v.file_path, v.line, v.column, v.source, v.message);
            }
        }
    }

    if any_failed {
        exit_code::ANALYSIS_ERROR
    } else if total_violations > 0 && fail_on_violation {
        exit_code::VIOLATIONS_FOUND
    } else {
        exit_code::SUCCESS
    }
}

/// Narrow each analyzer's violations to the files the caller asked to
/// check: an explicit file list (if given), minus `--exclude`, plus
/// `--include` when given as a further restriction on top of that.
fn filter_violations(results: &mut [AnalyzerResult], files: &[String], include: &[String], exclude: &[String]) {
    if files.is_empty() && include.is_empty() && exclude.is_empty() {
        return;
    }
    for result in results {
        result.violations.retain(|v| {
            if !exclude.is_empty() && path_matches_any(&v.file_path, exclude) {
                return false;
            }
            if !include.is_empty() && !path_matches_any(&v.file_path, include) {
                return false;
            }
            if !files.is_empty() && !files.iter().any(|f| f == &v.file_path) {
                return false;
            }
            true
        });
    }
}

fn selected_analyzers(linters: &str, config: &arch_unit_core::config::Config) -> Vec<AnalyzerSpec> {
    if linters == "none" {
        return Vec::new();
    }

    let mut specs = vec![AnalyzerSpec::RuleEngine];

    let wanted: Option<Vec<&str>> = if linters == "*" { None } else { Some(linters.split(',').map(str::trim).collect()) };

    for (name, linter_config) in &config.linters {
        if !linter_config.enabled {
            continue;
        }
        if let Some(list) = &wanted {
            if !list.contains(&name.as_str()) {
                continue;
            }
        }
        let Some((program, rest)) = linter_config.args.split_first() else { continue };
        specs.push(AnalyzerSpec::ExternalLinter {
            name: name.clone(),
            program: program.clone(),
            args: rest.to_vec(),
        });
    }

    // `cache_ttl`-style explicit durations on a per-linter `debounce` are
    // read directly by the runner via `config`; nothing to resolve here
    // beyond validating they parse, so a malformed value degrades to the
    // computed default rather than aborting the whole check.
    for linter_config in config.linters.values() {
        if let Some(debounce) = &linter_config.debounce {
            if parse_duration(debounce).is_none() && debounce != "auto" {
                eprintln!("arch-unit check: ignoring unparseable debounce `{debounce}`");
            }
        }
    }

    specs
}
