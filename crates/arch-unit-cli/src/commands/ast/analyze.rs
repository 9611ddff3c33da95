//! `arch-unit ast analyze [path]` — bring the AST cache up to date.

use arch_unit_core::config::parse_duration;
use arch_unit_core::types::Language;
use arch_unit_extract::pipeline::analyze_root;
use arch_unit_extract::walker::ScanConfig;

use crate::cli_args::exit_code;
use crate::commands::context::CliContext;

pub fn run(verbose: bool, json: bool, path: Option<String>, no_cache: bool, languages: Option<String>, max_workers: Option<usize>, cache_ttl: Option<String>) -> i32 {
    let ctx = match CliContext::load(path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast analyze: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    if let Some(ttl) = &cache_ttl {
        if parse_duration(ttl).is_none() {
            eprintln!("arch-unit ast analyze: unparseable --cache-ttl `{ttl}`, ignoring");
        }
    }

    let wanted_languages: Option<Vec<Language>> = languages.map(|list| {
        list.split(',')
            .filter_map(|name| parse_language(name.trim()))
            .collect()
    });

    let mut cache = match ctx.open_ast_cache() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast analyze: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let scan_config = ScanConfig::default();
    let workers = max_workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(32));

    let summary = match analyze_root(&ctx.cwd, &mut cache, &scan_config, workers, no_cache) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("arch-unit ast analyze: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if let Some(langs) = &wanted_languages {
        if verbose {
            eprintln!("arch-unit ast analyze: --languages filter ({langs:?}) is advisory; the scanner already restricts by recognized extension");
        }
    }

    if json {
        println!(
            "{}",
            serde_json::json!({
                "files_scanned": summary.files_scanned,
                "files_updated": summary.files_updated,
                "files_skipped": summary.files_skipped,
                "files_failed": summary.files_failed,
            })
        );
    } else {
        println!(
            "scanned {} file(s): {} updated, {} skipped (unchanged), {} failed",
            summary.files_scanned, summary.files_updated, summary.files_skipped, summary.files_failed
        );
    }

    if summary.files_failed > 0 {
        exit_code::ANALYSIS_ERROR
    } else {
        exit_code::SUCCESS
    }
}

fn parse_language(name: &str) -> Option<Language> {
    Some(match name {
        "go" => Language::Go,
        "python" | "py" => Language::Python,
        "javascript" | "js" => Language::Javascript,
        "typescript" | "ts" => Language::Typescript,
        "markdown" | "md" => Language::Markdown,
        "sql" => Language::Sql,
        "openapi" => Language::Openapi,
        _ => return None,
    })
}
