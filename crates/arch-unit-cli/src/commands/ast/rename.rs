//! `arch-unit ast rename OLD NEW`.

use arch_unit_rename::Renamer;

use crate::cli_args::exit_code;
use crate::commands::context::CliContext;

pub fn run(json: bool, old: String, new: String, dry_run: bool, show_diff: bool, backup: bool) -> i32 {
    let ctx = match CliContext::load(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast rename: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let cache = match ctx.open_ast_cache() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit ast rename: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let renamer = Renamer::new(&cache);
    let plan = match renamer.plan(&old, &new) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("arch-unit ast rename: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if show_diff || dry_run {
        for edit in &plan.edits {
            println!("{}:{}: {} -> {}", edit.file, edit.line, edit.old, edit.new);
        }
    }

    if dry_run {
        if json {
            println!("{}", serde_json::json!({ "dry_run": true, "edits": plan.edits.len() }));
        } else {
            println!("{} edit(s) planned across {} file(s) (dry run, nothing written)", plan.edits.len(), distinct_files(&plan));
        }
        return exit_code::SUCCESS;
    }

    match arch_unit_rename::apply_rename(&plan, backup) {
        Ok(report) => {
            if json {
                println!("{}", serde_json::json!({ "files_modified": report.files_modified, "references_updated": report.references_updated }));
            } else {
                println!("renamed `{old}` to `{new}`: {} file(s) modified, {} reference(s) updated", report.files_modified, report.references_updated);
            }
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("arch-unit ast rename: {e}");
            exit_code::ANALYSIS_ERROR
        }
    }
}

fn distinct_files(plan: &arch_unit_rename::RenamePlan) -> usize {
    let mut files: Vec<&str> = plan.edits.iter().map(|e| e.file.as_str()).collect();
    files.sort_unstable();
    files.dedup();
    files.len()
}
