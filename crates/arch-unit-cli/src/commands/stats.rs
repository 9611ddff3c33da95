//! `arch-unit stats` — linter execution history and debounce state.

use arch_unit_runner::debounce::{base_debounce, effective_debounce};

use crate::cli_args::exit_code;
use crate::commands::context::CliContext;

pub fn run(verbose_flag: bool, json: bool, dir: Option<String>) -> i32 {
    let ctx = match CliContext::load(dir.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("arch-unit stats: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    let store = match ctx.open_stats() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("arch-unit stats: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    let histories = match store.all() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("arch-unit stats: {e}");
            return exit_code::ANALYSIS_ERROR;
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&histories).unwrap_or_default());
        return exit_code::SUCCESS;
    }

    if histories.is_empty() {
        println!("no recorded executions yet");
        return exit_code::SUCCESS;
    }

    for h in &histories {
        let base = base_debounce(std::time::Duration::from_secs_f64(h.avg_duration_ms / 1000.0));
        let effective = effective_debounce(h, None);
        println!(
            "{} @ {} — runs: {}, avg: {}ms, factor: {:.2}, base debounce: {:?}, effective: {:?}",
            h.analyzer, h.workdir, h.run_count, h.avg_duration_ms, h.adaptation_factor, base, effective
        );
        if verbose_flag {
            println!(
                "  consecutive_no_violations: {}, consecutive_violations: {}, last_run_at: {}",
                h.consecutive_no_violations, h.consecutive_violations, h.last_run_at
            );
        }
    }

    exit_code::SUCCESS
}
