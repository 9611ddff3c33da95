//! Bounded-parallelism scheduler (§5): runs the rule engine and any number
//! of external linters concurrently, applying the debounce contract to
//! each `(analyzer, workdir)` pair before it runs.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use arch_unit_core::config::Config;
use arch_unit_core::store::AstCache;
use arch_unit_core::violations::{Violation, ViolationCache};
use arch_unit_rules::RuleEngine;
use rayon::ThreadPoolBuilder;

use crate::child::{run_linter, CancelToken};
use crate::debounce::{effective_debounce, should_skip};
use crate::error::RunError;
use crate::stats::StatsStore;

/// One enabled analyzer.
pub enum AnalyzerSpec {
    /// The internal import/call rule engine.
    RuleEngine,
    /// An external linter invoked as a child process over the whole workdir.
    ExternalLinter { name: String, program: String, args: Vec<String> },
}

impl AnalyzerSpec {
    pub fn name(&self) -> &str {
        match self {
            AnalyzerSpec::RuleEngine => "arch-unit",
            AnalyzerSpec::ExternalLinter { name, .. } => name,
        }
    }
}

/// Outcome of one analyzer run (or debounce skip).
#[derive(Debug, Clone)]
pub struct AnalyzerResult {
    pub analyzer: String,
    pub workdir: String,
    pub success: bool,
    pub duration: Duration,
    pub skipped: bool,
    pub violations: Vec<Violation>,
}

/// Coordinates rule-engine and external-linter execution against a shared
/// cache, violation store, and execution history.
pub struct Runner {
    root: PathBuf,
    cache: Mutex<Box<dyn AstCache + Send>>,
    violations: Mutex<ViolationCache>,
    stats: Mutex<StatsStore>,
    rule_engine: RuleEngine,
    max_workers: usize,
}

impl Runner {
    pub fn new(
        root: PathBuf,
        cache: Box<dyn AstCache + Send>,
        violations: ViolationCache,
        stats: StatsStore,
    ) -> Result<Self, RunError> {
        let rule_engine = RuleEngine::new(root.clone())?;
        let max_workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(32);
        Ok(Runner {
            root,
            cache: Mutex::new(cache),
            violations: Mutex::new(violations),
            stats: Mutex::new(stats),
            rule_engine,
            max_workers,
        })
    }

    /// Run every analyzer in `specs` against `config`, honoring debounce
    /// unless `force` is set. Returns one result per analyzer.
    pub fn run(
        &self,
        specs: Vec<AnalyzerSpec>,
        config: &Config,
        cancel: &CancelToken,
        force: bool,
    ) -> Result<Vec<AnalyzerResult>, RunError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| RunError::Pool(e.to_string()))?;

        let workdir = self.root.to_string_lossy().to_string();
        let results = pool.install(|| -> Result<Vec<AnalyzerResult>, RunError> {
            use rayon::prelude::*;
            specs
                .into_par_iter()
                .map(|spec| self.run_one(spec, config, &workdir, cancel, force))
                .collect()
        })?;
        Ok(results)
    }

    fn run_one(
        &self,
        spec: AnalyzerSpec,
        config: &Config,
        workdir: &str,
        cancel: &CancelToken,
        force: bool,
    ) -> Result<AnalyzerResult, RunError> {
        let name = spec.name().to_string();
        let override_duration = config
            .linters
            .get(&name)
            .and_then(|l| l.debounce.as_deref())
            .or(config.debounce.as_deref())
            .and_then(arch_unit_core::config::parse_duration);

        let history = self.stats.lock().unwrap().get(&name, workdir)?;
        let effective = effective_debounce(&history, override_duration);

        if !force && should_skip(&history, effective, chrono::Utc::now()) {
            let cached = self.violations.lock().unwrap().get_violations_by_source(&name)?;
            return Ok(AnalyzerResult {
                analyzer: name,
                workdir: workdir.to_string(),
                success: true,
                duration: Duration::ZERO,
                skipped: true,
                violations: cached,
            });
        }

        let started = Instant::now();
        let (success, violations) = match &spec {
            AnalyzerSpec::RuleEngine => (true, self.run_rule_engine(config)?),
            AnalyzerSpec::ExternalLinter { program, args, .. } => {
                self.run_external_linter(&name, program, args, cancel)?
            }
        };
        let duration = started.elapsed();

        let had_violations = !violations.is_empty();
        self.stats.lock().unwrap().record(&name, workdir, duration.as_secs_f64() * 1000.0, had_violations)?;

        Ok(AnalyzerResult { analyzer: name, workdir: workdir.to_string(), success, duration, skipped: false, violations })
    }

    fn run_rule_engine(&self, config: &Config) -> Result<Vec<Violation>, RunError> {
        let cache = self.cache.lock().unwrap();
        let files = cache.all_cached_files();
        let mut all = Vec::new();
        let mut violations = self.violations.lock().unwrap();
        for file in files {
            let file_violations = self.rule_engine.evaluate_file(cache.as_ref(), config, &file);
            violations.store_violations(&file, "arch-unit", &file_violations)?;
            all.extend(file_violations);
        }
        Ok(all)
    }

    fn run_external_linter(
        &self,
        name: &str,
        program: &str,
        args: &[String],
        cancel: &CancelToken,
    ) -> Result<(bool, Vec<Violation>), RunError> {
        let result = run_linter(program, args, &self.root, None, cancel);
        let result = match result {
            Ok(r) => r,
            Err(_) => return Ok((false, Vec::new())),
        };
        if result.timed_out || cancel.is_cancelled() {
            return Ok((false, Vec::new()));
        }

        let parsed = parse_linter_output(&result.stdout, name);
        let mut by_file: HashMap<String, Vec<Violation>> = HashMap::new();
        for v in &parsed {
            by_file.entry(v.file_path.clone()).or_default().push(v.clone());
        }

        let mut violations = self.violations.lock().unwrap();
        let previously_owned: HashSet<String> =
            violations.get_violations_by_source(name)?.into_iter().map(|v| v.file_path).collect();
        let current_files: HashSet<String> = by_file.keys().cloned().collect();

        for file in previously_owned.union(&current_files) {
            let for_file = by_file.get(file).cloned().unwrap_or_default();
            violations.store_violations(file, name, &for_file)?;
        }

        Ok((result.exit_code == Some(0), parsed))
    }
}

/// Best-effort `path:line: message` parser for linters that don't have a
/// structured output mode configured.
fn parse_linter_output(stdout: &str, source: &str) -> Vec<Violation> {
    let mut out = Vec::new();
    for line in stdout.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(line_no), Some(message)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(line_no) = line_no.trim().parse::<u32>() else { continue };
        out.push(Violation {
            id: 0,
            file_path: file.to_string(),
            line: line_no,
            column: 1,
            source: source.to_string(),
            rule_id: None,
            message: message.trim().to_string(),
            called_package: None,
            called_method: None,
            fixable: false,
            fix_applicability: None,
            created_at: chrono::Utc::now(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_line_message() {
        let out = parse_linter_output("main.go:12: unused import \"fmt\"\nnot a finding line", "golangci-lint");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file_path, "main.go");
        assert_eq!(out[0].line, 12);
        assert_eq!(out[0].message, "unused import \"fmt\"");
    }
}
