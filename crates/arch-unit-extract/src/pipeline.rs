//! Orchestrates a full (or incremental) scan: walk the tree, extract every
//! recognized file in parallel, then serialize the results into the cache
//! one file at a time, matching the single-writer policy every consumer of
//! `AstCache` relies on.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use arch_unit_core::hash::content_hash;
use arch_unit_core::store::AstCache;
use arch_unit_core::types::{CacheError, FileMetadata, Language};

use crate::resolver::{ExtractError, ExtractOutput, LanguageExtractor};
use crate::walker::{ScanConfig, ScannedFile, SourceScanner};
use crate::{go, markdown, openapi, python, sql, typescript};

/// Picks the extractor responsible for a language. `None` for languages the
/// scanner itself never reports (the scanner only emits files whose
/// extension maps to one of these).
pub fn extractor_for(language: Language) -> Box<dyn LanguageExtractor> {
    match language {
        Language::Go => Box::new(go::GoExtractor::new()),
        Language::Python => Box::new(python::PythonExtractor::new()),
        Language::Typescript => Box::new(typescript::TypeScriptExtractor::new()),
        Language::Javascript => Box::new(typescript::TypeScriptExtractor::javascript()),
        Language::Markdown => Box::new(markdown::MarkdownExtractor::new()),
        Language::Sql => Box::new(sql::SqlExtractor::new()),
        Language::Openapi => Box::new(openapi::OpenApiExtractor::new()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeSummary {
    pub files_scanned: usize,
    pub files_updated: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

/// One file's outcome, computed off the cache so extraction can run across
/// a rayon thread pool; the cache write itself happens back on the caller's
/// thread.
enum FileOutcome {
    Updated { file: ScannedFile, output: ExtractOutput, hash: String, size: u64, mtime: i64 },
    Failed { path: String, error: ExtractError },
    Unreadable { path: String },
}

/// Scan `root` and bring `cache` up to date. Files whose content hash
/// matches the cached one are left untouched unless `force` is set. Runs
/// extraction across up to `max_workers` threads; cache writes are applied
/// sequentially afterward (the cache is the one shared mutable resource).
pub fn analyze_root(
    root: &Path,
    cache: &mut dyn AstCache,
    scan_config: &ScanConfig,
    max_workers: usize,
    force: bool,
) -> Result<AnalyzeSummary, CacheError> {
    let scanner = SourceScanner::new(root, scan_config).map_err(|e| CacheError::Database(e.to_string()))?;
    let files = scanner.scan();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .map_err(|e| CacheError::Database(e.to_string()))?;

    let mut summary = AnalyzeSummary { files_scanned: files.len(), ..Default::default() };

    let rescan_targets: Vec<&ScannedFile> = files
        .iter()
        .filter(|f| force || cache.needs_rescan(f.path.to_string_lossy().as_ref()))
        .collect();
    summary.files_skipped = files.len() - rescan_targets.len();

    let outcomes: Vec<FileOutcome> = pool.install(|| {
        rescan_targets.into_par_iter().map(|file| extract_one(file)).collect()
    });

    for outcome in outcomes {
        match outcome {
            FileOutcome::Updated { file, output, hash, size, mtime } => {
                let metadata = FileMetadata {
                    file_path: file.path.to_string_lossy().to_string(),
                    content_hash: hash,
                    size,
                    mtime,
                    language: file.language,
                    last_scanned_at: chrono::Utc::now(),
                };
                cache.replace_file(
                    &file.path.to_string_lossy(),
                    output.nodes,
                    output.relationships,
                    output.library_relationships,
                    metadata,
                )?;
                summary.files_updated += 1;
            }
            FileOutcome::Failed { path, error } => {
                tracing::warn!(file = %path, error = %error, "extraction failed, file left at its prior cached state");
                summary.files_failed += 1;
            }
            FileOutcome::Unreadable { path } => {
                tracing::warn!(file = %path, "could not read file during scan");
                summary.files_failed += 1;
            }
        }
    }

    Ok(summary)
}

fn extract_one(file: &ScannedFile) -> FileOutcome {
    let path_str = file.path.to_string_lossy().to_string();
    let bytes = match std::fs::read(&file.path) {
        Ok(b) => b,
        Err(_) => return FileOutcome::Unreadable { path: path_str },
    };

    let extractor = extractor_for(file.language);
    match extractor.extract(&file.path, &bytes) {
        Ok(output) => {
            let hash = content_hash(&bytes);
            let size = bytes.len() as u64;
            let mtime = std::fs::metadata(&file.path)
                .and_then(|m| m.modified())
                .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64)
                .unwrap_or_else(|_| SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64);
            FileOutcome::Updated { file: file.clone(), output, hash, size, mtime }
        }
        Err(error) => FileOutcome::Failed { path: path_str, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_unit_core::sqlite::SqliteAstCache;

    #[test]
    fn analyzes_a_small_go_tree_and_skips_unchanged_on_rerun() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();

        let mut cache = SqliteAstCache::in_memory().unwrap();
        let config = ScanConfig::default();

        let first = analyze_root(tmp.path(), &mut cache, &config, 2, false).unwrap();
        assert_eq!(first.files_scanned, 1);
        assert_eq!(first.files_updated, 1);

        let second = analyze_root(tmp.path(), &mut cache, &config, 2, false).unwrap();
        assert_eq!(second.files_updated, 0);
        assert_eq!(second.files_skipped, 1);
    }
}
