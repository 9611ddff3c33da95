//! Source Scanner: a single deterministic directory walk
//! yielding `(path, language)` pairs, filtered by exclude-then-include glob
//! lists plus a fixed set of builtin excludes.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use arch_unit_core::types::Language;

const BUILTIN_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/vendor/**",
    "**/.git/**",
    "**/__pycache__/**",
    "**/.venv/**",
];

#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub language: Language,
}

pub struct SourceScanner {
    root: PathBuf,
    exclude: GlobSet,
    include: Option<GlobSet>,
}

impl SourceScanner {
    pub fn new(root: &Path, config: &ScanConfig) -> Result<Self, globset::Error> {
        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in BUILTIN_EXCLUDES {
            exclude_builder.add(Glob::new(pattern)?);
        }
        for pattern in &config.exclude {
            exclude_builder.add(Glob::new(pattern)?);
        }

        let include = if config.include.is_empty() {
            None
        } else {
            let mut include_builder = GlobSetBuilder::new();
            for pattern in &config.include {
                include_builder.add(Glob::new(pattern)?);
            }
            Some(include_builder.build()?)
        };

        Ok(Self {
            root: root.to_path_buf(),
            exclude: exclude_builder.build()?,
            include,
        })
    }

    /// Walks [`Self::root`] once, returning every regular file whose
    /// language is recognized and that survives exclude-then-include
    /// filtering, sorted by path for deterministic enumeration.
    pub fn scan(&self) -> Vec<ScannedFile> {
        let mut results = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .build();

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.into_path();
            let relative = path.strip_prefix(&self.root).unwrap_or(&path);

            if self.exclude.is_match(relative) {
                continue;
            }
            if let Some(include) = &self.include {
                if !include.is_match(relative) {
                    continue;
                }
            }

            let Some(language) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Language::from_extension)
            else {
                continue;
            };

            results.push(ScannedFile { path, language });
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_recognized_languages_and_drops_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.go"), "package main").unwrap();
        fs::write(root.join("src/app.py"), "x = 1").unwrap();
        fs::write(root.join("README.md"), "# hi").unwrap();
        fs::write(root.join("notes.txt"), "plain text").unwrap();

        let scanner = SourceScanner::new(root, &ScanConfig::default()).unwrap();
        let files = scanner.scan();
        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|f| f.language == Language::Go));
        assert!(files.iter().any(|f| f.language == Language::Python));
        assert!(files.iter().any(|f| f.language == Language::Markdown));
    }

    #[test]
    fn scan_applies_builtin_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("vendor/lib.go"), "package lib").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "module.exports = {}").unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();

        let scanner = SourceScanner::new(root, &ScanConfig::default()).unwrap();
        let files = scanner.scan();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("main.go"));
    }

    #[test]
    fn scan_applies_include_after_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("src/app.go"), "package app").unwrap();
        fs::write(root.join("tests/app_test.go"), "package app").unwrap();

        let config = ScanConfig {
            include: vec!["src/**".to_string()],
            exclude: vec![],
        };
        let scanner = SourceScanner::new(root, &config).unwrap();
        let files = scanner.scan();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("app.go"));
    }

    #[test]
    fn scan_is_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["c.go", "a.go", "b.go"] {
            fs::write(root.join(name), "package p").unwrap();
        }
        let scanner = SourceScanner::new(root, &ScanConfig::default()).unwrap();
        let first: Vec<_> = scanner.scan().into_iter().map(|f| f.path).collect();
        let second: Vec<_> = scanner.scan().into_iter().map(|f| f.path).collect();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] <= w[1]));
    }
}
