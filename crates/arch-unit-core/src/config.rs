//! Configuration file loading for arch-unit.
//!
//! Reads `arch-unit.yml` and provides typed access to all settings. Falls
//! back to sensible defaults when the file is missing or a key is absent.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level arch-unit configuration (`arch-unit.yml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    /// Global default debounce, e.g. `"30s"` or `"auto"`. Per-linter
    /// `debounce` overrides this.
    #[serde(default)]
    pub debounce: Option<String>,

    /// glob -> import rule list.
    #[serde(default)]
    pub rules: HashMap<String, RuleSetConfig>,

    #[serde(default)]
    pub linters: HashMap<String, LinterConfig>,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub builtin_rules: Vec<String>,

    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            debounce: None,
            rules: HashMap::new(),
            linters: HashMap::new(),
            languages: HashMap::new(),
            builtin_rules: Vec::new(),
            variables: HashMap::new(),
        }
    }
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub debounce: Option<String>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            args: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_format: None,
            debounce: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load `arch-unit.yml` from `root`. Returns defaults (with a warning
    /// logged) if the file is missing or fails to parse.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("arch-unit.yml");
        let content = match std::fs::read_to_string(&config_path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_yaml::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "failed to parse arch-unit.yml, using defaults"
                );
                Self::default()
            }
        }
    }
}

/// Parse a duration string: `30s, 5m, 2h, 7d, 1w`, or `auto`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s == "auto" || s.is_empty() {
        return None;
    }
    let (digits, unit) = s.split_at(s.len() - 1);
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        "w" => value * 604_800,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Home-directory cache paths.
pub struct CachePaths {
    pub ast_db: std::path::PathBuf,
    pub stats_db: std::path::PathBuf,
    pub violations_db: std::path::PathBuf,
    pub deps_db: std::path::PathBuf,
}

impl CachePaths {
    /// Resolve the standard cache locations under `~/.cache/arch-unit*`.
    pub fn resolve() -> Self {
        let cache_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("arch-unit");
        Self {
            ast_db: cache_root.join("ast.db"),
            stats_db: cache_root
                .parent()
                .map(|p| p.join("arch-unit-stats.db"))
                .unwrap_or_else(|| cache_root.join("arch-unit-stats.db")),
            violations_db: cache_root.join("violations.db"),
            deps_db: cache_root.join("deps.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.version, "1");
        assert!(cfg.rules.is_empty());
        assert!(cfg.linters.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = Config::load(Path::new("/nonexistent"));
        assert_eq!(cfg.version, "1");
    }

    #[test]
    fn test_load_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"
version: "1"
debounce: "30s"
rules:
  "internal/**":
    imports:
      - "!fmt"
      - "net/http"
linters:
  golangci-lint:
    enabled: true
    args: ["run"]
languages:
  go:
    includes: ["**/*.go"]
    excludes: ["vendor/**"]
"#;
        fs::write(dir.path().join("arch-unit.yml"), yaml).unwrap();
        let cfg = Config::load(dir.path());
        assert_eq!(cfg.debounce.as_deref(), Some("30s"));
        assert_eq!(
            cfg.rules.get("internal/**").unwrap().imports,
            vec!["!fmt", "net/http"]
        );
        assert!(cfg.linters.get("golangci-lint").unwrap().enabled);
        assert_eq!(
            cfg.languages.get("go").unwrap().excludes,
            vec!["vendor/**"]
        );
    }

    #[test]
    fn test_load_malformed_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("arch-unit.yml"), "not: [valid yaml").unwrap();
        let cfg = Config::load(dir.path());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("1w"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("auto"), None);
        assert_eq!(parse_duration("bogus"), None);
    }
}
