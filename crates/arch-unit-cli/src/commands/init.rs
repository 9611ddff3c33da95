//! `arch-unit init` — write a starter `arch-unit.yml`.

use std::collections::HashMap;
use std::path::Path;

use arch_unit_core::config::{Config, LanguageConfig, RuleSetConfig};

use crate::cli_args::exit_code;

pub fn run(verbose: bool, path: Option<String>, interactive: bool, style: String, strictness: String) -> i32 {
    let cwd = match path {
        Some(p) => std::path::PathBuf::from(p),
        None => match std::env::current_dir() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("arch-unit init: failed to get current directory: {e}");
                return exit_code::CONFIG_ERROR;
            }
        },
    };

    let config_path = cwd.join("arch-unit.yml");
    if config_path.exists() {
        eprintln!("arch-unit init: {} already exists", config_path.display());
        return exit_code::CONFIG_ERROR;
    }

    let (style, strictness) = if interactive { prompt_for_choices(style, strictness) } else { (style, strictness) };

    let style = normalize_style(&style);
    let strictness = normalize_strictness(&strictness);

    let languages = detect_languages(&cwd);
    let rules = starter_rules(style, strictness, &languages);
    let builtin_rules = starter_builtin_rules(strictness);

    let config = Config {
        version: "1".to_string(),
        debounce: Some("auto".to_string()),
        rules,
        linters: HashMap::new(),
        languages: languages.iter().map(|l| (l.clone(), LanguageConfig::default())).collect(),
        builtin_rules,
        variables: HashMap::new(),
    };

    let yaml = match serde_yaml::to_string(&config) {
        Ok(y) => y,
        Err(e) => {
            eprintln!("arch-unit init: failed to render config: {e}");
            return exit_code::CONFIG_ERROR;
        }
    };

    if let Err(e) = std::fs::write(&config_path, yaml) {
        eprintln!("arch-unit init: failed to write {}: {e}", config_path.display());
        return exit_code::CONFIG_ERROR;
    }

    if verbose {
        eprintln!(
            "arch-unit init: wrote {} (style={style:?}, strictness={strictness:?}, languages={languages:?})",
            config_path.display()
        );
    } else {
        println!("wrote {}", config_path.display());
    }

    exit_code::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Strict,
    Balanced,
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    Low,
    Medium,
    High,
}

fn normalize_style(s: &str) -> Style {
    match s {
        "strict" => Style::Strict,
        "permissive" | "relaxed" => Style::Permissive,
        _ => Style::Balanced,
    }
}

fn normalize_strictness(s: &str) -> Strictness {
    match s {
        "low" => Strictness::Low,
        "high" => Strictness::High,
        _ => Strictness::Medium,
    }
}

fn prompt_for_choices(default_style: String, default_strictness: String) -> (String, String) {
    let style_items = ["strict", "balanced", "permissive"];
    let style_default = style_items.iter().position(|s| *s == default_style).unwrap_or(1);
    let style = dialoguer::Select::new()
        .with_prompt("Rule style")
        .items(&style_items)
        .default(style_default)
        .interact()
        .map(|i| style_items[i].to_string())
        .unwrap_or(default_style);

    let strictness_items = ["low", "medium", "high"];
    let strictness_default = strictness_items.iter().position(|s| *s == default_strictness).unwrap_or(1);
    let strictness = dialoguer::Select::new()
        .with_prompt("Builtin rule strictness")
        .items(&strictness_items)
        .default(strictness_default)
        .interact()
        .map(|i| strictness_items[i].to_string())
        .unwrap_or(default_strictness);

    (style, strictness)
}

fn detect_languages(root: &Path) -> Vec<String> {
    let mut languages = Vec::new();
    if root.join("go.mod").exists() {
        languages.push("go".to_string());
    }
    if root.join("package.json").exists() {
        languages.push("typescript".to_string());
    }
    if root.join("pyproject.toml").exists() || root.join("requirements.txt").exists() || root.join("Pipfile").exists() {
        languages.push("python".to_string());
    }
    if languages.is_empty() {
        languages.push("go".to_string());
    }
    languages
}

/// A starter `rules:` map. `strict` adds a denial on `fmt.Println` outside
/// test files for Go; `balanced`/`permissive` start empty so the generated
/// file documents the syntax without imposing opinions the user didn't ask
/// for.
fn starter_rules(style: Style, strictness: Strictness, languages: &[String]) -> HashMap<String, RuleSetConfig> {
    let mut rules = HashMap::new();
    if style != Style::Strict {
        return rules;
    }
    if languages.iter().any(|l| l == "go") {
        rules.insert(
            "**/*.go".to_string(),
            RuleSetConfig { imports: vec!["!fmt:Println".to_string()] },
        );
    }
    if strictness == Strictness::High {
        rules.insert(
            "**/*_test.go".to_string(),
            RuleSetConfig { imports: vec!["fmt:*".to_string()] },
        );
    }
    rules
}

fn starter_builtin_rules(strictness: Strictness) -> Vec<String> {
    match strictness {
        Strictness::Low => Vec::new(),
        Strictness::Medium => vec!["no-cyclic-imports".to_string()],
        Strictness::High => vec!["no-cyclic-imports".to_string(), "max-complexity-10".to_string()],
    }
}
