//! Parsers for the seven supported manifest formats, each producing
//! `Dependency` records normalized to `(name, version, kind, ecosystem,
//! git?)`.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The package ecosystem a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Go,
    Npm,
    Python,
    Helm,
    Docker,
}

/// Whether a dependency is needed at runtime, only for development, or only
/// to build the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Runtime,
    Dev,
    Build,
}

/// One normalized dependency record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub kind: DependencyKind,
    pub ecosystem: Ecosystem,
    /// A git URL this dependency can be recursively resolved from, when one
    /// can be inferred from the manifest.
    pub git: Option<String>,
    /// The manifest file this record was read from (the cache key for
    /// `DependencyStore`).
    pub manifest_path: String,
}

/// Manifest file names this scanner recognizes.
pub const MANIFEST_FILE_NAMES: &[&str] =
    &["go.mod", "package.json", "requirements.txt", "Pipfile", "pyproject.toml", "Chart.yaml", "Dockerfile"];

/// Parse one manifest file's contents by its file name.
pub fn parse_manifest(path: &Path, contents: &str) -> Vec<Dependency> {
    let manifest_path = path.to_string_lossy().to_string();
    match path.file_name().and_then(|n| n.to_str()) {
        Some("go.mod") => parse_go_mod(contents, &manifest_path),
        Some("package.json") => parse_package_json(contents, &manifest_path),
        Some("requirements.txt") => parse_requirements_txt(contents, &manifest_path),
        Some("Pipfile") => parse_pipfile(contents, &manifest_path),
        Some("pyproject.toml") => parse_pyproject_toml(contents, &manifest_path),
        Some("Chart.yaml") => parse_chart_yaml(contents, &manifest_path),
        Some("Dockerfile") => parse_dockerfile(contents, &manifest_path),
        _ => Vec::new(),
    }
}

fn go_git_url(module_path: &str) -> Option<String> {
    if module_path.contains('.') && module_path.contains('/') {
        Some(format!("https://{module_path}"))
    } else {
        None
    }
}

fn parse_go_mod(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    let mut in_require_block = false;
    for line in contents.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("require (") {
            in_require_block = true;
            continue;
        }
        if in_require_block && line == ")" {
            in_require_block = false;
            continue;
        }
        let body = if let Some(rest) = line.strip_prefix("require ") {
            rest.trim()
        } else if in_require_block {
            line
        } else {
            continue;
        };
        let mut parts = body.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else { continue };
        out.push(Dependency {
            name: name.to_string(),
            version: version.to_string(),
            kind: DependencyKind::Runtime,
            ecosystem: Ecosystem::Go,
            git: go_git_url(name),
            manifest_path: manifest_path.to_string(),
        });
    }
    out
}

fn parse_package_json(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(contents) else { return Vec::new() };
    let mut out = Vec::new();
    for (key, kind) in [
        ("dependencies", DependencyKind::Runtime),
        ("devDependencies", DependencyKind::Dev),
        ("peerDependencies", DependencyKind::Runtime),
    ] {
        if let Some(deps) = json.get(key).and_then(|v| v.as_object()) {
            for (name, version) in deps {
                let version_str = version.as_str().unwrap_or("").to_string();
                out.push(Dependency {
                    name: name.clone(),
                    git: npm_git_url(&version_str),
                    version: version_str,
                    kind,
                    ecosystem: Ecosystem::Npm,
                    manifest_path: manifest_path.to_string(),
                });
            }
        }
    }
    out
}

fn npm_git_url(version: &str) -> Option<String> {
    if let Some(rest) = version.strip_prefix("git+") {
        return Some(rest.to_string());
    }
    if let Some(rest) = version.strip_prefix("github:") {
        return Some(format!("https://github.com/{rest}.git"));
    }
    None
}

fn parse_requirements_txt(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("-e ").or_else(|| line.strip_prefix("--editable ")) {
            if let Some((git, name)) = python_git_egg(rest) {
                out.push(Dependency {
                    name,
                    version: String::new(),
                    kind: DependencyKind::Runtime,
                    ecosystem: Ecosystem::Python,
                    git: Some(git),
                    manifest_path: manifest_path.to_string(),
                });
            }
            continue;
        }
        if let Some((name, version)) = split_python_requirement(line) {
            out.push(Dependency {
                name,
                version,
                kind: DependencyKind::Runtime,
                ecosystem: Ecosystem::Python,
                git: None,
                manifest_path: manifest_path.to_string(),
            });
        }
    }
    out
}

fn python_git_egg(spec: &str) -> Option<(String, String)> {
    let (url, fragment) = spec.split_once('#')?;
    let name = fragment.strip_prefix("egg=")?.to_string();
    Some((url.to_string(), name))
}

fn split_python_requirement(spec: &str) -> Option<(String, String)> {
    let spec = spec.split(';').next().unwrap_or(spec).trim();
    for op in ["==", ">=", "<=", "~=", "!=", ">", "<"] {
        if let Some((name, version)) = spec.split_once(op) {
            return Some((name.trim().to_string(), version.trim().to_string()));
        }
    }
    if spec.is_empty() {
        None
    } else {
        Some((spec.to_string(), String::new()))
    }
}

fn parse_pipfile(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let Ok(toml) = contents.parse::<toml::Value>() else { return Vec::new() };
    let mut out = Vec::new();
    for (table_key, kind) in [("packages", DependencyKind::Runtime), ("dev-packages", DependencyKind::Dev)] {
        if let Some(table) = toml.get(table_key).and_then(|v| v.as_table()) {
            for (name, value) in table {
                let (version, git) = match value {
                    toml::Value::String(s) => (s.clone(), None),
                    toml::Value::Table(t) => {
                        let version = t.get("version").and_then(|v| v.as_str()).unwrap_or("*").to_string();
                        let git = t.get("git").and_then(|v| v.as_str()).map(|s| s.to_string());
                        (version, git)
                    }
                    _ => ("*".to_string(), None),
                };
                out.push(Dependency {
                    name: name.clone(),
                    version,
                    kind,
                    ecosystem: Ecosystem::Python,
                    git,
                    manifest_path: manifest_path.to_string(),
                });
            }
        }
    }
    out
}

fn parse_pyproject_toml(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let Ok(toml) = contents.parse::<toml::Value>() else { return Vec::new() };
    let mut out = Vec::new();

    if let Some(deps) = toml.get("project").and_then(|p| p.get("dependencies")).and_then(|v| v.as_array()) {
        for entry in deps.iter().filter_map(|v| v.as_str()) {
            if let Some((name, version)) = split_python_requirement(entry) {
                out.push(Dependency {
                    name,
                    version,
                    kind: DependencyKind::Runtime,
                    ecosystem: Ecosystem::Python,
                    git: None,
                    manifest_path: manifest_path.to_string(),
                });
            }
        }
    }

    if let Some(table) = toml
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|v| v.as_table())
    {
        for (name, value) in table {
            if name == "python" {
                continue;
            }
            let version = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).unwrap_or("*").to_string(),
                _ => "*".to_string(),
            };
            out.push(Dependency {
                name: name.clone(),
                version,
                kind: DependencyKind::Runtime,
                ecosystem: Ecosystem::Python,
                git: None,
                manifest_path: manifest_path.to_string(),
            });
        }
    }

    out
}

fn parse_chart_yaml(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    #[derive(Deserialize)]
    struct ChartDep {
        name: String,
        version: String,
        #[serde(default)]
        repository: Option<String>,
    }
    #[derive(Deserialize)]
    struct Chart {
        #[serde(default)]
        dependencies: Vec<ChartDep>,
    }
    let Ok(chart) = serde_yaml::from_str::<Chart>(contents) else { return Vec::new() };
    chart
        .dependencies
        .into_iter()
        .map(|d| Dependency {
            name: d.name,
            version: d.version,
            kind: DependencyKind::Runtime,
            ecosystem: Ecosystem::Helm,
            git: d.repository,
            manifest_path: manifest_path.to_string(),
        })
        .collect()
}

fn parse_dockerfile(contents: &str, manifest_path: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("FROM ") else { continue };
        let image_ref = rest.split_whitespace().next().unwrap_or("");
        if image_ref.is_empty() {
            continue;
        }
        let (name, version) = match image_ref.rsplit_once(':') {
            Some((n, v)) if !n.is_empty() => (n.to_string(), v.to_string()),
            _ => (image_ref.to_string(), "latest".to_string()),
        };
        out.push(Dependency {
            name,
            version,
            kind: DependencyKind::Build,
            ecosystem: Ecosystem::Docker,
            git: None,
            manifest_path: manifest_path.to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_go_mod_require_block() {
        let contents = "module example.com/foo\n\ngo 1.21\n\nrequire (\n\tgithub.com/pkg/errors v0.9.1\n\tgolang.org/x/sync v0.5.0 // indirect\n)\n";
        let deps = parse_manifest(&PathBuf::from("go.mod"), contents);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "github.com/pkg/errors");
        assert_eq!(deps[0].version, "v0.9.1");
        assert_eq!(deps[0].git.as_deref(), Some("https://github.com/pkg/errors"));
    }

    #[test]
    fn parses_package_json_dependency_kinds() {
        let contents = r#"{"dependencies":{"express":"^4.18.0"},"devDependencies":{"jest":"^29.0.0"}}"#;
        let deps = parse_manifest(&PathBuf::from("package.json"), contents);
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|d| d.name == "express" && d.kind == DependencyKind::Runtime));
        assert!(deps.iter().any(|d| d.name == "jest" && d.kind == DependencyKind::Dev));
    }

    #[test]
    fn parses_requirements_txt_pins() {
        let contents = "# comment\nrequests==2.31.0\nflask>=2.0\n-e git+https://github.com/foo/bar.git#egg=bar\n";
        let deps = parse_manifest(&PathBuf::from("requirements.txt"), contents);
        assert_eq!(deps.len(), 3);
        assert!(deps.iter().any(|d| d.name == "bar" && d.git.is_some()));
    }

    #[test]
    fn parses_pyproject_pep621_dependencies() {
        let contents = "[project]\nname = \"foo\"\ndependencies = [\"requests>=2.0\", \"click\"]\n";
        let deps = parse_manifest(&PathBuf::from("pyproject.toml"), contents);
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn parses_chart_yaml_dependencies() {
        let contents = "apiVersion: v2\nname: mychart\ndependencies:\n  - name: postgresql\n    version: \"12.1.0\"\n    repository: \"https://charts.bitnami.com/bitnami\"\n";
        let deps = parse_manifest(&PathBuf::from("Chart.yaml"), contents);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "postgresql");
    }

    #[test]
    fn parses_dockerfile_from_lines() {
        let contents = "FROM golang:1.21 AS build\nFROM alpine:3.19\n";
        let deps = parse_manifest(&PathBuf::from("Dockerfile"), contents);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[1].name, "alpine");
        assert_eq!(deps[1].version, "3.19");
    }
}
