//! Recursive dependency resolution: follow each dependency's inferred git
//! URL, scan its manifests, and repeat up to `depth`, recording version
//! conflicts along the way.

use std::collections::HashMap;
use std::path::Path;

use crate::error::DepsError;
use crate::manifest::Dependency;
use crate::scanner::scan_manifests;

/// One dependency reached while walking the resolution tree, with the chain
/// of names that led to it.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub dependency: Dependency,
    pub resolution_path: Vec<String>,
}

/// The same dependency name resolved to differing versions along different
/// resolution paths.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionConflict {
    pub dependency_name: String,
    pub paths: Vec<(String, String)>,
}

/// Resolve `root_deps` recursively up to `depth` levels, cloning each
/// dependency's inferred git URL into a subdirectory of `cache_dir`.
/// Resolution strategy conflicts are reported, not enforced (§4.8).
pub fn resolve_recursive(
    root_deps: Vec<Dependency>,
    depth: u32,
    cache_dir: &Path,
) -> Result<(Vec<ResolvedDependency>, Vec<VersionConflict>), DepsError> {
    let mut resolved = Vec::new();
    let mut seen_git_urls = std::collections::HashSet::new();
    let mut queue: Vec<(Dependency, Vec<String>, u32)> =
        root_deps.into_iter().map(|d| (d, Vec::new(), depth)).collect();

    while let Some((dep, path, remaining_depth)) = queue.pop() {
        let mut resolution_path = path.clone();
        resolution_path.push(dep.name.clone());
        resolved.push(ResolvedDependency { dependency: dep.clone(), resolution_path: resolution_path.clone() });

        if remaining_depth == 0 {
            continue;
        }
        let Some(git_url) = &dep.git else { continue };
        if !seen_git_urls.insert(git_url.clone()) {
            continue;
        }

        let checkout_dir = match fetch_or_update(git_url, cache_dir) {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(url = %git_url, error = %e, "dependency git fetch failed, skipping recursion");
                continue;
            }
        };

        let nested = scan_manifests(&checkout_dir)?;
        for nested_dep in nested {
            queue.push((nested_dep, resolution_path.clone(), remaining_depth - 1));
        }
    }

    let conflicts = detect_conflicts(&resolved);
    Ok((resolved, conflicts))
}

/// Deterministic checkout directory name for a git URL, stable across runs
/// so repeated scans of the same dependency reuse one clone.
pub fn checkout_dir_name(git_url: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    git_url.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Clone `git_url` into `cache_dir` (or fetch if already cloned there) and
/// return the checkout path. Shared by recursive resolution and by `deps`
/// being pointed directly at a git URL.
pub fn fetch_or_update(git_url: &str, cache_dir: &Path) -> Result<std::path::PathBuf, DepsError> {
    let dest = cache_dir.join(checkout_dir_name(git_url));
    fetch_or_update_at(git_url, &dest)?;
    Ok(dest)
}

fn fetch_or_update_at(git_url: &str, dest: &Path) -> Result<(), DepsError> {
    if dest.exists() {
        let repo = git2::Repository::open(dest).map_err(|source| DepsError::Git { url: git_url.to_string(), source })?;
        let mut remote = repo
            .find_remote("origin")
            .map_err(|source| DepsError::Git { url: git_url.to_string(), source })?;
        remote
            .fetch(&["HEAD"], None, None)
            .map_err(|source| DepsError::Git { url: git_url.to_string(), source })?;
        return Ok(());
    }
    std::fs::create_dir_all(dest.parent().unwrap_or(dest)).ok();
    git2::build::RepoBuilder::new()
        .clone(git_url, dest)
        .map(|_| ())
        .map_err(|source| DepsError::Git { url: git_url.to_string(), source })
}

/// A dependency name resolved to more than one distinct version across the
/// tree is a conflict.
fn detect_conflicts(resolved: &[ResolvedDependency]) -> Vec<VersionConflict> {
    let mut by_name: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for r in resolved {
        by_name
            .entry(r.dependency.name.clone())
            .or_default()
            .push((r.resolution_path.join(" > "), r.dependency.version.clone()));
    }
    by_name
        .into_iter()
        .filter_map(|(name, paths)| {
            let distinct_versions: std::collections::HashSet<&str> =
                paths.iter().map(|(_, v)| v.as_str()).collect();
            if distinct_versions.len() > 1 {
                Some(VersionConflict { dependency_name: name, paths })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{DependencyKind, Ecosystem};

    fn dep(name: &str, version: &str) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: version.to_string(),
            kind: DependencyKind::Runtime,
            ecosystem: Ecosystem::Go,
            git: None,
            manifest_path: "go.mod".to_string(),
        }
    }

    #[test]
    fn depth_zero_resolves_only_direct_deps() {
        let tmp = tempfile::tempdir().unwrap();
        let (resolved, conflicts) =
            resolve_recursive(vec![dep("a", "1.0"), dep("b", "2.0")], 0, tmp.path()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn detects_conflicting_versions_across_paths() {
        let resolved = vec![
            ResolvedDependency { dependency: dep("a", "1.0"), resolution_path: vec!["root".into(), "a".into()] },
            ResolvedDependency { dependency: dep("a", "2.0"), resolution_path: vec!["root".into(), "b".into(), "a".into()] },
        ];
        let conflicts = detect_conflicts(&resolved);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].dependency_name, "a");
        assert_eq!(conflicts[0].paths.len(), 2);
    }
}
