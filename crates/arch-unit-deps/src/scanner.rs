//! Walks a workdir for recognized manifest files and parses each into
//! `Dependency` records.

use std::path::Path;

use ignore::WalkBuilder;

use crate::error::DepsError;
use crate::manifest::{parse_manifest, Dependency, MANIFEST_FILE_NAMES};

/// Walk `root` (honoring `.gitignore`, same convention as the source
/// scanner) collecting every recognized manifest and parsing it.
pub fn scan_manifests(root: &Path) -> Result<Vec<Dependency>, DepsError> {
    let mut out = Vec::new();
    for entry in WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let is_manifest = entry
            .file_name()
            .to_str()
            .map(|name| MANIFEST_FILE_NAMES.contains(&name))
            .unwrap_or(false);
        if !is_manifest {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())
            .map_err(|source| DepsError::Read { path: entry.path().to_path_buf(), source })?;
        out.extend(parse_manifest(entry.path(), &contents));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_manifests_at_any_depth() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("package.json"), r#"{"dependencies":{"left-pad":"1.0.0"}}"#).unwrap();
        std::fs::create_dir(tmp.path().join("service")).unwrap();
        std::fs::write(tmp.path().join("service/go.mod"), "module x\n\nrequire github.com/pkg/errors v0.9.1\n")
            .unwrap();

        let deps = scan_manifests(tmp.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|d| d.name == "left-pad"));
        assert!(deps.iter().any(|d| d.name == "github.com/pkg/errors"));
    }
}
