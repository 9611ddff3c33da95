//! Manifest parsing (`go.mod`, `package.json`, `requirements.txt`, `Pipfile`,
//! `pyproject.toml`, `Chart.yaml`, `Dockerfile`) into normalized dependency
//! records, with recursive resolution and version-conflict detection.

pub mod error;
pub mod manifest;
pub mod resolve;
pub mod scanner;
pub mod store;

pub use error::DepsError;
pub use manifest::{Dependency, DependencyKind, Ecosystem, MANIFEST_FILE_NAMES};
pub use resolve::{fetch_or_update, resolve_recursive, ResolvedDependency, VersionConflict};
pub use scanner::scan_manifests;
pub use store::DependencyStore;
