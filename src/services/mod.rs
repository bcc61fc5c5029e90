//! Enumerates the sibling services under the configured root and
//! validates names used to build filesystem paths, rejecting traversal
//! outright rather than merely expanding `~`.

pub mod compose;
pub mod env_file;
pub mod power;

use std::path::Path;
use thiserror::Error;

const COMPOSE_FILE: &str = "docker-compose.yml";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("name must not be empty")]
    Empty,

    #[error("name '{0}' must not contain path separators or '..'")]
    Traversal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejects empty names, path separators, and `..` segments — anything that
/// could escape `<root>/<service>` or `<root>/<service>/logs`.
pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::Empty);
    }
    if name == ".." || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(ServiceError::Traversal(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    pub name: String,
    pub status: ServiceStatus,
    pub compose_version: Option<(u32, u32)>,
}

/// Lists subdirectories of `root` that contain a compose manifest.
pub fn list_services(root: &Path) -> Result<Vec<String>, ServiceError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.path().join(COMPOSE_FILE).is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

pub fn compose_path(root: &Path, service: &str) -> std::path::PathBuf {
    root.join(service).join(COMPOSE_FILE)
}

pub fn env_path(root: &Path, service: &str) -> std::path::PathBuf {
    root.join(service).join(".env")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(validate_name("../etc").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn accepts_plain_names() {
        assert!(validate_name("web-app_1").is_ok());
    }

    #[test]
    fn lists_only_directories_with_compose_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("svc-a")).unwrap();
        std::fs::write(dir.path().join("svc-a").join(COMPOSE_FILE), "# DCM:1.0\n").unwrap();
        std::fs::create_dir(dir.path().join("not-a-service")).unwrap();

        let services = list_services(dir.path()).unwrap();
        assert_eq!(services, vec!["svc-a".to_string()]);
    }
}
