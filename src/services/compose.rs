//! Reads a service's compose manifest, surfacing only the `# DCM:<major>.<minor>`
//! magic comment on its first line. Full compose parsing/generation is out of
//! scope; the rest of the manifest is passed through unparsed.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns the manifest's raw contents, unmodified.
pub fn read_manifest(path: &Path) -> Result<String, ComposeError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Extracts `(major, minor)` from a leading `# DCM:<major>.<minor>` comment,
/// or `None` if the first line doesn't carry one.
pub fn extract_version(manifest: &str) -> Option<(u32, u32)> {
    let first_line = manifest.lines().next()?;
    let rest = first_line.strip_prefix("# DCM:")?;
    let (major, minor) = rest.split_once('.')?;
    Some((major.trim().parse().ok()?, minor.trim().parse().ok()?))
}
