use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process configuration for the engine and its HTTP surface. Fields
/// mirror the `CONTAINER_DIR`/`TZ` environment variables; the YAML file (if any)
/// supplies defaults that environment variables then override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `<root>` — absolute path under which every service directory lives.
    /// Sourced from `CONTAINER_DIR`; required, fatal if missing.
    pub root: PathBuf,

    /// IANA timezone used to interpret locale-form timestamps.
    /// Sourced from `TZ` if set, else this field, else `UTC`.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Soft cap (bytes) on a single `readTimeRange` byte slice.
    #[serde(default = "default_soft_cap_bytes")]
    pub soft_cap_bytes: u64,

    /// Address the HTTP/WS router binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Reserved: not validated on ingest. A future
    /// linear-scan fallback for out-of-order timestamps is not implemented.
    #[serde(default)]
    pub strict_monotonicity: bool,
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_soft_cap_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            timezone: default_timezone(),
            soft_cap_bytes: default_soft_cap_bytes(),
            listen: default_listen(),
            strict_monotonicity: false,
        }
    }
}

/// On-disk shape: every field optional, since `CONTAINER_DIR`/`TZ` usually
/// supply them and the file is itself optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfigFile {
    pub root: Option<PathBuf>,
    pub timezone: Option<String>,
    pub soft_cap_bytes: Option<u64>,
    pub listen: Option<String>,
    #[serde(default)]
    pub strict_monotonicity: bool,
}
