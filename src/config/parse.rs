use super::expand_tilde;
use super::types::{EngineConfig, EngineConfigFile};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("unrecognized timezone '{0}'")]
    UnknownTimezone(String),

    #[error("CONTAINER_DIR is not set and no 'root' was given in the config file")]
    MissingRoot,
}

/// Builds the engine configuration: an optional YAML file supplies
/// defaults, then `CONTAINER_DIR`/`TZ` environment variables override them.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let file = match path {
        Some(p) => load_file(p)?,
        None => EngineConfigFile::default(),
    };

    let root = std::env::var("CONTAINER_DIR")
        .ok()
        .map(|s| expand_tilde(Path::new(&s)))
        .or(file.root)
        .ok_or(ConfigError::MissingRoot)?;

    let timezone_name = std::env::var("TZ").ok().or(file.timezone);
    let timezone = match timezone_name {
        Some(name) => name
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(name))?,
        None => chrono_tz::UTC,
    };

    let mut config = EngineConfig {
        root,
        timezone,
        ..EngineConfig::default()
    };

    if let Some(cap) = file.soft_cap_bytes {
        config.soft_cap_bytes = cap;
    }
    if let Some(listen) = file.listen {
        config.listen = listen;
    }
    config.strict_monotonicity = file.strict_monotonicity;

    Ok(config)
}

fn load_file(path: &Path) -> Result<EngineConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let file: EngineConfigFile = serde_yaml::from_str(&contents)?;
    Ok(file)
}
