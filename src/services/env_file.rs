//! Reads and rewrites a service's `.env` file, preserving comments and
//! blank lines for a round-trip-safe edit. Atomic rewrite uses the same
//! write-to-temp-then-rename idiom as the time-range cache sidecar.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Pair(String, String),
    Verbatim(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn parse(contents: &str) -> Self {
        let lines = contents
            .lines()
            .map(|raw| {
                let trimmed = raw.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Verbatim(raw.to_string());
                }
                match raw.split_once('=') {
                    Some((key, value)) if !key.trim().is_empty() => {
                        Line::Pair(key.trim().to_string(), value.to_string())
                    }
                    _ => Line::Verbatim(raw.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    pub fn load(path: &Path) -> Result<Self, EnvFileError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ordered `(key, value)` pairs, comments and blank lines dropped.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                Line::Pair(k, v) => Some((k.clone(), v.clone())),
                Line::Verbatim(_) => None,
            })
            .collect()
    }

    /// Replaces the full set of key/value pairs, preserving comments and
    /// blank lines in place and appending new keys at the end.
    pub fn set_pairs(&mut self, pairs: Vec<(String, String)>) {
        let mut remaining: std::collections::HashMap<String, String> = pairs.into_iter().collect();
        for line in &mut self.lines {
            if let Line::Pair(key, value) = line {
                if let Some(new_value) = remaining.remove(key.as_str()) {
                    *value = new_value;
                }
            }
        }
        let mut keys_in_order: Vec<String> = Vec::new();
        for line in &self.lines {
            if let Line::Pair(k, _) = line {
                keys_in_order.push(k.clone());
            }
        }
        for (key, value) in remaining {
            if !keys_in_order.contains(&key) {
                self.lines.push(Line::Pair(key, value));
            }
        }
    }

    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|l| match l {
                Line::Pair(k, v) => format!("{k}={v}"),
                Line::Verbatim(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
            + "\n"
    }

    pub fn persist(&self, path: &Path) -> Result<(), EnvFileError> {
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, self.render())?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# comment\n\nPORT=8080\nNAME=web\n";

    #[test]
    fn parses_pairs_preserving_comments() {
        let env = EnvFile::parse(SAMPLE);
        assert_eq!(
            env.pairs(),
            vec![
                ("PORT".to_string(), "8080".to_string()),
                ("NAME".to_string(), "web".to_string())
            ]
        );
        assert_eq!(env.render(), SAMPLE);
    }

    #[test]
    fn set_pairs_updates_in_place_and_appends_new() {
        let mut env = EnvFile::parse(SAMPLE);
        env.set_pairs(vec![
            ("PORT".to_string(), "9090".to_string()),
            ("NAME".to_string(), "web".to_string()),
            ("DEBUG".to_string(), "1".to_string()),
        ]);
        let rendered = env.render();
        assert!(rendered.contains("PORT=9090"));
        assert!(rendered.contains("# comment"));
        assert!(rendered.contains("DEBUG=1"));
    }

    #[test]
    fn persist_writes_atomically() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let env = EnvFile::parse(SAMPLE);
        env.persist(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
        assert!(!dir.path().join(".env.tmp").exists());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let env = EnvFile::load(&dir.path().join(".env")).unwrap();
        assert!(env.pairs().is_empty());
    }
}
