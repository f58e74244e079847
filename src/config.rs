//! EPS configuration.
//!
//! Loaded from `~/.eps/config.toml`. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// EPS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Teacher sign-in id. Compared case-insensitively.
    pub teacher_id: String,

    /// Teacher sign-in password. Compared exactly.
    pub teacher_password: String,

    /// Where `eps.sqlite` lives. Defaults to `~/.eps/`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            teacher_id: "EPS".to_string(),
            teacher_password: "1234".to_string(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from `~/.eps/config.toml`, or defaults if it doesn't exist.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path, or defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.teacher_id.trim().is_empty() {
            return Err(format!("teacher-id is empty in {}", path.display()));
        }

        Ok(config)
    }

    /// The config file path: `~/.eps/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".eps").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.teacher_id, "EPS");
        assert_eq!(config.teacher_password, "1234");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "teacher-password = \"s3cret\"\ndata-dir = \"/srv/eps\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.teacher_id, "EPS");
        assert_eq!(config.teacher_password, "s3cret");
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/eps")));
    }

    #[test]
    fn empty_teacher_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "teacher-id = \"\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("teacher-id is empty"));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "teacher-id = [").unwrap();

        assert!(Config::load_from(&path).unwrap_err().starts_with("invalid config"));
    }
}
