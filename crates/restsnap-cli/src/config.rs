use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Connection defaults read from a TOML file; every field can be overridden
/// by a CLI flag or environment variable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("restsnap")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "url = \"https://controller.example.com\"\napi_key = \"secret\""
        )
        .unwrap();

        let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.url.as_deref(), Some("https://controller.example.com"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.username, None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some("/nonexistent/restsnap.toml")).unwrap();
        assert_eq!(config.url, None);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url = [not toml").unwrap();
        assert!(Config::load(Some(file.path().to_str().unwrap())).is_err());
    }
}
