use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://leafscan.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Invalid classifier URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Optional overrides read from the YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub classifier: ClassifierSection,
    pub upload: UploadSection,
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_bytes: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier_base_url: Url,
    pub classifier_timeout: Duration,
    pub max_upload_bytes: usize,
    pub database_url: String,
    pub bind_address: String,
    pub port: u16,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

impl AppConfig {
    /// Reads `.env`, the optional file named by `LEAFSCAN_CONFIG`, then the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let file = match std::env::var("LEAFSCAN_CONFIG") {
            Ok(path) => {
                log::info!("Loading configuration from {}", path);
                FileConfig::load(Path::new(&path))?
            }
            Err(_) => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Environment values win over file values, which win over defaults.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = env("CLASSIFIER_BASE_URL")
            .or(file.classifier.base_url)
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string());
        let classifier_base_url = Url::parse(&base_url)?;
        if !matches!(classifier_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "CLASSIFIER_BASE_URL",
                value: base_url,
            });
        }

        let timeout_secs = match env("CLASSIFIER_TIMEOUT_SECS") {
            Some(raw) => parse_number("CLASSIFIER_TIMEOUT_SECS", &raw)?,
            None => file.classifier.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                key: "CLASSIFIER_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
            });
        }

        let max_upload_bytes = match env("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number("MAX_UPLOAD_BYTES", &raw)?,
            None => file.upload.max_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_UPLOAD_BYTES",
                value: "0".to_string(),
            });
        }

        let port = match env("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => file.port.unwrap_or(8081),
        };

        Ok(Self {
            classifier_base_url,
            classifier_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
            database_url: env("DATABASE_URL")
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_address: env("BIND_ADDRESS")
                .or(file.bind_address)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = AppConfig::resolve(FileConfig::default(), env_of(&[])).unwrap();
        assert_eq!(config.classifier_base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.classifier_timeout, Duration::from_secs(15));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn env_overrides_file() {
        let file = FileConfig::parse(
            "classifier:\n  base_url: http://models.internal:9000\n  timeout_secs: 20\nupload:\n  max_bytes: 2048\nport: 9090\n",
        )
        .unwrap();
        let config =
            AppConfig::resolve(file, env_of(&[("CLASSIFIER_TIMEOUT_SECS", "30")])).unwrap();
        assert_eq!(config.classifier_base_url.host_str(), Some("models.internal"));
        assert_eq!(config.classifier_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let zero_timeout =
            AppConfig::resolve(FileConfig::default(), env_of(&[("CLASSIFIER_TIMEOUT_SECS", "0")]));
        assert!(matches!(
            zero_timeout,
            Err(ConfigError::InvalidValue { key: "CLASSIFIER_TIMEOUT_SECS", .. })
        ));

        let zero_size =
            AppConfig::resolve(FileConfig::default(), env_of(&[("MAX_UPLOAD_BYTES", "0")]));
        assert!(matches!(
            zero_size,
            Err(ConfigError::InvalidValue { key: "MAX_UPLOAD_BYTES", .. })
        ));

        let garbage = AppConfig::resolve(FileConfig::default(), env_of(&[("PORT", "eighty")]));
        assert!(matches!(garbage, Err(ConfigError::InvalidValue { key: "PORT", .. })));
    }

    #[test]
    fn rejects_non_http_classifier() {
        let bad_scheme = AppConfig::resolve(
            FileConfig::default(),
            env_of(&[("CLASSIFIER_BASE_URL", "ftp://models")]),
        );
        assert!(matches!(bad_scheme, Err(ConfigError::InvalidValue { .. })));

        let unparsable = AppConfig::resolve(
            FileConfig::default(),
            env_of(&[("CLASSIFIER_BASE_URL", "not a url")]),
        );
        assert!(matches!(unparsable, Err(ConfigError::Url(_))));
    }

    #[test]
    fn empty_file_is_default() {
        let file = FileConfig::parse("  \n").unwrap();
        assert!(file.classifier.base_url.is_none());
        assert!(file.upload.max_bytes.is_none());
    }
}
