use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::types::{MaxAttempts, RetryPolicy};

pub const ENV_ENDPOINT: &str = "MINIO_ENDPOINT";
pub const ENV_ACCESS_KEY: &str = "MINIO_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "MINIO_SECRET_KEY";
pub const ENV_BUCKET: &str = "MINIO_BUCKET";
/// Optional path to a TOML settings file.
pub const ENV_CONFIG_PATH: &str = "BUCKETGATE_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "bucketgate.toml";

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub readiness: ReadinessSettings,
}

/// Connection settings for the object-storage backend.
#[derive(Clone)]
pub struct StorageSettings {
    /// `host:port` or a full URL.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

impl StorageSettings {
    /// Endpoint as a URL. A bare `host:port` is addressed over plain HTTP.
    pub fn endpoint_url(&self) -> Result<String> {
        let raw = self.endpoint.trim();
        let url = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let uri: Uri = url
            .parse()
            .map_err(|e: http::uri::InvalidUri| {
                GateError::InvalidEndpoint(self.endpoint.clone(), e.to_string())
            })?;
        if uri.authority().is_none() {
            return Err(GateError::InvalidEndpoint(
                self.endpoint.clone(),
                "missing host".to_string(),
            ));
        }
        Ok(url.trim_end_matches('/').to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSettings {
    /// Number of bucket checks before giving up. `0` retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds to sleep between attempts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl ReadinessSettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: MaxAttempts::from_count(self.max_attempts),
            interval: Duration::from_secs(self.interval_secs),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_ATTEMPTS
}
fn default_interval_secs() -> u64 {
    RetryPolicy::DEFAULT_INTERVAL.as_secs()
}
fn default_region() -> String {
    "us-east-1".to_string()
}

/// Optional on-disk settings. Credentials never come from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub readiness: ReadinessSettings,
    #[serde(default)]
    pub storage: FileStorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageSettings {
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for FileStorageSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

impl FileSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GateError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GateError::TomlDe(e.to_string()))
    }

    /// Resolve the settings file: an explicit `BUCKETGATE_CONFIG` must exist,
    /// the default `bucketgate.toml` is used only when present.
    pub fn locate<F>(lookup: F, cwd: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CONFIG_PATH).filter(|p| !p.trim().is_empty()) {
            let path = PathBuf::from(path);
            tracing::info!("Loading configuration from {}", path.display());
            return Self::load(&path);
        }
        let default_path = cwd.join(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            tracing::info!("Loading configuration from {}", default_path.display());
            return Self::load(&default_path);
        }
        Ok(Self::default())
    }
}

impl Settings {
    /// Load from the process environment and the optional settings file.
    pub fn load() -> Result<Self> {
        let lookup = |name: &str| std::env::var(name).ok();
        let cwd = std::env::current_dir()?;
        let file = FileSettings::locate(lookup, &cwd)?;
        Self::from_lookup(file, lookup)
    }

    /// Combine file settings with required values taken from `lookup`.
    pub fn from_lookup<F>(file: FileSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(GateError::MissingEnv(name))
        };

        let storage = StorageSettings {
            endpoint: required(ENV_ENDPOINT)?,
            access_key: required(ENV_ACCESS_KEY)?,
            secret_key: required(ENV_SECRET_KEY)?,
            bucket: required(ENV_BUCKET)?,
            region: file.storage.region,
        };
        storage.endpoint_url()?;

        if file.server.listen_addr.trim().is_empty() {
            return Err(GateError::Config("server.listen_addr is empty".to_string()));
        }

        Ok(Self {
            storage,
            server: file.server,
            readiness: file.readiness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_ENDPOINT, "minio:9000"),
            (ENV_ACCESS_KEY, "minioadmin"),
            (ENV_SECRET_KEY, "minioadmin"),
            (ENV_BUCKET, "uploads"),
        ])
    }

    #[test]
    fn loads_required_values_with_defaults() {
        let vars = full_env();
        let settings =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.storage.bucket, "uploads");
        assert_eq!(settings.storage.region, "us-east-1");
        assert_eq!(settings.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(settings.readiness.policy(), RetryPolicy::default());
    }

    #[test]
    fn each_missing_variable_is_reported() {
        for name in [ENV_ENDPOINT, ENV_ACCESS_KEY, ENV_SECRET_KEY, ENV_BUCKET] {
            let mut vars = full_env();
            vars.remove(name);
            let err = Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned())
                .unwrap_err();
            assert!(matches!(err, GateError::MissingEnv(n) if n == name));
        }
    }

    #[test]
    fn empty_variable_counts_as_missing() {
        let mut vars = full_env();
        vars.insert(ENV_BUCKET.to_string(), String::new());
        let err =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, GateError::MissingEnv(ENV_BUCKET)));
    }

    #[test]
    fn bare_endpoint_gets_http_scheme() {
        let vars = full_env();
        let settings =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.storage.endpoint_url().unwrap(), "http://minio:9000");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let mut vars = full_env();
        vars.insert(ENV_ENDPOINT.to_string(), "https://s3.example.com/".to_string());
        let settings =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap();
        assert_eq!(
            settings.storage.endpoint_url().unwrap(),
            "https://s3.example.com"
        );
    }

    #[test]
    fn garbage_endpoint_is_rejected() {
        let mut vars = full_env();
        vars.insert(ENV_ENDPOINT.to_string(), "not a host".to_string());
        let err =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, GateError::InvalidEndpoint(..)));
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let vars = full_env();
        let settings =
            Settings::from_lookup(FileSettings::default(), |k| vars.get(k).cloned()).unwrap();
        let dbg = format!("{:?}", settings.storage);
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("secret_key: \"minioadmin\""));
    }

    #[test]
    fn file_settings_override_defaults() {
        let file = FileSettings::from_toml(
            r#"
            [server]
            listen_addr = "127.0.0.1:9999"

            [readiness]
            max_attempts = 0
            interval_secs = 5

            [storage]
            region = "eu-west-1"
            "#,
        )
        .unwrap();
        let vars = full_env();
        let settings = Settings::from_lookup(file, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.server.listen_addr, "127.0.0.1:9999");
        assert_eq!(settings.storage.region, "eu-west-1");
        let policy = settings.readiness.policy();
        assert_eq!(policy.max_attempts, MaxAttempts::Unlimited);
        assert_eq!(policy.interval, Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let err = FileSettings::from_toml("[readiness]\nmax_attempts = \"many\"").unwrap_err();
        assert!(matches!(err, GateError::TomlDe(_)));
    }

    #[test]
    fn locate_without_any_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let file = FileSettings::locate(|_| None, tmp.path()).unwrap();
        assert_eq!(file.server.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn locate_picks_up_default_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(DEFAULT_CONFIG_FILE),
            "[server]\nlisten_addr = \"0.0.0.0:7000\"\n",
        )
        .unwrap();
        let file = FileSettings::locate(|_| None, tmp.path()).unwrap();
        assert_eq!(file.server.listen_addr, "0.0.0.0:7000");
    }

    #[test]
    fn locate_fails_on_missing_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml").display().to_string();
        let err = FileSettings::locate(
            |k| (k == ENV_CONFIG_PATH).then(|| missing.clone()),
            tmp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, GateError::ConfigNotFound(_)));
    }
}
