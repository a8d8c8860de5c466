use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_APP_NAME: &str = "Abu-Abbad";
pub const DEFAULT_CACHE_PREFIX: &str = "abu-abbad";
pub const DEFAULT_CACHE_VERSION: &str = "v1";
pub const DEFAULT_API_PREFIX: &str = "/api/";
pub const DEFAULT_OFFLINE_PAGE: &str = "/offline.html";
pub const DEFAULT_FALLBACK_ICON: &str = "/icons/icon-192.png";
pub const DEFAULT_SYNC_TAG: &str = "sync-messages";
pub const DEFAULT_MESSAGES_ENDPOINT: &str = "/api/messages";
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_MAX_REPLAY_ATTEMPTS: u32 = 10;
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_SHELL_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/offline.html",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
];

/// The two partition names of one deployment. Both derive from a single
/// version string so install and activate always agree on what is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub shell: String,
    pub runtime: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            shell: format!("{prefix}-shell-{version}"),
            runtime: format!("{prefix}-runtime-{version}"),
        }
    }

    pub fn is_current(&self, partition: &str) -> bool {
        partition == self.shell || partition == self.runtime
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub cache_names: CacheNames,
    pub api_prefix: String,
    pub shell_manifest: Vec<String>,
    pub offline_page: String,
    pub fallback_icon: String,
    pub sync_tag: String,
    pub messages_endpoint: String,
    pub network_timeout: Duration,
    pub max_replay_attempts: u32,
    pub notification_title: String,
}

impl WorkerConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_names: CacheNames::new(DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            shell_manifest: DEFAULT_SHELL_MANIFEST
                .iter()
                .map(|path| path.to_string())
                .collect(),
            offline_page: DEFAULT_OFFLINE_PAGE.to_string(),
            fallback_icon: DEFAULT_FALLBACK_ICON.to_string(),
            sync_tag: DEFAULT_SYNC_TAG.to_string(),
            messages_endpoint: DEFAULT_MESSAGES_ENDPOINT.to_string(),
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            max_replay_attempts: DEFAULT_MAX_REPLAY_ATTEMPTS,
            notification_title: DEFAULT_APP_NAME.to_string(),
        }
    }

    /// Resolves a path from the configuration against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub worker: WorkerConfig,
    pub probe_interval: Option<Duration>,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
}

/// Optional settings read from a TOML file. Anything left out keeps its
/// default; command line flags win over the file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub upstream: Option<String>,
    pub listen: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub app_name: Option<String>,
    pub cache_prefix: Option<String>,
    pub cache_version: Option<String>,
    pub api_prefix: Option<String>,
    pub shell_manifest: Option<Vec<String>>,
    pub offline_page: Option<String>,
    pub fallback_icon: Option<String>,
    pub sync_tag: Option<String>,
    pub messages_endpoint: Option<String>,
    pub network_timeout: Option<String>,
    pub max_replay_attempts: Option<u32>,
    pub probe_interval: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, err) => {
                write!(f, "failed to read config {}: {err}", path.display())
            }
            ConfigError::Parse(path, err) => {
                write!(f, "failed to parse config {}: {err}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        toml::from_str(&text).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
    }
}

/// Parses `<number>[ms|s|m]`; a bare number is seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (amount, unit) = if let Some(amount) = value.strip_suffix("ms") {
        (amount, "ms")
    } else if let Some(amount) = value.strip_suffix('s') {
        (amount, "s")
    } else if let Some(amount) = value.strip_suffix('m') {
        (amount, "m")
    } else {
        (value, "s")
    };

    let amount: u64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{value}'; expected <number>[ms|s|m]"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "m" => Ok(Duration::from_secs(amount * 60)),
        _ => Ok(Duration::from_secs(amount)),
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: std::env::temp_dir(),
            worker: WorkerConfig::new(Url::parse("http://upstream.test/").expect("origin")),
            probe_interval: None,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn cache_names__should_derive_both_partitions_from_version() {
        // When
        let names = CacheNames::new("abu-abbad", "v7");

        // Then
        assert_eq!(names.shell, "abu-abbad-shell-v7");
        assert_eq!(names.runtime, "abu-abbad-runtime-v7");
        assert!(names.is_current("abu-abbad-shell-v7"));
        assert!(!names.is_current("abu-abbad-shell-v6"));
    }

    #[test]
    fn parse_duration__should_parse_units() {
        // Then
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("5"), Ok(Duration::from_secs(5)));
    }

    #[test]
    fn parse_duration__should_reject_invalid_values() {
        // Then
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn file_config__should_parse_partial_toml() {
        // Given
        let text = r#"
            upstream = "http://localhost:5173"
            cache_version = "v3"
            shell_manifest = ["/", "/offline.html"]
        "#;

        // When
        let config: FileConfig = toml::from_str(text).expect("parse config");

        // Then
        assert_eq!(config.upstream.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.cache_version.as_deref(), Some("v3"));
        assert_eq!(
            config.shell_manifest,
            Some(vec!["/".to_string(), "/offline.html".to_string()])
        );
        assert!(config.sync_tag.is_none());
    }

    #[test]
    fn resolve__should_join_paths_onto_origin() {
        // Given
        let config = WorkerConfig::new(Url::parse("http://localhost:5173/").expect("origin"));

        // When
        let url = config.resolve("/api/messages").expect("resolve");

        // Then
        assert_eq!(url.as_str(), "http://localhost:5173/api/messages");
    }
}
