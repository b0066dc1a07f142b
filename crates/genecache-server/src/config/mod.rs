// SPDX-License-Identifier: Apache-2.0

//! Environment-driven service configuration.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str =
    "https://ftp.ebi.ac.uk/pub/databases/genenames/hgnc/json/hgnc_complete_set.json";
pub const DEFAULT_GROUP_FIELD: &str = "locus_group";
pub const DEFAULT_CHART_TITLE: &str = "HGNC genes by locus group";
const REDIS_PORT: u16 = 6379;
const PRIMARY_DB: u8 = 0;
const ARTIFACT_DB: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    MissingStoreTarget,
    InvalidValue { key: &'static str, value: String },
    Contract(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStoreTarget => f.write_str(
                "store connection target unset: set GENECACHE_PRIMARY_REDIS_URL and \
                 GENECACHE_ARTIFACT_REDIS_URL, or REDIS_IP",
            ),
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: {value}"),
            Self::Contract(msg) => write!(f, "config contract violated: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub source_url: String,
    pub store_backend: StoreBackend,
    pub primary_store_url: Option<String>,
    pub artifact_store_url: Option<String>,
    pub redis_connect_timeout: Duration,
    pub redis_command_timeout: Duration,
    pub fetch_timeout: Duration,
    pub identifier_field: String,
    pub group_field: String,
    pub chart_title: String,
    pub replace_on_refresh: bool,
    pub serialize_refreshes: bool,
    pub max_body_bytes: usize,
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            store_backend: StoreBackend::Redis,
            primary_store_url: None,
            artifact_store_url: None,
            redis_connect_timeout: Duration::from_secs(5),
            redis_command_timeout: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(120),
            identifier_field: genecache_model::DEFAULT_IDENTIFIER_FIELD.to_string(),
            group_field: DEFAULT_GROUP_FIELD.to_string(),
            chart_title: DEFAULT_CHART_TITLE.to_string(),
            replace_on_refresh: false,
            serialize_refreshes: false,
            max_body_bytes: 16 * 1024,
            log_json: true,
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_ms(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("GENECACHE_BIND") {
            cfg.bind_addr = v;
        }
        if let Some(v) = get("GENECACHE_SOURCE_URL") {
            cfg.source_url = v;
        }
        if let Some(v) = get("GENECACHE_STORE_BACKEND") {
            cfg.store_backend = match v.as_str() {
                "redis" => StoreBackend::Redis,
                "memory" => StoreBackend::Memory,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "GENECACHE_STORE_BACKEND",
                        value: v,
                    })
                }
            };
        }

        let redis_ip = get("REDIS_IP");
        cfg.primary_store_url = get("GENECACHE_PRIMARY_REDIS_URL").or_else(|| {
            redis_ip
                .as_ref()
                .map(|ip| format!("redis://{ip}:{REDIS_PORT}/{PRIMARY_DB}"))
        });
        cfg.artifact_store_url = get("GENECACHE_ARTIFACT_REDIS_URL").or_else(|| {
            redis_ip
                .as_ref()
                .map(|ip| format!("redis://{ip}:{REDIS_PORT}/{ARTIFACT_DB}"))
        });

        if let Some(v) = get("GENECACHE_REDIS_CONNECT_TIMEOUT_MS") {
            cfg.redis_connect_timeout = parse_ms("GENECACHE_REDIS_CONNECT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("GENECACHE_REDIS_TIMEOUT_MS") {
            cfg.redis_command_timeout = parse_ms("GENECACHE_REDIS_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("GENECACHE_FETCH_TIMEOUT_MS") {
            cfg.fetch_timeout = parse_ms("GENECACHE_FETCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("GENECACHE_IDENTIFIER_FIELD") {
            cfg.identifier_field = v;
        }
        if let Some(v) = get("GENECACHE_GROUP_FIELD") {
            cfg.group_field = v;
        }
        if let Some(v) = get("GENECACHE_CHART_TITLE") {
            cfg.chart_title = v;
        }
        if let Some(v) = get("GENECACHE_REPLACE_ON_REFRESH") {
            cfg.replace_on_refresh = parse_bool("GENECACHE_REPLACE_ON_REFRESH", &v)?;
        }
        if let Some(v) = get("GENECACHE_SERIALIZE_REFRESHES") {
            cfg.serialize_refreshes = parse_bool("GENECACHE_SERIALIZE_REFRESHES", &v)?;
        }
        if let Some(v) = get("GENECACHE_MAX_BODY_BYTES") {
            cfg.max_body_bytes = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GENECACHE_MAX_BODY_BYTES",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("GENECACHE_LOG_JSON") {
            cfg.log_json = parse_bool("GENECACHE_LOG_JSON", &v)?;
        }

        validate_startup_config(&cfg)?;
        Ok(cfg)
    }
}

pub fn validate_startup_config(cfg: &ServiceConfig) -> Result<(), ConfigError> {
    if cfg.store_backend == StoreBackend::Redis
        && (cfg.primary_store_url.is_none() || cfg.artifact_store_url.is_none())
    {
        return Err(ConfigError::MissingStoreTarget);
    }
    if cfg.store_backend == StoreBackend::Redis
        && cfg.primary_store_url.is_some()
        && cfg.primary_store_url == cfg.artifact_store_url
    {
        return Err(ConfigError::Contract(
            "primary and artifact stores must use distinct targets".to_string(),
        ));
    }
    if cfg.bind_addr.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::InvalidValue {
            key: "GENECACHE_BIND",
            value: cfg.bind_addr.clone(),
        });
    }
    if cfg.redis_connect_timeout.is_zero()
        || cfg.redis_command_timeout.is_zero()
        || cfg.fetch_timeout.is_zero()
    {
        return Err(ConfigError::Contract("timeouts must be > 0".to_string()));
    }
    if cfg.max_body_bytes == 0 {
        return Err(ConfigError::Contract("max body bytes must be > 0".to_string()));
    }
    if cfg.identifier_field.is_empty() || cfg.group_field.is_empty() {
        return Err(ConfigError::Contract(
            "identifier and group fields must be non-empty".to_string(),
        ));
    }
    Ok(())
}
