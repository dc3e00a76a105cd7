use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<RemoteCredentials>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub org_unit_cache_size: usize,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteCredentials {
    Bearer { token: String },
    Basic { username: String, password: String },
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteCredentials::Bearer { .. } => f.write_str("Bearer(<redacted>)"),
            RemoteCredentials::Basic { username, .. } => {
                write!(f, "Basic({username}, <redacted>)")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub program: String,
    pub program_stage: String,
    pub pull_page_size: u32,
    pub auto_sync: bool,
    /// Seconds between scheduled pull/push rounds.
    pub sync_interval: u64,
    pub push_on_reconnect: bool,
    /// JSON field catalog; the built-in catalog is used when unset.
    #[serde(default)]
    pub field_catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                busy_timeout_ms: 5_000,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8080".to_string(),
                credentials: None,
                timeout_secs: 30,
                max_retries: 3,
                retry_base_delay_ms: 500,
                retry_max_delay_ms: 8_000,
                org_unit_cache_size: 512,
            },
            sync: SyncConfig {
                program: String::new(),
                program_stage: String::new(),
                pull_page_size: 50,
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                push_on_reconnect: true,
                field_catalog_path: None,
            },
        }
    }
}

fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("field-inspection-sync")
        .join("inspections.db");
    format!("sqlite://{}?mode=rwc", path.display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("INSPECTION_SYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_parse::<u32>("INSPECTION_SYNC_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value;
        }
        if let Some(value) = env_parse::<u64>("INSPECTION_SYNC_DATABASE_BUSY_TIMEOUT_MS") {
            cfg.database.busy_timeout_ms = value;
        }

        if let Ok(v) = std::env::var("INSPECTION_SYNC_REMOTE_URL") {
            cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
        }
        cfg.remote.credentials = credentials_from_env();
        if let Some(value) = env_parse::<u64>("INSPECTION_SYNC_REMOTE_TIMEOUT_SECS") {
            cfg.remote.timeout_secs = value;
        }
        if let Some(value) = env_parse::<u32>("INSPECTION_SYNC_REMOTE_MAX_RETRIES") {
            cfg.remote.max_retries = value;
        }
        if let Some(value) = env_parse::<u64>("INSPECTION_SYNC_REMOTE_RETRY_BASE_MS") {
            cfg.remote.retry_base_delay_ms = value;
        }
        if let Some(value) = env_parse::<u64>("INSPECTION_SYNC_REMOTE_RETRY_MAX_MS") {
            cfg.remote.retry_max_delay_ms = value;
        }
        if let Some(value) = env_parse::<usize>("INSPECTION_SYNC_ORG_UNIT_CACHE_SIZE") {
            cfg.remote.org_unit_cache_size = value;
        }

        if let Ok(v) = std::env::var("INSPECTION_SYNC_PROGRAM") {
            cfg.sync.program = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("INSPECTION_SYNC_PROGRAM_STAGE") {
            cfg.sync.program_stage = v.trim().to_string();
        }
        if let Some(value) = env_parse::<u32>("INSPECTION_SYNC_PULL_PAGE_SIZE") {
            cfg.sync.pull_page_size = value.max(1);
        }
        if let Ok(v) = std::env::var("INSPECTION_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_parse::<u64>("INSPECTION_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Ok(v) = std::env::var("INSPECTION_SYNC_PUSH_ON_RECONNECT") {
            cfg.sync.push_on_reconnect = parse_bool(&v, cfg.sync.push_on_reconnect);
        }
        if let Ok(v) = std::env::var("INSPECTION_SYNC_FIELD_CATALOG") {
            if !v.trim().is_empty() {
                cfg.sync.field_catalog_path = Some(PathBuf::from(v.trim()));
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.remote.timeout_secs == 0 {
            return Err("Remote timeout_secs must be greater than 0".to_string());
        }
        if self.remote.retry_base_delay_ms > self.remote.retry_max_delay_ms {
            return Err("Remote retry_base_delay_ms must not exceed retry_max_delay_ms".to_string());
        }
        if self.remote.org_unit_cache_size == 0 {
            return Err("Remote org_unit_cache_size must be greater than 0".to_string());
        }
        if self.sync.program.trim().is_empty() {
            return Err("Sync program must be configured".to_string());
        }
        if self.sync.program_stage.trim().is_empty() {
            return Err("Sync program_stage must be configured".to_string());
        }
        if self.sync.pull_page_size == 0 {
            return Err("Sync pull_page_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn credentials_from_env() -> Option<RemoteCredentials> {
    if let Ok(token) = std::env::var("INSPECTION_SYNC_REMOTE_TOKEN") {
        if !token.trim().is_empty() {
            return Some(RemoteCredentials::Bearer {
                token: token.trim().to_string(),
            });
        }
    }
    let username = std::env::var("INSPECTION_SYNC_REMOTE_USERNAME").ok()?;
    let password = std::env::var("INSPECTION_SYNC_REMOTE_PASSWORD").unwrap_or_default();
    if username.trim().is_empty() {
        return None;
    }
    Some(RemoteCredentials::Basic {
        username: username.trim().to_string(),
        password,
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.sync.program = "IpHINAT79UW".to_string();
        cfg.sync.program_stage = "A03MvHHogjR".to_string();
        cfg
    }

    #[test]
    fn default_config_requires_program() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_err());
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_backoff() {
        let mut cfg = configured();
        cfg.remote.retry_base_delay_ms = 10_000;
        cfg.remote.retry_max_delay_ms = 1_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_bool_falls_back_to_default() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = RemoteCredentials::Basic {
            username: "inspector".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("inspector"));
        assert!(!rendered.contains("hunter2"));
    }
}
