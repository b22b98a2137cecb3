use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub session: Session,
    pub account: Account,
    pub api_key: ApiKey,
    pub http: Http,
    pub log: Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub backend: String, // "fake" or "real"
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub redis_dsn: String,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub backend: String, // "memory" or "mysql"
    #[serde(default)]
    pub mysql_dsn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub backend: String, // "memory" or "mysql"
    #[serde(default)]
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub address: String,
    // both empty: serve plain HTTP
    #[serde(default)]
    pub cert_path: String,
    #[serde(default)]
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
