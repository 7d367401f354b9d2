use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub jwt: Jwt,
    pub storage: Storage,
    #[serde(default)]
    pub password: Password,
    pub http: Http,
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Jwt {
    /// Base64 encoded HS256 key.
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

/// Ten years. Larger lifetimes overflow expiry arithmetic downstream.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl Jwt {
    pub fn check_ttls(&self) -> Result<()> {
        for (name, secs) in [
            ("jwt.access_ttl_secs", self.access_ttl_secs),
            ("jwt.refresh_ttl_secs", self.refresh_ttl_secs),
        ] {
            if secs == 0 || secs > MAX_TTL_SECS {
                return Err(anyhow!("{} must be in 1..={}, got {}", name, MAX_TTL_SECS, secs));
            }
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

// Keeps the secret out of `info!(?settings)`.
impl std::fmt::Debug for Jwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "fake" or "real"
    #[serde(default)]
    pub mysql_dsn: Option<String>,
    #[serde(default)]
    pub redis_dsn: Option<String>,
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
    #[serde(default)]
    pub migrate: bool,
}

fn default_session_prefix() -> String {
    "session".to_string()
}

/// Argon2id costs; absent means the library defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Password {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "WARDEN";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;
    settings.jwt.check_ttls()?;

    Ok(settings)
}
