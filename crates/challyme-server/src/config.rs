use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

/// Secrets that ship in sample `.env` files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] =
    &["", "changeme", "change-me", "dev-secret-change-me", "secret"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(|key| env::var(key).ok())
    }

    fn load(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("CHALLYME_JWT_SECRET")
            .context("CHALLYME_JWT_SECRET must be set")?
            .trim()
            .to_string();
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.to_ascii_lowercase().as_str()) {
            bail!("CHALLYME_JWT_SECRET is a placeholder; set a real secret");
        }

        Ok(Self {
            host: try_load(&var, "CHALLYME_HOST", "0.0.0.0")?,
            port: try_load(&var, "CHALLYME_PORT", "3000")?,
            db_path: try_load(&var, "CHALLYME_DB_PATH", "challyme.db")?,
            upload_dir: try_load(&var, "CHALLYME_UPLOAD_DIR", "./uploads")?,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

fn try_load<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("Invalid {key} value '{raw}': {e}")
    })
}
