use anyhow::Context;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::finance::{DEFAULT_HORIZON_YEARS, MAX_HORIZON_YEARS};

pub const CONFIG_FILE: &str = "solar-audit.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub horizon_years: u32,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            horizon_years: DEFAULT_HORIZON_YEARS,
            log_json: false,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::raw().only(&["DATABASE_URL"]))
                .merge(Env::prefixed("SOLAR_AUDIT_")),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract().context("invalid solar-audit configuration")?;
        if config.horizon_years == 0 || config.horizon_years > MAX_HORIZON_YEARS {
            anyhow::bail!("horizon_years must be between 1 and {MAX_HORIZON_YEARS}");
        }
        Ok(config)
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL (or SOLAR_AUDIT_DATABASE_URL) must be set to a Postgres instance")
    }
}
