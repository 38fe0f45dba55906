use super::currency::CurrencyCode;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FxRatesApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FxRatesApiConfig {
    fn default() -> Self {
        FxRatesApiConfig {
            base_url: "https://api.fxratesapi.com".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub fxratesapi: FxRatesApiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_min_fetch_interval_secs")]
    pub min_fetch_interval_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_preload_delay_secs")]
    pub preload_delay_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            cache_ttl_secs: default_cache_ttl_secs(),
            min_fetch_interval_secs: default_min_fetch_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            preload_delay_secs: default_preload_delay_secs(),
        }
    }
}

/// Upper bound for every timing value: one week.
pub const MAX_TIMING_SECS: u64 = 7 * 24 * 60 * 60;

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_min_fetch_interval_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_preload_delay_secs() -> u64 {
    6
}

fn default_currencies() -> Vec<CurrencyCode> {
    CurrencyCode::DEFAULT_SET.to_vec()
}

fn default_preload() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub base_currency: CurrencyCode,
    #[serde(default = "default_currencies")]
    pub currencies: Vec<CurrencyCode>,
    /// Currencies shown against the base; all others when omitted.
    #[serde(default)]
    pub displayed: Option<Vec<CurrencyCode>>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "default_preload")]
    pub preload: bool,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxwatch", "fxwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "fxwatch", "fxwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currencies.is_empty() {
            bail!("`currencies` must list at least one currency");
        }
        if !self.currencies.contains(&self.base_currency) {
            bail!(
                "base currency {} is not one of the configured currencies",
                self.base_currency
            );
        }
        if let Some(displayed) = &self.displayed {
            if let Some(unknown) = displayed.iter().find(|c| !self.currencies.contains(c)) {
                bail!("displayed currency {unknown} is not one of the configured currencies");
            }
        }
        let timing = &self.timing;
        if timing.cache_ttl_secs == 0
            || timing.refresh_interval_secs == 0
            || timing.preload_delay_secs == 0
        {
            bail!("cache ttl, refresh interval and preload delay must be non-zero");
        }
        let bounded = [
            ("cache_ttl_secs", timing.cache_ttl_secs),
            ("min_fetch_interval_secs", timing.min_fetch_interval_secs),
            ("refresh_interval_secs", timing.refresh_interval_secs),
            ("preload_delay_secs", timing.preload_delay_secs),
            ("timeout_secs", self.providers.fxratesapi.timeout_secs),
        ];
        if let Some((name, value)) = bounded.iter().find(|(_, v)| *v > MAX_TIMING_SECS) {
            bail!("`{name}` is {value}, at most {MAX_TIMING_SECS} seconds is allowed");
        }
        if self.providers.fxratesapi.timeout_secs == 0 {
            bail!("provider timeout must be non-zero");
        }
        Ok(())
    }
}
