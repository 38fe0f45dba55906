use crate::core::CurrencyCode;
use crate::core::config::AppConfig;
use std::time::Duration as StdDuration;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Supported currencies, walked in enumeration order.
    pub currencies: Vec<CurrencyCode>,
    pub ttl: chrono::Duration,
    pub min_fetch_interval: chrono::Duration,
    pub refresh_interval: StdDuration,
    pub preload_delay: StdDuration,
    pub preload_enabled: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            currencies: CurrencyCode::DEFAULT_SET.to_vec(),
            ttl: chrono::Duration::minutes(5),
            min_fetch_interval: chrono::Duration::seconds(10),
            refresh_interval: StdDuration::from_secs(300),
            preload_delay: StdDuration::from_secs(6),
            preload_enabled: true,
        }
    }
}

fn secs(value: u64) -> chrono::Duration {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        let mut currencies = config.currencies.clone();
        currencies.sort();
        currencies.dedup();
        Self {
            currencies,
            ttl: secs(config.timing.cache_ttl_secs),
            min_fetch_interval: secs(config.timing.min_fetch_interval_secs),
            refresh_interval: StdDuration::from_secs(config.timing.refresh_interval_secs),
            preload_delay: StdDuration::from_secs(config.timing.preload_delay_secs),
            preload_enabled: config.preload,
        }
    }
}
