pub mod cli;
pub mod controller;
pub mod core;
pub mod providers;
pub mod store;

use crate::controller::{
    ActiveSelection, ControllerSettings, DisplaySelection, RateServiceHandle, RatesController,
};
use crate::core::config::AppConfig;
use crate::core::{CurrencyCode, SystemClock};
use crate::providers::FxRatesApiProvider;
use crate::store::SelectionStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Fetch once and print.
    Rates {
        base: Option<CurrencyCode>,
        amount: f64,
    },
    /// Keep refreshing until the user quits.
    Watch {
        base: Option<CurrencyCode>,
        amount: f64,
    },
}

fn open_store(config: &AppConfig) -> Option<SelectionStore> {
    let path = match config.default_data_path() {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "No data directory, selection will not be saved");
            return None;
        }
    };
    match SelectionStore::open(&path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Failed to open preference store");
            None
        }
    }
}

/// Saved selection first, then the configured list, then everything but the base.
pub fn initial_selection(
    config: &AppConfig,
    base: CurrencyCode,
    store: Option<&SelectionStore>,
) -> ActiveSelection {
    let saved = store.and_then(|s| match s.load() {
        Ok(selection) => selection,
        Err(e) => {
            warn!(error = %e, "Ignoring saved selection");
            None
        }
    });
    let displayed = saved.unwrap_or_else(|| match &config.displayed {
        Some(list) => DisplaySelection::only(&config.currencies, list),
        None => DisplaySelection::all_except(&config.currencies, base),
    });
    ActiveSelection { base, displayed }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let (base_override, amount) = match command {
        AppCommand::Rates { base, amount } | AppCommand::Watch { base, amount } => (base, amount),
    };
    let base = base_override.unwrap_or(config.base_currency);

    let provider_config = &config.providers.fxratesapi;
    let provider = FxRatesApiProvider::new(
        &provider_config.base_url,
        Duration::from_secs(provider_config.timeout_secs),
    )?;

    let store = open_store(&config);
    let selection = initial_selection(&config, base, store.as_ref());
    let mut controller = RatesController::new(
        Arc::new(provider),
        Arc::new(SystemClock),
        ControllerSettings::from(&config),
        selection,
    );

    match command {
        AppCommand::Rates { .. } => cli::rates::show_rates(&mut controller, amount).await,
        AppCommand::Watch { .. } => {
            let handle = RateServiceHandle::spawn(controller);
            cli::watch::run_watch(handle, store, amount).await
        }
    }
}
