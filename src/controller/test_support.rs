use super::rates::{ActiveSelection, RatesController};
use super::settings::ControllerSettings;
use crate::core::{Clock, CurrencyCode, FetchError, RateProvider, RateTable, Timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Duration};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub fn t0() -> Timestamp {
    DateTime::UNIX_EPOCH + Duration::days(20_000)
}

pub fn table(pairs: &[(CurrencyCode, f64)]) -> RateTable {
    pairs.iter().copied().collect()
}

#[derive(Debug, Clone)]
pub struct Call {
    pub base: CurrencyCode,
    pub symbols: Vec<CurrencyCode>,
    pub at: Instant,
}

/// Scripted provider that records every request.
#[derive(Default)]
pub struct MockProvider {
    queued: Mutex<HashMap<CurrencyCode, VecDeque<Result<RateTable, FetchError>>>>,
    defaults: Mutex<HashMap<CurrencyCode, Result<RateTable, FetchError>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer for `base` whenever nothing is queued.
    pub fn respond(&self, base: CurrencyCode, result: Result<RateTable, FetchError>) {
        self.defaults.lock().unwrap().insert(base, result);
    }

    /// Answer for the next request for `base` only.
    pub fn respond_once(&self, base: CurrencyCode, result: Result<RateTable, FetchError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(base)
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bases(&self) -> Vec<CurrencyCode> {
        self.calls().iter().map(|c| c.base).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RateProvider for MockProvider {
    async fn latest(
        &self,
        base: CurrencyCode,
        symbols: &[CurrencyCode],
    ) -> Result<RateTable, FetchError> {
        self.calls.lock().unwrap().push(Call {
            base,
            symbols: symbols.to_vec(),
            at: Instant::now(),
        });
        if let Some(result) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&base)
            .and_then(|q| q.pop_front())
        {
            return result;
        }
        self.defaults
            .lock()
            .unwrap()
            .get(&base)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network(format!("no response for {base}"))))
    }
}

/// Wall time that follows tokio's (possibly paused) clock.
pub struct TokioClock {
    start: Timestamp,
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: t0(),
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        let elapsed = Instant::now() - self.origin;
        self.start + Duration::from_std(elapsed).unwrap_or_else(|_| Duration::zero())
    }
}

pub fn settings(currencies: &[CurrencyCode]) -> ControllerSettings {
    ControllerSettings {
        currencies: currencies.to_vec(),
        ..ControllerSettings::default()
    }
}

pub fn controller(
    provider: Arc<MockProvider>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    base: CurrencyCode,
) -> RatesController {
    let selection = ActiveSelection::new(base, &settings.currencies);
    RatesController::new(provider, clock, settings, selection)
}
