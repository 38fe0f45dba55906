use super::display::{DisplayRate, DisplaySelection, project};
use super::limiter::RateLimiter;
use super::rollback::{BaseChange, RollbackFailure};
use super::settings::ControllerSettings;
use crate::core::{
    Clock, CurrencyCode, FailureKind, FetchError, RateCache, RateProvider, RateTable, Timestamp,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the user has picked: the base and which currencies to show against it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSelection {
    pub base: CurrencyCode,
    pub displayed: DisplaySelection,
}

impl ActiveSelection {
    pub fn new(base: CurrencyCode, currencies: &[CurrencyCode]) -> Self {
        Self {
            base,
            displayed: DisplaySelection::all_except(currencies, base),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub active_base: CurrencyCode,
    pub phase: BaseChange,
    pub loading: bool,
    pub rate_limit_error: bool,
}

impl ControllerState {
    pub fn previous_base(&self) -> Option<CurrencyCode> {
        self.phase.previous_base()
    }
}

/// Snapshot of everything a front end needs to render.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesView {
    pub base: CurrencyCode,
    pub previous_base: Option<CurrencyCode>,
    pub rates: RateTable,
    pub display_rates: Vec<DisplayRate>,
    pub selection: DisplaySelection,
    pub loading: bool,
    pub rate_limit_error: bool,
    pub last_updated: Option<Timestamp>,
    pub failure: Option<RollbackFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The limiter refused the attempt; nothing changed.
    SkippedByLimiter,
    Cached(RateTable),
    Fetched(RateTable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    AlreadyFresh,
    Fetched,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LimiterMode {
    Enforce,
    Bypass,
}

struct Publisher {
    sender: watch::Sender<RatesView>,
    shutdown: CancellationToken,
}

pub struct RatesController {
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    cache: RateCache,
    limiter: RateLimiter,
    state: ControllerState,
    selection: DisplaySelection,
    rates: RateTable,
    display_rates: Vec<DisplayRate>,
    last_updated: Option<Timestamp>,
    failure: Option<RollbackFailure>,
    publisher: Option<Publisher>,
}

impl RatesController {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        mut settings: ControllerSettings,
        initial: ActiveSelection,
    ) -> Self {
        settings.currencies.push(initial.base);
        settings.currencies.sort();
        settings.currencies.dedup();

        let mut selection = initial.displayed;
        selection.exclude_base(initial.base, &settings.currencies);

        let mut controller = Self {
            provider,
            clock,
            limiter: RateLimiter::new(settings.min_fetch_interval),
            settings,
            cache: RateCache::new(),
            state: ControllerState {
                active_base: initial.base,
                phase: BaseChange::Stable,
                loading: false,
                rate_limit_error: false,
            },
            selection,
            rates: RateTable::new(),
            display_rates: Vec::new(),
            last_updated: None,
            failure: None,
            publisher: None,
        };
        controller.project();
        controller
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn selection(&self) -> &DisplaySelection {
        &self.selection
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn last_fetch_at(&self) -> Timestamp {
        self.limiter.last_fetch_at()
    }

    pub fn view(&self) -> RatesView {
        RatesView {
            base: self.state.active_base,
            previous_base: self.state.previous_base(),
            rates: self.rates.clone(),
            display_rates: self.display_rates.clone(),
            selection: self.selection.clone(),
            loading: self.state.loading,
            rate_limit_error: self.state.rate_limit_error,
            last_updated: self.last_updated,
            failure: self.failure.clone(),
        }
    }

    /// Routes every subsequent state change to `sender` until `shutdown` fires.
    pub fn attach(&mut self, sender: watch::Sender<RatesView>, shutdown: CancellationToken) {
        sender.send_replace(self.view());
        self.publisher = Some(Publisher { sender, shutdown });
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            if publisher.shutdown.is_cancelled() {
                debug!("Discarding update after teardown");
                return;
            }
            publisher.sender.send_replace(self.view());
        }
    }

    fn project(&mut self) {
        self.display_rates = project(
            &self.settings.currencies,
            self.state.active_base,
            &self.selection,
            &self.rates,
        );
    }

    fn symbols_for(&self, base: CurrencyCode) -> Vec<CurrencyCode> {
        self.settings
            .currencies
            .iter()
            .copied()
            .filter(|c| *c != base)
            .collect()
    }

    /// Shows whatever is cached for `base`, fresh or not; clears the table otherwise.
    fn show_cached(&mut self, base: CurrencyCode) {
        match self.cache.get(base) {
            Some(entry) => {
                self.rates = entry.rates.clone();
                self.last_updated = Some(entry.fetched_at);
            }
            None => {
                self.rates = RateTable::new();
                self.last_updated = None;
            }
        }
        self.project();
    }

    async fn fetch(
        &mut self,
        base: CurrencyCode,
        mode: LimiterMode,
    ) -> Result<FetchOutcome, FetchError> {
        let now = self.clock.now();
        if mode == LimiterMode::Enforce && !self.limiter.allow(now) {
            return Ok(FetchOutcome::SkippedByLimiter);
        }

        if let Some(entry) = self.cache.get_fresh(base, now, self.settings.ttl) {
            debug!(%base, "Using cached rates");
            self.rates = entry.rates.clone();
            self.last_updated = Some(entry.fetched_at);
            self.state.rate_limit_error = false;
            self.failure = None;
            self.project();
            self.publish();
            return Ok(FetchOutcome::Cached(self.rates.clone()));
        }

        self.state.loading = true;
        self.limiter.record(now);
        self.publish();

        let symbols = self.symbols_for(base);
        let result = self.provider.latest(base, &symbols).await;
        self.state.loading = false;

        match result {
            Ok(rates) => {
                info!(%base, count = rates.len(), "Fetched latest rates");
                self.cache.put(base, rates.clone(), now);
                self.rates = rates.clone();
                self.last_updated = Some(now);
                self.state.rate_limit_error = false;
                self.failure = None;
                self.project();
                self.publish();
                Ok(FetchOutcome::Fetched(rates))
            }
            Err(err) => {
                match err.kind() {
                    FailureKind::RateLimited => {
                        warn!(
                            %base,
                            error = %err,
                            "Rate limit exceeded, using cached data if available"
                        );
                        self.state.rate_limit_error = true;
                        if let Some(entry) = self.cache.get(base) {
                            self.rates = entry.rates.clone();
                            self.last_updated = Some(entry.fetched_at);
                            self.project();
                        }
                    }
                    FailureKind::NetworkFailure => {
                        warn!(%base, error = %err, "Failed to fetch rates");
                    }
                }
                self.publish();
                Err(err)
            }
        }
    }

    /// Refreshes the active base, subject to the limiter.
    ///
    /// While a base change is unconfirmed, this fetch decides it.
    pub async fn refresh(&mut self) -> Result<FetchOutcome, FetchError> {
        let base = self.state.active_base;
        let result = self.fetch(base, LimiterMode::Enforce).await;
        self.settle(result).await
    }

    /// Refreshes the active base, ignoring the limiter.
    pub async fn force_refresh(&mut self) -> Result<FetchOutcome, FetchError> {
        debug!("Forcing refresh");
        self.limiter.reset();
        self.refresh().await
    }

    pub async fn set_active_base(
        &mut self,
        base: CurrencyCode,
    ) -> Result<FetchOutcome, FetchError> {
        if base == self.state.active_base {
            return self.refresh().await;
        }

        if self.state.previous_base() == Some(base) {
            info!(%base, "Switched back before the change was confirmed");
            self.state.phase = BaseChange::Stable;
        } else {
            let phase = std::mem::replace(&mut self.state.phase, BaseChange::Stable);
            self.state.phase = phase.begin(self.state.active_base, &self.selection);
        }

        info!(from = %self.state.active_base, to = %base, "Changing base currency");
        if !self.settings.currencies.contains(&base) {
            self.settings.currencies.push(base);
            self.settings.currencies.sort();
        }
        self.state.active_base = base;
        self.selection.exclude_base(base, &self.settings.currencies);
        self.show_cached(base);
        self.publish();

        self.refresh().await
    }

    pub fn set_displayed(&mut self, currency: CurrencyCode, shown: bool) {
        debug!(%currency, shown, "Updating displayed currencies");
        self.selection.set(currency, shown);
        self.project();
        self.publish();
    }

    async fn settle(
        &mut self,
        result: Result<FetchOutcome, FetchError>,
    ) -> Result<FetchOutcome, FetchError> {
        if self.state.previous_base().is_none() {
            return result;
        }
        match result {
            Ok(FetchOutcome::SkippedByLimiter) => Ok(FetchOutcome::SkippedByLimiter),
            Ok(outcome) => {
                info!(base = %self.state.active_base, "Base change confirmed");
                let phase = std::mem::replace(&mut self.state.phase, BaseChange::Stable);
                self.state.phase = phase.confirm();
                self.publish();
                Ok(outcome)
            }
            Err(err) => {
                self.roll_back().await;
                Err(err)
            }
        }
    }

    /// Restores the last good base and retries it once.
    async fn roll_back(&mut self) {
        let failed = self.state.active_base;
        let Some(restored) = self.state.previous_base() else {
            return;
        };
        let phase = std::mem::replace(&mut self.state.phase, BaseChange::Stable);
        let (phase, selection) = match phase.roll_back(failed) {
            Ok(rolled) => rolled,
            Err(phase) => {
                self.state.phase = phase;
                return;
            }
        };

        warn!(%failed, %restored, "Base change failed, rolling back");
        self.state.phase = phase;
        self.state.active_base = restored;
        self.selection = selection;
        self.selection.exclude_base(restored, &self.settings.currencies);
        self.show_cached(restored);
        self.publish();

        let phase = std::mem::replace(&mut self.state.phase, BaseChange::Stable);
        self.state.phase = phase.retry();
        info!(%restored, "Retrying restored base");
        let retry = self.fetch(restored, LimiterMode::Bypass).await;

        let phase = std::mem::replace(&mut self.state.phase, BaseChange::Stable);
        let (phase, failure) = phase.finish_retry(retry.as_ref().err());
        self.state.phase = phase;
        if let Some(failure) = failure {
            error!(%failure, "Rollback retry failed");
            self.failure = Some(failure);
        }
        self.publish();
    }

    /// Warms the cache for `base` without touching what is displayed.
    pub async fn preload(&mut self, base: CurrencyCode) -> PreloadOutcome {
        let now = self.clock.now();
        if self.cache.get_fresh(base, now, self.settings.ttl).is_some() {
            debug!(%base, "Preload skipped, cache is fresh");
            return PreloadOutcome::AlreadyFresh;
        }

        let symbols = self.symbols_for(base);
        match self.provider.latest(base, &symbols).await {
            Ok(rates) => {
                debug!(%base, count = rates.len(), "Preloaded rates");
                self.cache.put(base, rates, now);
                PreloadOutcome::Fetched
            }
            Err(err) => {
                warn!(%base, error = %err, "Preload failed");
                PreloadOutcome::Failed
            }
        }
    }
}
