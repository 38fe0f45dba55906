//! Runs a [`RatesController`] on its own task and feeds it events.
//!
//! Commands, the periodic refresh and preload steps are handled one at a time,
//! so the controller never sees concurrent mutation.

use super::preload::PreloadScheduler;
use super::rates::{FetchOutcome, RatesController, RatesView};
use crate::core::{CurrencyCode, FetchError};
use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetActiveBase(CurrencyCode),
    SetDisplayed(CurrencyCode, bool),
    ForceRefresh,
    Preload,
}

pub struct RateServiceHandle {
    commands: mpsc::UnboundedSender<Command>,
    views: watch::Receiver<RatesView>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RateServiceHandle {
    /// Starts the service: an immediate fetch, then the refresh timer and preloading.
    pub fn spawn(mut controller: RatesController) -> Self {
        let shutdown = CancellationToken::new();
        let (view_tx, views) = watch::channel(controller.view());
        controller.attach(view_tx, shutdown.clone());

        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(controller, command_rx, shutdown.clone()));

        Self {
            commands,
            views,
            shutdown,
            task,
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Rate service has stopped"))
    }

    pub fn set_active_base(&self, base: CurrencyCode) -> Result<()> {
        self.send(Command::SetActiveBase(base))
    }

    pub fn set_displayed(&self, currency: CurrencyCode, shown: bool) -> Result<()> {
        self.send(Command::SetDisplayed(currency, shown))
    }

    pub fn request_force_refresh(&self) -> Result<()> {
        self.send(Command::ForceRefresh)
    }

    pub fn request_preload(&self) -> Result<()> {
        self.send(Command::Preload)
    }

    pub fn subscribe(&self) -> watch::Receiver<RatesView> {
        self.views.clone()
    }

    pub fn view(&self) -> RatesView {
        self.views.borrow().clone()
    }

    /// Stops the timer and the event loop. Results still in flight are dropped.
    pub async fn teardown(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await.context("Rate service task panicked")
    }
}

fn log_result(trigger: &str, result: Result<FetchOutcome, FetchError>) {
    match result {
        Ok(FetchOutcome::SkippedByLimiter) => debug!(trigger, "Fetch skipped by limiter"),
        Ok(_) => debug!(trigger, "Fetch completed"),
        Err(err) => debug!(trigger, error = %err, "Fetch failed"),
    }
}

async fn run(
    mut controller: RatesController,
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
) {
    let settings = controller.settings().clone();
    let mut preload = PreloadScheduler::new(settings.preload_delay);

    let initial = controller.refresh().await;
    log_result("startup", initial);

    if settings.preload_enabled {
        preload.start(&settings.currencies, controller.state().active_base);
    }

    let mut ticker = interval_at(
        Instant::now() + settings.refresh_interval,
        settings.refresh_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::SetActiveBase(base) => {
                        let result = controller.set_active_base(base).await;
                        log_result("base change", result);
                    }
                    Command::SetDisplayed(currency, shown) => {
                        controller.set_displayed(currency, shown);
                    }
                    Command::ForceRefresh => {
                        let result = controller.force_refresh().await;
                        log_result("force refresh", result);
                    }
                    Command::Preload => {
                        let active = controller.state().active_base;
                        preload.start(&controller.settings().currencies, active);
                    }
                }
            }
            _ = ticker.tick() => {
                let result = controller.refresh().await;
                log_result("timer", result);
            }
            _ = preload.due(), if !preload.is_idle() => {
                preload.step(&mut controller).await;
            }
        }
    }
    info!("Rate service stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::settings::ControllerSettings;
    use crate::controller::test_support::{MockProvider, TokioClock, controller, settings, table};
    use crate::core::CurrencyCode::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn quiet_settings() -> ControllerSettings {
        ControllerSettings {
            ttl: chrono::Duration::seconds(30),
            min_fetch_interval: chrono::Duration::zero(),
            refresh_interval: Duration::from_secs(60),
            preload_enabled: false,
            ..settings(&[EUR, USD, JPY])
        }
    }

    fn spawn(provider: &Arc<MockProvider>, settings: ControllerSettings) -> RateServiceHandle {
        provider.respond(EUR, Ok(table(&[(USD, 1.08), (JPY, 161.2)])));
        provider.respond(USD, Ok(table(&[(EUR, 0.92), (JPY, 149.3)])));
        provider.respond(JPY, Ok(table(&[(EUR, 0.0062), (USD, 0.0067)])));
        RateServiceHandle::spawn(controller(
            provider.clone(),
            Arc::new(TokioClock::new()),
            settings,
            EUR,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_on_start_and_on_timer() {
        let provider = MockProvider::new();
        let handle = spawn(&provider, quiet_settings());
        let mut views = handle.subscribe();

        views.wait_for(|v| v.last_updated.is_some()).await.unwrap();
        assert_eq!(provider.call_count(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(provider.call_count(), 2);

        handle.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_reach_controller() {
        let provider = MockProvider::new();
        let handle = spawn(&provider, quiet_settings());
        let mut views = handle.subscribe();
        views.wait_for(|v| v.last_updated.is_some()).await.unwrap();

        handle.set_active_base(USD).unwrap();
        handle.set_displayed(JPY, false).unwrap();
        views
            .wait_for(|v| v.base == USD && !v.selection.is_displayed(JPY))
            .await
            .unwrap();

        let view = handle.view();
        assert_eq!(view.previous_base, None);
        assert_eq!(view.rates.get(JPY), Some(149.3));
        assert!(view.display_rates.is_empty());

        handle.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_runs_after_startup() {
        let provider = MockProvider::new();
        let settings = ControllerSettings {
            preload_enabled: true,
            ..quiet_settings()
        };
        let handle = spawn(&provider, settings);

        tokio::time::sleep(Duration::from_secs(13)).await;

        let calls = provider.calls();
        assert_eq!(provider.bases(), vec![EUR, USD, JPY]);
        assert!(calls[2].at - calls[1].at >= Duration::from_secs(6));
        assert_eq!(handle.view().base, EUR);

        handle.teardown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_timer_and_updates() {
        let provider = MockProvider::new();
        let handle = spawn(&provider, quiet_settings());
        let mut views = handle.subscribe();
        views.wait_for(|v| v.last_updated.is_some()).await.unwrap();

        handle.teardown().await.unwrap();
        views.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(provider.call_count(), 1);
        assert!(views.changed().await.is_err());
    }
}
