use super::rates::{PreloadOutcome, RatesController};
use crate::core::CurrencyCode;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

/// One paced pass over the supported currencies, warming the cache.
///
/// Fresh entries are skipped without waiting; every network fetch is followed
/// by `delay` before the next one.
#[derive(Debug)]
pub struct PreloadScheduler {
    pending: VecDeque<CurrencyCode>,
    delay: Duration,
    next_at: Instant,
}

impl PreloadScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            delay,
            next_at: Instant::now(),
        }
    }

    /// Queues every currency except `active`. Ignored while a pass is running.
    pub fn start(&mut self, currencies: &[CurrencyCode], active: CurrencyCode) {
        if !self.is_idle() {
            debug!("Preload already in progress");
            return;
        }
        self.pending = currencies.iter().copied().filter(|c| *c != active).collect();
        self.next_at = Instant::now() + self.delay;
        info!(count = self.pending.len(), "Starting preload pass");
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = CurrencyCode> + '_ {
        self.pending.iter().copied()
    }

    /// Resolves when the next step may run.
    pub async fn due(&self) {
        sleep_until(self.next_at).await;
    }

    /// Fetches the next currency that is not fresh, then schedules the next step.
    pub async fn step(&mut self, controller: &mut RatesController) {
        while let Some(base) = self.pending.pop_front() {
            if base == controller.state().active_base {
                debug!(%base, "Preload skipped, currency is the active base");
                continue;
            }
            match controller.preload(base).await {
                PreloadOutcome::AlreadyFresh => continue,
                PreloadOutcome::Fetched | PreloadOutcome::Failed => {
                    self.next_at = Instant::now() + self.delay;
                    break;
                }
            }
        }
        if self.pending.is_empty() {
            info!("Preload pass complete");
        }
    }

    /// Drives a whole pass to completion.
    pub async fn run(&mut self, controller: &mut RatesController) {
        while !self.is_idle() {
            self.due().await;
            self.step(controller).await;
        }
    }
}
