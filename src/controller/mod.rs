//! Rate resilience controller: caching, throttling, preloading and rollback

pub mod display;
pub mod limiter;
pub mod preload;
pub mod rates;
pub mod rollback;
pub mod service;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

pub use display::{DisplayRate, DisplaySelection, project};
pub use limiter::RateLimiter;
pub use preload::PreloadScheduler;
pub use rates::{
    ActiveSelection, ControllerState, FetchOutcome, PreloadOutcome, RatesController, RatesView,
};
pub use rollback::{BaseChange, RollbackFailure};
pub use service::{Command, RateServiceHandle};
pub use settings::ControllerSettings;
