//! Core domain types and abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, RateCache};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use currency::{CurrencyCode, CurrencyParseError, RateProvider, RateTable};
pub use error::{FailureKind, FetchError};
