//! Currency codes, rate tables and the remote rate provider abstraction

use super::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Currencies known to the application.
///
/// Declaration order is the enumeration order used everywhere a list of
/// currencies is walked (preloading, display, provider `symbols`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum CurrencyCode {
    EUR,
    HKD,
    CNY,
    USD,
    JPY,
    GBP,
    CHF,
    AUD,
    CAD,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 9] = [
        CurrencyCode::EUR,
        CurrencyCode::HKD,
        CurrencyCode::CNY,
        CurrencyCode::USD,
        CurrencyCode::JPY,
        CurrencyCode::GBP,
        CurrencyCode::CHF,
        CurrencyCode::AUD,
        CurrencyCode::CAD,
    ];

    /// The currencies offered when nothing else is configured.
    pub const DEFAULT_SET: [CurrencyCode; 6] = [
        CurrencyCode::EUR,
        CurrencyCode::HKD,
        CurrencyCode::CNY,
        CurrencyCode::USD,
        CurrencyCode::JPY,
        CurrencyCode::GBP,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CurrencyCode::EUR => "EUR",
            CurrencyCode::HKD => "HKD",
            CurrencyCode::CNY => "CNY",
            CurrencyCode::USD => "USD",
            CurrencyCode::JPY => "JPY",
            CurrencyCode::GBP => "GBP",
            CurrencyCode::CHF => "CHF",
            CurrencyCode::AUD => "AUD",
            CurrencyCode::CAD => "CAD",
        }
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency code: '{0}'")]
pub struct CurrencyParseError(pub String);

impl FromStr for CurrencyCode {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        CurrencyCode::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| CurrencyParseError(s.to_string()))
    }
}

/// Conversion factors from one implied base currency to other currencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable(BTreeMap<CurrencyCode, f64>);

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, currency: CurrencyCode) -> Option<f64> {
        self.0.get(&currency).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CurrencyCode, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (CurrencyCode, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source of the latest rates for a base currency.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches rates for `base` against each of `symbols` with a single request.
    async fn latest(
        &self,
        base: CurrencyCode,
        symbols: &[CurrencyCode],
    ) -> Result<RateTable, FetchError>;
}
