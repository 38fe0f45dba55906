//! Projection of the current rate table into the list the user sees.

use crate::core::{CurrencyCode, RateTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-currency "show this" flags. A missing flag means hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySelection(BTreeMap<CurrencyCode, bool>);

impl DisplaySelection {
    /// Shows every currency except `base`.
    pub fn all_except(currencies: &[CurrencyCode], base: CurrencyCode) -> Self {
        Self(currencies.iter().map(|c| (*c, *c != base)).collect())
    }

    /// Shows exactly `displayed`; every other currency gets an explicit `false`.
    pub fn only(currencies: &[CurrencyCode], displayed: &[CurrencyCode]) -> Self {
        Self(
            currencies
                .iter()
                .map(|c| (*c, displayed.contains(c)))
                .collect(),
        )
    }

    pub fn is_displayed(&self, currency: CurrencyCode) -> bool {
        self.0.get(&currency).copied().unwrap_or(false)
    }

    pub fn set(&mut self, currency: CurrencyCode, shown: bool) {
        self.0.insert(currency, shown);
    }

    /// Hides the new base and shows any currency that has no flag yet.
    pub fn exclude_base(&mut self, base: CurrencyCode, currencies: &[CurrencyCode]) {
        for currency in currencies {
            if *currency == base {
                self.0.insert(*currency, false);
            } else {
                self.0.entry(*currency).or_insert(true);
            }
        }
    }

    pub fn displayed(&self) -> impl Iterator<Item = CurrencyCode> + '_ {
        self.0.iter().filter(|(_, shown)| **shown).map(|(c, _)| *c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRate {
    pub currency: CurrencyCode,
    /// `None` when the table has no rate for a currency the user asked for.
    pub value: Option<f64>,
}

impl DisplayRate {
    /// What `amount` units of the base are worth in this currency.
    pub fn convert(&self, amount: f64) -> Option<f64> {
        self.value.map(|rate| rate * amount)
    }
}

/// Walks `currencies` in order and keeps every displayed one except the base.
pub fn project(
    currencies: &[CurrencyCode],
    active_base: CurrencyCode,
    selection: &DisplaySelection,
    rates: &RateTable,
) -> Vec<DisplayRate> {
    currencies
        .iter()
        .copied()
        .filter(|c| *c != active_base && selection.is_displayed(*c))
        .map(|currency| DisplayRate {
            currency,
            value: rates.get(currency),
        })
        .collect()
}
