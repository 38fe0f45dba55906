//! Base-change lifecycle: confirm, or roll back to the last good base and retry once.

use super::display::DisplaySelection;
use crate::core::{CurrencyCode, FetchError};
use serde::Serialize;

/// Reported when both the base change and the retry on the restored base failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackFailure {
    pub failed: CurrencyCode,
    pub restored: CurrencyCode,
    pub reason: String,
}

impl std::fmt::Display for RollbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not load rates for {}; restored {} but its refresh failed too: {}",
            self.failed, self.restored, self.reason
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaseChange {
    Stable,
    /// A new base is active but has not been fetched successfully yet.
    Changing {
        previous: CurrencyCode,
        selection: DisplaySelection,
    },
    RollingBack {
        failed: CurrencyCode,
        restored: CurrencyCode,
    },
    Retrying {
        failed: CurrencyCode,
        restored: CurrencyCode,
    },
}

impl BaseChange {
    /// The base to fall back to, defined only while a rollback is possible.
    pub fn previous_base(&self) -> Option<CurrencyCode> {
        match self {
            BaseChange::Changing { previous, .. } => Some(*previous),
            _ => None,
        }
    }

    /// Starts a change away from `current`.
    ///
    /// A change issued while another is still unconfirmed keeps the original
    /// fallback, since the intermediate base never loaded.
    pub fn begin(self, current: CurrencyCode, selection: &DisplaySelection) -> BaseChange {
        match self {
            BaseChange::Changing {
                previous,
                selection,
            } => BaseChange::Changing {
                previous,
                selection,
            },
            _ => BaseChange::Changing {
                previous: current,
                selection: selection.clone(),
            },
        }
    }

    /// The new base loaded at least once.
    pub fn confirm(self) -> BaseChange {
        match self {
            BaseChange::Changing { .. } => BaseChange::Stable,
            other => other,
        }
    }

    /// Moves `Changing` to `RollingBack`, handing back the selection to restore.
    pub fn roll_back(
        self,
        failed: CurrencyCode,
    ) -> Result<(BaseChange, DisplaySelection), BaseChange> {
        match self {
            BaseChange::Changing {
                previous,
                selection,
            } => Ok((
                BaseChange::RollingBack {
                    failed,
                    restored: previous,
                },
                selection,
            )),
            other => Err(other),
        }
    }

    pub fn retry(self) -> BaseChange {
        match self {
            BaseChange::RollingBack { failed, restored } => {
                BaseChange::Retrying { failed, restored }
            }
            other => other,
        }
    }

    /// Ends the single retry. A failed retry yields the terminal failure; no
    /// other state can produce one.
    pub fn finish_retry(self, error: Option<&FetchError>) -> (BaseChange, Option<RollbackFailure>) {
        match (self, error) {
            (BaseChange::Retrying { failed, restored }, Some(err)) => (
                BaseChange::Stable,
                Some(RollbackFailure {
                    failed,
                    restored,
                    reason: err.to_string(),
                }),
            ),
            (BaseChange::Retrying { .. }, None) => (BaseChange::Stable, None),
            (other, _) => (other, None),
        }
    }
}
