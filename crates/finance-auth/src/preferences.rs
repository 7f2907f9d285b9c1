//! Operation filter preferences kept in the tab-scoped store

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{PERIOD_FILTER_KEY, PERIOD_FROM_KEY, PERIOD_TO_KEY};
use crate::error::{Error, Result};
use crate::store::KeyValueStore;

/// Period selector for the operations list and the overview charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    #[default]
    Today,
    Week,
    Month,
    Year,
    All,
    Interval,
}

impl PeriodFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodFilter::Today => "today",
            PeriodFilter::Week => "week",
            PeriodFilter::Month => "month",
            PeriodFilter::Year => "year",
            PeriodFilter::All => "all",
            PeriodFilter::Interval => "interval",
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "today" => Ok(PeriodFilter::Today),
            "week" => Ok(PeriodFilter::Week),
            "month" => Ok(PeriodFilter::Month),
            "year" => Ok(PeriodFilter::Year),
            "all" => Ok(PeriodFilter::All),
            "interval" => Ok(PeriodFilter::Interval),
            other => Err(Error::UnknownFilter(other.to_owned())),
        }
    }
}

/// Date bounds for [`PeriodFilter::Interval`], as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateInterval {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateInterval {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    /// Both bounds present and non-empty.
    pub fn is_complete(&self) -> bool {
        matches!((&self.from, &self.to), (Some(f), Some(t)) if !f.is_empty() && !t.is_empty())
    }
}

/// A restored filter choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub filter: PeriodFilter,
    pub interval: DateInterval,
}

/// Filter preferences over the tab-scoped store.
#[derive(Clone)]
pub struct FilterPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl FilterPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Remember the filter. Interval bounds are kept only for `interval`.
    pub fn save(&self, filter: PeriodFilter, interval: &DateInterval) -> Result<()> {
        self.store.set(PERIOD_FILTER_KEY, filter.as_str())?;
        if filter == PeriodFilter::Interval {
            self.store
                .set(PERIOD_FROM_KEY, interval.from.as_deref().unwrap_or(""))?;
            self.store
                .set(PERIOD_TO_KEY, interval.to.as_deref().unwrap_or(""))?;
        } else {
            self.store.remove(PERIOD_FROM_KEY)?;
            self.store.remove(PERIOD_TO_KEY)?;
        }
        debug!(%filter, "saved period filter");
        Ok(())
    }

    /// Restore the saved filter; unknown or missing values restore `today`.
    pub fn load(&self) -> FilterSelection {
        let filter = self
            .store
            .get(PERIOD_FILTER_KEY)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let interval = if filter == PeriodFilter::Interval {
            DateInterval {
                from: self.store.get(PERIOD_FROM_KEY).filter(|s| !s.is_empty()),
                to: self.store.get(PERIOD_TO_KEY).filter(|s| !s.is_empty()),
            }
        } else {
            DateInterval::default()
        };

        FilterSelection { filter, interval }
    }

    /// Forget all three keys. Run when the tab (or shell) closes.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(PERIOD_FILTER_KEY)?;
        self.store.remove(PERIOD_FROM_KEY)?;
        self.store.remove(PERIOD_TO_KEY)
    }
}
