//! This file defines the `BudgetGoal` type and the `YearMonth` key used to
//! group budget goals into months.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de};
use time::Date;

use crate::models::CategoryId;

/// A calendar month, the granularity budget goals are keyed by.
///
/// Renders (and serializes) as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    /// The calendar year.
    pub year: i32,
    /// The month of the year, 1-12.
    pub month: u8,
}

impl From<Date> for YearMonth {
    fn from(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The error returned when a string is not a valid `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseYearMonthError(String);

impl Display for ParseYearMonthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" is not a valid YYYY-MM month", self.0)
    }
}

impl std::error::Error for ParseYearMonthError {}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseYearMonthError(s.to_owned());

        let (year, month) = s.split_once('-').ok_or_else(error)?;
        let year: i32 = year.parse().map_err(|_| error())?;
        let month: u8 = month.parse().map_err(|_| error())?;

        if !(1..=12).contains(&month) {
            return Err(error());
        }

        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Whether a monthly budget has been set for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// A monthly budget is set for the category in this month.
    Budgeted,
    /// No budget is set; only spending is tracked.
    Unbudgeted,
}

/// A per-category spending goal for one calendar month.
///
/// Keyed by (category, month). The spent amount is computed server-side and
/// is always non-negative, whether or not a budget is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetGoal {
    /// The category the goal applies to.
    pub category_id: CategoryId,
    /// The month the goal applies to.
    pub month: YearMonth,
    /// The budgeted amount, absent when no budget is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
    /// How much was spent in the category this month. Server-computed,
    /// always non-negative.
    pub spent_amount: f64,
    /// Whether a budget is set for this (category, month).
    pub status: BudgetStatus,
}
