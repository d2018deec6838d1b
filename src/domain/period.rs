//! Fiscal period axis.
//!
//! A fiscal year is twelve calendar months starting at a configurable month
//! (April for most of the cooperative's plans). The order is fixed when the
//! calendar is built and never changes afterwards.

use chrono::Month;

use crate::domain::error::GridError;

pub const PERIODS_PER_YEAR: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    /// Stable key used in cell lookup, e.g. `"apr"`.
    pub key: String,
    pub label: String,
    /// Calendar month number, 1 = January.
    pub calendar_month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
    periods: Vec<Period>,
}

impl FiscalCalendar {
    /// Build the twelve periods of a fiscal year beginning at `start_month`.
    pub fn starting_at(start_month: u32) -> Result<Self, GridError> {
        let first = u8::try_from(start_month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or(GridError::InvalidStartMonth(start_month))?;

        let mut periods = Vec::with_capacity(PERIODS_PER_YEAR);
        let mut month = first;
        for _ in 0..PERIODS_PER_YEAR {
            let name = month.name();
            periods.push(Period {
                key: name[..3].to_lowercase(),
                label: name.to_string(),
                calendar_month: month.number_from_month(),
            });
            month = month.succ();
        }

        Ok(Self {
            start_month,
            periods,
        })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.periods.iter().position(|p| p.key == key)
    }

    pub fn by_key(&self, key: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.key == key)
    }

    pub fn by_calendar_month(&self, month: u32) -> Option<&Period> {
        self.periods.iter().find(|p| p.calendar_month == month)
    }
}
