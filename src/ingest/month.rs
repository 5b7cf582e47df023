//! Calendar months the pipeline ingests

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// A validated (year, month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripMonth {
    year: i32,
    month: u32,
}

impl TripMonth {
    /// Create a month, rejecting values outside 1..=12
    pub fn new(year: i32, month: u32) -> EtlResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EtlError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month, rolling December over into January
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for TripMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of months within one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    year: i32,
    start: u32,
    end: u32,
}

impl MonthRange {
    /// Create a range; both ends must be valid months and `start <= end`
    pub fn new(year: i32, start: u32, end: u32) -> EtlResult<Self> {
        TripMonth::new(year, start)?;
        TripMonth::new(year, end)?;
        if start > end {
            return Err(EtlError::Config(format!(
                "month_start ({}) is after month_end ({})",
                start, end
            )));
        }
        Ok(Self { year, start, end })
    }

    /// Range covering a single month
    pub fn single(month: TripMonth) -> Self {
        Self {
            year: month.year,
            start: month.month,
            end: month.month,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Number of months in the range
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    /// Always false since a range holds at least one month. Pairs with
    /// `len` for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Months in ascending order
    pub fn iter(&self) -> impl Iterator<Item = TripMonth> + '_ {
        (self.start..=self.end).map(|month| TripMonth {
            year: self.year,
            month,
        })
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}..={:04}-{:02}",
            self.year, self.start, self.year, self.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_month_display_is_zero_padded() {
        assert_eq!(TripMonth::new(2024, 1).unwrap().to_string(), "2024-01");
        assert_eq!(TripMonth::new(2024, 9).unwrap().to_string(), "2024-09");
        assert_eq!(TripMonth::new(2024, 12).unwrap().to_string(), "2024-12");
    }

    #[test]
    fn test_trip_month_rejects_out_of_range() {
        assert!(matches!(
            TripMonth::new(2024, 0),
            Err(EtlError::InvalidMonth { month: 0, .. })
        ));
        assert!(TripMonth::new(2024, 13).is_err());
    }

    #[test]
    fn test_next_rolls_over_december() {
        let dec = TripMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), TripMonth::new(2025, 1).unwrap());
        assert_eq!(
            TripMonth::new(2024, 3).unwrap().next().first_day(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
    }

    #[test]
    fn test_month_range_iterates_inclusive() {
        let range = MonthRange::new(2024, 1, 5).unwrap();
        let months: Vec<String> = range.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            months,
            vec!["2024-01", "2024-02", "2024-03", "2024-04", "2024-05"]
        );
        assert_eq!(range.len(), 5);
        assert_eq!(range.to_string(), "2024-01..=2024-05");
    }

    #[test]
    fn test_month_range_validation() {
        assert!(MonthRange::new(2024, 5, 1).is_err());
        assert!(MonthRange::new(2024, 0, 3).is_err());
        assert!(MonthRange::new(2024, 1, 13).is_err());
        assert_eq!(MonthRange::new(2024, 7, 7).unwrap().len(), 1);
    }

    #[test]
    fn test_single_range() {
        let month = TripMonth::new(2023, 11).unwrap();
        let range = MonthRange::single(month);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![month]);
    }
}
