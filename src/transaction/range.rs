//! Inclusive date ranges used to filter transactions.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::Error;

/// A date range where `start` is on or before `end`, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange(start, end));
        }

        Ok(Self { start, end })
    }

    /// The `days` days ending on `end`, including `end` itself.
    ///
    /// A `days` of zero is treated as one day. The start stops at the
    /// earliest representable date.
    pub fn ending_on(end: Date, days: u16) -> Self {
        let start = end.saturating_sub(Duration::days(i64::from(days.max(1)) - 1));

        Self { start, end }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }
}

/// Query parameters for endpoints that take an optional date range.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct DateRangeQuery {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl DateRangeQuery {
    /// Check that the start date, if given, is not after the end date.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateRange] if both dates are given and out of order.
    pub fn validate(&self) -> Result<(), Error> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => DateRange::new(start, end).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Resolve to a full range, filling in missing dates from `default`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDateRange] if the resolved start is after the resolved end.
    pub fn resolve(&self, default: DateRange) -> Result<DateRange, Error> {
        DateRange::new(
            self.start_date.unwrap_or(default.start),
            self.end_date.unwrap_or(default.end),
        )
    }
}

#[cfg(test)]
mod date_range_tests {
    use time::{Date, macros::date};

    use crate::Error;

    use super::{DateRange, DateRangeQuery};

    #[test]
    fn new_rejects_start_after_end() {
        let start = date!(2025 - 10 - 02);
        let end = date!(2025 - 10 - 01);

        assert_eq!(
            DateRange::new(start, end),
            Err(Error::InvalidDateRange(start, end))
        );
    }

    #[test]
    fn single_day_range_is_valid() {
        let day = date!(2025 - 10 - 02);

        let range = DateRange::new(day, day).unwrap();

        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn ending_on_includes_end() {
        let range = DateRange::ending_on(date!(2025 - 03 - 01), 3);

        assert_eq!(range.start(), date!(2025 - 02 - 27));
        assert_eq!(range.end(), date!(2025 - 03 - 01));
        assert_eq!(DateRange::ending_on(range.end(), 0).start(), range.end());
    }

    #[test]
    fn ending_on_stops_at_earliest_date() {
        let end = Date::MIN.next_day().unwrap();

        let range = DateRange::ending_on(end, 45);

        assert_eq!(range.start(), Date::MIN);
        assert_eq!(range.end(), end);
    }

    #[test]
    fn query_fills_missing_dates_from_default() {
        let default = DateRange::new(date!(2025 - 01 - 01), date!(2025 - 01 - 31)).unwrap();
        let query = DateRangeQuery {
            start_date: Some(date!(2025 - 01 - 10)),
            end_date: None,
        };

        let range = query.resolve(default).unwrap();

        assert_eq!(range.start(), date!(2025 - 01 - 10));
        assert_eq!(range.end(), date!(2025 - 01 - 31));
    }

    #[test]
    fn query_validation_only_checks_complete_ranges() {
        let open_ended = DateRangeQuery {
            start_date: Some(date!(2025 - 01 - 10)),
            end_date: None,
        };
        let reversed = DateRangeQuery {
            start_date: Some(date!(2025 - 01 - 10)),
            end_date: Some(date!(2025 - 01 - 09)),
        };

        assert_eq!(open_ended.validate(), Ok(()));
        assert!(matches!(
            reversed.validate(),
            Err(Error::InvalidDateRange(_, _))
        ));
    }
}
