//! Calendar date ranges for archive requests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Format used for the time window sent to the archive service.
const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting an end date before the start date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> PipelineResult<Self> {
        if start > end {
            return Err(PipelineError::invalid_value(
                "date range",
                format!("start date {} is after end date {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> PipelineResult<Self> {
        Self::new(parse_date("start_date", start)?, parse_date("end_date", end)?)
    }

    /// First instant of the start date (00:00:00).
    pub fn window_start(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last whole second of the end date (23:59:59).
    pub fn window_end(&self) -> NaiveDateTime {
        // 23:59:59 is always a valid time of day
        self.end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }

    pub fn window_start_iso(&self) -> String {
        self.window_start().format(ISO_DATETIME).to_string()
    }

    pub fn window_end_iso(&self) -> String {
        self.window_end().format(ISO_DATETIME).to_string()
    }

    /// `<start>_<end>` with ISO dates, used in artifact file names.
    pub fn file_fragment(&self) -> String {
        format!(
            "{}_{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn parse_date(key: &str, value: &str) -> PipelineResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        PipelineError::invalid_value(key, format!("'{}' is not a YYYY-MM-DD date: {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_day_window() {
        let range = DateRange::parse("2005-01-01", "2024-12-31").unwrap();
        assert_eq!(range.window_start_iso(), "2005-01-01T00:00:00");
        assert_eq!(range.window_end_iso(), "2024-12-31T23:59:59");
    }

    #[test]
    fn test_file_fragment() {
        let range = DateRange::parse("2005-01-01", "2024-12-31").unwrap();
        assert_eq!(range.file_fragment(), "2005-01-01_2024-12-31");
    }

    #[test]
    fn test_single_day() {
        let range = DateRange::parse("2020-02-29", "2020-02-29").unwrap();
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(DateRange::parse("2024-01-02", "2024-01-01").is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        let err = DateRange::parse("2024-13-01", "2024-12-31").unwrap_err();
        assert!(err.to_string().contains("start_date"));
    }
}
