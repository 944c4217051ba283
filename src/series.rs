//! Validated daily series.
//!
//! Every downstream step assumes one observation per calendar day with no
//! gaps. `DailySeries::new` is the single place that checks this, so the
//! filter and the sweep can work on plain slices afterwards.

use chrono::{Duration, NaiveDate};

use crate::model::{DailyRecord, InputError};

/// A date-contiguous, finite-valued sequence of daily records.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    records: Vec<DailyRecord>,
}

impl DailySeries {
    /// Validates and wraps `records`.
    ///
    /// Fails when the records are empty, when any deficit or flow ratio is
    /// non-finite, or when a record is not exactly one day after its
    /// predecessor.
    pub fn new(records: Vec<DailyRecord>) -> Result<Self, InputError> {
        if records.is_empty() {
            return Err(InputError::EmptySeries);
        }

        for (index, record) in records.iter().enumerate() {
            for value in [record.deficit, record.flow_ratio] {
                if !value.is_finite() {
                    return Err(InputError::NonFiniteValue { index, value });
                }
            }
        }

        for (index, pair) in records.windows(2).enumerate() {
            if pair[1].date != pair[0].date + Duration::days(1) {
                return Err(InputError::DateGap {
                    index: index + 1,
                    previous: pair[0].date,
                    found: pair[1].date,
                });
            }
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last date covered by the series.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        // new() guarantees at least one record
        let first = self.records[0].date;
        let last = self.records[self.records.len() - 1].date;
        (first, last)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn deficits(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.deficit).collect()
    }

    /// Binary low-flow extreme indicator: `flow_ratio < threshold`.
    pub fn extreme_labels(&self, threshold: f64) -> Vec<bool> {
        self.records
            .iter()
            .map(|r| is_low_flow_extreme(r.flow_ratio, threshold))
            .collect()
    }
}

/// Returns `true` if the flow ratio marks a low-flow extreme day.
///
/// Strictly below the threshold counts; a ratio equal to it does not.
pub fn is_low_flow_extreme(flow_ratio: f64, threshold: f64) -> bool {
    flow_ratio < threshold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2001, 1, 1).unwrap() + Duration::days(offset)
    }

    fn record(offset: i64, deficit: f64, flow_ratio: f64) -> DailyRecord {
        DailyRecord { date: day(offset), deficit, flow_ratio }
    }

    #[test]
    fn test_contiguous_records_are_accepted() {
        let series = DailySeries::new(vec![
            record(0, 1.0, 0.2),
            record(1, 2.0, -0.1),
            record(2, 3.0, 0.0),
        ])
        .expect("consecutive days should validate");
        assert_eq!(series.len(), 3);
        assert_eq!(series.date_range(), (day(0), day(2)));
        assert_eq!(series.deficits(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_gap_in_dates_is_rejected() {
        let err = DailySeries::new(vec![record(0, 1.0, 0.0), record(2, 1.0, 0.0)]).unwrap_err();
        assert_eq!(
            err,
            InputError::DateGap { index: 1, previous: day(0), found: day(2) }
        );
    }

    #[test]
    fn test_duplicate_date_is_rejected() {
        let err = DailySeries::new(vec![record(0, 1.0, 0.0), record(0, 1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, InputError::DateGap { index: 1, .. }));
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let err = DailySeries::new(vec![record(0, 1.0, 0.0), record(1, f64::NAN, 0.0)]).unwrap_err();
        assert!(matches!(err, InputError::NonFiniteValue { index: 1, .. }));
    }

    #[test]
    fn test_empty_records_are_rejected() {
        assert_eq!(DailySeries::new(Vec::new()).unwrap_err(), InputError::EmptySeries);
    }

    #[test]
    fn test_labels_use_strict_threshold() {
        let series = DailySeries::new(vec![
            record(0, 0.0, 0.5),
            record(1, 0.0, 0.0),
            record(2, 0.0, -0.01),
        ])
        .unwrap();
        assert_eq!(series.extreme_labels(0.0), vec![false, false, true]);
    }
}
