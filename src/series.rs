//! Observation series, the dense merged table and period selection.
//!
//! The estimator works on a [`MergedTable`]: one target column and one or more
//! control columns sharing a single strictly increasing date index with no
//! missing values. Tables are built either directly from aligned columns or by
//! [`merge_series`], which inner-joins independently sourced series and drops
//! every row where any value is missing.

use crate::errors::{validate_all_finite, CausalImpactError, CausalResult};
use chrono::NaiveDate;
use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn ensure_strictly_increasing(timestamps: &[NaiveDate], name: &str) -> CausalResult<()> {
    if let Some(i) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
        return Err(CausalImpactError::InvalidSeries {
            name: name.to_string(),
            reason: format!(
                "timestamps must be unique and increasing, but {} follows {} at index {}",
                timestamps[i + 1],
                timestamps[i],
                i + 1
            ),
        });
    }
    Ok(())
}

/// A named, time-ordered sequence of observations.
///
/// Values may be NaN to mark a missing observation; such rows are dropped by
/// [`merge_series`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawObservationSeries")
)]
pub struct ObservationSeries {
    name: String,
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ObservationSeries {
    /// Builds a series from parallel timestamp and value vectors.
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> CausalResult<Self> {
        let name = name.into();
        if timestamps.len() != values.len() {
            return Err(CausalImpactError::DimensionMismatch {
                column: name,
                expected: timestamps.len(),
                actual: values.len(),
            });
        }
        ensure_strictly_increasing(&timestamps, &name)?;
        Ok(Self {
            name,
            timestamps,
            values,
        })
    }

    /// Builds a series from `(timestamp, value)` pairs.
    pub fn from_points<I>(name: impl Into<String>, points: I) -> CausalResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let (timestamps, values) = points.into_iter().unzip();
        Self::new(name, timestamps, values)
    }

    /// Series name (e.g. a ticker symbol)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observation dates
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Observation values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series holds no observations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value observed on `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.timestamps
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }
}

/// Which of the two analysis windows a [`Period`] plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PeriodKind {
    /// Training window
    Pre,
    /// Evaluation window
    Post,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKind::Pre => write!(f, "pre-period"),
            PeriodKind::Post => write!(f, "post-period"),
        }
    }
}

/// Closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawPeriod")
)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Creates a period; fails when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CausalResult<Self> {
        if start > end {
            return Err(CausalImpactError::InvalidPeriod {
                reason: format!("start {} is after end {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start date
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Inclusive end date
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when `date` lies inside the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Contiguous row range of a sorted index falling inside the period.
    pub fn select(&self, timestamps: &[NaiveDate]) -> Range<usize> {
        let lo = timestamps.partition_point(|t| *t < self.start);
        let hi = timestamps.partition_point(|t| *t <= self.end);
        lo..hi.max(lo)
    }

    /// Fails unless `self` ends strictly before `later` starts.
    pub fn ensure_precedes(&self, later: &Period) -> CausalResult<()> {
        if self.end >= later.start {
            return Err(CausalImpactError::InvalidPeriod {
                reason: format!(
                    "pre-period [{}, {}] must end before post-period [{}, {}] starts",
                    self.start, self.end, later.start, later.end
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Dense table of one target column and N ≥ 1 control columns.
///
/// Controls are stored column-wise: `controls()[j][i]` is control `j` at row `i`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawMergedTable")
)]
pub struct MergedTable {
    timestamps: Vec<NaiveDate>,
    target_name: String,
    target: Vec<f64>,
    control_names: Vec<String>,
    controls: Vec<Vec<f64>>,
}

impl MergedTable {
    /// Builds a table from already aligned columns.
    ///
    /// # Errors
    /// - `DimensionMismatch` if the target or any control differs in length
    /// - `InvalidSeries` for unordered timestamps
    /// - `NumericalError` for missing (NaN) or infinite values
    /// - `InvalidParameter` when no control columns are given or a column name repeats
    pub fn from_columns(
        timestamps: Vec<NaiveDate>,
        target_name: impl Into<String>,
        target: Vec<f64>,
        controls: Vec<(String, Vec<f64>)>,
    ) -> CausalResult<Self> {
        let target_name = target_name.into();
        if controls.is_empty() {
            return Err(CausalImpactError::InvalidParameter {
                parameter: "controls".to_string(),
                value: 0.0,
                constraint: "at least one control column".to_string(),
            });
        }
        if target.len() != timestamps.len() {
            return Err(CausalImpactError::DimensionMismatch {
                column: target_name,
                expected: timestamps.len(),
                actual: target.len(),
            });
        }

        let (control_names, controls): (Vec<String>, Vec<Vec<f64>>) =
            controls.into_iter().unzip();
        // Lookups by name must be unambiguous
        for (j, name) in control_names.iter().enumerate() {
            if *name == target_name || control_names[..j].contains(name) {
                return Err(CausalImpactError::InvalidParameter {
                    parameter: "controls".to_string(),
                    value: j as f64,
                    constraint: format!("unique column names, but '{}' appears twice", name),
                });
            }
        }
        let table = Self {
            timestamps,
            target_name,
            target,
            control_names,
            controls,
        };
        table.check_alignment()?;
        ensure_strictly_increasing(&table.timestamps, &table.target_name)?;
        validate_all_finite(&table.target, &table.target_name)?;
        for (name, column) in table.control_names.iter().zip(&table.controls) {
            validate_all_finite(column, name)?;
        }
        Ok(table)
    }

    /// Verifies the date index and every control column have the target's length.
    pub fn check_alignment(&self) -> CausalResult<()> {
        if self.timestamps.len() != self.target.len() {
            return Err(CausalImpactError::DimensionMismatch {
                column: "timestamps".to_string(),
                expected: self.target.len(),
                actual: self.timestamps.len(),
            });
        }
        for (name, column) in self.control_names.iter().zip(&self.controls) {
            if column.len() != self.target.len() {
                return Err(CausalImpactError::DimensionMismatch {
                    column: name.clone(),
                    expected: self.target.len(),
                    actual: column.len(),
                });
            }
        }
        Ok(())
    }

    /// Shared date index
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Target column name
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Target values
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Control column names, in column order
    pub fn control_names(&self) -> &[String] {
        &self.control_names
    }

    /// Control columns
    pub fn controls(&self) -> &[Vec<f64>] {
        &self.controls
    }

    /// Number of control columns
    pub fn n_controls(&self) -> usize {
        self.controls.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Row range selected by `period`.
    pub fn select(&self, period: &Period) -> Range<usize> {
        period.select(&self.timestamps)
    }

    /// Looks up a column (target or control) by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if name == self.target_name {
            return Some(&self.target);
        }
        self.control_names
            .iter()
            .position(|n| n == name)
            .map(|j| self.controls[j].as_slice())
    }

    /// Restricts the table to a row range.
    pub fn slice(&self, rows: Range<usize>) -> MergedTable {
        MergedTable {
            timestamps: self.timestamps[rows.clone()].to_vec(),
            target_name: self.target_name.clone(),
            target: self.target[rows.clone()].to_vec(),
            control_names: self.control_names.clone(),
            controls: self
                .controls
                .iter()
                .map(|c| c[rows.clone()].to_vec())
                .collect(),
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawObservationSeries {
    name: String,
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawObservationSeries> for ObservationSeries {
    type Error = CausalImpactError;

    fn try_from(raw: RawObservationSeries) -> CausalResult<Self> {
        Self::new(raw.name, raw.timestamps, raw.values)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPeriod> for Period {
    type Error = CausalImpactError;

    fn try_from(raw: RawPeriod) -> CausalResult<Self> {
        Self::new(raw.start, raw.end)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawMergedTable {
    timestamps: Vec<NaiveDate>,
    target_name: String,
    target: Vec<f64>,
    control_names: Vec<String>,
    controls: Vec<Vec<f64>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMergedTable> for MergedTable {
    type Error = CausalImpactError;

    /// Deserialized tables go through the same checks as [`MergedTable::from_columns`].
    fn try_from(raw: RawMergedTable) -> CausalResult<Self> {
        if raw.control_names.len() != raw.controls.len() {
            return Err(CausalImpactError::DimensionMismatch {
                column: "control_names".to_string(),
                expected: raw.controls.len(),
                actual: raw.control_names.len(),
            });
        }
        let controls = raw.control_names.into_iter().zip(raw.controls).collect();
        Self::from_columns(raw.timestamps, raw.target_name, raw.target, controls)
    }
}

/// Inner-joins a target with its controls on date, dropping incomplete rows.
///
/// A row survives only if every series has a finite observation on that date.
pub fn merge_series(
    target: &ObservationSeries,
    controls: &[ObservationSeries],
) -> CausalResult<MergedTable> {
    if controls.is_empty() {
        return Err(CausalImpactError::InvalidParameter {
            parameter: "controls".to_string(),
            value: 0.0,
            constraint: "at least one control series".to_string(),
        });
    }

    let mut timestamps = Vec::with_capacity(target.len());
    let mut target_values = Vec::with_capacity(target.len());
    let mut control_values: Vec<Vec<f64>> = vec![Vec::with_capacity(target.len()); controls.len()];
    let mut row = Vec::with_capacity(controls.len());
    let mut dropped = 0usize;

    for (&date, &y) in target.timestamps().iter().zip(target.values()) {
        row.clear();
        row.extend(controls.iter().filter_map(|c| c.get(date)));
        if !y.is_finite() || row.len() != controls.len() || !row.iter().all(|v| v.is_finite()) {
            dropped += 1;
            continue;
        }
        timestamps.push(date);
        target_values.push(y);
        for (column, &value) in control_values.iter_mut().zip(&row) {
            column.push(value);
        }
    }

    if dropped > 0 {
        log::debug!(
            "merge_series: dropped {} of {} '{}' rows with missing values",
            dropped,
            target.len(),
            target.name()
        );
    }

    let named = controls
        .iter()
        .map(|c| c.name().to_string())
        .zip(control_values)
        .collect();
    MergedTable::from_columns(timestamps, target.name(), target_values, named)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_timestamps() {
        let result = ObservationSeries::new("TSLA", vec![day(2), day(1)], vec![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(CausalImpactError::InvalidSeries { .. })
        ));

        let result = ObservationSeries::new("TSLA", vec![day(1), day(1)], vec![1.0, 2.0]);
        assert!(result.is_err(), "duplicate timestamps must be rejected");
    }

    #[test]
    fn test_series_length_mismatch() {
        let result = ObservationSeries::new("TSLA", vec![day(1), day(2)], vec![1.0]);
        assert!(matches!(
            result,
            Err(CausalImpactError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_period_selection_is_inclusive() {
        let ts: Vec<NaiveDate> = (1..=10).map(day).collect();
        let period = Period::new(day(3), day(5)).unwrap();
        assert_eq!(period.select(&ts), 2..5);

        // Boundaries that fall between observations
        let ts = vec![day(1), day(4), day(8)];
        let period = Period::new(day(2), day(7)).unwrap();
        assert_eq!(period.select(&ts), 1..2);

        let period = Period::new(day(20), day(25)).unwrap();
        assert!(period.select(&ts).is_empty());
    }

    #[test]
    fn test_period_validation() {
        assert!(matches!(
            Period::new(day(5), day(4)),
            Err(CausalImpactError::InvalidPeriod { .. })
        ));

        let pre = Period::new(day(1), day(5)).unwrap();
        let post = Period::new(day(5), day(9)).unwrap();
        assert!(pre.ensure_precedes(&post).is_err());

        let post = Period::new(day(6), day(9)).unwrap();
        assert!(pre.ensure_precedes(&post).is_ok());
        assert!(post.contains(day(6)) && post.contains(day(9)) && !post.contains(day(10)));
    }

    #[test]
    fn test_merge_drops_incomplete_rows() {
        let target = ObservationSeries::new(
            "TSLA",
            vec![day(1), day(2), day(3), day(4), day(5)],
            vec![10.0, 11.0, f64::NAN, 13.0, 14.0],
        )
        .unwrap();
        let wmt = ObservationSeries::new(
            "WMT",
            vec![day(1), day(2), day(3), day(5)],
            vec![1.0, 2.0, 3.0, 5.0],
        )
        .unwrap();
        let msft = ObservationSeries::new(
            "MSFT",
            vec![day(1), day(2), day(3), day(4), day(5), day(6)],
            vec![7.0, f64::NAN, 9.0, 10.0, 11.0, 12.0],
        )
        .unwrap();

        let table = merge_series(&target, &[wmt, msft]).unwrap();
        // day 2: MSFT missing; day 3: target missing; day 4: WMT missing
        assert_eq!(table.timestamps(), &[day(1), day(5)]);
        assert_eq!(table.target(), &[10.0, 14.0]);
        assert_eq!(table.control_names(), &["WMT".to_string(), "MSFT".to_string()]);
        assert_eq!(table.column("WMT").unwrap(), &[1.0, 5.0]);
        assert_eq!(table.column("MSFT").unwrap(), &[7.0, 11.0]);
        assert!(table.column("NVDA").is_none());
    }

    #[test]
    fn test_from_columns_guards() {
        let ts = vec![day(1), day(2), day(3)];
        let result = MergedTable::from_columns(
            ts.clone(),
            "y",
            vec![1.0, 2.0, 3.0],
            vec![("x".to_string(), vec![1.0, 2.0])],
        );
        match result {
            Err(CausalImpactError::DimensionMismatch {
                column,
                expected,
                actual,
            }) => {
                assert_eq!(column, "x");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }

        let result = MergedTable::from_columns(ts.clone(), "y", vec![1.0, 2.0, 3.0], vec![]);
        assert!(matches!(
            result,
            Err(CausalImpactError::InvalidParameter { .. })
        ));

        let result = MergedTable::from_columns(
            ts,
            "y",
            vec![1.0, f64::NAN, 3.0],
            vec![("x".to_string(), vec![1.0, 2.0, 3.0])],
        );
        assert!(matches!(
            result,
            Err(CausalImpactError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let ts = vec![day(1), day(2), day(3)];
        let result = MergedTable::from_columns(
            ts.clone(),
            "y",
            vec![1.0, 2.0, 3.0],
            vec![
                ("x".to_string(), vec![1.0, 2.0, 4.0]),
                ("x".to_string(), vec![3.0, 1.0, 2.0]),
            ],
        );
        assert!(matches!(
            result,
            Err(CausalImpactError::InvalidParameter { ref parameter, .. }) if parameter == "controls"
        ));

        // A control may not shadow the target either
        let result = MergedTable::from_columns(
            ts,
            "y",
            vec![1.0, 2.0, 3.0],
            vec![("y".to_string(), vec![1.0, 2.0, 4.0])],
        );
        assert!(matches!(
            result,
            Err(CausalImpactError::InvalidParameter { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialization_validates_tables() {
        let valid = MergedTable::from_columns(
            vec![day(1), day(2), day(3)],
            "y",
            vec![1.0, 2.0, 3.0],
            vec![("x".to_string(), vec![3.0, 1.0, 2.0])],
        )
        .unwrap();
        let json = serde_json::to_string(&valid).unwrap();
        let restored: MergedTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, valid);

        // More dates than values
        let ragged = r#"{
            "timestamps": ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06"],
            "target_name": "y",
            "target": [1.0, 2.0, 3.0, 4.0],
            "control_names": ["x"],
            "controls": [[2.0, 1.0, 4.0, 3.0]]
        }"#;
        let err = serde_json::from_str::<MergedTable>(ragged).unwrap_err();
        assert!(err.to_string().contains("Dimension mismatch"), "{}", err);

        let unsorted = r#"{
            "timestamps": ["2024-01-03", "2024-01-01", "2024-01-02"],
            "target_name": "y",
            "target": [1.0, 2.0, 3.0],
            "control_names": ["x"],
            "controls": [[2.0, 1.0, 4.0]]
        }"#;
        assert!(serde_json::from_str::<MergedTable>(unsorted).is_err());

        let unnamed = r#"{
            "timestamps": ["2024-01-01", "2024-01-02"],
            "target_name": "y",
            "target": [1.0, 2.0],
            "control_names": [],
            "controls": [[2.0, 1.0]]
        }"#;
        assert!(serde_json::from_str::<MergedTable>(unnamed).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialization_validates_series_and_periods() {
        let unsorted = r#"{"name": "x", "timestamps": ["2024-01-02", "2024-01-01"], "values": [1.0, 2.0]}"#;
        assert!(serde_json::from_str::<ObservationSeries>(unsorted).is_err());

        let reversed = r#"{"start": "2024-01-05", "end": "2024-01-01"}"#;
        assert!(serde_json::from_str::<Period>(reversed).is_err());

        let period: Period = serde_json::from_str(r#"{"start": "2024-01-01", "end": "2024-01-05"}"#).unwrap();
        assert_eq!(period, Period::new(day(1), day(5)).unwrap());
    }

    #[test]
    fn test_slice_keeps_alignment() {
        let ts: Vec<NaiveDate> = (1..=5).map(day).collect();
        let table = MergedTable::from_columns(
            ts,
            "y",
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![("x".to_string(), vec![5.0, 4.0, 3.0, 2.0, 1.0])],
        )
        .unwrap();
        let head = table.slice(1..3);
        assert_eq!(head.len(), 2);
        assert_eq!(head.target(), &[2.0, 3.0]);
        assert_eq!(head.controls()[0], vec![4.0, 3.0]);
        assert!(head.check_alignment().is_ok());
    }
}
