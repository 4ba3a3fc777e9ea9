//! Physiological validation and data-quality scoring for daily metrics.
//!
//! Hard bounds reject impossible values at the write path; softer warning
//! thresholds only raise quality flags that feed the data-quality report.
//! Missing values are always valid, they just count against completeness.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::DailyMetric;

/// The validated metric channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    Steps,
    SleepHours,
    SystolicBp,
    DiastolicBp,
}

impl MetricField {
    pub const ALL: [MetricField; 4] = [
        MetricField::Steps,
        MetricField::SleepHours,
        MetricField::SystolicBp,
        MetricField::DiastolicBp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::Steps => "steps",
            MetricField::SleepHours => "sleep_hours",
            MetricField::SystolicBp => "systolic_bp",
            MetricField::DiastolicBp => "diastolic_bp",
        }
    }

    /// Inclusive physiological bounds. Values outside are rejected.
    fn bounds(&self) -> (f64, f64) {
        match self {
            MetricField::Steps => (0.0, 50000.0),
            MetricField::SleepHours => (0.0, 16.0),
            MetricField::SystolicBp => (70.0, 250.0),
            MetricField::DiastolicBp => (40.0, 150.0),
        }
    }

    /// Softer range outside which a value is flagged but still accepted
    fn warning_thresholds(&self) -> (f64, f64) {
        match self {
            MetricField::Steps => (500.0, 30000.0),
            MetricField::SleepHours => (3.0, 12.0),
            MetricField::SystolicBp => (90.0, 180.0),
            MetricField::DiastolicBp => (60.0, 120.0),
        }
    }

    fn value_of(&self, metric: &DailyMetric) -> Option<f64> {
        match self {
            MetricField::Steps => metric.steps.map(f64::from),
            MetricField::SleepHours => metric.sleep_hours,
            MetricField::SystolicBp => metric.systolic_bp.map(f64::from),
            MetricField::DiastolicBp => metric.diastolic_bp.map(f64::from),
        }
    }
}

/// Checks one value against its physiological bounds. `None` is valid.
pub fn validate_metric(field: MetricField, value: Option<f64>) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };

    let (min, max) = field.bounds();
    if value < min || value > max {
        return Err(format!(
            "{} value {} outside valid range [{}, {}]",
            field.as_str(),
            value,
            min,
            max
        ));
    }

    Ok(())
}

/// Validates all four channels of an incoming metrics write.
/// Returns every violation, not just the first.
pub fn validate_channels(
    steps: Option<f64>,
    sleep_hours: Option<f64>,
    systolic_bp: Option<f64>,
    diastolic_bp: Option<f64>,
) -> Result<(), Vec<String>> {
    let checks = [
        (MetricField::Steps, steps),
        (MetricField::SleepHours, sleep_hours),
        (MetricField::SystolicBp, systolic_bp),
        (MetricField::DiastolicBp, diastolic_bp),
    ];

    let errors: Vec<String> = checks
        .iter()
        .filter_map(|&(field, value)| validate_metric(field, value).err())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quality flags for one value: `<field>_missing`, `<field>_low`, or
/// `<field>_high`
pub fn quality_flags(field: MetricField, value: Option<f64>) -> Vec<String> {
    let Some(value) = value else {
        return vec![format!("{}_missing", field.as_str())];
    };

    let (min_warn, max_warn) = field.warning_thresholds();
    if value < min_warn {
        vec![format!("{}_low", field.as_str())]
    } else if value > max_warn {
        vec![format!("{}_high", field.as_str())]
    } else {
        Vec::new()
    }
}

/// Indices of values whose z-score exceeds the threshold. Fewer than three
/// samples, or a flat series, yields no outliers.
pub fn detect_outliers_zscore(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter(|(_, &value)| ((value - mean) / std).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Per-field fraction of records with a value, in [0, 1]
pub fn check_completeness(metrics: &[DailyMetric]) -> BTreeMap<String, f64> {
    if metrics.is_empty() {
        return BTreeMap::new();
    }

    MetricField::ALL
        .iter()
        .map(|field| {
            let present = metrics.iter().filter(|m| field.value_of(m).is_some()).count();
            (field.as_str().to_string(), present as f64 / metrics.len() as f64)
        })
        .collect()
}

/// Aggregate quality report served by the data-quality endpoint and cached
/// in Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_records: usize,
    pub date_range: Option<String>,
    pub completeness: BTreeMap<String, f64>,
    pub avg_completeness: f64,
    /// 0 to 100
    pub quality_score: f64,
    pub date_gaps: Vec<String>,
    pub quality_flags: Vec<String>,
    pub ready_for_training: bool,
}

/// Builds the full quality report over a user's metric history.
///
/// The score starts at average completeness scaled to 100 and loses 5 points
/// per distinct quality flag, capped at a 30-point deduction.
pub fn quality_report(metrics: &[DailyMetric]) -> DataQualityReport {
    if metrics.is_empty() {
        return DataQualityReport {
            total_records: 0,
            date_range: None,
            completeness: BTreeMap::new(),
            avg_completeness: 0.0,
            quality_score: 0.0,
            date_gaps: Vec::new(),
            quality_flags: vec!["no_data".to_string()],
            ready_for_training: false,
        };
    }

    let completeness = check_completeness(metrics);
    let avg_completeness = if completeness.is_empty() {
        0.0
    } else {
        completeness.values().sum::<f64>() / completeness.len() as f64
    };

    let mut dates: Vec<_> = metrics.iter().map(|m| m.date).collect();
    dates.sort();

    let date_range = Some(format!("{} to {}", dates[0], dates[dates.len() - 1]));

    let date_gaps: Vec<String> = dates
        .windows(2)
        .filter_map(|pair| {
            let delta = (pair[1] - pair[0]).num_days();
            if delta > 1 {
                Some(format!("{} days between {} and {}", delta, pair[0], pair[1]))
            } else {
                None
            }
        })
        .collect();

    let flags: BTreeSet<String> = metrics
        .iter()
        .flat_map(|metric| {
            MetricField::ALL
                .iter()
                .flat_map(|&field| quality_flags(field, field.value_of(metric)))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut quality_score = avg_completeness * 100.0;
    if !flags.is_empty() {
        quality_score -= (flags.len() as f64 * 5.0).min(30.0);
    }
    quality_score = quality_score.max(0.0);

    DataQualityReport {
        total_records: metrics.len(),
        date_range,
        completeness,
        avg_completeness: (avg_completeness * 100.0).round() / 100.0,
        quality_score: (quality_score * 10.0).round() / 10.0,
        date_gaps,
        quality_flags: flags.into_iter().collect(),
        ready_for_training: quality_score >= 70.0 && avg_completeness >= 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn metric(
        day: u32,
        steps: Option<i32>,
        sleep: Option<f64>,
        sbp: Option<i32>,
        dbp: Option<i32>,
    ) -> DailyMetric {
        DailyMetric {
            user_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            steps,
            sleep_hours: sleep,
            systolic_bp: sbp,
            diastolic_bp: dbp,
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate_metric(MetricField::SystolicBp, Some(70.0)).is_ok());
        assert!(validate_metric(MetricField::SystolicBp, Some(250.0)).is_ok());
        assert!(validate_metric(MetricField::SystolicBp, Some(69.0)).is_err());
        assert!(validate_metric(MetricField::SystolicBp, Some(251.0)).is_err());

        assert!(validate_metric(MetricField::Steps, Some(0.0)).is_ok());
        assert!(validate_metric(MetricField::Steps, Some(50000.0)).is_ok());
        assert!(validate_metric(MetricField::Steps, Some(50001.0)).is_err());

        assert!(validate_metric(MetricField::SleepHours, Some(16.0)).is_ok());
        assert!(validate_metric(MetricField::SleepHours, Some(16.5)).is_err());

        assert!(validate_metric(MetricField::DiastolicBp, Some(40.0)).is_ok());
        assert!(validate_metric(MetricField::DiastolicBp, Some(39.0)).is_err());
    }

    #[test]
    fn test_missing_value_is_valid() {
        for field in MetricField::ALL {
            assert!(validate_metric(field, None).is_ok());
        }
    }

    #[test]
    fn test_validate_channels_collects_all_errors() {
        let result = validate_channels(Some(-5.0), Some(20.0), Some(120.0), None);
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("steps"));
        assert!(errors[1].contains("sleep_hours"));
    }

    #[test]
    fn test_quality_flags_low_high_missing() {
        assert_eq!(quality_flags(MetricField::Steps, None), vec!["steps_missing"]);
        assert_eq!(quality_flags(MetricField::Steps, Some(100.0)), vec!["steps_low"]);
        assert_eq!(
            quality_flags(MetricField::Steps, Some(35000.0)),
            vec!["steps_high"]
        );
        assert!(quality_flags(MetricField::Steps, Some(8000.0)).is_empty());

        assert_eq!(
            quality_flags(MetricField::SleepHours, Some(2.0)),
            vec!["sleep_hours_low"]
        );
        assert_eq!(
            quality_flags(MetricField::SystolicBp, Some(190.0)),
            vec!["systolic_bp_high"]
        );
    }

    #[test]
    fn test_outliers_need_three_samples() {
        assert!(detect_outliers_zscore(&[1.0, 100.0], 3.0).is_empty());
    }

    #[test]
    fn test_outliers_flat_series() {
        assert!(detect_outliers_zscore(&[5.0, 5.0, 5.0, 5.0], 3.0).is_empty());
    }

    #[test]
    fn test_outliers_detected() {
        let mut values = vec![10.0; 20];
        values.push(1000.0);
        let outliers = detect_outliers_zscore(&values, 3.0);
        assert_eq!(outliers, vec![20]);
    }

    #[test]
    fn test_completeness_per_field() {
        let metrics = vec![
            metric(1, Some(8000), Some(7.0), None, None),
            metric(2, Some(9000), None, None, None),
        ];
        let completeness = check_completeness(&metrics);
        assert_eq!(completeness["steps"], 1.0);
        assert_eq!(completeness["sleep_hours"], 0.5);
        assert_eq!(completeness["systolic_bp"], 0.0);
    }

    #[test]
    fn test_quality_report_empty() {
        let report = quality_report(&[]);
        assert_eq!(report.total_records, 0);
        assert_eq!(report.quality_score, 0.0);
        assert!(!report.ready_for_training);
        assert_eq!(report.quality_flags, vec!["no_data"]);
    }

    #[test]
    fn test_quality_report_complete_clean_data() {
        let metrics: Vec<_> = (1..=7)
            .map(|d| metric(d, Some(8000), Some(7.5), Some(118), Some(76)))
            .collect();
        let report = quality_report(&metrics);
        assert_eq!(report.total_records, 7);
        assert_eq!(report.avg_completeness, 1.0);
        assert_eq!(report.quality_score, 100.0);
        assert!(report.ready_for_training);
        assert!(report.date_gaps.is_empty());
        assert!(report.quality_flags.is_empty());
    }

    #[test]
    fn test_quality_report_flag_deduction_capped() {
        // Every field missing on every day: 4 distinct flags at 5 points each,
        // but completeness is already 0 so the score floors at 0
        let metrics: Vec<_> = (1..=3).map(|d| metric(d, None, None, None, None)).collect();
        let report = quality_report(&metrics);
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(report.quality_flags.len(), 4);
        assert!(!report.ready_for_training);
    }

    #[test]
    fn test_quality_report_detects_date_gaps() {
        let metrics = vec![
            metric(1, Some(8000), Some(7.0), Some(120), Some(80)),
            metric(2, Some(8000), Some(7.0), Some(120), Some(80)),
            metric(6, Some(8000), Some(7.0), Some(120), Some(80)),
        ];
        let report = quality_report(&metrics);
        assert_eq!(report.date_gaps.len(), 1);
        assert!(report.date_gaps[0].starts_with("4 days"));
        assert_eq!(report.date_range.as_deref(), Some("2026-08-01 to 2026-08-06"));
    }

    #[test]
    fn test_flagged_data_lowers_score_below_training_bar() {
        // Complete but every day has unusually low steps and sleep
        let metrics: Vec<_> = (1..=7)
            .map(|d| metric(d, Some(200), Some(2.0), Some(120), Some(80)))
            .collect();
        let report = quality_report(&metrics);
        assert_eq!(report.quality_score, 90.0);
        assert!(report.ready_for_training);

        // Add missing fields too: 2 value flags + 2 missing flags caps at 20
        let metrics: Vec<_> = (1..=7).map(|d| metric(d, Some(200), Some(2.0), None, None)).collect();
        let report = quality_report(&metrics);
        assert_eq!(report.avg_completeness, 0.5);
        assert_eq!(report.quality_score, 30.0);
        assert!(!report.ready_for_training);
    }
}
