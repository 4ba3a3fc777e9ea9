use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BpCategory, ChannelFeatures, DailyMetric, FeatureSet, RollingStats, Trend, TrendDirection,
    },
};

/// How far back the feature computation looks
pub const FEATURE_WINDOW_DAYS: i64 = 30;

/// Computes the feature set for a user from their recent daily metrics
///
/// Reads the last 30 days of observations and derives rolling statistics,
/// trends, consistency, and risk flags for every channel. A user with zero
/// metrics gets an all-default feature set; the rule engine treats that as
/// insufficient data rather than an error.
pub async fn compute_features(pool: &PgPool, user_id: Uuid) -> AppResult<FeatureSet> {
    let today = Utc::now().date_naive();
    let start = today - Duration::days(FEATURE_WINDOW_DAYS);

    let metrics: Vec<DailyMetric> = sqlx::query_as(
        r#"
        SELECT user_id, date, steps, sleep_hours, systolic_bp, diastolic_bp
        FROM daily_metrics
        WHERE user_id = $1 AND date >= $2
        ORDER BY date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .fetch_all(pool)
    .await?;

    tracing::debug!(user_id = %user_id, rows = metrics.len(), "Computing features");

    Ok(build_feature_set(&metrics, today))
}

/// Builds a feature set from metrics ordered ascending by date.
/// Pure; `today` anchors the rolling windows.
pub fn build_feature_set(metrics: &[DailyMetric], today: NaiveDate) -> FeatureSet {
    let steps_samples = channel_samples(metrics, |m| m.steps.map(f64::from));
    let sleep_samples = channel_samples(metrics, |m| m.sleep_hours);
    let sbp_samples = channel_samples(metrics, |m| m.systolic_bp.map(f64::from));
    let dbp_samples = channel_samples(metrics, |m| m.diastolic_bp.map(f64::from));

    let steps = channel_features(&steps_samples, today);
    let sleep = channel_features(&sleep_samples, today);
    let systolic = channel_features(&sbp_samples, today);
    let diastolic = channel_features(&dbp_samples, today);

    // Most recent non-null reading per BP channel, 0.0 when none
    let latest_sbp = sbp_samples.last().map(|(_, v)| *v).unwrap_or(0.0);
    let latest_dbp = dbp_samples.last().map(|(_, v)| *v).unwrap_or(0.0);

    let bp_category = if latest_sbp > 0.0 && latest_dbp > 0.0 {
        Some(classify_bp(latest_sbp, latest_dbp))
    } else {
        None
    };

    let week_ago = today - Duration::days(7);
    let sleep_last_7: Vec<f64> = sleep_samples
        .iter()
        .filter(|(date, _)| *date >= week_ago)
        .map(|(_, v)| *v)
        .collect();
    let sleep_deficit_days = sleep_last_7.iter().filter(|&&v| v < 7.0).count();
    let sleep_excess_days = sleep_last_7.iter().filter(|&&v| v > 9.0).count();

    let data_completeness = (sleep.win7.count + steps.win7.count) as f64 / 14.0;

    FeatureSet {
        data_days: metrics.len(),
        steps,
        sleep,
        systolic,
        diastolic,
        latest_sbp,
        latest_dbp,
        bp_category,
        sleep_deficit_days,
        sleep_excess_days,
        data_completeness,
    }
}

/// Extracts (date, value) pairs for one channel, skipping null observations
fn channel_samples<F>(metrics: &[DailyMetric], extract: F) -> Vec<(NaiveDate, f64)>
where
    F: Fn(&DailyMetric) -> Option<f64>,
{
    metrics
        .iter()
        .filter_map(|m| extract(m).map(|v| (m.date, v)))
        .collect()
}

/// Derives all per-channel features from (date, value) samples in
/// chronological order
fn channel_features(samples: &[(NaiveDate, f64)], today: NaiveDate) -> ChannelFeatures {
    let all_values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();

    let window = |days: i64| -> Vec<f64> {
        let cutoff = today - Duration::days(days);
        samples
            .iter()
            .filter(|(date, _)| *date >= cutoff)
            .map(|(_, v)| *v)
            .collect()
    };

    let win7_values = window(7);
    let (weekday_avg, weekend_avg) = temporal_split(samples);
    let weekend_weekday_diff = match (weekday_avg, weekend_avg) {
        (Some(wd), Some(we)) => Some(we - wd),
        _ => None,
    };

    ChannelFeatures {
        win7: rolling_stats(&win7_values),
        win14: rolling_stats(&window(14)),
        win30: rolling_stats(&window(30)),
        trend: compute_trend(&win7_values),
        consistency: consistency_score(&all_values),
        weekday_avg,
        weekend_avg,
        weekend_weekday_diff,
    }
}

/// Mean, min, max, population standard deviation, and coefficient of
/// variation over a window. Empty windows yield all zeros.
pub fn rolling_stats(values: &[f64]) -> RollingStats {
    if values.is_empty() {
        return RollingStats::default();
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // Fewer than 2 samples: std and cv default to 0.0 rather than erroring
    let std = if count > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let cv = if mean > 0.0 { std / mean } else { 0.0 };

    RollingStats {
        mean,
        min,
        max,
        std,
        cv,
        count,
    }
}

/// Ordinary-least-squares trend over a time-indexed series.
///
/// Direction is `Stable` when the daily slope is under 1% of the series
/// mean; strength is the R² of the fit clamped to [0, 1]. Fewer than 2
/// samples yields `InsufficientData` with zero slope.
pub fn compute_trend(values: &[f64]) -> Trend {
    let n = values.len();
    if n < 2 {
        return Trend::default();
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };

    let direction = if slope.abs() <= 0.01 * y_mean.abs() {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    // R² of the fitted line
    let strength = if denominator != 0.0 {
        let ss_tot: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
        if ss_tot != 0.0 {
            let ss_res: f64 = values
                .iter()
                .enumerate()
                .map(|(i, y)| {
                    let predicted = slope * (i as f64 - x_mean) + y_mean;
                    (y - predicted).powi(2)
                })
                .sum();
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else {
            0.0
        }
    } else {
        0.0
    };

    Trend {
        direction,
        slope,
        strength,
    }
}

/// Consistency score from the coefficient of variation: exp(-cv), so lower
/// variability scores closer to 1.0. Neutral 0.5 with fewer than 2 samples;
/// 0.0 when the mean is zero.
pub fn consistency_score(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.5;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let cv = variance.sqrt() / mean;

    let consistency = (-cv).exp();
    (consistency * 1000.0).round() / 1000.0
}

/// Splits samples into weekday and weekend averages
fn temporal_split(samples: &[(NaiveDate, f64)]) -> (Option<f64>, Option<f64>) {
    let mut weekday = Vec::new();
    let mut weekend = Vec::new();

    for (date, value) in samples {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => weekend.push(*value),
            _ => weekday.push(*value),
        }
    }

    let avg = |values: &[f64]| {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    (avg(&weekday), avg(&weekend))
}

/// Classifies the latest BP reading following standard clinical guidelines
fn classify_bp(sbp: f64, dbp: f64) -> BpCategory {
    if sbp < 120.0 && dbp < 80.0 {
        BpCategory::Normal
    } else if sbp < 130.0 && dbp < 80.0 {
        BpCategory::Elevated
    } else if sbp < 140.0 || dbp < 90.0 {
        BpCategory::Stage1Hypertension
    } else if sbp < 180.0 || dbp < 120.0 {
        BpCategory::Stage2Hypertension
    } else {
        BpCategory::HypertensiveCrisis
    }
}
