use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::DailyMetric;
use crate::services::validation::{self, quality_flags, MetricField};

/// Days of history returned by the listing endpoint
const METRICS_HISTORY_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct UpsertMetricsRequest {
    pub date: NaiveDate,
    pub steps: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub systolic_bp: Option<i32>,
    pub diastolic_bp: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct UpsertMetricsResponse {
    #[serde(flatten)]
    pub metric: DailyMetric,
    /// Soft warnings for accepted but unusual values
    pub quality_flags: Vec<String>,
}

/// Handler for writing one day's metrics. Validates against physiological
/// bounds before touching the database; an existing row for the same
/// (user, date) is overwritten.
pub async fn upsert(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpsertMetricsRequest>,
) -> AppResult<Json<UpsertMetricsResponse>> {
    validation::validate_channels(
        request.steps.map(f64::from),
        request.sleep_hours,
        request.systolic_bp.map(f64::from),
        request.diastolic_bp.map(f64::from),
    )
    .map_err(AppError::Validation)?;

    let metric = sqlx::query_as::<_, DailyMetric>(
        r#"
        INSERT INTO daily_metrics (user_id, date, steps, sleep_hours, systolic_bp, diastolic_bp)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, date) DO UPDATE
        SET steps = EXCLUDED.steps,
            sleep_hours = EXCLUDED.sleep_hours,
            systolic_bp = EXCLUDED.systolic_bp,
            diastolic_bp = EXCLUDED.diastolic_bp
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(request.date)
    .bind(request.steps)
    .bind(request.sleep_hours)
    .bind(request.systolic_bp)
    .bind(request.diastolic_bp)
    .fetch_one(&state.db)
    .await?;

    let flags: Vec<String> = [
        (MetricField::Steps, metric.steps.map(f64::from)),
        (MetricField::SleepHours, metric.sleep_hours),
        (MetricField::SystolicBp, metric.systolic_bp.map(f64::from)),
        (MetricField::DiastolicBp, metric.diastolic_bp.map(f64::from)),
    ]
    .iter()
    .flat_map(|&(field, value)| quality_flags(field, value))
    .collect();

    tracing::info!(%user_id, date = %request.date, flags = flags.len(), "Daily metrics recorded");

    Ok(Json(UpsertMetricsResponse {
        metric,
        quality_flags: flags,
    }))
}

/// Handler for listing a user's recent metrics, newest first
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<DailyMetric>>> {
    let metrics = sqlx::query_as::<_, DailyMetric>(
        r#"
        SELECT * FROM daily_metrics
        WHERE user_id = $1 AND date >= CURRENT_DATE - $2::int
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(METRICS_HISTORY_DAYS as i32)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(metrics))
}
