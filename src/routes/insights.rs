use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use super::AppState;
use crate::cached;
use crate::db::CacheKey;
use crate::error::{AppError, AppResult};
use crate::models::DailyMetric;
use crate::services::feedback::{self, FeedbackInsights, INSIGHTS_CACHE_TTL};
use crate::services::validation::{self, DataQualityReport};

/// Seconds the cached data-quality report stays fresh
const QUALITY_CACHE_TTL: u64 = 300;

/// Handler for the feedback insights summary, served from cache when fresh
pub async fn feedback_insights(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<FeedbackInsights>> {
    let insights = fetch_insights(&state, user_id).await?;
    Ok(Json(insights))
}

async fn fetch_insights(state: &AppState, user_id: Uuid) -> AppResult<FeedbackInsights> {
    cached!(
        state.cache,
        CacheKey::FeedbackInsights(user_id),
        INSIGHTS_CACHE_TTL,
        async {
            let snapshots = feedback::load_snapshots(&state.db, user_id).await?;
            Ok::<_, AppError>(feedback::feedback_insights(&snapshots, Utc::now()))
        }
    )
}

/// Handler for the data-quality report over the user's full metric history
pub async fn data_quality(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<DataQualityReport>> {
    let report = fetch_quality(&state, user_id).await?;
    Ok(Json(report))
}

async fn fetch_quality(state: &AppState, user_id: Uuid) -> AppResult<DataQualityReport> {
    cached!(
        state.cache,
        CacheKey::DataQuality(user_id),
        QUALITY_CACHE_TTL,
        async {
            let metrics = sqlx::query_as::<_, DailyMetric>(
                "SELECT * FROM daily_metrics WHERE user_id = $1 ORDER BY date ASC",
            )
            .bind(user_id)
            .fetch_all(&state.db)
            .await?;

            Ok::<_, AppError>(validation::quality_report(&metrics))
        }
    )
}
