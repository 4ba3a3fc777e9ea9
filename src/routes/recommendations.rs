use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{FeatureSet, Recommendation};
use crate::services::feedback::{self, FeedbackRequest, FeedbackResponse};
use crate::services::{compute_features, generate_for_user};

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub generated: usize,
    pub features: FeatureSet,
}

/// Handler for regenerating a user's recommendation set from their current
/// metrics
pub async fn generate(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<GenerateResponse>> {
    let features = compute_features(&state.db, user_id).await?;
    let generated = generate_for_user(&state.db, &state.scorer, user_id, &features).await?;

    Ok(Json(GenerateResponse {
        generated,
        features,
    }))
}

/// Handler for listing a user's recommendations, best scored first
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = sqlx::query_as::<_, Recommendation>(
        r#"
        SELECT * FROM recommendations
        WHERE user_id = $1
        ORDER BY score DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(recommendations))
}

/// Handler for marking a recommendation as seen by the user
pub async fn mark_viewed(
    State(state): State<AppState>,
    Path((user_id, recommendation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Recommendation>> {
    let recommendation = sqlx::query_as::<_, Recommendation>(
        r#"
        UPDATE recommendations
        SET viewed = true, viewed_at = COALESCE(viewed_at, now())
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(recommendation_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("recommendation {recommendation_id}")))?;

    Ok(Json(recommendation))
}

/// Handler for recording helpful / acted-upon feedback on a recommendation
pub async fn feedback(
    State(state): State<AppState>,
    Path((user_id, recommendation_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    let response = feedback::submit_feedback(
        &state.db,
        &state.cache,
        &state.scorer,
        user_id,
        recommendation_id,
        request,
    )
    .await?;

    Ok(Json(response))
}
