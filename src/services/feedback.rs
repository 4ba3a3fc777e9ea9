//! Feedback-learning layer.
//!
//! Blends explicit user feedback (helpful ratings, acted-upon flags, views)
//! into per-category confidence adjustments and an engagement score. All the
//! math lives in pure functions over `FeedbackSnapshot` slices so it can be
//! tested without a database; the service functions at the bottom do the
//! persistence.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::features::compute_features;
use super::scorer::ScorerService;
use crate::db::{Cache, CacheKey};
use crate::error::{AppError, AppResult};
use crate::models::{Category, FeedbackSnapshot, LearningStatus, Recommendation};

/// Starting confidence for a category the user has never rated
const PRIOR_CONFIDENCE: f64 = 0.40;

/// Feedback newer than this counts as "recent" and is weighted in
const RECENCY_WINDOW_DAYS: i64 = 30;

/// Seconds the cached insights summary stays fresh
pub const INSIGHTS_CACHE_TTL: u64 = 60;

/// Per-category learned confidence in [0.1, 1.0].
///
/// With no rated recommendations in the category the prior of 0.40 applies.
/// Otherwise the helpful rate and action rate are blended 60/40, recent
/// feedback (last 30 days) is folded in at 30% weight, and a category where
/// the user acts on more than half of rated items earns a 0.1 bonus.
pub fn category_confidence(
    snapshots: &[FeedbackSnapshot],
    category: Category,
    now: DateTime<Utc>,
) -> f64 {
    let rated: Vec<&FeedbackSnapshot> = snapshots
        .iter()
        .filter(|s| s.category == category && s.helpful.is_some())
        .collect();

    if rated.is_empty() {
        return PRIOR_CONFIDENCE;
    }

    let total = rated.len() as f64;
    let helpful_rate = rated.iter().filter(|s| s.helpful == Some(true)).count() as f64 / total;
    let action_rate = rated.iter().filter(|s| s.acted_upon).count() as f64 / total;

    let mut confidence = helpful_rate * 0.6 + action_rate * 0.4;

    let cutoff = now - Duration::days(RECENCY_WINDOW_DAYS);
    let recent: Vec<&&FeedbackSnapshot> = rated
        .iter()
        .filter(|s| s.feedback_at.map(|at| at > cutoff).unwrap_or(false))
        .collect();

    if !recent.is_empty() {
        let recent_helpful_rate =
            recent.iter().filter(|s| s.helpful == Some(true)).count() as f64 / recent.len() as f64;
        confidence = confidence * 0.7 + recent_helpful_rate * 0.3;
    }

    confidence = confidence.clamp(0.1, 1.0);

    if action_rate > 0.5 {
        confidence = (confidence + 0.1).min(1.0);
    }

    confidence
}

/// Overall engagement in [0, 1]: how much the user interacts with
/// recommendations at all. Neutral 0.5 when they have none.
pub fn engagement_score(snapshots: &[FeedbackSnapshot]) -> f64 {
    if snapshots.is_empty() {
        return 0.5;
    }

    let total = snapshots.len() as f64;
    let view_rate = snapshots.iter().filter(|s| s.viewed).count() as f64 / total;
    let feedback_rate = snapshots.iter().filter(|s| s.helpful.is_some()).count() as f64 / total;
    let action_rate = snapshots.iter().filter(|s| s.acted_upon).count() as f64 / total;

    view_rate * 0.3 + feedback_rate * 0.4 + action_rate * 0.3
}

/// Final blended score: the base score nudged by how much this user trusts
/// the category, scaled by engagement. Always lands in [0.10, 0.95].
pub fn personalized_confidence(base: f64, category_conf: f64, engagement: f64) -> f64 {
    (base + category_conf * engagement * 0.25).clamp(0.10, 0.95)
}

/// Aggregate feedback summary returned by the insights endpoint and cached
/// in Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackInsights {
    pub total_recommendations: usize,
    pub viewed_count: usize,
    pub feedback_count: usize,
    pub helpful_count: usize,
    /// Percentage in [0, 100]
    pub helpful_rate: f64,
    /// Percentage in [0, 100]
    pub action_rate: f64,
    pub favorite_category: Option<Category>,
    pub category_confidence: HashMap<Category, f64>,
    pub engagement_score: f64,
    pub learning_status: LearningStatus,
}

/// Computes the insights summary from a user's full recommendation history
pub fn feedback_insights(snapshots: &[FeedbackSnapshot], now: DateTime<Utc>) -> FeedbackInsights {
    let total = snapshots.len();
    let viewed_count = snapshots.iter().filter(|s| s.viewed).count();
    let feedback_count = snapshots.iter().filter(|s| s.helpful.is_some()).count();
    let helpful_count = snapshots.iter().filter(|s| s.helpful == Some(true)).count();
    let acted_count = snapshots.iter().filter(|s| s.acted_upon).count();

    // Both rates are over rated rows, not the full recommendation set
    let helpful_rate = if feedback_count > 0 {
        helpful_count as f64 / feedback_count as f64 * 100.0
    } else {
        0.0
    };
    let action_rate = if feedback_count > 0 {
        acted_count as f64 / feedback_count as f64 * 100.0
    } else {
        0.0
    };

    let favorite_category = Category::ALL
        .iter()
        .map(|&c| {
            let helpful = snapshots
                .iter()
                .filter(|s| s.category == c && s.helpful == Some(true))
                .count();
            (c, helpful)
        })
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(c, _)| c);

    let confidences = Category::ALL
        .iter()
        .map(|&c| (c, category_confidence(snapshots, c, now)))
        .collect();

    let learning_status = if feedback_count == 0 {
        LearningStatus::New
    } else if feedback_count < 5 {
        LearningStatus::Learning
    } else if helpful_rate >= 70.0 {
        LearningStatus::Excellent
    } else if helpful_rate >= 50.0 {
        LearningStatus::Good
    } else {
        LearningStatus::NeedsImprovement
    };

    FeedbackInsights {
        total_recommendations: total,
        viewed_count,
        feedback_count,
        helpful_count,
        helpful_rate,
        action_rate,
        favorite_category,
        category_confidence: confidences,
        engagement_score: engagement_score(snapshots),
        learning_status,
    }
}

/// Body of the feedback submission endpoint
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub helpful: bool,
    #[serde(default)]
    pub acted_upon: bool,
}

/// Response after recording feedback
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub recommendation_id: Uuid,
    pub category: Category,
    /// Recomputed blended confidence for the rated category, raw in [0.10, 0.95]
    pub personalized_confidence: f64,
    /// Same value as a percentage for display
    pub personalized_confidence_pct: f64,
    pub learning_status: LearningStatus,
}

/// Loads all of a user's recommendations projected to feedback snapshots
pub async fn load_snapshots(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<FeedbackSnapshot>> {
    let recommendations = sqlx::query_as::<_, Recommendation>(
        "SELECT * FROM recommendations WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(recommendations
        .iter()
        .map(Recommendation::feedback_snapshot)
        .collect())
}

/// Records feedback on one recommendation, recomputes the blended confidence
/// for that (user, category), and propagates the new score to every one of
/// the user's recommendations in the category so displayed confidence stays
/// internally consistent.
///
/// The write-through at the end refreshes the cached insights entry so the
/// next insights read reflects this rating.
pub async fn submit_feedback(
    pool: &PgPool,
    cache: &Cache,
    scorer: &ScorerService,
    user_id: Uuid,
    recommendation_id: Uuid,
    request: FeedbackRequest,
) -> AppResult<FeedbackResponse> {
    let category: String = sqlx::query_scalar(
        r#"
        UPDATE recommendations
        SET helpful = $3, acted_upon = $4, feedback_at = now(), viewed = true
        WHERE id = $1 AND user_id = $2
        RETURNING category
        "#,
    )
    .bind(recommendation_id)
    .bind(user_id)
    .bind(request.helpful)
    .bind(request.acted_upon)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("recommendation {recommendation_id}")))?;

    let category = category
        .parse::<Category>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let now = Utc::now();
    let snapshots = load_snapshots(pool, user_id).await?;
    let confidence = category_confidence(&snapshots, category, now);
    let engagement = engagement_score(&snapshots);

    let features = compute_features(pool, user_id).await?;
    let base = scorer.predict_or_fallback(&features, category).confidence;
    let personalized = personalized_confidence(base, confidence, engagement);

    let updated = sqlx::query(
        "UPDATE recommendations SET score = $3 WHERE user_id = $1 AND category = $2",
    )
    .bind(user_id)
    .bind(category.as_str())
    .bind(personalized)
    .execute(pool)
    .await?
    .rows_affected();

    tracing::info!(
        %user_id,
        %recommendation_id,
        category = %category,
        helpful = request.helpful,
        acted_upon = request.acted_upon,
        confidence,
        personalized,
        propagated = updated,
        "Feedback recorded"
    );

    let insights = feedback_insights(&snapshots, now);
    cache.set_in_background(
        &CacheKey::FeedbackInsights(user_id),
        &insights,
        INSIGHTS_CACHE_TTL,
    );

    Ok(FeedbackResponse {
        recommendation_id,
        category,
        personalized_confidence: personalized,
        personalized_confidence_pct: personalized * 100.0,
        learning_status: insights.learning_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        category: Category,
        helpful: Option<bool>,
        acted_upon: bool,
        viewed: bool,
        days_ago: Option<i64>,
    ) -> FeedbackSnapshot {
        FeedbackSnapshot {
            category,
            helpful,
            acted_upon,
            viewed,
            feedback_at: days_ago.map(|d| Utc::now() - Duration::days(d)),
        }
    }

    #[test]
    fn test_unrated_category_gets_prior() {
        let snapshots = vec![snapshot(Category::Sleep, None, false, true, None)];
        let confidence = category_confidence(&snapshots, Category::Sleep, Utc::now());
        assert_eq!(confidence, PRIOR_CONFIDENCE);

        // No history at all: still the prior
        assert_eq!(category_confidence(&[], Category::Activity, Utc::now()), PRIOR_CONFIDENCE);
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let all_negative: Vec<_> = (0..20)
            .map(|_| snapshot(Category::Sleep, Some(false), false, true, Some(2)))
            .collect();
        let low = category_confidence(&all_negative, Category::Sleep, Utc::now());
        assert!(low >= 0.1);

        let all_positive: Vec<_> = (0..20)
            .map(|_| snapshot(Category::Sleep, Some(true), true, true, Some(2)))
            .collect();
        let high = category_confidence(&all_positive, Category::Sleep, Utc::now());
        assert!(high <= 1.0);
        assert!(high > 0.9);
    }

    #[test]
    fn test_confidence_climbs_with_positive_feedback() {
        let now = Utc::now();
        let mut snapshots = Vec::new();
        let mut previous = category_confidence(&snapshots, Category::Activity, now);

        for _ in 0..5 {
            snapshots.push(snapshot(Category::Activity, Some(true), true, true, Some(1)));
            let current = category_confidence(&snapshots, Category::Activity, now);
            assert!(current >= previous);
            previous = current;
        }
        assert!(previous > PRIOR_CONFIDENCE);
    }

    #[test]
    fn test_old_feedback_not_weighted_as_recent() {
        let now = Utc::now();
        // Identical ratings, one set recent and one stale. Mixed helpfulness
        // so the recency blend actually changes the value.
        let recent = vec![
            snapshot(Category::Sleep, Some(true), false, true, Some(5)),
            snapshot(Category::Sleep, Some(false), false, true, Some(60)),
        ];
        let stale = vec![
            snapshot(Category::Sleep, Some(true), false, true, Some(60)),
            snapshot(Category::Sleep, Some(false), false, true, Some(5)),
        ];

        let with_recent_positive = category_confidence(&recent, Category::Sleep, now);
        let with_recent_negative = category_confidence(&stale, Category::Sleep, now);
        assert!(with_recent_positive > with_recent_negative);
    }

    #[test]
    fn test_action_rate_bonus() {
        // Helpful but never acted upon
        let passive: Vec<_> = (0..4)
            .map(|_| snapshot(Category::Nutrition, Some(true), false, true, Some(3)))
            .collect();
        // Same ratings, all acted upon
        let active: Vec<_> = (0..4)
            .map(|_| snapshot(Category::Nutrition, Some(true), true, true, Some(3)))
            .collect();

        let passive_conf = category_confidence(&passive, Category::Nutrition, Utc::now());
        let active_conf = category_confidence(&active, Category::Nutrition, Utc::now());
        assert!(active_conf > passive_conf);
    }

    #[test]
    fn test_engagement_neutral_without_history() {
        assert_eq!(engagement_score(&[]), 0.5);
    }

    #[test]
    fn test_engagement_weights() {
        // 4 recommendations: all viewed, 2 rated, 1 acted upon
        let snapshots = vec![
            snapshot(Category::Sleep, Some(true), true, true, Some(1)),
            snapshot(Category::Sleep, Some(false), false, true, Some(1)),
            snapshot(Category::Activity, None, false, true, None),
            snapshot(Category::Activity, None, false, true, None),
        ];
        let score = engagement_score(&snapshots);
        let expected = 1.0 * 0.3 + 0.5 * 0.4 + 0.25 * 0.3;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_personalized_confidence_bounds() {
        assert_eq!(personalized_confidence(0.99, 1.0, 1.0), 0.95);
        assert_eq!(personalized_confidence(0.0, 0.0, 0.0), 0.10);

        let mid = personalized_confidence(0.6, 0.8, 0.5);
        assert!((mid - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_personalized_confidence_monotonic_in_category_conf() {
        let low = personalized_confidence(0.5, 0.2, 0.6);
        let high = personalized_confidence(0.5, 0.9, 0.6);
        assert!(high > low);
    }

    #[test]
    fn test_insights_learning_statuses() {
        let now = Utc::now();

        assert_eq!(feedback_insights(&[], now).learning_status, LearningStatus::New);

        // Delivered but never rated still counts as a new learner
        let unrated = vec![
            snapshot(Category::Sleep, None, false, true, None),
            snapshot(Category::Activity, None, false, false, None),
        ];
        assert_eq!(
            feedback_insights(&unrated, now).learning_status,
            LearningStatus::New
        );

        let few = vec![snapshot(Category::Sleep, Some(true), false, true, Some(1))];
        assert_eq!(feedback_insights(&few, now).learning_status, LearningStatus::Learning);

        let mostly_helpful: Vec<_> = (0..10)
            .map(|i| snapshot(Category::Sleep, Some(i < 8), false, true, Some(1)))
            .collect();
        assert_eq!(
            feedback_insights(&mostly_helpful, now).learning_status,
            LearningStatus::Excellent
        );

        let half_helpful: Vec<_> = (0..10)
            .map(|i| snapshot(Category::Sleep, Some(i < 5), false, true, Some(1)))
            .collect();
        assert_eq!(
            feedback_insights(&half_helpful, now).learning_status,
            LearningStatus::Good
        );

        let unhelpful: Vec<_> = (0..10)
            .map(|i| snapshot(Category::Sleep, Some(i < 2), false, true, Some(1)))
            .collect();
        assert_eq!(
            feedback_insights(&unhelpful, now).learning_status,
            LearningStatus::NeedsImprovement
        );
    }

    #[test]
    fn test_insights_rates_and_favorite() {
        let now = Utc::now();
        let snapshots = vec![
            snapshot(Category::Sleep, Some(true), true, true, Some(1)),
            snapshot(Category::Sleep, Some(true), false, true, Some(1)),
            snapshot(Category::Activity, Some(false), false, true, Some(1)),
            snapshot(Category::Nutrition, None, false, false, None),
        ];

        let insights = feedback_insights(&snapshots, now);
        assert_eq!(insights.total_recommendations, 4);
        assert_eq!(insights.viewed_count, 3);
        assert_eq!(insights.feedback_count, 3);
        assert_eq!(insights.helpful_count, 2);
        assert!((insights.helpful_rate - 2.0 / 3.0 * 100.0).abs() < 1e-9);
        assert!((insights.action_rate - 1.0 / 3.0 * 100.0).abs() < 1e-9);
        assert_eq!(insights.favorite_category, Some(Category::Sleep));
        assert_eq!(insights.category_confidence.len(), 4);
    }

    #[test]
    fn test_insights_no_favorite_without_helpful_ratings() {
        let snapshots = vec![
            snapshot(Category::Sleep, Some(false), false, true, Some(1)),
            snapshot(Category::Activity, None, false, false, None),
        ];
        let insights = feedback_insights(&snapshots, Utc::now());
        assert_eq!(insights.favorite_category, None);
    }

    #[test]
    fn test_insights_serde_round_trip() {
        let insights = feedback_insights(
            &[snapshot(Category::Sleep, Some(true), true, true, Some(1))],
            Utc::now(),
        );
        let json = serde_json::to_string(&insights).unwrap();
        let parsed: FeedbackInsights = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_recommendations, 1);
        assert_eq!(parsed.learning_status, LearningStatus::Learning);
    }
}
