//! Regeneration protocol for a user's recommendation set.
//!
//! One generation run replaces the user's current unrated recommendations
//! with a freshly scored set while preserving every row that carries
//! feedback. The whole run executes inside a single transaction holding a
//! per-user advisory lock, so two concurrent runs for the same user cannot
//! interleave their delete and insert phases.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

use super::feedback::{category_confidence, engagement_score, personalized_confidence};
use super::rules::run_rules;
use super::scorer::ScorerService;
use crate::error::AppResult;
use crate::models::{Candidate, Category, FeatureSet, FeedbackSnapshot, Recommendation, Source};

/// Minimum blended confidence, as a percentage, a candidate must clear to be
/// persisted
const CONFIDENCE_CUTOFF_PCT: f64 = 10.0;

/// Multiplier applied when the user previously rated the category helpful or
/// acted on it
const LIKED_CATEGORY_BOOST: f64 = 1.2;

/// A candidate that survived scoring and is ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRecommendation {
    pub category: Category,
    pub text: String,
    pub rationale: String,
    pub score: f64,
}

/// Categories the user has signalled they like, from rated history
fn liked_categories(snapshots: &[FeedbackSnapshot]) -> HashSet<Category> {
    snapshots
        .iter()
        .filter(|s| s.helpful == Some(true) || s.acted_upon)
        .map(|s| s.category)
        .collect()
}

/// Scores, filters, and orders candidates. Pure apart from the scorer call.
///
/// `previous_texts` is the full pre-deletion snapshot of the user's
/// recommendation texts; a candidate matching one exactly is dropped so the
/// user never sees the same advice twice in a row.
pub fn plan_recommendations(
    candidates: &[Candidate],
    snapshots: &[FeedbackSnapshot],
    previous_texts: &HashSet<String>,
    scorer: &ScorerService,
    features: &FeatureSet,
    now: DateTime<Utc>,
) -> Vec<PlannedRecommendation> {
    let liked = liked_categories(snapshots);
    let engagement = engagement_score(snapshots);

    let mut planned: Vec<PlannedRecommendation> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if previous_texts.contains(&candidate.text) {
            tracing::debug!(category = %candidate.category, "Skipping duplicate candidate");
            continue;
        }

        let prediction = scorer.predict_or_fallback(features, candidate.category);
        let confidence = category_confidence(snapshots, candidate.category, now);
        let mut score = personalized_confidence(prediction.confidence, confidence, engagement);

        if liked.contains(&candidate.category) {
            score = (score * LIKED_CATEGORY_BOOST).min(0.95);
        }

        if score * 100.0 > CONFIDENCE_CUTOFF_PCT {
            planned.push(PlannedRecommendation {
                category: candidate.category,
                text: candidate.text.clone(),
                rationale: prediction.explanation,
                score,
            });
        }
    }

    planned.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    planned
}

/// Runs the full regeneration protocol for one user and returns how many
/// recommendations were created.
///
/// Within one transaction: take the per-user advisory lock, snapshot the
/// existing set (texts and feedback), delete only the unrated rows, run the
/// rules over the precomputed features, score and filter the candidates, and
/// bulk insert the survivors.
pub async fn generate_for_user(
    pool: &PgPool,
    scorer: &ScorerService,
    user_id: Uuid,
    features: &FeatureSet,
) -> AppResult<usize> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    let previous = sqlx::query_as::<_, Recommendation>(
        "SELECT * FROM recommendations WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let snapshots: Vec<FeedbackSnapshot> = previous
        .iter()
        .map(Recommendation::feedback_snapshot)
        .collect();
    let previous_texts: HashSet<String> = previous.iter().map(|r| r.text.clone()).collect();

    let deleted = sqlx::query(
        "DELETE FROM recommendations WHERE user_id = $1 AND feedback_at IS NULL",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let kept = previous.len() as u64 - deleted;

    let candidates = run_rules(features, &mut rand::thread_rng());
    let planned = plan_recommendations(
        &candidates,
        &snapshots,
        &previous_texts,
        scorer,
        features,
        Utc::now(),
    );

    let source = if scorer.is_loaded() { Source::Ml } else { Source::Rule };
    let model_version = scorer.model_version();

    for recommendation in &planned {
        sqlx::query(
            r#"
            INSERT INTO recommendations (user_id, category, text, rationale, source, score, model_version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user_id)
        .bind(recommendation.category.as_str())
        .bind(&recommendation.text)
        .bind(&recommendation.rationale)
        .bind(source.as_str())
        .bind(recommendation.score)
        .bind(model_version)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        %user_id,
        candidates = candidates.len(),
        generated = planned.len(),
        deleted,
        kept_with_feedback = kept,
        source = %source.as_str(),
        model_version,
        "Recommendation set regenerated"
    );

    Ok(planned.len())
}
