use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

pub mod features;

pub use features::{BpCategory, ChannelFeatures, FeatureSet, RollingStats, Trend, TrendDirection};

/// Recommendation category. Closed set, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Activity,
    Nutrition,
    Sleep,
    Lifestyle,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Activity,
        Category::Nutrition,
        Category::Sleep,
        Category::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Activity => "activity",
            Category::Nutrition => "nutrition",
            Category::Sleep => "sleep",
            Category::Lifestyle => "lifestyle",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(Category::Activity),
            "nutrition" => Ok(Category::Nutrition),
            "sleep" => Ok(Category::Sleep),
            "lifestyle" => Ok(Category::Lifestyle),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

/// How a recommendation's score was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Rule,
    Ml,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Rule => "rule",
            Source::Ml => "ml",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown source: {0}")]
pub struct ParseSourceError(String);

impl FromStr for Source {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rule" => Ok(Source::Rule),
            "ml" => Ok(Source::Ml),
            other => Err(ParseSourceError(other.to_string())),
        }
    }
}

/// One health observation per (user, calendar date). Channels are optional;
/// a missing value is excluded from aggregates, never treated as zero.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyMetric {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub steps: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub systolic_bp: Option<i32>,
    pub diastolic_bp: Option<i32>,
}

/// Persisted personalized recommendation.
///
/// Feedback fields (`helpful`, `acted_upon`, `feedback_at`) are written only
/// by the feedback endpoint; a row with non-null `feedback_at` is permanent
/// history and must never be deleted by the generator.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub category: Category,
    pub text: String,
    pub rationale: String,
    pub source: Source,
    pub score: f64,
    pub viewed: bool,
    pub viewed_at: Option<DateTime<Utc>>,
    pub helpful: Option<bool>,
    pub feedback_at: Option<DateTime<Utc>>,
    pub acted_upon: bool,
    pub model_version: String,
    pub experiment_group: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Recommendation {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let category: String = row.try_get("category")?;
        let category = category
            .parse::<Category>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "category".into(),
                source: Box::new(e),
            })?;

        let source: String = row.try_get("source")?;
        let source = source
            .parse::<Source>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "source".into(),
                source: Box::new(e),
            })?;

        Ok(Recommendation {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            category,
            text: row.try_get("text")?,
            rationale: row.try_get("rationale")?,
            source,
            score: row.try_get("score")?,
            viewed: row.try_get("viewed")?,
            viewed_at: row.try_get("viewed_at")?,
            helpful: row.try_get("helpful")?,
            feedback_at: row.try_get("feedback_at")?,
            acted_upon: row.try_get("acted_upon")?,
            model_version: row.try_get("model_version")?,
            experiment_group: row.try_get("experiment_group")?,
        })
    }
}

impl Recommendation {
    /// Projects the fields the feedback-learning layer needs.
    pub fn feedback_snapshot(&self) -> FeedbackSnapshot {
        FeedbackSnapshot {
            category: self.category,
            helpful: self.helpful,
            acted_upon: self.acted_upon,
            viewed: self.viewed,
            feedback_at: self.feedback_at,
        }
    }
}

/// In-memory projection of one recommendation's feedback state.
/// The blender and insights computations operate on slices of these.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackSnapshot {
    pub category: Category,
    pub helpful: Option<bool>,
    pub acted_upon: bool,
    pub viewed: bool,
    pub feedback_at: Option<DateTime<Utc>>,
}

/// Unscored, unpersisted suggestion produced by one rule
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub category: Category,
    pub text: String,
    pub base_rule_score: f64,
}

/// Coarse summary of how well the feedback loop is trained for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStatus {
    New,
    Learning,
    Excellent,
    Good,
    NeedsImprovement,
}
