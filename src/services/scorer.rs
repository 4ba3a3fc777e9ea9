//! Pretrained helpfulness classifier wrapper.
//!
//! The model artifact is a JSON file produced by the offline training
//! pipeline: per-feature standardization parameters plus logistic-regression
//! weights. It is loaded once at startup into an explicitly constructed
//! `ScorerService` that is shared read-only across requests; a missing or
//! broken artifact degrades to rule-only scoring, never a failed request.

use serde::Deserialize;
use std::path::Path;

use crate::models::{Category, FeatureSet};

/// Number of entries in the model's input vector. The order must match the
/// training pipeline exactly.
pub const FEATURE_DIM: usize = 16;

/// Calibrated logistic-regression artifact produced offline
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    /// Per-feature standardization mean
    pub means: Vec<f64>,
    /// Per-feature standardization deviation
    pub stds: Vec<f64>,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

/// Outcome of scoring one (user, category) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub helpful: bool,
    /// Base confidence in [0, 1] before feedback blending
    pub confidence: f64,
    pub explanation: String,
}

/// Scoring failures. Distinct from "no model loaded": these mean a model is
/// present but could not produce a usable answer.
#[derive(thiserror::Error, Debug)]
pub enum ScoreError {
    #[error("model artifact dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite confidence")]
    NonFinite,
}

/// Holds the classifier for the process lifetime. Construct once at startup
/// and pass into the generator; immutable after load.
pub struct ScorerService {
    model: Option<ModelArtifact>,
}

impl ScorerService {
    /// Loads the model artifact from disk. A missing or unparseable file is
    /// logged and leaves the service in rule-only mode.
    pub fn init(model_path: &Path) -> Self {
        let model = match std::fs::read_to_string(model_path) {
            Ok(json) => match serde_json::from_str::<ModelArtifact>(&json) {
                Ok(artifact) => {
                    tracing::info!(
                        version = %artifact.version,
                        path = %model_path.display(),
                        "Helpfulness model loaded"
                    );
                    Some(artifact)
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        path = %model_path.display(),
                        "Failed to parse model artifact, falling back to rule-only scoring"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %model_path.display(),
                    "No trained model found, using rule-only scoring"
                );
                None
            }
        };

        Self { model }
    }

    /// A service with no model, for rule-only operation
    pub fn disabled() -> Self {
        Self { model: None }
    }

    #[cfg(test)]
    fn with_model(model: ModelArtifact) -> Self {
        Self { model: Some(model) }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Version string recorded on generated recommendations
    pub fn model_version(&self) -> &str {
        self.model
            .as_ref()
            .map(|m| m.version.as_str())
            .unwrap_or("rule-only")
    }

    /// Builds the fixed-order input vector from the feature set
    pub fn feature_vector(features: &FeatureSet) -> [f64; FEATURE_DIM] {
        let sleep_trend = if features.sleep.win14.mean > 0.0 {
            features.sleep.win7.mean - features.sleep.win14.mean
        } else {
            0.0
        };
        let steps_trend = if features.steps.win14.mean > 0.0 {
            features.steps.win7.mean - features.steps.win14.mean
        } else {
            0.0
        };

        [
            features.steps.win7.mean,
            features.steps.win7.std,
            features.steps.win14.mean,
            features.sleep.win7.mean,
            features.sleep.win7.std,
            features.sleep.win14.mean,
            features.systolic.win7.mean,
            features.diastolic.win7.mean,
            features.sleep.win7.cv,
            features.steps.win7.cv,
            sleep_trend,
            steps_trend,
            if features.systolic.win7.mean > 130.0 { 1.0 } else { 0.0 },
            if features.steps.win7.mean < 5000.0 { 1.0 } else { 0.0 },
            if features.sleep.win7.mean < 6.0 { 1.0 } else { 0.0 },
            features.data_completeness,
        ]
    }

    /// Scores with the loaded model. `None` means no model is loaded;
    /// `Some(Err(..))` means the model is present but failed.
    fn predict(
        &self,
        features: &FeatureSet,
        category: Category,
    ) -> Option<Result<Prediction, ScoreError>> {
        let model = self.model.as_ref()?;
        Some(self.predict_with(model, features, category))
    }

    fn predict_with(
        &self,
        model: &ModelArtifact,
        features: &FeatureSet,
        category: Category,
    ) -> Result<Prediction, ScoreError> {
        if model.weights.len() != FEATURE_DIM
            || model.means.len() != FEATURE_DIM
            || model.stds.len() != FEATURE_DIM
        {
            return Err(ScoreError::DimensionMismatch {
                expected: FEATURE_DIM,
                actual: model.weights.len(),
            });
        }

        let vector = Self::feature_vector(features);

        let mut z = model.intercept;
        for i in 0..FEATURE_DIM {
            let std = if model.stds[i] > 0.0 { model.stds[i] } else { 1.0 };
            z += model.weights[i] * (vector[i] - model.means[i]) / std;
        }

        let confidence = sigmoid(z);
        if !confidence.is_finite() {
            return Err(ScoreError::NonFinite);
        }

        Ok(Prediction {
            helpful: confidence >= 0.5,
            confidence,
            explanation: build_explanation(features, category, confidence),
        })
    }

    /// Scores a (user, category) pair, degrading to the neutral fallback on
    /// any failure. This is the only entry point the generator uses; it never
    /// errors.
    pub fn predict_or_fallback(&self, features: &FeatureSet, category: Category) -> Prediction {
        match self.predict(features, category) {
            Some(Ok(prediction)) => prediction,
            Some(Err(e)) => {
                tracing::error!(error = %e, category = %category, "Prediction failed, using default");
                Prediction {
                    helpful: true,
                    confidence: 0.5,
                    explanation: "Prediction unavailable, using default".to_string(),
                }
            }
            None => Prediction {
                helpful: true,
                confidence: 0.5,
                explanation: "Using rule-based scoring (no model loaded)".to_string(),
            },
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Templated, human-readable rationale built from which feature thresholds
/// were breached, plus a confidence-band qualifier
fn build_explanation(features: &FeatureSet, category: Category, confidence: f64) -> String {
    let mut parts: Vec<String> = Vec::new();

    if matches!(category, Category::Sleep | Category::Lifestyle) {
        let sleep_avg = features.sleep.win7.mean;
        if sleep_avg > 0.0 && sleep_avg < 6.0 {
            parts.push(format!("Your average sleep is low ({:.1}h)", sleep_avg));
        } else if sleep_avg > 9.0 {
            parts.push(format!("Your sleep looks excessive ({:.1}h)", sleep_avg));
        }

        if features.sleep.win7.cv > 0.3 {
            parts.push("Your sleep schedule is irregular".to_string());
        }
    }

    if matches!(category, Category::Activity | Category::Lifestyle) {
        let steps_avg = features.steps.win7.mean;
        if steps_avg > 0.0 && steps_avg < 5000.0 {
            parts.push(format!(
                "Your activity is low ({} steps/day)",
                steps_avg as i64
            ));
        }

        if features.steps.win14.mean > 0.0
            && features.steps.win7.mean - features.steps.win14.mean < -1000.0
        {
            parts.push("Your activity has been declining recently".to_string());
        }
    }

    if features.systolic.win7.mean > 130.0 {
        parts.push(format!(
            "Elevated blood pressure (SBP {:.0})",
            features.systolic.win7.mean
        ));
    }

    if features.data_completeness < 0.5 {
        parts.push("Limited data, log more metrics for better advice".to_string());
    }

    if confidence > 0.8 {
        parts.push(format!("Strongly personalized for you ({:.0}%)", confidence * 100.0));
    } else if confidence > 0.6 {
        parts.push(format!("Personalized to your profile ({:.0}%)", confidence * 100.0));
    }

    if parts.is_empty() {
        "Recommendation based on your health data".to_string()
    } else {
        parts.join(" • ")
    }
}
