use serde::Serialize;

/// Aggregate statistics for one metric channel over one rolling window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct RollingStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
    /// Coefficient of variation (std / mean, 0.0 when mean is 0)
    pub cv: f64,
    /// Number of non-null samples in the window
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    #[default]
    InsufficientData,
}

/// Ordinary-least-squares trend over a time-indexed series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Trend {
    pub direction: TrendDirection,
    pub slope: f64,
    /// R² of the fit, clamped to [0, 1]
    pub strength: f64,
}

/// Derived features for one metric channel (steps, sleep, systolic, diastolic)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelFeatures {
    pub win7: RollingStats,
    pub win14: RollingStats,
    pub win30: RollingStats,
    pub trend: Trend,
    /// exp(-cv) over the full window; 0.5 neutral with fewer than 2 samples
    pub consistency: f64,
    pub weekday_avg: Option<f64>,
    pub weekend_avg: Option<f64>,
    pub weekend_weekday_diff: Option<f64>,
}

impl Default for ChannelFeatures {
    fn default() -> Self {
        Self {
            win7: RollingStats::default(),
            win14: RollingStats::default(),
            win30: RollingStats::default(),
            trend: Trend::default(),
            consistency: 0.5,
            weekday_avg: None,
            weekend_avg: None,
            weekend_weekday_diff: None,
        }
    }
}

/// Blood pressure classification following standard clinical guidelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BpCategory {
    Normal,
    Elevated,
    Stage1Hypertension,
    Stage2Hypertension,
    HypertensiveCrisis,
}

/// Ephemeral, per-request feature set computed fresh on every generation
/// cycle from the user's recent daily metrics. Never persisted.
///
/// With zero metrics in the window every aggregate is 0.0; rules gate their
/// "low value" triggers on `> 0` so the zero default never fires them.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FeatureSet {
    /// Distinct days with at least one observation in the 30-day window
    pub data_days: usize,
    pub steps: ChannelFeatures,
    pub sleep: ChannelFeatures,
    pub systolic: ChannelFeatures,
    pub diastolic: ChannelFeatures,
    /// Most recent systolic reading, 0.0 when none exists
    pub latest_sbp: f64,
    /// Most recent diastolic reading, 0.0 when none exists
    pub latest_dbp: f64,
    pub bp_category: Option<BpCategory>,
    /// Days in the last 7 with sleep below 7.0 hours
    pub sleep_deficit_days: usize,
    /// Days in the last 7 with sleep above 9.0 hours
    pub sleep_excess_days: usize,
    /// (sleep 7d samples + steps 7d samples) / 14
    pub data_completeness: f64,
}

impl FeatureSet {
    /// 7-day average sleep hours (0.0 with no data)
    pub fn sleep_7d_avg(&self) -> f64 {
        self.sleep.win7.mean
    }

    /// 7-day average step count (0.0 with no data)
    pub fn steps_7d_avg(&self) -> f64 {
        self.steps.win7.mean
    }
}
