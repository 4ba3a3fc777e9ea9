//! Deterministic rule engine proposing candidate recommendations.
//!
//! Each rule is a pure predicate over the feature set returning a
//! `RuleMatch`; text variant selection is a separate rendering step so the
//! firing logic stays fully deterministic and testable. Conditional "low
//! value" triggers are gated on `value > 0` so the zero defaults from an
//! empty metrics window never fire them.

use rand::seq::SliceRandom;
use rand::Rng;

use super::variants;
use crate::models::{Candidate, Category, FeatureSet};

/// Where a rule's text comes from: a single canonical string or a pool of
/// pre-authored variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextChoice {
    Fixed(&'static str),
    Pool(&'static [&'static str]),
}

/// A rule that fired: category, base score, and the texts it may render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch {
    pub name: &'static str,
    pub category: Category,
    pub base_score: f64,
    pub texts: TextChoice,
}

type RuleFn = fn(&FeatureSet) -> Option<RuleMatch>;

fn bp_critical(features: &FeatureSet) -> Option<RuleMatch> {
    if features.latest_sbp >= 180.0 || features.latest_dbp >= 120.0 {
        Some(RuleMatch {
            name: "bp_critical",
            category: Category::Lifestyle,
            base_score: 1.0,
            texts: TextChoice::Fixed(variants::BP_CRITICAL_TEXT),
        })
    } else {
        None
    }
}

fn bp_high(features: &FeatureSet) -> Option<RuleMatch> {
    // Exclusive band: the crisis rule owns readings at or above 180/120
    if bp_critical(features).is_some() {
        return None;
    }
    if features.latest_sbp >= 140.0 || features.latest_dbp >= 90.0 {
        Some(RuleMatch {
            name: "bp_high",
            category: Category::Lifestyle,
            base_score: 0.85,
            texts: TextChoice::Pool(variants::BP_HIGH_VARIANTS),
        })
    } else {
        None
    }
}

fn bp_moderate(features: &FeatureSet) -> Option<RuleMatch> {
    if features.latest_sbp >= 140.0 || features.latest_dbp >= 90.0 {
        return None;
    }
    if features.latest_sbp >= 130.0 || features.latest_dbp >= 80.0 {
        Some(RuleMatch {
            name: "bp_moderate",
            category: Category::Lifestyle,
            base_score: 0.7,
            texts: TextChoice::Pool(variants::BP_MODERATE_VARIANTS),
        })
    } else {
        None
    }
}

fn sleep_short(features: &FeatureSet) -> Option<RuleMatch> {
    let sleep_avg = features.sleep_7d_avg();
    if sleep_avg > 0.0 && sleep_avg < 6.0 {
        Some(RuleMatch {
            name: "sleep_short",
            category: Category::Sleep,
            base_score: 0.6,
            texts: TextChoice::Pool(variants::SLEEP_VARIANTS),
        })
    } else {
        None
    }
}

fn regular_schedule(features: &FeatureSet) -> Option<RuleMatch> {
    let sleep_avg = features.sleep_7d_avg();
    if sleep_avg > 0.0 && sleep_avg < 7.0 {
        Some(RuleMatch {
            name: "regular_schedule",
            category: Category::Sleep,
            base_score: 0.5,
            texts: TextChoice::Pool(variants::SCHEDULE_VARIANTS),
        })
    } else {
        None
    }
}

fn morning_sunlight(features: &FeatureSet) -> Option<RuleMatch> {
    let sleep_avg = features.sleep_7d_avg();
    if sleep_avg > 0.0 && sleep_avg < 7.0 {
        Some(RuleMatch {
            name: "morning_sunlight",
            category: Category::Sleep,
            base_score: 0.45,
            texts: TextChoice::Pool(variants::MORNING_SUNLIGHT_VARIANTS),
        })
    } else {
        None
    }
}

fn steps_low(features: &FeatureSet) -> Option<RuleMatch> {
    let steps_avg = features.steps_7d_avg();
    if steps_avg > 0.0 && steps_avg < 5000.0 {
        Some(RuleMatch {
            name: "steps_low",
            category: Category::Activity,
            base_score: 0.55,
            texts: TextChoice::Pool(variants::ACTIVITY_VARIANTS),
        })
    } else {
        None
    }
}

fn standing_breaks(features: &FeatureSet) -> Option<RuleMatch> {
    let steps_avg = features.steps_7d_avg();
    if steps_avg > 0.0 && steps_avg < 8000.0 {
        Some(RuleMatch {
            name: "standing_breaks",
            category: Category::Activity,
            base_score: 0.45,
            texts: TextChoice::Pool(variants::STANDING_BREAKS_VARIANTS),
        })
    } else {
        None
    }
}

fn stress_management(features: &FeatureSet) -> Option<RuleMatch> {
    // Poor sleep often correlates with stress
    let sleep_avg = features.sleep_7d_avg();
    if sleep_avg > 0.0 && sleep_avg < 7.0 {
        Some(RuleMatch {
            name: "stress_management",
            category: Category::Lifestyle,
            base_score: 0.5,
            texts: TextChoice::Pool(variants::STRESS_VARIANTS),
        })
    } else {
        None
    }
}

fn hydration_reminder(features: &FeatureSet) -> Option<RuleMatch> {
    // Any recorded activity at all warrants the reminder
    if features.steps_7d_avg() > 0.0 {
        Some(RuleMatch {
            name: "hydration_reminder",
            category: Category::Nutrition,
            base_score: 0.4,
            texts: TextChoice::Pool(variants::HYDRATION_VARIANTS),
        })
    } else {
        None
    }
}

fn balanced_meals(_features: &FeatureSet) -> Option<RuleMatch> {
    // Unconditional: generic nutrition advice applies to everyone
    Some(RuleMatch {
        name: "balanced_meals",
        category: Category::Nutrition,
        base_score: 0.4,
        texts: TextChoice::Pool(variants::NUTRITION_VARIANTS),
    })
}

fn sleep_good(features: &FeatureSet) -> Option<RuleMatch> {
    if features.sleep_7d_avg() >= 7.0 {
        Some(RuleMatch {
            name: "sleep_good",
            category: Category::Sleep,
            base_score: 0.3,
            texts: TextChoice::Fixed(variants::SLEEP_GOOD_TEXT),
        })
    } else {
        None
    }
}

fn steps_good(features: &FeatureSet) -> Option<RuleMatch> {
    if features.steps_7d_avg() >= 8000.0 {
        Some(RuleMatch {
            name: "steps_good",
            category: Category::Activity,
            base_score: 0.3,
            texts: TextChoice::Fixed(variants::STEPS_GOOD_TEXT),
        })
    } else {
        None
    }
}

/// The rule list, highest priority first. Ordering is for readability only:
/// every matching rule contributes a candidate.
pub fn rules() -> &'static [RuleFn] {
    &[
        bp_critical,       // Hypertensive crisis (180/120+)
        bp_high,           // Stage 2 hypertension (140/90+)
        bp_moderate,       // Stage 1 hypertension (130/80+)
        sleep_short,       // Poor sleep
        regular_schedule,  // Sleep schedule
        morning_sunlight,  // Circadian rhythm
        steps_low,         // Low activity
        standing_breaks,   // Movement breaks
        stress_management, // Stress reduction
        hydration_reminder,
        balanced_meals,
        sleep_good, // Positive reinforcement
        steps_good, // Positive reinforcement
    ]
}

/// Evaluates every rule against the features (pure, no randomness)
pub fn evaluate(features: &FeatureSet) -> Vec<RuleMatch> {
    rules().iter().filter_map(|rule| rule(features)).collect()
}

/// Renders a match into a candidate, picking a text variant at random.
/// Randomness only affects which phrasing is chosen, never whether the rule
/// fired.
pub fn render<R: Rng>(matched: &RuleMatch, rng: &mut R) -> Candidate {
    let text = match matched.texts {
        TextChoice::Fixed(text) => text,
        TextChoice::Pool(pool) => pool.choose(rng).copied().unwrap_or_default(),
    };

    Candidate {
        category: matched.category,
        text: text.to_string(),
        base_rule_score: matched.base_score,
    }
}

/// Runs the full engine: evaluate then render each match
pub fn run_rules<R: Rng>(features: &FeatureSet, rng: &mut R) -> Vec<Candidate> {
    evaluate(features)
        .iter()
        .map(|matched| render(matched, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn features_with(steps_avg: f64, sleep_avg: f64, sbp: f64, dbp: f64) -> FeatureSet {
        let mut features = FeatureSet::default();
        features.steps.win7.mean = steps_avg;
        features.sleep.win7.mean = sleep_avg;
        features.latest_sbp = sbp;
        features.latest_dbp = dbp;
        features
    }

    fn fired(features: &FeatureSet) -> Vec<&'static str> {
        evaluate(features).iter().map(|m| m.name).collect()
    }

    #[test]
    fn test_empty_features_fire_only_unconditional_rule() {
        // Zero defaults from an empty window must not trip any "low value"
        // trigger; only the unconditional nutrition rule remains.
        let matches = evaluate(&FeatureSet::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "balanced_meals");
    }

    #[test]
    fn test_critical_bp_fires_with_canonical_text() {
        let features = features_with(0.0, 0.0, 185.0, 125.0);
        let names = fired(&features);
        assert!(names.contains(&"bp_critical"));

        let matched = evaluate(&features)
            .into_iter()
            .find(|m| m.name == "bp_critical")
            .unwrap();
        assert_eq!(matched.category, Category::Lifestyle);
        assert_eq!(matched.base_score, 1.0);
        assert_eq!(
            matched.texts,
            TextChoice::Fixed(variants::BP_CRITICAL_TEXT)
        );

        // The crisis reading yields exactly one lifestyle candidate
        let lifestyle: Vec<_> = evaluate(&features)
            .into_iter()
            .filter(|m| m.category == Category::Lifestyle)
            .collect();
        assert_eq!(lifestyle.len(), 1);
    }

    #[test]
    fn test_bp_bands_are_mutually_exclusive() {
        for sbp in [125.0, 132.0, 145.0, 185.0] {
            let names = fired(&features_with(0.0, 0.0, sbp, 0.0));
            let bp_count = names
                .iter()
                .filter(|n| n.starts_with("bp_"))
                .count();
            assert!(bp_count <= 1, "multiple bp rules fired at sbp={}", sbp);
        }
    }

    #[test]
    fn test_bp_thresholds_are_exact() {
        // 140/90 fires high, 139/89 does not
        assert!(fired(&features_with(0.0, 0.0, 140.0, 0.0)).contains(&"bp_high"));
        assert!(fired(&features_with(0.0, 0.0, 0.0, 90.0)).contains(&"bp_high"));
        assert!(!fired(&features_with(0.0, 0.0, 139.0, 89.0)).contains(&"bp_high"));

        // 130/80 fires moderate
        assert!(fired(&features_with(0.0, 0.0, 130.0, 0.0)).contains(&"bp_moderate"));
        assert!(!fired(&features_with(0.0, 0.0, 129.0, 79.0)).contains(&"bp_moderate"));
    }

    #[test]
    fn test_low_sleep_scenario() {
        // 5.5h sleep, 6000 steps: sleep rules fire, neither step threshold does
        let features = features_with(6000.0, 5.5, 0.0, 0.0);
        let names = fired(&features);

        assert!(names.contains(&"sleep_short"));
        assert!(names.contains(&"regular_schedule"));
        assert!(names.contains(&"morning_sunlight"));
        assert!(names.contains(&"stress_management"));
        assert!(!names.contains(&"steps_low"));
        assert!(!names.contains(&"steps_good"));
    }

    #[test]
    fn test_sleep_short_and_good_are_mutually_exclusive() {
        for sleep_avg in [4.0, 5.9, 6.0, 6.9, 7.0, 8.5] {
            let names = fired(&features_with(0.0, sleep_avg, 0.0, 0.0));
            let short = names.contains(&"sleep_short");
            let good = names.contains(&"sleep_good");
            assert!(!(short && good), "both fired at sleep_avg={}", sleep_avg);
        }
    }

    #[test]
    fn test_steps_between_thresholds_fires_neither_extreme() {
        let names = fired(&features_with(6500.0, 8.0, 0.0, 0.0));
        assert!(!names.contains(&"steps_low"));
        assert!(!names.contains(&"steps_good"));
        // Still below the standing-breaks secondary threshold
        assert!(names.contains(&"standing_breaks"));
    }

    #[test]
    fn test_good_habits_positive_reinforcement() {
        let names = fired(&features_with(9000.0, 7.5, 115.0, 75.0));
        assert!(names.contains(&"sleep_good"));
        assert!(names.contains(&"steps_good"));
        assert!(!names.contains(&"standing_breaks"));
        assert!(!names.contains(&"stress_management"));
    }

    #[test]
    fn test_each_rule_yields_at_most_one_candidate() {
        let features = features_with(3000.0, 5.0, 190.0, 125.0);
        let matches = evaluate(&features);
        let mut names: Vec<_> = matches.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), matches.len());
    }

    #[test]
    fn test_render_picks_from_pool() {
        let features = features_with(3000.0, 8.0, 0.0, 0.0);
        let matched = evaluate(&features)
            .into_iter()
            .find(|m| m.name == "steps_low")
            .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let candidate = render(&matched, &mut rng);
        assert!(variants::ACTIVITY_VARIANTS.contains(&candidate.text.as_str()));
        assert_eq!(candidate.category, Category::Activity);
        assert_eq!(candidate.base_rule_score, 0.55);
    }

    #[test]
    fn test_randomness_never_changes_what_fires() {
        let features = features_with(3000.0, 5.0, 145.0, 95.0);
        let names_a: Vec<_> = run_rules(&features, &mut StdRng::seed_from_u64(1))
            .iter()
            .map(|c| c.category)
            .collect();
        let names_b: Vec<_> = run_rules(&features, &mut StdRng::seed_from_u64(999))
            .iter()
            .map(|c| c.category)
            .collect();
        assert_eq!(names_a, names_b);
    }
}
