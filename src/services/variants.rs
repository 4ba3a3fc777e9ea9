//! Pre-authored recommendation text pools.
//!
//! Each health condition has several phrasings so repeated generation cycles
//! don't show the user the same sentence verbatim. Which variant is rendered
//! is random; whether a rule fires never is.

/// Canonical safety text for a hypertensive-crisis reading. Single fixed
/// string, never varied.
pub const BP_CRITICAL_TEXT: &str =
    "Your blood pressure is very high. Consult a healthcare professional immediately.";

/// Positive reinforcement for good sleep habits
pub const SLEEP_GOOD_TEXT: &str =
    "Well done! You are maintaining good sleep habits. Keep it up.";

/// Positive reinforcement for good activity levels
pub const STEPS_GOOD_TEXT: &str =
    "Excellent activity level! You are reaching the recommended daily targets.";

pub const SLEEP_VARIANTS: &[&str] = &[
    "Try avoiding screens for an hour before bed to improve your sleep quality.",
    "Build a relaxing bedtime routine: 20 minutes of reading, meditation, or quiet music.",
    "Keep your bedroom cool (18-20°C) and dark to encourage restorative sleep.",
    "Avoid caffeine after 3pm and alcohol within 3 hours of bedtime for better sleep.",
    "Try the 4-7-8 technique: inhale 4s, hold 7s, exhale 8s to fall asleep faster.",
];

pub const ACTIVITY_VARIANTS: &[&str] = &[
    "Take a 10-15 minute walk after lunch to raise your daily activity.",
    "Take the stairs instead of the elevator: 3 flights burns about 30 calories.",
    "Try desk stretches: 5 minutes of mobility work every 2 hours at the office.",
    "Dance to 3 favourite songs a day: fun and solid cardio (around 150 calories).",
    "Walk during phone calls: 30 minutes of calls can become 2000 steps.",
    "Take an active break: 10 squats and 10 wall push-ups every hour.",
];

pub const BP_HIGH_VARIANTS: &[&str] = &[
    "Your blood pressure is elevated. Cut back on salt, manage stress, and see your doctor.",
    "High blood pressure detected. Try 10 minutes of deep breathing a day and keep salt under 5g.",
    "Hypertension noted. Favour fruit, vegetables, and oily fish rich in omega-3.",
    "Elevated pressure: walk 30 minutes a day, avoid alcohol, and arrange a medical follow-up.",
    "Your blood pressure needs attention: reduce stress, sleep 7-8 hours, and eat less salt.",
];

pub const BP_MODERATE_VARIANTS: &[&str] = &[
    "Your blood pressure is starting to rise. Monitor it regularly and keep healthy habits.",
    "Rising blood pressure: aim for 150 minutes of moderate activity a week and eat less salt.",
    "Blood pressure worth watching: consider the DASH diet (fruit, vegetables, whole grains).",
    "Pre-hypertensive reading: limit coffee, drink more water, and manage your stress.",
    "Slightly elevated pressure detected: losing 2-3 kg if overweight helps considerably.",
];

pub const STRESS_VARIANTS: &[&str] = &[
    "Try relaxation techniques such as meditation or yoga to manage stress.",
    "Practice paced breathing: 6 breaths per minute for 5 minutes, 3 times a day.",
    "Try the 5-5-5 rule: 5 min of gratitude each morning, 5 min at midday, 5 min winding down.",
    "Use a guided meditation app for 10 minutes a day to build the habit.",
    "Keep a journal: write down 3 positive things each evening to lower anxiety.",
];

pub const HYDRATION_VARIANTS: &[&str] = &[
    "Aim to drink 1.5-2 litres of water a day to stay well hydrated.",
    "Drink a large glass of water on waking to rehydrate after the night.",
    "Keep a water bottle within reach: target 8 glasses of 250ml a day.",
    "Mix it up with infusions: lemon, ginger, or mint make hydration easier.",
    "Eat water-rich foods: cucumber, watermelon, tomato cover about 20% of your needs.",
];

pub const NUTRITION_VARIANTS: &[&str] = &[
    "Favour balanced meals with vegetables, lean protein, and whole grains.",
    "Use the plate rule: half vegetables, a quarter protein, a quarter complex carbs.",
    "Eat the rainbow: 5 colours of fruit and vegetables a day covers most nutrients.",
    "Prep meals on Sunday: 4-5 healthy dishes ready for the week.",
    "Cut down on ultra-processed food: favour fresh, home-cooked meals.",
];

pub const MORNING_SUNLIGHT_VARIANTS: &[&str] = &[
    "Get natural light in the morning to anchor your circadian rhythm.",
    "Open the blinds as soon as you wake: 15 minutes of daylight boosts your energy.",
    "Have your coffee or tea by a window: pair your morning routine with light exposure.",
    "Walk 10 minutes outside in the morning: light plus movement wakes the body up.",
];

pub const SCHEDULE_VARIANTS: &[&str] = &[
    "Keep a regular sleep schedule by going to bed and getting up at fixed times.",
    "Build a morning routine: same wake-up time every day, weekends included.",
    "Plan meals at regular hours: 3 meals plus one snack if needed.",
    "Block 30 minutes of physical activity at the same time each day to build the habit.",
];

pub const STANDING_BREAKS_VARIANTS: &[&str] = &[
    "Stand up and stretch every hour if you work sitting down.",
    "Set an hourly alarm: 2 minutes of stretching counters sedentary time.",
    "Walk during phone meetings: it sparks creativity and cuts fatigue.",
    "Try a standing desk for 2 hours a day: alternate sitting and standing.",
];
