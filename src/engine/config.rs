use serde::{Deserialize, Serialize};

/// Phase timing, milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingParams {
    /// Per-item exposure for sequential stimuli.
    pub item_ms: u64,
    /// Inter-stimulus gap between sequential items.
    pub gap_ms: u64,
    /// Whole-pattern exposure for spatial stimuli.
    pub spatial_presentation_ms: u64,
    pub feedback_ms: u64,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            item_ms: 1000,
            gap_ms: 250,
            spatial_presentation_ms: 3000,
            feedback_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Points per held item on a correct trial.
    pub points_per_unit: u32,
    /// Response times above this count as attention lapses.
    pub lapse_threshold_ms: u64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            points_per_unit: 10,
            lapse_threshold_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterParams {
    /// Session score at or above this counts toward mastery.
    pub mastery_score: u32,
    pub mastery_gain: f64,
    /// Mean accuracy over the recent window below this decays capacity.
    pub decay_accuracy: f64,
    pub decay_step: f64,
    /// Sessions per trend window.
    pub trend_window: usize,
    /// Score delta separating improving/declining from stable.
    pub trend_delta: f64,
}

impl Default for UpdaterParams {
    fn default() -> Self {
        Self {
            mastery_score: 80,
            mastery_gain: 0.5,
            decay_accuracy: 0.5,
            decay_step: 0.25,
            trend_window: 3,
            trend_delta: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub timing: TimingParams,
    pub scoring: ScoringParams,
    pub updater: UpdaterParams,
}

impl EngineConfig {
    /// Builds a config from defaults, overridden by `MEMSPAN_*` environment
    /// variables. Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MEMSPAN_ITEM_MS") {
            config.timing.item_ms = val.parse().unwrap_or(1000);
        }
        if let Ok(val) = std::env::var("MEMSPAN_GAP_MS") {
            config.timing.gap_ms = val.parse().unwrap_or(250);
        }
        if let Ok(val) = std::env::var("MEMSPAN_SPATIAL_PRESENTATION_MS") {
            config.timing.spatial_presentation_ms = val.parse().unwrap_or(3000);
        }
        if let Ok(val) = std::env::var("MEMSPAN_FEEDBACK_MS") {
            config.timing.feedback_ms = val.parse().unwrap_or(1500);
        }
        if let Ok(val) = std::env::var("MEMSPAN_POINTS_PER_UNIT") {
            config.scoring.points_per_unit = val.parse().unwrap_or(10);
        }
        if let Ok(val) = std::env::var("MEMSPAN_LAPSE_THRESHOLD_MS") {
            config.scoring.lapse_threshold_ms = val.parse().unwrap_or(8000);
        }
        if let Ok(val) = std::env::var("MEMSPAN_MASTERY_SCORE") {
            config.updater.mastery_score = val.parse().unwrap_or(80);
        }
        if let Ok(val) = std::env::var("MEMSPAN_MASTERY_GAIN") {
            config.updater.mastery_gain = val.parse().unwrap_or(0.5);
        }
        if let Ok(val) = std::env::var("MEMSPAN_DECAY_ACCURACY") {
            config.updater.decay_accuracy = val.parse().unwrap_or(0.5);
        }
        if let Ok(val) = std::env::var("MEMSPAN_DECAY_STEP") {
            config.updater.decay_step = val.parse().unwrap_or(0.25);
        }
        if let Ok(val) = std::env::var("MEMSPAN_TREND_WINDOW") {
            config.updater.trend_window = val.parse().unwrap_or(3);
        }
        if let Ok(val) = std::env::var("MEMSPAN_TREND_DELTA") {
            config.updater.trend_delta = val.parse().unwrap_or(5.0);
        }

        config
    }
}
