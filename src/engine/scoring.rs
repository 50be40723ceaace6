use crate::engine::config::ScoringParams;
use crate::engine::staircase;
use crate::engine::types::{DifficultyLevel, SessionResult, TrialResult};

/// Aggregates a session's trial history into its final result.
///
/// A correct trial earns `scalar * points_per_unit` where the scalar is the
/// item count held at that trial, so harder completed trials weigh more.
/// Incorrect trials earn nothing. The score normalizes raw points against a
/// perfect run at the family maximum and lands in `[0, 100]`.
pub fn aggregate(
    trials: &[TrialResult],
    final_level: DifficultyLevel,
    params: &ScoringParams,
) -> SessionResult {
    if trials.is_empty() {
        return SessionResult {
            score: 0,
            accuracy: 0.0,
            average_response_time_ms: 0.0,
            completion_rate: 0.0,
            attention_lapses: 0,
            final_level,
        };
    }

    let total = trials.len() as f64;
    let correct = trials.iter().filter(|t| t.correct).count() as f64;
    let accuracy = correct / total;

    let raw_points: u32 = trials
        .iter()
        .filter(|t| t.correct)
        .map(|t| t.level_at_trial.scalar() * params.points_per_unit)
        .sum();
    let per_trial_max = staircase::max_scalar(final_level.family()) * params.points_per_unit;
    let score = if per_trial_max == 0 {
        0
    } else {
        let pct = 100.0 * raw_points as f64 / (total * per_trial_max as f64);
        pct.round().clamp(0.0, 100.0) as u32
    };

    let average_response_time_ms = trials
        .iter()
        .map(|t| t.response_time_ms as f64)
        .sum::<f64>()
        / total;
    let attention_lapses = trials
        .iter()
        .filter(|t| t.response_time_ms > params.lapse_threshold_ms)
        .count() as u32;

    SessionResult {
        score,
        accuracy,
        average_response_time_ms,
        completion_rate: 1.0,
        attention_lapses,
        final_level,
    }
}
