use crate::engine::catalog::ExerciseConfig;
use crate::engine::config::UpdaterParams;
use crate::engine::profile::Profile;
use crate::engine::staircase;
use crate::engine::types::{HistoryEntry, ProgressTrend};

/// Folds completed sessions into the profile: history append, capacity
/// adjustment for the exercise's primary challenge area, trend recompute.
#[derive(Debug, Clone)]
pub struct ProfileUpdater {
    params: UpdaterParams,
}

impl ProfileUpdater {
    pub fn new(params: UpdaterParams) -> Self {
        Self { params }
    }

    pub fn fold(&self, mut profile: Profile, exercise: &ExerciseConfig, entry: HistoryEntry) -> Profile {
        let primary = exercise.primary_area();
        let result = entry.result;
        profile.exercise_history.push(entry);

        // Mastery: a high score earned at or above the level the prior
        // capacity implies raises that capacity.
        let prior_capacity = profile.capacity_for(primary);
        let implied = staircase::implied_level(result.final_level.family(), prior_capacity);
        if result.score >= self.params.mastery_score
            && result.final_level.scalar() >= implied.scalar()
        {
            *profile.capacity_for_mut(primary) += self.params.mastery_gain;
        }

        // Persistently low accuracy over a full recent window decays it.
        let window = self.params.trend_window.max(1);
        if profile.exercise_history.len() >= window {
            let recent = &profile.exercise_history[profile.exercise_history.len() - window..];
            let mean_accuracy =
                recent.iter().map(|e| e.result.accuracy).sum::<f64>() / window as f64;
            if mean_accuracy < self.params.decay_accuracy {
                *profile.capacity_for_mut(primary) -= self.params.decay_step;
            }
        }

        profile.clamp_capacities();
        profile.recompute_overall();
        profile.progress_trend = compute_trend(
            &profile.exercise_history,
            window,
            self.params.trend_delta,
        );

        tracing::debug!(
            area = primary.as_str(),
            score = result.score,
            trend = profile.progress_trend.as_str(),
            "session folded into profile"
        );
        profile
    }
}

/// Short-term mean score against the preceding window. Stays `initial`
/// until the history extends beyond one full window.
fn compute_trend(history: &[HistoryEntry], window: usize, delta: f64) -> ProgressTrend {
    if history.len() <= window {
        return ProgressTrend::Initial;
    }

    let split = history.len() - window;
    let previous_start = split.saturating_sub(window);
    let recent = &history[split..];
    let previous = &history[previous_start..split];

    let recent_mean = recent.iter().map(|e| e.result.score as f64).sum::<f64>() / recent.len() as f64;
    let previous_mean =
        previous.iter().map(|e| e.result.score as f64).sum::<f64>() / previous.len() as f64;

    let diff = recent_mean - previous_mean;
    if diff > delta {
        ProgressTrend::Improving
    } else if diff < -delta {
        ProgressTrend::Declining
    } else {
        ProgressTrend::Stable
    }
}
