use serde::{Deserialize, Serialize};

use crate::engine::types::{
    ChallengeArea, ExerciseKind, HistoryEntry, ProgressTrend, SupportLevel,
};

pub const CAPACITY_MIN: f64 = 0.0;
pub const CAPACITY_MAX: f64 = 10.0;

/// Per-user capability profile. Capacity scores live in `[0, 10]`;
/// `progress_trend` is derived from the history and never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub overall_capacity: f64,
    pub visual_spatial_capacity: f64,
    pub phonological_capacity: f64,
    pub central_executive_strength: f64,
    pub episodic_buffer_capacity: f64,
    pub challenge_areas: Vec<ChallengeArea>,
    pub recommended_exercises: Vec<ExerciseKind>,
    pub recommended_support_level: SupportLevel,
    pub exercise_history: Vec<HistoryEntry>,
    pub progress_trend: ProgressTrend,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            overall_capacity: 5.0,
            visual_spatial_capacity: 5.0,
            phonological_capacity: 5.0,
            central_executive_strength: 5.0,
            episodic_buffer_capacity: 5.0,
            challenge_areas: vec![
                ChallengeArea::CentralExecutive,
                ChallengeArea::PhonologicalLoop,
            ],
            recommended_exercises: Vec::new(),
            recommended_support_level: SupportLevel::Moderate,
            exercise_history: Vec::new(),
            progress_trend: ProgressTrend::Initial,
        }
    }
}

impl Profile {
    pub fn capacity_for(&self, area: ChallengeArea) -> f64 {
        match area {
            ChallengeArea::VisualSpatialSketchpad => self.visual_spatial_capacity,
            ChallengeArea::PhonologicalLoop => self.phonological_capacity,
            ChallengeArea::CentralExecutive => self.central_executive_strength,
            ChallengeArea::EpisodicBuffer => self.episodic_buffer_capacity,
        }
    }

    pub fn capacity_for_mut(&mut self, area: ChallengeArea) -> &mut f64 {
        match area {
            ChallengeArea::VisualSpatialSketchpad => &mut self.visual_spatial_capacity,
            ChallengeArea::PhonologicalLoop => &mut self.phonological_capacity,
            ChallengeArea::CentralExecutive => &mut self.central_executive_strength,
            ChallengeArea::EpisodicBuffer => &mut self.episodic_buffer_capacity,
        }
    }

    pub fn clamp_capacities(&mut self) {
        for area in ChallengeArea::ALL {
            let value = self.capacity_for_mut(area);
            *value = value.clamp(CAPACITY_MIN, CAPACITY_MAX);
        }
        self.overall_capacity = self.overall_capacity.clamp(CAPACITY_MIN, CAPACITY_MAX);
    }

    /// Overall capacity is the mean of the four subsystem scores.
    pub fn recompute_overall(&mut self) {
        let sum: f64 = ChallengeArea::ALL
            .iter()
            .map(|area| self.capacity_for(*area))
            .sum();
        self.overall_capacity = (sum / ChallengeArea::ALL.len() as f64).clamp(CAPACITY_MIN, CAPACITY_MAX);
    }
}
