use serde::Serialize;

use crate::engine::types::{ChallengeArea, ContextualTrigger, ExerciseKind, SupportLevel};

/// Immutable catalog entry describing one exercise type. The first listed
/// challenge area is the primary one credited by the profile updater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    #[serde(rename = "type")]
    pub kind: ExerciseKind,
    pub challenge_areas: &'static [ChallengeArea],
    /// Catalog sort key only; trial difficulty comes from the staircase.
    pub difficulty: u8,
    /// Session time budget, seconds.
    #[serde(rename = "duration")]
    pub duration_secs: u32,
    pub adaptive_difficulty: bool,
    pub visual_support: bool,
    pub auditory_support: bool,
}

impl ExerciseConfig {
    pub fn primary_area(&self) -> ChallengeArea {
        self.challenge_areas[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTool {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub target_challenge_areas: &'static [ChallengeArea],
    pub support_level: SupportLevel,
    pub contextual_trigger: ContextualTrigger,
}

const BUILTIN_EXERCISES: &[ExerciseConfig] = &[
    ExerciseConfig {
        kind: ExerciseKind::DigitSpan,
        challenge_areas: &[
            ChallengeArea::PhonologicalLoop,
            ChallengeArea::CentralExecutive,
        ],
        difficulty: 2,
        duration_secs: 180,
        adaptive_difficulty: true,
        visual_support: false,
        auditory_support: true,
    },
    ExerciseConfig {
        kind: ExerciseKind::ReverseDigitSpan,
        challenge_areas: &[
            ChallengeArea::CentralExecutive,
            ChallengeArea::PhonologicalLoop,
        ],
        difficulty: 3,
        duration_secs: 180,
        adaptive_difficulty: true,
        visual_support: false,
        auditory_support: true,
    },
    ExerciseConfig {
        kind: ExerciseKind::PatternMemory,
        challenge_areas: &[ChallengeArea::VisualSpatialSketchpad],
        difficulty: 2,
        duration_secs: 240,
        adaptive_difficulty: true,
        visual_support: true,
        auditory_support: false,
    },
    ExerciseConfig {
        kind: ExerciseKind::SpatialLocation,
        challenge_areas: &[
            ChallengeArea::VisualSpatialSketchpad,
            ChallengeArea::EpisodicBuffer,
        ],
        difficulty: 3,
        duration_secs: 240,
        adaptive_difficulty: true,
        visual_support: true,
        auditory_support: false,
    },
];

const BUILTIN_TOOLS: &[SupportTool] = &[
    SupportTool {
        id: "step-checklist",
        name: "Step checklist",
        description: "Externalizes the steps of the current task so none have to be held in mind",
        target_challenge_areas: &[ChallengeArea::CentralExecutive],
        support_level: SupportLevel::Minimal,
        contextual_trigger: ContextualTrigger::MultiStepTask,
    },
    SupportTool {
        id: "verbal-rehearsal-script",
        name: "Verbal rehearsal script",
        description: "Short spoken-repetition prompts for material that must survive a delay",
        target_challenge_areas: &[ChallengeArea::PhonologicalLoop],
        support_level: SupportLevel::Minimal,
        contextual_trigger: ContextualTrigger::RecallDemand,
    },
    SupportTool {
        id: "task-breakdown",
        name: "Task breakdown sheet",
        description: "Splits a large task into ordered sub-tasks before starting",
        target_challenge_areas: &[
            ChallengeArea::CentralExecutive,
            ChallengeArea::EpisodicBuffer,
        ],
        support_level: SupportLevel::Moderate,
        contextual_trigger: ContextualTrigger::TaskInitiation,
    },
    SupportTool {
        id: "visual-schedule",
        name: "Visual schedule",
        description: "Pictorial timeline of the day's activities, reviewed at each transition",
        target_challenge_areas: &[
            ChallengeArea::VisualSpatialSketchpad,
            ChallengeArea::CentralExecutive,
        ],
        support_level: SupportLevel::Moderate,
        contextual_trigger: ContextualTrigger::Transition,
    },
    SupportTool {
        id: "memory-notebook",
        name: "Memory notebook",
        description: "Running written record of facts and events to consult instead of recalling",
        target_challenge_areas: &[
            ChallengeArea::EpisodicBuffer,
            ChallengeArea::PhonologicalLoop,
        ],
        support_level: SupportLevel::Substantial,
        contextual_trigger: ContextualTrigger::RecallDemand,
    },
    SupportTool {
        id: "guided-coaching-plan",
        name: "Guided coaching plan",
        description: "Coach-administered routine covering planning, rehearsal, and review",
        target_challenge_areas: &[
            ChallengeArea::CentralExecutive,
            ChallengeArea::VisualSpatialSketchpad,
            ChallengeArea::PhonologicalLoop,
            ChallengeArea::EpisodicBuffer,
        ],
        support_level: SupportLevel::Comprehensive,
        contextual_trigger: ContextualTrigger::SustainedAttention,
    },
];

#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    entries: Vec<ExerciseConfig>,
}

impl ExerciseCatalog {
    pub fn builtin() -> Self {
        Self::new(BUILTIN_EXERCISES.to_vec())
    }

    /// Catalog from host-supplied entries, for deployments that trim or
    /// extend the builtin set.
    pub fn new(entries: Vec<ExerciseConfig>) -> Self {
        Self { entries }
    }

    pub fn get(&self, kind: ExerciseKind) -> Option<&ExerciseConfig> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn entries(&self) -> &[ExerciseConfig] {
        &self.entries
    }
}

#[derive(Debug, Clone)]
pub struct SupportToolCatalog {
    entries: Vec<SupportTool>,
}

impl SupportToolCatalog {
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TOOLS.to_vec())
    }

    pub fn new(entries: Vec<SupportTool>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&SupportTool> {
        self.entries.iter().find(|t| t.id == id)
    }

    pub fn entries(&self) -> &[SupportTool] {
        &self.entries
    }
}
