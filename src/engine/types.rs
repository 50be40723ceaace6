use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeArea {
    VisualSpatialSketchpad,
    PhonologicalLoop,
    CentralExecutive,
    EpisodicBuffer,
}

impl ChallengeArea {
    pub const ALL: [ChallengeArea; 4] = [
        Self::VisualSpatialSketchpad,
        Self::PhonologicalLoop,
        Self::CentralExecutive,
        Self::EpisodicBuffer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisualSpatialSketchpad => "visual_spatial_sketchpad",
            Self::PhonologicalLoop => "phonological_loop",
            Self::CentralExecutive => "central_executive",
            Self::EpisodicBuffer => "episodic_buffer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "visual_spatial_sketchpad" => Some(Self::VisualSpatialSketchpad),
            "phonological_loop" => Some(Self::PhonologicalLoop),
            "central_executive" => Some(Self::CentralExecutive),
            "episodic_buffer" => Some(Self::EpisodicBuffer),
            _ => None,
        }
    }
}

// Variant order defines the support-level scale; Ord is relied on when
// filtering tools against a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum SupportLevel {
    Minimal,
    #[default]
    Moderate,
    Substantial,
    Comprehensive,
}

impl SupportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::Comprehensive => "comprehensive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "substantial" => Self::Substantial,
            "comprehensive" => Self::Comprehensive,
            _ => Self::Moderate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    DigitSpan,
    ReverseDigitSpan,
    PatternMemory,
    SpatialLocation,
}

impl ExerciseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitSpan => "digit-span",
            Self::ReverseDigitSpan => "reverse-digit-span",
            Self::PatternMemory => "pattern-memory",
            Self::SpatialLocation => "spatial-location",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "digit-span" => Some(Self::DigitSpan),
            "reverse-digit-span" => Some(Self::ReverseDigitSpan),
            "pattern-memory" => Some(Self::PatternMemory),
            "spatial-location" => Some(Self::SpatialLocation),
            _ => None,
        }
    }

    pub fn family(&self) -> ExerciseFamily {
        match self {
            Self::DigitSpan | Self::ReverseDigitSpan => ExerciseFamily::Sequential,
            Self::PatternMemory | Self::SpatialLocation => ExerciseFamily::Spatial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseFamily {
    Sequential,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ProgressTrend {
    Improving,
    Declining,
    Stable,
    #[default]
    Initial,
}

impl ProgressTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
            Self::Initial => "initial",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "improving" => Self::Improving,
            "declining" => Self::Declining,
            "stable" => Self::Stable,
            _ => Self::Initial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextualTrigger {
    TaskInitiation,
    MultiStepTask,
    RecallDemand,
    Transition,
    SustainedAttention,
}

impl ContextualTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskInitiation => "task_initiation",
            Self::MultiStepTask => "multi_step_task",
            Self::RecallDemand => "recall_demand",
            Self::Transition => "transition",
            Self::SustainedAttention => "sustained_attention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Instruction,
    Presentation,
    Recall,
    Feedback,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instruction => "instruction",
            Self::Presentation => "presentation",
            Self::Recall => "recall",
            Self::Feedback => "feedback",
            Self::Finished => "finished",
        }
    }
}

/// Staircase state. Sequential exercises adapt the sequence length; spatial
/// exercises adapt the highlighted-cell count and, at the count bounds, the
/// grid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum DifficultyLevel {
    Sequence { length: u8 },
    Pattern { count: u8, grid: u8 },
}

impl DifficultyLevel {
    pub fn family(&self) -> ExerciseFamily {
        match self {
            Self::Sequence { .. } => ExerciseFamily::Sequential,
            Self::Pattern { .. } => ExerciseFamily::Spatial,
        }
    }

    /// Item count the level asks the user to hold: sequence length or
    /// highlighted-cell count. Also the per-trial scoring weight basis.
    pub fn scalar(&self) -> u32 {
        match self {
            Self::Sequence { length } => *length as u32,
            Self::Pattern { count, .. } => *count as u32,
        }
    }

    /// Total order over levels within a family. A grid step dominates any
    /// count change (count never reaches 10).
    pub fn ordinal(&self) -> u32 {
        match self {
            Self::Sequence { length } => *length as u32,
            Self::Pattern { count, grid } => *grid as u32 * 10 + *count as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    pub correct: bool,
    pub response_time_ms: u64,
    pub level_at_trial: DifficultyLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub score: u32,
    pub accuracy: f64,
    pub average_response_time_ms: f64,
    pub completion_rate: f64,
    pub attention_lapses: u32,
    pub final_level: DifficultyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub session_id: Uuid,
    pub exercise: ExerciseKind,
    pub completed_at: DateTime<Utc>,
    pub result: SessionResult,
}
