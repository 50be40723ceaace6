//! Orchestration over the engine core: the session-running facade, the
//! event bus, and checklist scratch storage.

pub mod checklist;
pub mod events;
pub mod trainer;

pub use checklist::{ChecklistDoc, ChecklistIndex, ChecklistItem, ChecklistService};
pub use events::{EventBus, EventBusStats, EventEnvelope, TrainingEvent};
pub use trainer::{
    RecommendationSet, SessionHandle, SessionStatus, SessionSummary, TrainingService,
    TrialProgress, TrialStart,
};
