#![allow(dead_code)]

//! Adaptive working-memory training engine. Profiles users across four
//! working-memory subsystems, recommends exercises and externalization
//! tools, runs timed exercise sessions on a 1-up/1-down staircase, and
//! folds session results back into the profile.
//!
//! The crate is a pure library: a hosting UI drives [`TrainingService`]
//! and renders the stimuli and events it hands back.

pub mod engine;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;

pub use engine::catalog::{ExerciseCatalog, ExerciseConfig, SupportTool, SupportToolCatalog};
pub use engine::config::EngineConfig;
pub use engine::profile::Profile;
pub use engine::stimulus::{Cell, Stimulus};
pub use engine::types::{
    ChallengeArea, ContextualTrigger, DifficultyLevel, ExerciseFamily, ExerciseKind,
    HistoryEntry, Phase, ProgressTrend, SessionResult, SupportLevel, TrialResult,
};
pub use error::{EngineError, EngineResult};
pub use service::{
    ChecklistDoc, ChecklistItem, ChecklistService, EventBus, RecommendationSet, SessionHandle,
    SessionStatus, SessionSummary, TrainingEvent, TrainingService, TrialProgress, TrialStart,
};
pub use storage::{
    FileStore, KvProfileStore, KvStore, MemoryStore, ProfileStore, StoreError, StoreResult,
};
