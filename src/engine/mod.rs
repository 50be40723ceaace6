//! Core training engine: catalogs, difficulty adaptation, stimulus
//! generation, the session state machine, scoring, and profile folding.

pub mod catalog;
pub mod config;
pub mod profile;
pub mod recommend;
pub mod scoring;
pub mod session;
pub mod staircase;
pub mod stimulus;
pub mod types;
pub mod updater;

pub use catalog::{ExerciseCatalog, ExerciseConfig, SupportTool, SupportToolCatalog};
pub use config::EngineConfig;
pub use profile::Profile;
pub use session::SessionMachine;
pub use types::*;
