//! Session-running facade. Owns the active session table, schedules phase
//! and countdown timers on the tokio runtime, folds finished sessions into
//! profiles, and publishes bus events. One service instance per process,
//! constructed by the host and shared by cloning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::engine::catalog::{ExerciseCatalog, ExerciseConfig, SupportTool, SupportToolCatalog};
use crate::engine::config::EngineConfig;
use crate::engine::profile::Profile;
use crate::engine::recommend;
use crate::engine::session::{
    BeginOutcome, InputOutcome, PendingTimer, SessionMachine, TimerOutcome,
};
use crate::engine::staircase;
use crate::engine::stimulus::{Cell, Stimulus};
use crate::engine::types::{
    DifficultyLevel, ExerciseKind, HistoryEntry, Phase, SessionResult,
};
use crate::engine::updater::ProfileUpdater;
use crate::error::{EngineError, EngineResult};
use crate::service::events::{
    EventBus, ProfileUpdatedPayload, SessionCompletedPayload, SessionStartedPayload,
    TrainingEvent, TrialRecordedPayload,
};
use crate::storage::ProfileStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub exercises: Vec<ExerciseConfig>,
    pub tools: Vec<SupportTool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub exercise: ExerciseConfig,
    pub starting_level: DifficultyLevel,
    pub duration_secs: u32,
}

/// What the host must present for the trial that just began.
#[derive(Debug, Clone)]
pub struct TrialStart {
    pub stimulus: Stimulus,
    pub presentation: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialProgress {
    /// Input recorded; the trial is still collecting responses.
    Accepted,
    /// The trial was scored and the session moved to feedback.
    TrialComplete {
        correct: bool,
        next_level: DifficultyLevel,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub phase: Phase,
    pub level: DifficultyLevel,
    pub trials_completed: u32,
    pub time_remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub user_id: String,
    pub exercise: ExerciseKind,
    pub result: SessionResult,
    pub profile: Profile,
}

struct ActiveSession {
    user_id: String,
    machine: SessionMachine,
    phase_timer: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct SessionTable {
    by_id: HashMap<Uuid, ActiveSession>,
    by_user: HashMap<String, Uuid>,
}

impl SessionTable {
    fn remove(&mut self, session_id: Uuid) -> Option<ActiveSession> {
        let active = self.by_id.remove(&session_id)?;
        if self.by_user.get(&active.user_id) == Some(&session_id) {
            self.by_user.remove(&active.user_id);
        }
        Some(active)
    }
}

struct ServiceInner {
    config: EngineConfig,
    exercises: ExerciseCatalog,
    tools: SupportToolCatalog,
    store: Arc<dyn ProfileStore>,
    bus: EventBus,
    updater: ProfileUpdater,
    sessions: Mutex<SessionTable>,
}

#[derive(Clone)]
pub struct TrainingService {
    inner: Arc<ServiceInner>,
}

impl TrainingService {
    pub fn new(config: EngineConfig, store: Arc<dyn ProfileStore>) -> Self {
        Self::with_bus(config, store, EventBus::new())
    }

    pub fn with_bus(config: EngineConfig, store: Arc<dyn ProfileStore>, bus: EventBus) -> Self {
        Self::with_catalogs(
            config,
            store,
            bus,
            ExerciseCatalog::builtin(),
            SupportToolCatalog::builtin(),
        )
    }

    /// Full-control constructor for hosts that ship their own catalogs.
    pub fn with_catalogs(
        config: EngineConfig,
        store: Arc<dyn ProfileStore>,
        bus: EventBus,
        exercises: ExerciseCatalog,
        tools: SupportToolCatalog,
    ) -> Self {
        let updater = ProfileUpdater::new(config.updater.clone());
        Self {
            inner: Arc::new(ServiceInner {
                config,
                exercises,
                tools,
                store,
                bus,
                updater,
                sessions: Mutex::new(SessionTable::default()),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn exercises(&self) -> &ExerciseCatalog {
        &self.inner.exercises
    }

    pub fn support_tools(&self) -> &SupportToolCatalog {
        &self.inner.tools
    }

    /// Loads the user's profile. A store miss is not an error: a default
    /// profile is synthesized, given its recommendations, and persisted.
    pub fn profile(&self, user_id: &str) -> EngineResult<Profile> {
        if let Some(profile) = self.inner.store.get(user_id)? {
            return Ok(profile);
        }
        let mut profile = Profile::default();
        profile.recommended_exercises = exercise_kinds(&profile, &self.inner.exercises);
        self.inner.store.put(user_id, &profile)?;
        tracing::info!(user_id, "synthesized default profile");
        Ok(profile)
    }

    /// Exercise and tool recommendations for the user's current profile.
    pub fn recommendations(&self, user_id: &str) -> EngineResult<RecommendationSet> {
        let profile = self.profile(user_id)?;
        Ok(RecommendationSet {
            exercises: recommend::recommend_exercises(&profile, &self.inner.exercises),
            tools: recommend::recommend_support_tools(&profile, &self.inner.tools),
        })
    }

    /// Starts a session of `kind` for the user, cancelling any session the
    /// user already has running; a cancelled session's trials are discarded
    /// without touching the profile. The starting level is implied by the
    /// profile's capacity for the exercise's primary challenge area.
    pub async fn start_exercise(
        &self,
        user_id: &str,
        kind: ExerciseKind,
    ) -> EngineResult<SessionHandle> {
        self.start_exercise_seeded(user_id, kind, rand::random::<u64>())
            .await
    }

    /// [`start_exercise`](Self::start_exercise) with a fixed stimulus seed.
    pub async fn start_exercise_seeded(
        &self,
        user_id: &str,
        kind: ExerciseKind,
        seed: u64,
    ) -> EngineResult<SessionHandle> {
        let config = *self
            .inner
            .exercises
            .get(kind)
            .ok_or_else(|| EngineError::ConfigNotFound(kind.as_str().to_string()))?;

        let profile = self.profile(user_id)?;
        let implied = staircase::implied_level(
            kind.family(),
            profile.capacity_for(config.primary_area()),
        );

        let session_id = Uuid::new_v4();
        let machine = SessionMachine::new(
            session_id,
            config,
            self.inner.config.timing.clone(),
            self.inner.config.scoring.clone(),
            implied,
            seed,
            Instant::now(),
        );
        let starting_level = machine.current_level();
        let duration = machine.budget();

        let countdown = spawn_countdown(Arc::clone(&self.inner), session_id, duration);
        let displaced = {
            let mut table = self.inner.sessions.lock();
            let displaced = table
                .by_user
                .insert(user_id.to_string(), session_id)
                .and_then(|old_id| table.by_id.remove(&old_id));
            table.by_id.insert(
                session_id,
                ActiveSession {
                    user_id: user_id.to_string(),
                    machine,
                    phase_timer: None,
                    countdown: Some(countdown),
                },
            );
            displaced
        };
        if let Some(mut old) = displaced {
            abort_timers(&mut old);
            tracing::info!(
                user_id,
                discarded = %old.machine.session_id(),
                "cancelled prior session before starting a new one"
            );
        }

        tracing::info!(
            user_id,
            session_id = %session_id,
            exercise = kind.as_str(),
            starting_level = ?starting_level,
            "session started"
        );
        self.inner
            .bus
            .publish(TrainingEvent::SessionStarted(SessionStartedPayload {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                exercise: kind,
                starting_level,
                timestamp: Utc::now(),
            }))
            .await;

        Ok(SessionHandle {
            session_id,
            exercise: config,
            starting_level,
            duration_secs: config.duration_secs,
        })
    }

    /// Moves an instruction-phase session into presentation. Returns the
    /// stimulus and how long the host should display it before the engine
    /// opens recall by itself.
    pub async fn begin_trial(&self, session_id: Uuid) -> EngineResult<TrialStart> {
        let (start, timer) = {
            let mut table = self.inner.sessions.lock();
            let active = table
                .by_id
                .get_mut(&session_id)
                .ok_or_else(|| unknown_session(session_id))?;
            match active.machine.begin_trial() {
                BeginOutcome::Presenting { timer } => (
                    TrialStart {
                        stimulus: active.machine.stimulus().clone(),
                        presentation: timer.delay,
                    },
                    timer,
                ),
                BeginOutcome::Ignored => {
                    return Err(EngineError::InvalidSessionState(format!(
                        "cannot begin a trial in the {} phase",
                        active.machine.phase().as_str()
                    )))
                }
            }
        };
        self.arm_phase_timer(session_id, timer);
        Ok(start)
    }

    /// One digit of sequential recall.
    pub async fn submit_digit(&self, session_id: Uuid, digit: u8) -> EngineResult<TrialProgress> {
        self.apply_input(session_id, |machine, now| machine.submit_digit(digit, now))
            .await
    }

    /// Marks or unmarks a grid cell during spatial recall.
    pub async fn toggle_cell(&self, session_id: Uuid, cell: Cell) -> EngineResult<TrialProgress> {
        self.apply_input(session_id, |machine, now| machine.toggle_cell(cell, now))
            .await
    }

    /// Submits the marked cell set for scoring.
    pub async fn submit_pattern(&self, session_id: Uuid) -> EngineResult<TrialProgress> {
        self.apply_input(session_id, |machine, now| machine.submit_pattern(now))
            .await
    }

    async fn apply_input<F>(&self, session_id: Uuid, apply: F) -> EngineResult<TrialProgress>
    where
        F: FnOnce(&mut SessionMachine, Instant) -> InputOutcome,
    {
        let (user_id, trial_index, correct, timer, next_level) = {
            let mut table = self.inner.sessions.lock();
            let active = table
                .by_id
                .get_mut(&session_id)
                .ok_or_else(|| unknown_session(session_id))?;
            match apply(&mut active.machine, Instant::now()) {
                InputOutcome::Recorded => return Ok(TrialProgress::Accepted),
                InputOutcome::Ignored => {
                    return Err(EngineError::InvalidSessionState(format!(
                        "input rejected in the {} phase",
                        active.machine.phase().as_str()
                    )))
                }
                InputOutcome::TrialComplete { correct, timer } => (
                    active.user_id.clone(),
                    active.machine.trials().len() as u32 - 1,
                    correct,
                    timer,
                    active.machine.current_level(),
                ),
            }
        };
        self.arm_phase_timer(session_id, timer);
        self.inner
            .bus
            .publish(TrainingEvent::TrialRecorded(TrialRecordedPayload {
                user_id,
                session_id: session_id.to_string(),
                trial_index,
                correct,
                next_level,
                timestamp: Utc::now(),
            }))
            .await;
        Ok(TrialProgress::TrialComplete {
            correct,
            next_level,
        })
    }

    pub fn session_status(&self, session_id: Uuid) -> EngineResult<SessionStatus> {
        let table = self.inner.sessions.lock();
        let active = table
            .by_id
            .get(&session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        Ok(SessionStatus {
            phase: active.machine.phase(),
            level: active.machine.current_level(),
            trials_completed: active.machine.trials().len() as u32,
            time_remaining_ms: active.machine.time_remaining(Instant::now()).as_millis() as u64,
        })
    }

    /// Finalizes the session from whatever phase it is in, folds the result
    /// into the profile (zero-trial sessions are not folded), persists it,
    /// and returns the summary. Ending an unknown or already-ended session
    /// is an error.
    pub async fn end_exercise(&self, session_id: Uuid) -> EngineResult<SessionSummary> {
        let active = {
            let mut table = self.inner.sessions.lock();
            table.remove(session_id)
        }
        .ok_or_else(|| unknown_session(session_id))?;
        finish_session(&self.inner, active).await
    }

    fn arm_phase_timer(&self, session_id: Uuid, timer: PendingTimer) {
        let handle = spawn_phase_timer(Arc::clone(&self.inner), session_id, timer);
        let mut table = self.inner.sessions.lock();
        match table.by_id.get_mut(&session_id) {
            Some(active) => {
                if let Some(old) = active.phase_timer.replace(handle) {
                    old.abort();
                }
            }
            // Session ended between the transition and arming.
            None => handle.abort(),
        }
    }
}

fn exercise_kinds(profile: &Profile, catalog: &ExerciseCatalog) -> Vec<ExerciseKind> {
    recommend::recommend_exercises(profile, catalog)
        .iter()
        .map(|e| e.kind)
        .collect()
}

fn unknown_session(session_id: Uuid) -> EngineError {
    EngineError::InvalidSessionState(format!("no active session {session_id}"))
}

fn abort_timers(active: &mut ActiveSession) {
    if let Some(handle) = active.phase_timer.take() {
        handle.abort();
    }
    if let Some(handle) = active.countdown.take() {
        handle.abort();
    }
}

fn spawn_phase_timer(
    inner: Arc<ServiceInner>,
    session_id: Uuid,
    timer: PendingTimer,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timer.delay).await;
        on_phase_timer(inner, session_id, timer).await;
    })
}

fn spawn_countdown(
    inner: Arc<ServiceInner>,
    session_id: Uuid,
    duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        on_countdown(inner, session_id).await;
    })
}

async fn on_phase_timer(inner: Arc<ServiceInner>, session_id: Uuid, timer: PendingTimer) {
    let expired = {
        let mut table = inner.sessions.lock();
        let Some(active) = table.by_id.get_mut(&session_id) else {
            return;
        };
        match active
            .machine
            .handle_timer(timer.kind, timer.epoch, Instant::now())
        {
            TimerOutcome::SessionExpired => table.remove(session_id),
            TimerOutcome::RecallStarted
            | TimerOutcome::AwaitingTrial
            | TimerOutcome::Ignored => None,
        }
    };
    if let Some(active) = expired {
        let session_id = active.machine.session_id();
        if let Err(err) = finish_session(&inner, active).await {
            tracing::error!(session_id = %session_id, error = %err, "failed to persist expired session");
        }
    }
}

async fn on_countdown(inner: Arc<ServiceInner>, session_id: Uuid) {
    let removed = {
        let mut table = inner.sessions.lock();
        table.remove(session_id)
    };
    let Some(active) = removed else {
        return;
    };
    tracing::info!(session_id = %session_id, "session budget elapsed");
    if let Err(err) = finish_session(&inner, active).await {
        tracing::error!(session_id = %session_id, error = %err, "failed to persist expired session");
    }
}

async fn finish_session(
    inner: &ServiceInner,
    mut active: ActiveSession,
) -> EngineResult<SessionSummary> {
    abort_timers(&mut active);
    let result = active.machine.finalize();
    let kind = active.machine.exercise().kind;
    let session_id = active.machine.session_id();
    let user_id = active.user_id.clone();

    let mut profile = inner.store.get(&user_id)?.unwrap_or_default();
    let folded = !active.machine.trials().is_empty();
    if folded {
        let entry = HistoryEntry {
            session_id,
            exercise: kind,
            completed_at: Utc::now(),
            result,
        };
        profile = inner.updater.fold(profile, active.machine.exercise(), entry);
    }
    profile.recommended_exercises = exercise_kinds(&profile, &inner.exercises);
    inner.store.put(&user_id, &profile)?;

    inner
        .bus
        .publish(TrainingEvent::SessionCompleted(SessionCompletedPayload {
            user_id: user_id.clone(),
            session_id: session_id.to_string(),
            exercise: kind,
            result,
            timestamp: Utc::now(),
        }))
        .await;
    if folded {
        inner
            .bus
            .publish(TrainingEvent::ProfileUpdated(ProfileUpdatedPayload {
                user_id: user_id.clone(),
                progress_trend: profile.progress_trend,
                overall_capacity: profile.overall_capacity,
                timestamp: Utc::now(),
            }))
            .await;
    }

    Ok(SessionSummary {
        session_id,
        user_id,
        exercise: kind,
        result,
        profile,
    })
}
