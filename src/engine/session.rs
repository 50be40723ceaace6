//! Trial/session state machine. Synchronous and clock-injected: every
//! operation takes the caller's `Instant`, and timed transitions are
//! returned as [`PendingTimer`] descriptors for the host to schedule.
//! Each transition bumps a timer epoch; callbacks delivering a stale epoch
//! are ignored, which is what makes cancellation race-free.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::engine::catalog::ExerciseConfig;
use crate::engine::config::{ScoringParams, TimingParams};
use crate::engine::scoring;
use crate::engine::staircase;
use crate::engine::stimulus::{self, Cell, Stimulus};
use crate::engine::types::{DifficultyLevel, ExerciseFamily, Phase, SessionResult, TrialResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Presentation,
    Feedback,
}

/// Delayed callback the host must schedule against this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub kind: TimerKind,
    pub delay: Duration,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Stimulus exposed; the presentation timer must be armed.
    Presenting { timer: PendingTimer },
    /// Not in the instruction phase.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Presentation elapsed; recall input is open.
    RecallStarted,
    /// Feedback elapsed with budget left; back to instruction.
    AwaitingTrial,
    /// Feedback elapsed with the session budget exhausted; the machine is
    /// finished and the host should aggregate.
    SessionExpired,
    /// Stale epoch or mismatched phase; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Input accepted; the trial is still open.
    Recorded,
    /// Trial scored; the feedback timer must be armed.
    TrialComplete { correct: bool, timer: PendingTimer },
    Ignored,
}

#[derive(Debug)]
pub struct SessionMachine {
    session_id: Uuid,
    config: ExerciseConfig,
    timing: TimingParams,
    scoring: ScoringParams,
    budget: Duration,
    started_at: Instant,
    deadline: Instant,
    phase: Phase,
    level: DifficultyLevel,
    rng: ChaCha8Rng,
    stimulus: Stimulus,
    response_digits: Vec<u8>,
    marked_cells: BTreeSet<Cell>,
    recall_entered_at: Option<Instant>,
    trials: Vec<TrialResult>,
    timer_epoch: u64,
}

impl SessionMachine {
    pub fn new(
        session_id: Uuid,
        config: ExerciseConfig,
        timing: TimingParams,
        scoring: ScoringParams,
        starting_level: DifficultyLevel,
        seed: u64,
        now: Instant,
    ) -> Self {
        let budget = Duration::from_secs(config.duration_secs as u64);
        let level = staircase::clamp_level(starting_level);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let stimulus = stimulus::generate(level, &mut rng);
        Self {
            session_id,
            config,
            timing,
            scoring,
            budget,
            started_at: now,
            deadline: now + budget,
            phase: Phase::Instruction,
            level,
            rng,
            stimulus,
            response_digits: Vec::new(),
            marked_cells: BTreeSet::new(),
            recall_entered_at: None,
            trials: Vec::new(),
            timer_epoch: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn exercise(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_level(&self) -> DifficultyLevel {
        self.level
    }

    /// Stimulus for the current (or upcoming) trial.
    pub fn stimulus(&self) -> &Stimulus {
        &self.stimulus
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn time_remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn presentation_duration(&self) -> Duration {
        match &self.stimulus {
            Stimulus::Sequence { digits } => {
                let per_item = self.timing.item_ms + self.timing.gap_ms;
                Duration::from_millis(digits.len() as u64 * per_item)
            }
            Stimulus::Pattern { .. } => Duration::from_millis(self.timing.spatial_presentation_ms),
        }
    }

    /// Leaves instruction and exposes the stimulus for presentation.
    pub fn begin_trial(&mut self) -> BeginOutcome {
        if self.phase != Phase::Instruction {
            return BeginOutcome::Ignored;
        }
        self.phase = Phase::Presentation;
        self.timer_epoch += 1;
        BeginOutcome::Presenting {
            timer: PendingTimer {
                kind: TimerKind::Presentation,
                delay: self.presentation_duration(),
                epoch: self.timer_epoch,
            },
        }
    }

    /// Delivers an armed timer back to the machine.
    pub fn handle_timer(&mut self, kind: TimerKind, epoch: u64, now: Instant) -> TimerOutcome {
        if epoch != self.timer_epoch {
            tracing::warn!(
                session_id = %self.session_id,
                stale = epoch,
                current = self.timer_epoch,
                "stale timer ignored"
            );
            return TimerOutcome::Ignored;
        }
        match (kind, self.phase) {
            (TimerKind::Presentation, Phase::Presentation) => {
                self.phase = Phase::Recall;
                self.timer_epoch += 1;
                self.response_digits.clear();
                self.marked_cells.clear();
                self.recall_entered_at = Some(now);
                TimerOutcome::RecallStarted
            }
            (TimerKind::Feedback, Phase::Feedback) => {
                self.timer_epoch += 1;
                if self.time_remaining(now).is_zero() {
                    self.phase = Phase::Finished;
                    TimerOutcome::SessionExpired
                } else {
                    self.phase = Phase::Instruction;
                    TimerOutcome::AwaitingTrial
                }
            }
            _ => TimerOutcome::Ignored,
        }
    }

    /// One digit of sequential recall. The trial completes by itself once
    /// the expected number of digits has arrived.
    pub fn submit_digit(&mut self, digit: u8, now: Instant) -> InputOutcome {
        if self.phase != Phase::Recall
            || self.config.kind.family() != ExerciseFamily::Sequential
            || digit > 9
        {
            return InputOutcome::Ignored;
        }
        self.response_digits.push(digit);
        if self.response_digits.len() < self.stimulus.expected_len() {
            return InputOutcome::Recorded;
        }
        let response = std::mem::take(&mut self.response_digits);
        let correct = self.stimulus.check_digits(self.config.kind, &response);
        self.complete_trial(correct, now)
    }

    /// Marks or unmarks a cell during spatial recall.
    pub fn toggle_cell(&mut self, cell: Cell, _now: Instant) -> InputOutcome {
        if self.phase != Phase::Recall || self.config.kind.family() != ExerciseFamily::Spatial {
            return InputOutcome::Ignored;
        }
        if let Stimulus::Pattern { grid, .. } = &self.stimulus {
            if cell.row >= *grid || cell.col >= *grid {
                return InputOutcome::Ignored;
            }
        }
        if !self.marked_cells.remove(&cell) {
            self.marked_cells.insert(cell);
        }
        InputOutcome::Recorded
    }

    /// Submits the marked cell set; a pattern submission is one explicit
    /// action rather than count-bounded.
    pub fn submit_pattern(&mut self, now: Instant) -> InputOutcome {
        if self.phase != Phase::Recall || self.config.kind.family() != ExerciseFamily::Spatial {
            return InputOutcome::Ignored;
        }
        let marked = std::mem::take(&mut self.marked_cells);
        let correct = self.stimulus.check_cells(&marked);
        self.complete_trial(correct, now)
    }

    fn complete_trial(&mut self, correct: bool, now: Instant) -> InputOutcome {
        let response_time_ms = self
            .recall_entered_at
            .map(|entered| now.saturating_duration_since(entered).as_millis() as u64)
            .unwrap_or(0);
        self.trials.push(TrialResult {
            correct,
            response_time_ms,
            level_at_trial: self.level,
        });

        self.level = staircase::next(self.level, correct, self.config.adaptive_difficulty);
        self.stimulus = stimulus::generate(self.level, &mut self.rng);
        self.recall_entered_at = None;
        self.phase = Phase::Feedback;
        self.timer_epoch += 1;

        tracing::debug!(
            session_id = %self.session_id,
            correct,
            response_time_ms,
            next_level = ?self.level,
            "trial recorded"
        );

        InputOutcome::TrialComplete {
            correct,
            timer: PendingTimer {
                kind: TimerKind::Feedback,
                delay: Duration::from_millis(self.timing.feedback_ms),
                epoch: self.timer_epoch,
            },
        }
    }

    /// Terminal aggregation, reachable from any phase. Invalidates any
    /// outstanding timer epoch; a partially-entered recall is discarded.
    pub fn finalize(&mut self) -> SessionResult {
        self.phase = Phase::Finished;
        self.timer_epoch += 1;
        self.recall_entered_at = None;
        let result = scoring::aggregate(&self.trials, self.level, &self.scoring);
        tracing::info!(
            session_id = %self.session_id,
            trials = self.trials.len(),
            score = result.score,
            "session finalized"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::ExerciseCatalog;
    use crate::engine::types::ExerciseKind;

    fn machine_for(kind: ExerciseKind, seed: u64, now: Instant) -> SessionMachine {
        let config = *ExerciseCatalog::builtin().get(kind).unwrap();
        let starting = staircase::initial(kind.family());
        SessionMachine::new(
            Uuid::new_v4(),
            config,
            TimingParams::default(),
            ScoringParams::default(),
            starting,
            seed,
            now,
        )
    }

    fn run_presentation(machine: &mut SessionMachine, now: Instant) -> Instant {
        let timer = match machine.begin_trial() {
            BeginOutcome::Presenting { timer } => timer,
            BeginOutcome::Ignored => panic!("begin_trial ignored in phase {:?}", machine.phase()),
        };
        let fired = now + timer.delay;
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, fired),
            TimerOutcome::RecallStarted
        );
        fired
    }

    fn answer_digits(stimulus: &Stimulus, reverse: bool) -> Vec<u8> {
        match stimulus {
            Stimulus::Sequence { digits } => {
                let mut answer = digits.clone();
                if reverse {
                    answer.reverse();
                }
                answer
            }
            other => panic!("expected sequence stimulus, got {other:?}"),
        }
    }

    #[test]
    fn correct_digit_trial_raises_the_level() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        assert_eq!(machine.current_level(), DifficultyLevel::Sequence { length: 3 });

        let now = run_presentation(&mut machine, start);
        let answer = answer_digits(machine.stimulus(), false);
        let mut outcome = InputOutcome::Ignored;
        for (i, digit) in answer.iter().enumerate() {
            outcome = machine.submit_digit(*digit, now + Duration::from_millis(200 * i as u64));
        }
        match outcome {
            InputOutcome::TrialComplete { correct, timer } => {
                assert!(correct);
                assert_eq!(timer.kind, TimerKind::Feedback);
            }
            other => panic!("expected trial completion, got {other:?}"),
        }
        assert_eq!(machine.current_level(), DifficultyLevel::Sequence { length: 4 });
        assert_eq!(machine.trials().len(), 1);
        assert!(machine.trials()[0].correct);
    }

    #[test]
    fn wrong_answer_holds_the_floor_level() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 5, start);
        let now = run_presentation(&mut machine, start);

        let mut answer = answer_digits(machine.stimulus(), false);
        answer[0] = (answer[0] + 1) % 10;
        for digit in &answer {
            machine.submit_digit(*digit, now + Duration::from_millis(500));
        }
        assert!(!machine.trials()[0].correct);
        // Already at the family minimum; an incorrect trial cannot go lower.
        assert_eq!(machine.current_level(), DifficultyLevel::Sequence { length: 3 });
    }

    #[test]
    fn reverse_variant_expects_reversed_input() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::ReverseDigitSpan, 9, start);
        let now = run_presentation(&mut machine, start);

        let answer = answer_digits(machine.stimulus(), true);
        let mut outcome = InputOutcome::Ignored;
        for digit in &answer {
            outcome = machine.submit_digit(*digit, now + Duration::from_millis(300));
        }
        match outcome {
            InputOutcome::TrialComplete { correct, .. } => assert!(correct),
            other => panic!("expected trial completion, got {other:?}"),
        }
    }

    #[test]
    fn spatial_trial_matches_marked_cells() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::PatternMemory, 17, start);
        let now = run_presentation(&mut machine, start);

        let cells: Vec<Cell> = match machine.stimulus() {
            Stimulus::Pattern { cells, .. } => cells.iter().copied().collect(),
            other => panic!("expected pattern stimulus, got {other:?}"),
        };
        for cell in &cells {
            assert_eq!(
                machine.toggle_cell(*cell, now),
                InputOutcome::Recorded
            );
        }
        match machine.submit_pattern(now + Duration::from_millis(900)) {
            InputOutcome::TrialComplete { correct, .. } => assert!(correct),
            other => panic!("expected trial completion, got {other:?}"),
        }
        assert_eq!(
            machine.current_level(),
            DifficultyLevel::Pattern { count: 4, grid: 3 }
        );
    }

    #[test]
    fn toggling_twice_unmarks_a_cell() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::PatternMemory, 17, start);
        let now = run_presentation(&mut machine, start);

        let cells: Vec<Cell> = match machine.stimulus() {
            Stimulus::Pattern { cells, .. } => cells.iter().copied().collect(),
            other => panic!("expected pattern stimulus, got {other:?}"),
        };
        for cell in &cells {
            machine.toggle_cell(*cell, now);
        }
        // Unmark one required cell; the submission no longer matches.
        machine.toggle_cell(cells[0], now);
        match machine.submit_pattern(now) {
            InputOutcome::TrialComplete { correct, .. } => assert!(!correct),
            other => panic!("expected trial completion, got {other:?}"),
        }
    }

    #[test]
    fn stale_presentation_timer_is_ignored() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        let timer = match machine.begin_trial() {
            BeginOutcome::Presenting { timer } => timer,
            BeginOutcome::Ignored => panic!("begin_trial ignored"),
        };
        let now = start + timer.delay;
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, now),
            TimerOutcome::RecallStarted
        );
        // The same timer firing again carries a dead epoch.
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, now),
            TimerOutcome::Ignored
        );
        assert_eq!(machine.phase(), Phase::Recall);
    }

    #[test]
    fn input_outside_recall_is_ignored() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        assert_eq!(machine.submit_digit(4, start), InputOutcome::Ignored);
        machine.begin_trial();
        assert_eq!(machine.submit_digit(4, start), InputOutcome::Ignored);
    }

    #[test]
    fn digit_input_is_rejected_for_spatial_exercises() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::PatternMemory, 3, start);
        let now = run_presentation(&mut machine, start);
        assert_eq!(machine.submit_digit(4, now), InputOutcome::Ignored);
        assert!(matches!(
            machine.submit_pattern(now),
            InputOutcome::TrialComplete { .. }
        ));
    }

    #[test]
    fn out_of_grid_cells_are_ignored() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::PatternMemory, 3, start);
        let now = run_presentation(&mut machine, start);
        assert_eq!(
            machine.toggle_cell(Cell { row: 7, col: 0 }, now),
            InputOutcome::Ignored
        );
    }

    #[test]
    fn feedback_timer_past_the_deadline_expires_the_session() {
        let start = Instant::now();
        let config = *ExerciseCatalog::builtin()
            .get(ExerciseKind::DigitSpan)
            .unwrap();
        let mut machine = SessionMachine::new(
            Uuid::new_v4(),
            config,
            TimingParams::default(),
            ScoringParams::default(),
            DifficultyLevel::Sequence { length: 3 },
            3,
            start,
        );
        let now = run_presentation(&mut machine, start);
        let answer = answer_digits(machine.stimulus(), false);
        let mut outcome = InputOutcome::Ignored;
        for digit in &answer {
            outcome = machine.submit_digit(*digit, now);
        }
        let timer = match outcome {
            InputOutcome::TrialComplete { timer, .. } => timer,
            other => panic!("expected trial completion, got {other:?}"),
        };
        // Deliver the feedback timer after the whole session budget.
        let long_after = start + machine.budget() + Duration::from_secs(1);
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, long_after),
            TimerOutcome::SessionExpired
        );
        assert!(machine.is_finished());
    }

    #[test]
    fn feedback_timer_with_budget_left_loops_to_instruction() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        let now = run_presentation(&mut machine, start);
        let answer = answer_digits(machine.stimulus(), false);
        let mut outcome = InputOutcome::Ignored;
        for digit in &answer {
            outcome = machine.submit_digit(*digit, now);
        }
        let timer = match outcome {
            InputOutcome::TrialComplete { timer, .. } => timer,
            other => panic!("expected trial completion, got {other:?}"),
        };
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, now + timer.delay),
            TimerOutcome::AwaitingTrial
        );
        assert_eq!(machine.phase(), Phase::Instruction);
    }

    #[test]
    fn finalize_with_zero_trials_reports_degenerate_result() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        machine.begin_trial();
        let result = machine.finalize();
        assert_eq!(result.score, 0);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.completion_rate, 0.0);
        assert_eq!(result.final_level, DifficultyLevel::Sequence { length: 3 });
        assert!(machine.is_finished());
    }

    #[test]
    fn finalize_invalidates_outstanding_timers() {
        let start = Instant::now();
        let mut machine = machine_for(ExerciseKind::DigitSpan, 3, start);
        let timer = match machine.begin_trial() {
            BeginOutcome::Presenting { timer } => timer,
            BeginOutcome::Ignored => panic!("begin_trial ignored"),
        };
        machine.finalize();
        assert_eq!(
            machine.handle_timer(timer.kind, timer.epoch, start + timer.delay),
            TimerOutcome::Ignored
        );
    }
}
