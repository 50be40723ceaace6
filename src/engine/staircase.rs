//! 1-up/1-down difficulty staircase. Raises the level after a correct
//! trial, lowers it after an incorrect one, clamped to per-family bounds.
//! Engagement-oriented, not a psychometric threshold estimator.

use crate::engine::types::{DifficultyLevel, ExerciseFamily};

pub const SEQUENCE_MIN: u8 = 3;
pub const SEQUENCE_MAX: u8 = 9;
pub const PATTERN_MIN: u8 = 3;
pub const PATTERN_MAX: u8 = 6;
pub const GRID_MIN: u8 = 3;
pub const GRID_MAX: u8 = 5;

/// Lowest level of a family, used when no profile signal is available.
pub fn initial(family: ExerciseFamily) -> DifficultyLevel {
    match family {
        ExerciseFamily::Sequential => DifficultyLevel::Sequence {
            length: SEQUENCE_MIN,
        },
        ExerciseFamily::Spatial => DifficultyLevel::Pattern {
            count: PATTERN_MIN,
            grid: GRID_MIN,
        },
    }
}

/// Maps a capacity score in `[0, 10]` onto the family's scalar bounds to
/// pick a starting level. Spatial levels start on the smallest grid.
pub fn implied_level(family: ExerciseFamily, capacity: f64) -> DifficultyLevel {
    let t = (capacity / 10.0).clamp(0.0, 1.0);
    match family {
        ExerciseFamily::Sequential => {
            let span = (SEQUENCE_MAX - SEQUENCE_MIN) as f64;
            DifficultyLevel::Sequence {
                length: SEQUENCE_MIN + (t * span).round() as u8,
            }
        }
        ExerciseFamily::Spatial => {
            let span = (PATTERN_MAX - PATTERN_MIN) as f64;
            DifficultyLevel::Pattern {
                count: PATTERN_MIN + (t * span).round() as u8,
                grid: GRID_MIN,
            }
        }
    }
}

pub fn max_scalar(family: ExerciseFamily) -> u32 {
    match family {
        ExerciseFamily::Sequential => SEQUENCE_MAX as u32,
        ExerciseFamily::Spatial => PATTERN_MAX as u32,
    }
}

pub fn clamp_level(level: DifficultyLevel) -> DifficultyLevel {
    match level {
        DifficultyLevel::Sequence { length } => DifficultyLevel::Sequence {
            length: length.clamp(SEQUENCE_MIN, SEQUENCE_MAX),
        },
        DifficultyLevel::Pattern { count, grid } => DifficultyLevel::Pattern {
            count: count.clamp(PATTERN_MIN, PATTERN_MAX),
            grid: grid.clamp(GRID_MIN, GRID_MAX),
        },
    }
}

/// One staircase step. With `adaptive` false the level passes through
/// unchanged (clamped), whatever the outcome.
pub fn next(level: DifficultyLevel, was_correct: bool, adaptive: bool) -> DifficultyLevel {
    let level = clamp_level(level);
    if !adaptive {
        return level;
    }

    match level {
        DifficultyLevel::Sequence { length } => {
            let length = if was_correct {
                (length + 1).min(SEQUENCE_MAX)
            } else {
                (length - 1).max(SEQUENCE_MIN)
            };
            DifficultyLevel::Sequence { length }
        }
        DifficultyLevel::Pattern { count, grid } => {
            if was_correct {
                if count < PATTERN_MAX {
                    DifficultyLevel::Pattern {
                        count: count + 1,
                        grid,
                    }
                } else if grid < GRID_MAX {
                    // Full count on this grid: move to the larger grid and
                    // restart the count at the family minimum.
                    DifficultyLevel::Pattern {
                        count: PATTERN_MIN,
                        grid: grid + 1,
                    }
                } else {
                    level
                }
            } else if count > PATTERN_MIN {
                DifficultyLevel::Pattern {
                    count: count - 1,
                    grid,
                }
            } else if grid > GRID_MIN {
                DifficultyLevel::Pattern {
                    count: PATTERN_MAX,
                    grid: grid - 1,
                }
            } else {
                level
            }
        }
    }
}
