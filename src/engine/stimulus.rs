use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::staircase;
use crate::engine::types::{DifficultyLevel, ExerciseKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

/// One trial's presented material. Sequential exercises present digits one
/// at a time; spatial exercises flash a set of highlighted grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stimulus {
    Sequence { digits: Vec<u8> },
    Pattern { grid: u8, cells: BTreeSet<Cell> },
}

/// Generates a stimulus at the given level. Out-of-bounds levels are
/// clamped first, so pattern cells always fit the grid.
pub fn generate<R: Rng + ?Sized>(level: DifficultyLevel, rng: &mut R) -> Stimulus {
    match staircase::clamp_level(level) {
        DifficultyLevel::Sequence { length } => {
            let digits = (0..length).map(|_| rng.gen_range(0..=9u8)).collect();
            Stimulus::Sequence { digits }
        }
        DifficultyLevel::Pattern { count, grid } => {
            let side = grid as usize;
            let picks = rand::seq::index::sample(rng, side * side, count as usize);
            let cells = picks
                .into_iter()
                .map(|idx| Cell {
                    row: (idx / side) as u8,
                    col: (idx % side) as u8,
                })
                .collect();
            Stimulus::Pattern { grid, cells }
        }
    }
}

impl Stimulus {
    /// Number of recall responses the trial expects.
    pub fn expected_len(&self) -> usize {
        match self {
            Self::Sequence { digits } => digits.len(),
            Self::Pattern { cells, .. } => cells.len(),
        }
    }

    /// Exact-match check for the sequential family. The reverse variant
    /// accepts only the reversal of the presented order.
    pub fn check_digits(&self, kind: ExerciseKind, response: &[u8]) -> bool {
        match self {
            Self::Sequence { digits } => {
                if matches!(kind, ExerciseKind::ReverseDigitSpan) {
                    response.iter().eq(digits.iter().rev())
                } else {
                    response == digits.as_slice()
                }
            }
            Self::Pattern { .. } => false,
        }
    }

    /// Exact cell-for-cell match for the spatial family.
    pub fn check_cells(&self, marked: &BTreeSet<Cell>) -> bool {
        match self {
            Self::Pattern { cells, .. } => marked == cells,
            Self::Sequence { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn sequence_has_requested_length_and_digit_range() {
        for length in 3..=9u8 {
            let stimulus = generate(DifficultyLevel::Sequence { length }, &mut rng(7));
            match stimulus {
                Stimulus::Sequence { digits } => {
                    assert_eq!(digits.len(), length as usize);
                    assert!(digits.iter().all(|d| *d <= 9));
                }
                other => panic!("expected sequence, got {other:?}"),
            }
        }
    }

    #[test]
    fn pattern_has_exact_count_without_replacement() {
        let stimulus = generate(DifficultyLevel::Pattern { count: 6, grid: 4 }, &mut rng(11));
        match stimulus {
            Stimulus::Pattern { grid, cells } => {
                assert_eq!(grid, 4);
                assert_eq!(cells.len(), 6, "set size proves no duplicates");
                assert!(cells.iter().all(|c| c.row < 4 && c.col < 4));
            }
            other => panic!("expected pattern, got {other:?}"),
        }
    }

    #[test]
    fn same_seed_reproduces_the_stimulus() {
        let level = DifficultyLevel::Pattern { count: 4, grid: 3 };
        let a = generate(level, &mut rng(42));
        let b = generate(level, &mut rng(42));
        assert_eq!(a, b);
    }

    #[test]
    fn forward_check_rejects_reversed_input() {
        let stimulus = Stimulus::Sequence {
            digits: vec![1, 2, 3],
        };
        assert!(stimulus.check_digits(ExerciseKind::DigitSpan, &[1, 2, 3]));
        assert!(!stimulus.check_digits(ExerciseKind::DigitSpan, &[3, 2, 1]));
    }

    #[test]
    fn reverse_check_accepts_only_the_reversal() {
        let stimulus = Stimulus::Sequence {
            digits: vec![1, 2, 3],
        };
        assert!(stimulus.check_digits(ExerciseKind::ReverseDigitSpan, &[3, 2, 1]));
        assert!(!stimulus.check_digits(ExerciseKind::ReverseDigitSpan, &[1, 2, 3]));
    }

    #[test]
    fn palindrome_sequences_accept_both_orders() {
        let stimulus = Stimulus::Sequence {
            digits: vec![4, 5, 4],
        };
        assert!(stimulus.check_digits(ExerciseKind::ReverseDigitSpan, &[4, 5, 4]));
    }

    #[test]
    fn cell_check_requires_exact_set_equality() {
        let cells: BTreeSet<Cell> = [Cell { row: 0, col: 0 }, Cell { row: 2, col: 1 }]
            .into_iter()
            .collect();
        let stimulus = Stimulus::Pattern { grid: 3, cells };

        let exact: BTreeSet<Cell> = [Cell { row: 0, col: 0 }, Cell { row: 2, col: 1 }]
            .into_iter()
            .collect();
        assert!(stimulus.check_cells(&exact));

        let subset: BTreeSet<Cell> = [Cell { row: 0, col: 0 }].into_iter().collect();
        assert!(!stimulus.check_cells(&subset));

        let superset: BTreeSet<Cell> = [
            Cell { row: 0, col: 0 },
            Cell { row: 2, col: 1 },
            Cell { row: 1, col: 1 },
        ]
        .into_iter()
        .collect();
        assert!(!stimulus.check_cells(&superset));
    }
}
