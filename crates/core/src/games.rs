//! Correctness predicates for the four mini-games.
//!
//! Every game is the same interaction: items move between containers (or get
//! toggled), and the question is solved once a numeric condition holds. Each
//! variant gets one pure predicate, selected by a single `match`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Operation, QuestionKind, SortOrder};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameError {
    #[error("arrangement for {found} submitted to a {expected} question")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no item left in the {0} container")]
    EmptyContainer(Container),
}

//
// ─── CONTAINERS ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    First,
    Second,
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::First => f.write_str("first"),
            Container::Second => f.write_str("second"),
        }
    }
}

/// Item counts of the two drop zones used by the box and equation games.
///
/// Box: `first` is the box, `second` is outside.
/// Equation: `first` is the item pool, `second` is the missing-operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TwoContainers {
    pub first: u32,
    pub second: u32,
}

impl TwoContainers {
    #[must_use]
    pub fn new(first: u32, second: u32) -> Self {
        Self { first, second }
    }

    /// Drag one item out of `from` into the other container.
    ///
    /// # Errors
    ///
    /// Returns `GameError::EmptyContainer` if `from` holds no items.
    pub fn drag_from(&mut self, from: Container) -> Result<(), GameError> {
        let (src, dst) = match from {
            Container::First => (&mut self.first, &mut self.second),
            Container::Second => (&mut self.second, &mut self.first),
        };
        *src = src.checked_sub(1).ok_or(GameError::EmptyContainer(from))?;
        *dst = dst.saturating_add(1);
        Ok(())
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.first.saturating_add(self.second)
    }
}

//
// ─── ARRANGEMENTS ──────────────────────────────────────────────────────────────
//

/// Current state of a game board, as produced by the learner's drags and taps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Arrangement {
    ColorUp { colored: Vec<bool> },
    Sort { values: Vec<i64> },
    Box(TwoContainers),
    Equation(TwoContainers),
}

impl Arrangement {
    /// The untouched board a question starts from.
    #[must_use]
    pub fn initial(kind: &QuestionKind) -> Self {
        match kind {
            QuestionKind::ColorUp { total_items, .. } => Arrangement::ColorUp {
                colored: vec![false; usize::try_from(*total_items).unwrap_or(0)],
            },
            QuestionKind::Sort { values, .. } => Arrangement::Sort {
                values: values.clone(),
            },
            QuestionKind::Box { start_in_box, .. } => {
                Arrangement::Box(TwoContainers::new(*start_in_box, 0))
            }
            QuestionKind::Equation {
                operand1, result, ..
            } => Arrangement::Equation(TwoContainers::new((*operand1).max(*result), 0)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Arrangement::ColorUp { .. } => "color-up",
            Arrangement::Sort { .. } => "sort",
            Arrangement::Box(_) => "box",
            Arrangement::Equation(_) => "equation",
        }
    }
}

//
// ─── PREDICATES ────────────────────────────────────────────────────────────────
//

/// Decide whether `arrangement` solves a question of the given kind.
///
/// # Errors
///
/// Returns `GameError::KindMismatch` when the arrangement belongs to another game.
pub fn evaluate(kind: &QuestionKind, arrangement: &Arrangement) -> Result<bool, GameError> {
    match (kind, arrangement) {
        (QuestionKind::ColorUp { target_colored, .. }, Arrangement::ColorUp { colored }) => {
            Ok(color_up_correct(colored, *target_colored))
        }
        (QuestionKind::Sort { values, order }, Arrangement::Sort { values: arranged }) => {
            Ok(is_permutation(values, arranged) && sort_correct(arranged, *order))
        }
        (QuestionKind::Box { target_in_box, .. }, Arrangement::Box(containers)) => {
            Ok(containers.first == *target_in_box)
        }
        (
            QuestionKind::Equation {
                operand1,
                operation,
                result,
            },
            Arrangement::Equation(containers),
        ) => Ok(needed_count(*operand1, *operation, *result) == Some(containers.second)),
        (kind, arrangement) => Err(GameError::KindMismatch {
            expected: kind.name(),
            found: arrangement.name(),
        }),
    }
}

/// Exactly `target` items are colored.
#[must_use]
pub fn color_up_correct(colored: &[bool], target: u32) -> bool {
    let count = colored.iter().filter(|c| **c).count();
    u32::try_from(count).is_ok_and(|count| count == target)
}

/// Values follow `order` across the whole list; equal neighbours are allowed.
#[must_use]
pub fn sort_correct(values: &[i64], order: SortOrder) -> bool {
    values.windows(2).all(|pair| match order {
        SortOrder::Ascending => pair[0] <= pair[1],
        SortOrder::Descending => pair[0] >= pair[1],
    })
}

fn is_permutation(expected: &[i64], arranged: &[i64]) -> bool {
    if expected.len() != arranged.len() {
        return false;
    }
    let mut a = expected.to_vec();
    let mut b = arranged.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Items the learner must drag into the missing-operand slot.
///
/// `None` when no whole, non-negative count solves the equation (negative
/// difference, zero divisor, or a remainder). Such questions can never be solved.
#[must_use]
pub fn needed_count(operand1: u32, operation: Operation, result: u32) -> Option<u32> {
    match operation {
        Operation::Add => result.checked_sub(operand1),
        Operation::Sub => operand1.checked_sub(result),
        Operation::Mul => {
            if operand1 == 0 || result % operand1 != 0 {
                None
            } else {
                Some(result / operand1)
            }
        }
        Operation::Div => {
            if result == 0 || operand1 % result != 0 {
                None
            } else {
                Some(operand1 / result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn equation(operand1: u32, operation: Operation, result: u32) -> QuestionKind {
        QuestionKind::Equation {
            operand1,
            operation,
            result,
        }
    }

    #[test]
    fn equation_needs_four_for_three_plus_what_is_seven() {
        let kind = equation(3, Operation::Add, 7);
        assert_eq!(needed_count(3, Operation::Add, 7), Some(4));
        for (dragged, expected) in [(3, false), (4, true), (5, false)] {
            let arrangement = Arrangement::Equation(TwoContainers::new(10 - dragged, dragged));
            assert_eq!(evaluate(&kind, &arrangement).unwrap(), expected, "dragged {dragged}");
        }
    }

    #[test]
    fn equation_needed_for_each_operation() {
        assert_eq!(needed_count(9, Operation::Sub, 4), Some(5));
        assert_eq!(needed_count(3, Operation::Mul, 12), Some(4));
        assert_eq!(needed_count(12, Operation::Div, 3), Some(4));
    }

    #[test]
    fn equation_without_whole_answer_is_never_correct() {
        assert_eq!(needed_count(0, Operation::Mul, 5), None);
        assert_eq!(needed_count(5, Operation::Div, 0), None);
        assert_eq!(needed_count(3, Operation::Mul, 7), None);
        assert_eq!(needed_count(7, Operation::Div, 2), None);
        assert_eq!(needed_count(8, Operation::Add, 5), None);
        assert_eq!(needed_count(2, Operation::Sub, 5), None);

        let kind = equation(0, Operation::Mul, 5);
        for dragged in 0..=5 {
            let arrangement = Arrangement::Equation(TwoContainers::new(5 - dragged, dragged));
            assert!(!evaluate(&kind, &arrangement).unwrap());
        }
    }

    #[test]
    fn sort_accepts_ascending_rearrangement() {
        let kind = QuestionKind::Sort {
            values: vec![4, 2, 3],
            order: SortOrder::Ascending,
        };
        let sorted = Arrangement::Sort {
            values: vec![2, 3, 4],
        };
        let unsorted = Arrangement::Sort {
            values: vec![2, 4, 3],
        };
        assert!(evaluate(&kind, &sorted).unwrap());
        assert!(!evaluate(&kind, &unsorted).unwrap());
    }

    #[test]
    fn sort_honours_descending_order() {
        let kind = QuestionKind::Sort {
            values: vec![4, 2, 3],
            order: SortOrder::Descending,
        };
        assert!(evaluate(&kind, &Arrangement::Sort { values: vec![4, 3, 2] }).unwrap());
        assert!(!evaluate(&kind, &Arrangement::Sort { values: vec![2, 3, 4] }).unwrap());
    }

    #[test]
    fn sort_allows_duplicates() {
        assert!(sort_correct(&[1, 2, 2, 5], SortOrder::Ascending));
        assert!(sort_correct(&[5, 5, 1], SortOrder::Descending));
    }

    #[test]
    fn sort_rejects_changed_values() {
        let kind = QuestionKind::Sort {
            values: vec![4, 2, 3],
            order: SortOrder::Ascending,
        };
        assert!(!evaluate(&kind, &Arrangement::Sort { values: vec![1, 2, 3] }).unwrap());
    }

    #[test]
    fn box_flips_exactly_at_target() {
        let kind = QuestionKind::Box {
            start_in_box: 15,
            target_in_box: 3,
        };
        let mut board = Arrangement::initial(&kind);
        let mut solved_at = Vec::new();
        for step in 0..15 {
            if evaluate(&kind, &board).unwrap() {
                solved_at.push(step);
            }
            if let Arrangement::Box(containers) = &mut board {
                containers.drag_from(Container::First).unwrap();
            }
        }
        assert_eq!(solved_at, vec![12]);
    }

    #[test]
    fn color_up_counts_colored_items() {
        let kind = QuestionKind::ColorUp {
            total_items: 5,
            target_colored: 2,
        };
        let board = Arrangement::ColorUp {
            colored: vec![true, false, true, false, false],
        };
        assert!(evaluate(&kind, &board).unwrap());
        let board = Arrangement::ColorUp {
            colored: vec![true, true, true, false, false],
        };
        assert!(!evaluate(&kind, &board).unwrap());
    }

    #[test]
    fn mismatched_arrangement_is_an_error() {
        let kind = QuestionKind::Box {
            start_in_box: 2,
            target_in_box: 1,
        };
        let err = evaluate(&kind, &Arrangement::Sort { values: vec![] }).unwrap_err();
        assert_eq!(
            err,
            GameError::KindMismatch {
                expected: "box",
                found: "sort"
            }
        );
    }

    #[test]
    fn drag_from_empty_container_fails() {
        let mut containers = TwoContainers::new(0, 2);
        assert_eq!(
            containers.drag_from(Container::First).unwrap_err(),
            GameError::EmptyContainer(Container::First)
        );
        containers.drag_from(Container::Second).unwrap();
        assert_eq!(containers, TwoContainers::new(1, 1));
    }

    #[test]
    fn equation_pool_holds_enough_items() {
        let kind = equation(12, Operation::Div, 3);
        let Arrangement::Equation(pool) = Arrangement::initial(&kind) else {
            panic!("expected equation board");
        };
        assert!(pool.first >= 4);
    }

    proptest! {
        #[test]
        fn any_sorted_permutation_is_correct(mut values in proptest::collection::vec(-50_i64..50, 1..12)) {
            let kind = QuestionKind::Sort { values: values.clone(), order: SortOrder::Ascending };
            values.sort_unstable();
            let arrangement = Arrangement::Sort { values };
            prop_assert!(evaluate(&kind, &arrangement).unwrap());
        }

        #[test]
        fn dragging_preserves_item_total(first in 0_u32..20, second in 0_u32..20, moves in proptest::collection::vec(any::<bool>(), 0..40)) {
            let mut containers = TwoContainers::new(first, second);
            for to_second in moves {
                let from = if to_second { Container::First } else { Container::Second };
                let _ = containers.drag_from(from);
            }
            prop_assert_eq!(containers.total(), first + second);
        }
    }
}
