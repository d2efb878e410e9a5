#![allow(dead_code)]

use std::sync::Arc;

use mathquest_core::games::{Arrangement, TwoContainers, needed_count};
use mathquest_core::model::{
    LearnerId, Level, LevelId, PlacementQuestion, Question, QuestionId, QuestionKind,
    QuestionRecord, QuizQuestion, SortOrder, SublevelId,
};
use mathquest_core::time::fixed_now;
use services::backend::{Backend, ContentPack, PracticeSet, QuizSet};
use services::{Clock, LearnerService, ProgressionService};
use storage::repository::InMemoryRepository;

pub const LEARNER: LearnerId = LearnerId::new(1);

fn record(id: u64, kind: &str) -> QuestionRecord {
    QuestionRecord {
        id: QuestionId::new(id),
        prompt: format!("question {id}"),
        kind: kind.into(),
        ..QuestionRecord::default()
    }
}

pub fn color_up(id: u64) -> QuestionRecord {
    QuestionRecord {
        total_items: Some(6),
        target_colored: Some(4),
        ..record(id, "color-up")
    }
}

pub fn boxed(id: u64) -> QuestionRecord {
    QuestionRecord {
        start_in_box: Some(9),
        target_in_box: Some(5),
        ..record(id, "box")
    }
}

pub fn equation(id: u64) -> QuestionRecord {
    QuestionRecord {
        operand1: Some(3),
        operation: Some("+".into()),
        result: Some(7),
        ..record(id, "equation")
    }
}

pub fn sort_desc(id: u64) -> QuestionRecord {
    QuestionRecord {
        values: Some(vec![4, 9, 1]),
        order: Some("descending".into()),
        ..record(id, "sort")
    }
}

pub fn quiz(level: u64, count: u64) -> QuizSet {
    QuizSet {
        level_id: LevelId::new(level),
        questions: (1..=count)
            .map(|n| QuizQuestion {
                id: QuestionId::new(level * 1000 + n),
                prompt: format!("{n} + {n}"),
                options: vec![(2 * n).to_string(), (2 * n + 1).to_string()],
                correct_answer: (2 * n).to_string(),
            })
            .collect(),
    }
}

pub fn quiz_answer(question: &QuizQuestion, correct: bool) -> String {
    if correct {
        question.correct_answer.clone()
    } else {
        format!("{}?", question.correct_answer)
    }
}

/// Two levels: level 1 has sublevels 11 and 12, level 2 has only 21.
pub fn pack() -> ContentPack {
    let level1 = Level::new(
        LevelId::new(1),
        "Counting",
        vec![
            (SublevelId::new(11), "Color".into()),
            (SublevelId::new(12), "Boxes".into()),
        ],
        None,
    )
    .unwrap();
    let level2 = Level::new(
        LevelId::new(2),
        "Adding",
        vec![(SublevelId::new(21), "Equations".into())],
        Some(75),
    )
    .unwrap();

    ContentPack {
        levels: vec![level1, level2],
        practice: vec![
            PracticeSet {
                level_id: LevelId::new(1),
                sublevel_id: SublevelId::new(11),
                questions: vec![color_up(1), sort_desc(2), color_up(3)],
            },
            PracticeSet {
                level_id: LevelId::new(1),
                sublevel_id: SublevelId::new(12),
                questions: vec![boxed(4), boxed(5)],
            },
            PracticeSet {
                level_id: LevelId::new(2),
                sublevel_id: SublevelId::new(21),
                questions: vec![equation(6), equation(7)],
            },
        ],
        quizzes: vec![quiz(1, 10), quiz(2, 4)],
        placement: Vec::new(),
    }
}

pub fn with_placement(mut pack: ContentPack) -> ContentPack {
    pack.placement = quiz(1, 2)
        .questions
        .into_iter()
        .map(|question| PlacementQuestion { question, level: 1 })
        .chain(
            quiz(2, 2)
                .questions
                .into_iter()
                .map(|question| PlacementQuestion { question, level: 2 }),
        )
        .collect();
    pack
}

/// The board a perfect learner would submit.
pub fn solve(question: &Question) -> Arrangement {
    match &question.kind {
        QuestionKind::ColorUp {
            total_items,
            target_colored,
        } => Arrangement::ColorUp {
            colored: (0..*total_items).map(|i| i < *target_colored).collect(),
        },
        QuestionKind::Sort { values, order } => {
            let mut values = values.clone();
            values.sort_unstable();
            if *order == SortOrder::Descending {
                values.reverse();
            }
            Arrangement::Sort { values }
        }
        QuestionKind::Box {
            start_in_box,
            target_in_box,
        } => Arrangement::Box(TwoContainers::new(
            *target_in_box,
            start_in_box - target_in_box,
        )),
        QuestionKind::Equation {
            operand1,
            operation,
            result,
        } => {
            let needed = needed_count(*operand1, *operation, *result).unwrap_or(0);
            Arrangement::Equation(TwoContainers::new(0, needed))
        }
    }
}

/// The untouched board, which solves none of the questions in `pack`.
pub fn fumble(question: &Question) -> Arrangement {
    Arrangement::initial(&question.kind)
}

pub struct Harness {
    pub repo: InMemoryRepository,
    pub learners: LearnerService,
    pub progression: ProgressionService,
}

pub fn harness(backend: Arc<dyn Backend>) -> Harness {
    let repo = InMemoryRepository::new();
    harness_with(repo, backend)
}

pub fn harness_with(repo: InMemoryRepository, backend: Arc<dyn Backend>) -> Harness {
    let learners = LearnerService::new(Arc::new(repo.clone()), Arc::new(repo.clone()));
    let progression = ProgressionService::new(
        Clock::fixed(fixed_now()),
        backend,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    Harness {
        repo,
        learners,
        progression,
    }
}
