//! Terminal rendition of the drag-and-drop games.
//!
//! Each game board is driven through the same moves the touch UI would make:
//! taps color items, drags move one item between containers.

use std::io::{self, BufRead, Write};

use mathquest_core::games::{Arrangement, Container, TwoContainers};
use mathquest_core::model::{LearnerId, Question, QuestionKind, QuizQuestion};
use mathquest_core::progression::{PracticeStep, ProgressionError};
use services::{Activity, LearnerJourney, ProgressionService, ProgressionServiceError};

type PlayResult = Result<(), Box<dyn std::error::Error>>;

/// Read one trimmed line. `None` on end of input or `q`.
fn ask(input: &mut impl BufRead, message: &str) -> io::Result<Option<String>> {
    print!("{message} ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim().to_string();
    if line.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    Ok(Some(line))
}

fn ask_count(input: &mut impl BufRead, message: &str) -> io::Result<Option<u32>> {
    loop {
        let Some(line) = ask(input, message)? else {
            return Ok(None);
        };
        match line.parse() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => println!("Please type a whole number (or q to stop)."),
        }
    }
}

enum Step {
    Placement,
    OfferQuiz,
    Practice,
    Quiz,
    Done,
}

/// Backend trouble the learner can try again; the journey is left as it was.
fn retryable(err: &ProgressionServiceError) -> bool {
    matches!(
        err,
        ProgressionServiceError::Backend(_)
            | ProgressionServiceError::Busy
            | ProgressionServiceError::Progression(ProgressionError::NoContent)
    )
}

fn offer_retry(input: &mut impl BufRead, err: &dyn std::error::Error) -> io::Result<bool> {
    println!("Something went wrong: {err}. Your progress is kept.");
    Ok(ask(input, "Try again? [y/n]")?.is_some_and(|answer| answer.eq_ignore_ascii_case("y")))
}

pub async fn run(progression: &ProgressionService, learner_id: LearnerId) -> PlayResult {
    let stdin = io::stdin();
    play(progression, learner_id, &mut stdin.lock()).await
}

async fn play(
    progression: &ProgressionService,
    learner_id: LearnerId,
    input: &mut impl BufRead,
) -> PlayResult {
    let mut journey = loop {
        match progression.start(learner_id).await {
            Ok(journey) => break journey,
            Err(err) if retryable(&err) => {
                if !offer_retry(input, &err)? {
                    return Ok(());
                }
            }
            Err(err) => return Err(err.into()),
        }
    };

    loop {
        let next = match journey.activity() {
            Activity::Placement(_) => Step::Placement,
            Activity::Practice(session) if session.quiz_unlocked() => Step::OfferQuiz,
            Activity::Practice(_) => Step::Practice,
            Activity::Quiz { .. } => Step::Quiz,
            Activity::Complete => Step::Done,
        };
        let keep_going = match step(progression, &mut journey, input, next).await {
            Ok(keep_going) => keep_going,
            Err(err) => {
                if !err
                    .downcast_ref::<ProgressionServiceError>()
                    .is_some_and(retryable)
                {
                    return Err(err);
                }
                offer_retry(input, &*err)?
            }
        };
        if !keep_going {
            break;
        }
    }
    println!("Bye! You are on level {}.", journey.learner().level());
    Ok(())
}

async fn step(
    progression: &ProgressionService,
    journey: &mut LearnerJourney,
    input: &mut impl BufRead,
    next: Step,
) -> Result<bool, Box<dyn std::error::Error>> {
    match next {
        Step::Placement => placement(progression, journey, input).await,
        Step::OfferQuiz => match ask(input, "The level quiz is unlocked. Take it now? [y/n]")? {
            None => Ok(false),
            Some(answer) if answer.eq_ignore_ascii_case("y") => {
                progression.start_quiz(journey).await?;
                Ok(true)
            }
            Some(_) => practice(progression, journey, input).await,
        },
        Step::Practice => practice(progression, journey, input).await,
        Step::Quiz => quiz(progression, journey, input).await,
        Step::Done => {
            println!("You finished every level. Well done!");
            Ok(false)
        }
    }
}

async fn placement(
    progression: &ProgressionService,
    journey: &mut LearnerJourney,
    input: &mut impl BufRead,
) -> Result<bool, Box<dyn std::error::Error>> {
    println!("First, a short quiz to find the right level for you.");
    while let Some(next) = journey.placement().and_then(|s| s.next_unanswered()).cloned() {
        let Some(answer) = ask_quiz_question(input, &next.question)? else {
            return Ok(false);
        };
        progression.answer_placement(journey, next.question.id, &answer)?;
    }
    let outcome = progression.submit_placement(journey).await?;
    println!("You start at level {}.", outcome.result.level);
    if let Some(err) = outcome.sync_error {
        println!("(Saved on this device; could not reach the server: {err})");
    }
    Ok(true)
}

async fn practice(
    progression: &ProgressionService,
    journey: &mut LearnerJourney,
    input: &mut impl BufRead,
) -> Result<bool, Box<dyn std::error::Error>> {
    let question = progression.next_practice_question(journey).await?;
    if let (Some(level), Some(session)) = (journey.current_level(), journey.practice()) {
        println!(
            "\n[{} - part {}/{}] {}",
            level.name(),
            session.sublevel_index() + 1,
            session.sublevel_count(),
            question.prompt.as_str()
        );
    }
    let Some(arrangement) = play_board(input, &question)? else {
        return Ok(false);
    };
    let answer = progression.answer_practice(journey, question.id, &arrangement)?;
    println!("{}", if answer.correct { "Correct!" } else { "Not quite." });
    match answer.step {
        PracticeStep::Continue => {}
        PracticeStep::AdvancedSublevel { to, .. } => println!("On to part {}!", to + 1),
        PracticeStep::QuizUnlocked => println!("You unlocked the level quiz!"),
    }
    Ok(true)
}

async fn quiz(
    progression: &ProgressionService,
    journey: &mut LearnerJourney,
    input: &mut impl BufRead,
) -> Result<bool, Box<dyn std::error::Error>> {
    while let Some(next) = journey.quiz().and_then(|q| q.next_unanswered()).cloned() {
        let Some(answer) = ask_quiz_question(input, &next)? else {
            progression.abandon_quiz(journey)?;
            return Ok(false);
        };
        progression.answer_quiz(journey, next.id, &answer)?;
    }
    let outcome = progression.submit_quiz(journey).await?;
    let result = outcome.result;
    println!(
        "You got {}/{} ({}%). {}",
        result.correct,
        result.total,
        result.percentage,
        if result.passed {
            "You passed, on to the next level!"
        } else {
            "Keep practicing and try again."
        }
    );
    if let Some(receipt) = outcome.receipt.filter(|r| !r.message.is_empty()) {
        println!("{}", receipt.message);
    }
    if let Some(err) = outcome.sync_error {
        println!("(Saved on this device; could not reach the server: {err})");
    }
    Ok(true)
}

/// Show a quiz question; a letter picks the matching option.
fn ask_quiz_question(input: &mut impl BufRead, question: &QuizQuestion) -> io::Result<Option<String>> {
    println!("\n{}", question.prompt);
    for (option, letter) in question.options.iter().zip('a'..='z') {
        println!("  {letter}) {option}");
    }
    let Some(line) = ask(input, ">")? else {
        return Ok(None);
    };
    let picked = option_for(&line, &question.options);
    Ok(Some(picked.unwrap_or(line)))
}

fn option_for(line: &str, options: &[String]) -> Option<String> {
    let mut chars = line.chars();
    let letter = chars.next().filter(|_| chars.next().is_none())?;
    ('a'..='z')
        .zip(options)
        .find(|(l, _)| *l == letter.to_ascii_lowercase())
        .map(|(_, option)| option.clone())
}

/// Let the learner play one board. `None` if they stopped.
fn play_board(input: &mut impl BufRead, question: &Question) -> io::Result<Option<Arrangement>> {
    let mut board = Arrangement::initial(&question.kind);
    match (&question.kind, &mut board) {
        (QuestionKind::ColorUp { total_items, .. }, Arrangement::ColorUp { colored }) => {
            println!("{}", "o ".repeat(colored.len()));
            let Some(taps) = ask_count(input, &format!("How many of the {total_items} do you color?"))?
            else {
                return Ok(None);
            };
            for (i, item) in colored.iter_mut().enumerate() {
                *item = u32::try_from(i).is_ok_and(|i| i < taps);
            }
        }
        (QuestionKind::Sort { order, .. }, Arrangement::Sort { values }) => {
            println!("Cards: {values:?} ({order:?})");
            let Some(line) = ask(input, "Type the cards in order, separated by spaces:")? else {
                return Ok(None);
            };
            *values = line
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
        }
        (QuestionKind::Box { .. }, Arrangement::Box(containers)) => {
            println!("The box holds {} items.", containers.first);
            let Some(drags) = ask_count(input, "How many do you drag out?")? else {
                return Ok(None);
            };
            drag(containers, Container::First, drags);
        }
        (
            QuestionKind::Equation {
                operand1,
                operation,
                result,
            },
            Arrangement::Equation(containers),
        ) => {
            println!("{operand1} {} ? = {result}", operation.symbol());
            let Some(drags) = ask_count(input, "How many items go in the empty slot?")? else {
                return Ok(None);
            };
            drag(containers, Container::First, drags);
        }
        _ => {}
    }
    Ok(Some(board))
}

fn drag(containers: &mut TwoContainers, from: Container, times: u32) {
    for _ in 0..times {
        if containers.drag_from(from).is_err() {
            println!("The {from} container is empty.");
            break;
        }
    }
}
