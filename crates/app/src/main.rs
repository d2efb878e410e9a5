mod play;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mathquest_core::model::{LearnerId, LevelId, SublevelId};
use services::backend::{Backend, HttpBackend, StaticBackend};
use services::progression::validate_questions;
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SQLITE_SCHEME: &str = "sqlite://";
const MEMORY_DB: &str = "sqlite::memory:";
const DEFAULT_DB_URL: &str = "sqlite://mathquest.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingFlag { flag: &'static str },
    NoContentSource,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::NoContentSource => {
                write!(f, "no content source: set MATHQUEST_API_URL or pass --content")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(raw: String, flag: &'static str) -> Result<u64, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  mathquest play   [--db <sqlite_url>] [--learner <id>] [--name <name>]");
    eprintln!("                   [--content <file.json>] [--shuffle]");
    eprintln!("  mathquest status [--db <sqlite_url>] [--learner <id>]");
    eprintln!("  mathquest sync   [--db <sqlite_url>] [--learner <id>] [--content <file.json>]");
    eprintln!("  mathquest order  --level <id> --sublevel <id> [--content <file.json>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://mathquest.sqlite3");
    eprintln!("  --learner 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MATHQUEST_DB_URL, MATHQUEST_LEARNER_ID");
    eprintln!("  MATHQUEST_API_URL, MATHQUEST_API_TOKEN");
    eprintln!("  MATHQUEST_AI_API_KEY, MATHQUEST_AI_BASE_URL, MATHQUEST_AI_MODEL");
    eprintln!("  RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Status,
    Sync,
    Order,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" | "practice" => Some(Self::Play),
            "status" => Some(Self::Status),
            "sync" => Some(Self::Sync),
            "order" => Some(Self::Order),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    learner_id: LearnerId,
    name: String,
    content: Option<PathBuf>,
    shuffle: bool,
    level_id: Option<LevelId>,
    sublevel_id: Option<SublevelId>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("MATHQUEST_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut learner_id = std::env::var("MATHQUEST_LEARNER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| LearnerId::new(1), LearnerId::new);
        let mut name = "Learner".to_string();
        let mut content = None;
        let mut shuffle = false;
        let mut level_id = None;
        let mut sublevel_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--learner" => {
                    let value = require_value(args, "--learner")?;
                    learner_id = LearnerId::new(parse_id(value, "--learner")?);
                }
                "--name" => name = require_value(args, "--name")?,
                "--content" => content = Some(PathBuf::from(require_value(args, "--content")?)),
                "--shuffle" => shuffle = true,
                "--level" => {
                    let value = require_value(args, "--level")?;
                    level_id = Some(LevelId::new(parse_id(value, "--level")?));
                }
                "--sublevel" => {
                    let value = require_value(args, "--sublevel")?;
                    sublevel_id = Some(SublevelId::new(parse_id(value, "--sublevel")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learner_id,
            name,
            content,
            shuffle,
            level_id,
            sublevel_id,
        })
    }

    fn backend(&self) -> Result<Arc<dyn Backend>, Box<dyn std::error::Error>> {
        if let Some(path) = &self.content {
            return Ok(Arc::new(StaticBackend::from_json_file(path)?));
        }
        let http = HttpBackend::from_env();
        if !http.enabled() {
            return Err(ArgsError::NoContentSource.into());
        }
        Ok(Arc::new(http))
    }
}

/// Turn `--db` input into a `sqlite://` URL with an absolute path, so the
/// learner database does not depend on where the game was launched from.
/// Bare paths and `sqlite:` prefixes are accepted.
fn normalize_sqlite_url(raw: String) -> String {
    if raw == MEMORY_DB || raw.starts_with(SQLITE_SCHEME) {
        return raw;
    }
    let trimmed = raw.trim();
    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("{SQLITE_SCHEME}{}", absolute.display())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    if cmd == Command::Order {
        return order(&parsed).await;
    }

    prepare_sqlite_file(&parsed.db_url)?;
    // `status` reads local state only and works without a content source.
    let backend: Arc<dyn Backend> = if cmd == Command::Status {
        Arc::new(StaticBackend::default())
    } else {
        parsed.backend()?
    };
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::default(), backend).await?;
    info!(db = %parsed.db_url, learner = %parsed.learner_id, "storage ready");

    match cmd {
        Command::Play => {
            let learners = app.learners();
            let learner = learners
                .load_or_register(parsed.learner_id, &parsed.name)
                .await?;
            println!("Hello, {}! You are on level {}.", learner.name(), learner.level());
            let progression = app.progression();
            let progression = if parsed.shuffle {
                Arc::new(progression.as_ref().clone().with_shuffle_questions(true))
            } else {
                progression
            };
            play::run(progression.as_ref(), parsed.learner_id).await
        }
        Command::Status => status(&app, parsed.learner_id).await,
        Command::Sync => {
            let sent = app.progression().retry_sync(parsed.learner_id).await?;
            println!("Sent {sent} pending quiz result(s).");
            Ok(())
        }
        Command::Order => Ok(()),
    }
}

async fn status(app: &AppServices, learner_id: LearnerId) -> Result<(), Box<dyn std::error::Error>> {
    let learners = app.learners();
    let learner = learners.load(learner_id).await?;
    println!("{} (id {})", learner.name(), learner.id());
    println!("  level: {}", learner.level());
    println!(
        "  placement quiz: {}",
        if learner.completed_initial_quiz() { "done" } else { "pending" }
    );

    let rows = learners.recent_results(learner_id, 10).await?;
    if rows.is_empty() {
        println!("  no quizzes taken yet");
    }
    for row in rows {
        let attempt = row.attempt;
        println!(
            "  {} level {}: {}/{} ({}%) {}{}",
            attempt.recorded_at.format("%Y-%m-%d %H:%M"),
            attempt.level_id,
            attempt.correct,
            attempt.total,
            attempt.percentage,
            if attempt.passed { "passed" } else { "failed" },
            if attempt.synced { "" } else { " [not synced]" },
        );
    }
    Ok(())
}

/// Print an AI-suggested easiest-first order for one sublevel's questions.
async fn order(parsed: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let level_id = parsed
        .level_id
        .ok_or(ArgsError::MissingFlag { flag: "--level" })?;
    let sublevel_id = parsed
        .sublevel_id
        .ok_or(ArgsError::MissingFlag { flag: "--sublevel" })?;
    let backend = parsed.backend()?;
    let ai = services::AiOrderingService::from_env();

    let records = backend.fetch_practice_questions(level_id, sublevel_id).await?;
    let questions = validate_questions(records);
    let ordered = ai.suggest_order(&questions).await?;
    for id in ordered {
        if let Some(question) = questions.iter().find(|q| q.id == id) {
            println!("{id}\t{}\t{}", question.kind.name(), question.prompt.as_str());
        }
    }
    Ok(())
}

/// Make sure the learner database file and its directory exist before the
/// pool opens it; sqlx will not create either.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == MEMORY_DB {
        return Ok(());
    }
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let path = db_url
        .strip_prefix(SQLITE_SCHEME)
        .and_then(|rest| rest.split('?').next())
        .filter(|path| !path.is_empty())
        .ok_or_else(invalid)?;

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "--db",
            "sqlite:///tmp/mq.sqlite3",
            "--learner",
            "42",
            "--content",
            "pack.json",
            "--shuffle",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite:///tmp/mq.sqlite3");
        assert_eq!(args.learner_id, LearnerId::new(42));
        assert_eq!(args.content, Some(PathBuf::from("pack.json")));
        assert!(args.shuffle);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            parse(&["--learner", "abc"]),
            Err(ArgsError::InvalidId { flag: "--learner", .. })
        ));
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["--nope"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/mq.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/mq.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn only_sqlite_file_urls_are_prepared() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://localhost/mq").is_err());
        assert!(prepare_sqlite_file("sqlite://?mode=rwc").is_err());
    }
}
