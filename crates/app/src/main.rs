use std::fmt;
use std::path::PathBuf;

use services::{AppServices, Clock, ReadingControl, ServiceConfig, SubmissionError};
use study_core::model::{
    Answer, AnswerValue, Question, QuestionKind, QuestionRange, ReadingRecord, SourceKind,
};
use study_core::reading::{count_words, format_clock};
use study_core::reducer::Action;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
    InvalidKeep { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidKeep { raw } => write!(f, "invalid --keep value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study study   [--db <sqlite_url>] [--file <path>]");
    eprintln!("  study history [--db <sqlite_url>] [--limit <n>] [--export]");
    eprintln!("                [--enable | --disable] [--keep <n>]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_GENERATION_URL, STUDY_ANALYSIS_URL, STUDY_API_KEY,");
    eprintln!("  STUDY_WPM, STUDY_PAGE_SIZE, STUDY_SCORING, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Study,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "study" => Some(Self::Study),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    file: Option<PathBuf>,
    limit: Option<u32>,
    export: bool,
    record_history: Option<bool>,
    keep: Option<u32>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--file" => parsed.file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    let limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                    parsed.limit = Some(limit);
                }
                "--export" => parsed.export = true,
                "--enable" => parsed.record_history = Some(true),
                "--disable" => parsed.record_history = Some(false),
                "--keep" => {
                    let value = require_value(args, "--keep")?;
                    let keep = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ArgsError::InvalidKeep { raw: value.clone() })?;
                    parsed.keep = Some(keep);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1).peekable();

    let cmd = match argv.peek().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => {
            let cmd = Command::from_arg(first).ok_or_else(|| {
                eprintln!("unknown subcommand: {first}");
                print_usage();
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
            })?;
            argv.next();
            cmd
        }
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = ServiceConfig::from_env()?;
    if let Some(db_url) = args.db_url.clone() {
        config.database_url = db_url;
    }
    let services = AppServices::new_sqlite(&config, Clock::system()).await?;

    match cmd {
        Command::Study => study(&services, &args).await,
        Command::History => history(&services, &args).await,
    }
}

//
// ─── STUDY ─────────────────────────────────────────────────────────────────────
//

async fn study(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = services.store();
    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    let (source, text) = match &args.file {
        Some(path) => (SourceKind::Text, tokio::fs::read_to_string(path).await?),
        None => {
            println!("Paste the text to study, then finish with an empty line:");
            (SourceKind::Text, read_paragraphs(&mut input).await?)
        }
    };
    if text.trim().is_empty() {
        println!("Nothing to study.");
        return Ok(());
    }

    store.dispatch(Action::SetSource(source)).await;
    let session = store
        .dispatch(Action::text_with_estimate(
            text,
            services.settings().words_per_minute(),
        ))
        .await;
    let words = count_words(session.text());
    let range = QuestionRange::suggested_for(words);
    store.dispatch(Action::SetQuestionRange(range)).await;

    // Questions are generated while the text is being read.
    let orchestrator = services.orchestrator();
    let generation = tokio::spawn(async move { orchestrator.start().await });

    let duration_ms = session.reading_duration_ms();
    println!(
        "{words} words, about {} of reading. Press Enter when you are done.",
        format_clock(duration_ms / 1000)
    );
    let (control, rx) = watch::channel(ReadingControl::Run);
    let timer = services.reading_timer();
    let mut countdown = tokio::spawn(async move { timer.run(duration_ms, rx).await });
    let outcome = tokio::select! {
        outcome = &mut countdown => outcome?,
        _ = input.next_line() => {
            let _ = control.send(ReadingControl::Stop);
            countdown.await?
        }
    };
    info!(actual_ms = outcome.actual_ms, early_stop = outcome.early_stop, "reading finished");

    let report = generation.await??;
    for notice in &report.notices {
        warn!(page = notice.page, message = %notice.message, "page incomplete");
    }

    ask_unanswered(services, &mut input).await?;
    if let Err(err) = services.orchestrator().ensure_complete().await {
        warn!(error = %err, "quiz is incomplete, grading what is available");
    }
    ask_unanswered(services, &mut input).await?;

    let session = store.snapshot();
    match services.grading().validate_submission(&session) {
        Ok(()) => {}
        Err(SubmissionError::NoQuestions) => {
            println!("No questions were generated. Is STUDY_GENERATION_URL set?");
            return Ok(());
        }
        Err(err) => println!("{err}; unanswered questions score zero."),
    }

    let card = services.grading().grade(&session).await;
    println!();
    for (n, outcome) in card.outcomes.iter().enumerate() {
        let mark = if outcome.correct { "✓" } else { "✗" };
        println!(
            "{mark} {}. {} (you: {}, expected: {}) {:+.1}",
            n + 1,
            outcome.question,
            outcome.user_answer,
            outcome.correct_answer,
            outcome.points
        );
    }
    println!(
        "Score: {:.1}/{:.1} ({}%), {}/{} correct",
        card.result.score,
        card.result.total_points,
        card.result.percentage,
        card.result.correct_answers,
        card.result.total_questions
    );

    let reading = ReadingRecord {
        estimated_sec: duration_ms / 1000,
        actual_sec: outcome.actual_ms / 1000,
        early_stop: outcome.early_stop,
    };
    let entry = services
        .grading()
        .build_history_entry(&session, &card, reading);
    services.grading().record(entry).await?;
    Ok(())
}

async fn read_paragraphs(input: &mut Input) -> std::io::Result<String> {
    let mut text = String::new();
    while let Some(line) = input.next_line().await? {
        if line.trim().is_empty() && !text.is_empty() {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

async fn ask_unanswered(services: &AppServices, input: &mut Input) -> std::io::Result<()> {
    let store = services.store();
    let pending: Vec<Question> = store
        .snapshot()
        .unanswered()
        .into_iter()
        .cloned()
        .collect();
    for question in pending {
        println!();
        println!("[{}] {}", question.difficulty().as_str(), question.prompt());
        if let Some(options) = question.options() {
            for (n, option) in options.iter().enumerate() {
                println!("  {}) {option}", n + 1);
            }
        } else if question.kind() == QuestionKind::TrueFalse {
            println!("  (true / false)");
        }

        let Some(line) = input.next_line().await? else {
            break;
        };
        let value = resolve_answer(&question, line.trim());
        if !value.is_blank() {
            store
                .dispatch(Action::SetAnswer(Answer::new(question.id().clone(), value)))
                .await;
        }
    }
    Ok(())
}

/// A numeric reply picks the matching option; anything else is taken verbatim.
fn resolve_answer(question: &Question, reply: &str) -> AnswerValue {
    let picked = question.options().and_then(|options| {
        let n: usize = reply.parse().ok()?;
        options.get(n.checked_sub(1)?).cloned()
    });
    AnswerValue::text(picked.unwrap_or_else(|| reply.to_string()))
}

//
// ─── HISTORY ───────────────────────────────────────────────────────────────────
//

async fn history(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let history = services.history();
    if args.export {
        println!("{}", history.export_json().await?);
        return Ok(());
    }

    let mut settings = history.settings().await?;
    if args.record_history.is_some() || args.keep.is_some() {
        settings.enabled = args.record_history.unwrap_or(settings.enabled);
        settings.max_entries = args.keep.unwrap_or(settings.max_entries);
        history.update_settings(settings).await?;
    }
    println!(
        "History recording {}, keeping the last {} sessions.",
        if settings.enabled { "on" } else { "off" },
        settings.max_entries
    );

    let entries = history.list(args.limit).await?;
    if entries.is_empty() {
        println!("No study sessions recorded yet.");
        return Ok(());
    }
    let stats = history.stats().await?;
    println!(
        "{} sessions, average {:.1}%, {} studied, {} questions answered",
        stats.total_sessions,
        stats.average_percentage,
        format_clock(stats.total_study_sec),
        stats.total_questions
    );
    for entry in entries {
        println!(
            "{}  {:>3}%  {} questions  {} words  read {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.quiz.percentage,
            entry.quiz.question_count,
            entry.source.size,
            format_clock(entry.reading.actual_sec),
            if entry.reading.early_stop { " (stopped early)" } else { "" },
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
