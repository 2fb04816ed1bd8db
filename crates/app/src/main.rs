use std::fmt;
use std::path::PathBuf;

use lesson_core::model::{ActivityId, ActivityKind, StudentProfile, Theme};
use lesson_core::widgets::{Cell, GRID_SIZE, WordSearch};
use services::{Clock, LessonCommand, LessonConfig, LessonServices, LessonSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    MissingArgument(&'static str),
    NoActivity(ActivityKind),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::MissingArgument(what) => write!(f, "missing argument: {what}"),
            ArgsError::NoActivity(kind) => write!(f, "the lesson plan has no {kind:?} activity"),
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

fn parse_number<T: std::str::FromStr>(raw: &str, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_owned(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--plan <file.json>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                         progress summary (default)");
    eprintln!("  plan                           steps, activities and unlock state");
    eprintln!("  play                           read JSON lesson commands from stdin");
    eprintln!("  profile --name <n> --age <a> [--avatar <x>] [--level <l>] [--interest <i>]");
    eprintln!("  theme <light|dark|toggle>");
    eprintln!("  rate <1-5>");
    eprintln!("  results                        final score and completion time");
    eprintln!("  wordsearch                     print the word-search grid");
    eprintln!("  certificate [--out <dir>]      write the certificate document");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LESSON_DB_URL, LESSON_PLAN, LESSON_SURVEY_URL, LESSON_PYTHON, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Plan,
    Play,
    Profile,
    Theme,
    Rate,
    Results,
    WordSearch,
    Certificate,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "plan" => Some(Self::Plan),
            "play" => Some(Self::Play),
            "profile" => Some(Self::Profile),
            "theme" => Some(Self::Theme),
            "rate" => Some(Self::Rate),
            "results" => Some(Self::Results),
            "wordsearch" => Some(Self::WordSearch),
            "certificate" => Some(Self::Certificate),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProfileArgs {
    name: Option<String>,
    age: Option<u32>,
    avatar: Option<String>,
    level: Option<String>,
    interest: Option<String>,
}

struct Args {
    command: Command,
    config: LessonConfig,
    out_dir: PathBuf,
    profile: ProfileArgs,
    positional: Vec<String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut config = LessonConfig::from_env();
        config.db_url = normalize_sqlite_url(config.db_url);
        let mut command = None;
        let mut out_dir = PathBuf::from(".");
        let mut profile = ProfileArgs::default();
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--plan" => config.plan_path = Some(require_value(&mut args, "--plan")?.into()),
                "--out" => out_dir = require_value(&mut args, "--out")?.into(),
                "--name" => profile.name = Some(require_value(&mut args, "--name")?),
                "--age" => {
                    let value = require_value(&mut args, "--age")?;
                    profile.age = Some(parse_number(&value, "--age")?);
                }
                "--avatar" => profile.avatar = Some(require_value(&mut args, "--avatar")?),
                "--level" => profile.level = Some(require_value(&mut args, "--level")?),
                "--interest" => profile.interest = Some(require_value(&mut args, "--interest")?),
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => {
                    return Err(ArgsError::UnknownArg(flag.to_owned()));
                }
                _ if command.is_none() => {
                    let parsed = Command::from_arg(&arg);
                    command = Some(parsed.ok_or(ArgsError::UnknownArg(arg))?);
                }
                _ => positional.push(arg),
            }
        }

        Ok(Some(Self {
            command: command.unwrap_or(Command::Status),
            config,
            out_dir,
            profile,
            positional,
        }))
    }

    fn first_positional(&self, what: &'static str) -> Result<&str, ArgsError> {
        self.positional
            .first()
            .map(String::as_str)
            .ok_or(ArgsError::MissingArgument(what))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn activity_of(session: &LessonSession, kind: ActivityKind) -> Result<ActivityId, ArgsError> {
    session
        .first_activity_of(kind)
        .ok_or(ArgsError::NoActivity(kind))
}

async fn print_status(services: &LessonServices) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = services.store().snapshot().await?;
    let results = snapshot.final_results();
    println!("Lesson:        {}", services.plan().title);
    println!(
        "Student:       {}",
        snapshot.student_name().unwrap_or("(no profile yet)")
    );
    println!("Unlocked step: {}", snapshot.unlocked_step);
    println!("Score:         {}", results.score_display());
    println!("Theme:         {}", snapshot.theme);
    if let Some(time) = results.time_display() {
        println!("Time:          {time}");
    }
    if let Some(bonus) = &snapshot.time_bonus {
        println!("Time bonus:    {} (+{})", bonus.title, bonus.points);
    }
    println!("Satisfaction:  {}", snapshot.satisfaction_rating.label());
    Ok(())
}

fn print_plan(session: &LessonSession) {
    for step in &session.plan().steps {
        let marker = match session.step_state(step.id) {
            Some(state) if state.is_unlocked() => "✓",
            _ => " ",
        };
        println!("[{marker}] {:>2}. {}", step.id, step.title);
        for activity in &step.activities {
            let scored = if activity.scored { " (scored)" } else { "" };
            println!(
                "        {} {:?}{scored}",
                activity.id,
                activity.widget.kind()
            );
        }
    }
}

fn print_word_search(puzzle: &WordSearch) {
    for row in 0..GRID_SIZE {
        let line: String = (0..GRID_SIZE)
            .filter_map(|col| puzzle.letter(Cell::new(row, col)))
            .flat_map(|c| [c, ' '])
            .collect();
        println!("{}", line.trim_end());
    }
    println!();
    for word in puzzle.words() {
        println!("{:<10} {}", word.word, word.concept);
    }
}

/// Reads one JSON command per line and prints each outcome.
async fn play(session: &mut LessonSession) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command: LessonCommand = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("invalid command: {err}");
                continue;
            }
        };
        match session.dispatch(command).await {
            Ok(outcome) => println!("{outcome:?}"),
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    // Open + migrate SQLite at startup.
    prepare_sqlite_file(&args.config.db_url)?;
    let services = LessonServices::new_sqlite(&args.config, Clock::default_clock()).await?;
    info!(db = %args.config.db_url, command = ?args.command, "lesson services ready");

    match args.command {
        Command::Status => print_status(&services).await?,
        Command::Plan => print_plan(&services.start_session().await?),
        Command::Play => play(&mut services.start_session().await?).await?,
        Command::Profile => {
            let profile_args = &args.profile;
            let name = profile_args
                .name
                .clone()
                .ok_or(ArgsError::MissingArgument("--name"))?;
            let age = profile_args.age.ok_or(ArgsError::MissingArgument("--age"))?;
            let profile = StudentProfile::new(
                name,
                age,
                profile_args.avatar.clone().unwrap_or_else(|| "🐍".into()),
                profile_args.level.clone().unwrap_or_else(|| "beginner".into()),
                profile_args.interest.clone().unwrap_or_default(),
            )?;
            let mut session = services.start_session().await?;
            let activity = activity_of(&session, ActivityKind::Profile)?;
            session.submit_profile(activity, &profile).await?;
            println!("Welcome, {}!", profile.name());
        }
        Command::Theme => {
            let session = services.start_session().await?;
            let theme = match args.first_positional("theme")? {
                "toggle" => session.toggle_theme().await?,
                raw => {
                    let theme: Theme = raw.parse()?;
                    session.set_theme(theme).await?;
                    theme
                }
            };
            println!("Theme set to {theme}.");
        }
        Command::Rate => {
            let raw = args.first_positional("rating")?;
            let stars: u8 = parse_number(raw, "rating")?;
            let mut session = services.start_session().await?;
            let activity = activity_of(&session, ActivityKind::Survey)?;
            session.rate(activity, stars).await?;
            let rating = services.store().satisfaction_rating().await?;
            println!("Thanks for your feedback: {}", rating.label());
        }
        Command::Results => {
            let session = services.start_session().await?;
            let results = session.finish_course().await?;
            println!("Final score: {}", results.score_display());
            match results.time_display() {
                Some(time) => println!("Completion time: {time}"),
                None => println!("Completion time: --:--"),
            }
        }
        Command::WordSearch => print_word_search(&WordSearch::python_basics()?),
        Command::Certificate => {
            let path = services.certificates().save_to(&args.out_dir).await?;
            println!("Certificate written to {}", path.display());
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse(args.iter().map(|a| (*a).to_owned()))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn defaults_to_status() {
        let args = parse(&["--db", "sqlite::memory:"]);
        assert_eq!(args.command, Command::Status);
        assert_eq!(args.config.db_url, "sqlite::memory:");
    }

    #[test]
    fn flags_and_positionals_mix() {
        let args = parse(&["certificate", "--out", "/tmp/certs"]);
        assert_eq!(args.command, Command::Certificate);
        assert_eq!(args.out_dir, PathBuf::from("/tmp/certs"));

        let args = parse(&["rate", "4"]);
        assert_eq!(args.first_positional("rating").unwrap(), "4");

        let args = parse(&["profile", "--name", "Ada", "--age", "36"]);
        assert_eq!(args.profile.name.as_deref(), Some("Ada"));
        assert_eq!(args.profile.age, Some(36));
    }

    #[test]
    fn rejects_unknown_input() {
        let args = |raw: &[&str]| Args::parse(raw.iter().map(|a| (*a).to_owned()));
        assert!(matches!(args(&["dance"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(args(&["--wat"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            args(&["profile", "--age", "old"]),
            Err(ArgsError::InvalidNumber { .. })
        ));
        assert!(matches!(args(&["--help"]), Ok(None)));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:lesson.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/lesson.sqlite3"));
    }
}
