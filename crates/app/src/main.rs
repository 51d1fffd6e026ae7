use std::fmt;

use learn_core::model::{ChapterId, CourseId};
use services::{AppServices, Clock};
use storage::repository::Storage;
use storage::seed::seed_demo_catalog;
use tracing_subscriber::EnvFilter;

mod quiz_cli;
mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidChapterId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidChapterId { raw } => write!(f, "invalid --chapter-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    course_id: CourseId,
    chapter_id: Option<ChapterId>,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- quiz     [--db <sqlite_url>] [--course-id <id>] [--chapter-id <id>]");
    eprintln!("  cargo run -p app -- courses  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- outline  [--db <sqlite_url>] [--course-id <id>]");
    eprintln!("  cargo run -p app -- progress [--db <sqlite_url>] [--json]");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>] [--course-id <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://dev.sqlite3");
    eprintln!("  --course-id 1");
    eprintln!("  --chapter-id first chapter of the course with questions");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_COURSE_ID, LEARN_CHAPTER_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Courses,
    Outline,
    Progress,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "courses" => Some(Self::Courses),
            "outline" => Some(Self::Outline),
            "progress" => Some(Self::Progress),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

impl Args {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("LEARN_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url),
            course_id: std::env::var("LEARN_COURSE_ID")
                .ok()
                .and_then(|value| value.parse::<CourseId>().ok())
                .unwrap_or_else(|| CourseId::new(1)),
            chapter_id: std::env::var("LEARN_CHAPTER_ID")
                .ok()
                .and_then(|value| value.parse::<ChapterId>().ok()),
            json: false,
        }
    }

    fn parse(mut self, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    self.db_url = normalize_sqlite_url(value);
                }
                "--course-id" => {
                    let value = require_value(args, "--course-id")?;
                    self.course_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                }
                "--chapter-id" => {
                    let value = require_value(args, "--chapter-id")?;
                    let parsed = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidChapterId { raw: value.clone() })?;
                    self.chapter_id = Some(parsed);
                }
                "--json" => self.json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(self)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn split_command(mut argv: Vec<String>) -> Result<Option<(Command, Vec<String>)>, ArgsError> {
    // No subcommand means quiz.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => return Ok(None),
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => {
            let cmd = Command::from_arg(first).ok_or_else(|| ArgsError::UnknownArg(first.to_owned()))?;
            argv.remove(0);
            cmd
        }
    };
    Ok(Some((cmd, argv)))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = split_command(argv).and_then(|split| match split {
        Some((cmd, rest)) => Args::from_env()
            .parse(&mut rest.into_iter())
            .map(|args| Some((cmd, args))),
        None => Ok(None),
    });
    let Some((cmd, args)) = parsed.map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    // Open + migrate SQLite here so core/services stay free of filesystem concerns.
    prepare_sqlite_file(&args.db_url)?;
    let clock = Clock::system();

    if cmd == Command::Seed {
        let storage = Storage::sqlite(&args.db_url).await?;
        let chapter_id = seed_demo_catalog(&storage, args.course_id, clock.now()).await?;
        println!(
            "Seeded course {} (quiz chapter {chapter_id}) into {}",
            args.course_id, args.db_url
        );
        return Ok(());
    }

    let services = AppServices::new_sqlite(&args.db_url, clock, args.course_id).await?;
    if services.seeded_demo() {
        eprintln!("Empty database: added the demo course {}.", services.course_id());
    }

    match cmd {
        Command::Quiz => {
            let chapter_id = services.resolve_quiz_chapter(args.chapter_id).await?;
            quiz_cli::run_quiz(&services.quiz_loop(), chapter_id).await?;
        }
        Command::Courses => {
            let list = services.courses().list_courses().await?;
            print!("{}", render::courses(&list));
        }
        Command::Outline => {
            let outline = services.courses().course_outline(services.course_id()).await?;
            print!("{}", render::outline(&outline));
        }
        Command::Progress => {
            let dashboard = services.courses().learner_dashboard().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print!("{}", render::dashboard(&dashboard));
            }
        }
        Command::Seed => {}
    }
    Ok(())
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

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never interleave with quiz prompts on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
