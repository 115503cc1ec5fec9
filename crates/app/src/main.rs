use std::fmt;
use std::path::PathBuf;

use math_core::model::{Difficulty, Mode, Profile, ProfileId, SettingsDraft};
use math_core::time::history_label;
use services::{AppServices, Clock, ProfileService, settings_for_profile};
use tracing_subscriber::EnvFilter;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    UnknownProfile { raw: String },
    NoProfile,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required here"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownProfile { raw } => write!(f, "no learner named or with id {raw}"),
            ArgsError::NoProfile => {
                write!(f, "no learner selected; pass --profile or run `profiles --add`")
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

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  math-buddy play     [--db <sqlite_url>] [--profile <name|id>] [--settings <json>]");
    eprintln!("                      [--grade <1-5>] [--mode <mode>] [--difficulty <level>] [--count <n>]");
    eprintln!("  math-buddy profiles [--db <sqlite_url>] [--profile <name|id>]");
    eprintln!("                      [--add <name> --age <n> --grade <1-5>] [--clear]");
    eprintln!("  math-buddy history  [--db <sqlite_url>] [--profile <name|id>]");
    eprintln!();
    eprintln!("Modes: tables, beforeAfter, moreLess, addSubtract, mixed");
    eprintln!("Difficulty: easy, medium, hard");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  command play, --db sqlite:math-buddy.sqlite3, profile = last selected");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MATH_BUDDY_DB_URL, MATH_BUDDY_PROFILE, MATH_BUDDY_LOG (or RUST_LOG)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Profiles,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "profiles" => Some(Self::Profiles),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct NewProfileArgs {
    name: Option<String>,
    age: Option<u8>,
}

struct Args {
    db_url: String,
    profile: Option<String>,
    settings_file: Option<PathBuf>,
    overrides: SettingsDraft,
    new_profile: NewProfileArgs,
    clear_selection: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("MATH_BUDDY_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://math-buddy.sqlite3".into(), normalize_sqlite_url);
        let mut profile = std::env::var("MATH_BUDDY_PROFILE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut settings_file: Option<PathBuf> = None;
        let mut overrides = SettingsDraft::default();
        let mut new_profile = NewProfileArgs::default();
        let mut clear_selection = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--profile" => profile = Some(require_value(args, "--profile")?),
                "--settings" => settings_file = Some(require_value(args, "--settings")?.into()),
                "--grade" => overrides.grade = Some(parse_value(args, "--grade")?),
                "--mode" => overrides.mode = Some(parse_value::<Mode>(args, "--mode")?),
                "--difficulty" => {
                    overrides.difficulty = Some(parse_value::<Difficulty>(args, "--difficulty")?);
                }
                "--count" => overrides.question_count = Some(parse_value(args, "--count")?),
                "--add" => new_profile.name = Some(require_value(args, "--add")?),
                "--age" => new_profile.age = Some(parse_value(args, "--age")?),
                "--clear" => clear_selection = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            profile,
            settings_file,
            overrides,
            new_profile,
            clear_selection,
        })
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
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MATH_BUDDY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
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

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;
    let profiles = services.profiles();

    match cmd {
        Command::Play => play(&profiles, parsed).await,
        Command::Profiles => list_profiles(&profiles, parsed).await,
        Command::History => show_history(&profiles, parsed).await,
    }
}

async fn resolve_learner(
    profiles: &ProfileService,
    selector: Option<&str>,
) -> Result<Option<Profile>, Box<dyn std::error::Error>> {
    let Some(raw) = selector else {
        return Ok(profiles.current_profile().await?);
    };

    if let Ok(id) = raw.parse::<ProfileId>() {
        return Ok(Some(profiles.get_profile(id).await?));
    }
    let wanted = raw.trim();
    profiles
        .list_profiles()
        .await?
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(wanted))
        .map(Some)
        .ok_or_else(|| ArgsError::UnknownProfile { raw: raw.to_string() }.into())
}

async fn play(profiles: &ProfileService, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let learner = resolve_learner(profiles, args.profile.as_deref()).await?;

    let mut draft = SettingsDraft::default();
    if let Some(path) = &args.settings_file {
        let raw = std::fs::read_to_string(path)?;
        draft = serde_json::from_str(&raw)?;
    }
    let draft = draft.overlay(args.overrides);

    let settings = match &learner {
        Some(profile) => {
            println!("Hi {}!", profile.label());
            settings_for_profile(profile, draft)?
        }
        None => draft.validate()?,
    };

    let outcome = terminal::play(profiles, learner.as_ref().map(Profile::id), settings).await?;
    if let (Some(summary), Some(profile)) = (outcome, learner) {
        println!(
            "Saved {}/{} to {}'s history.",
            summary.score(),
            summary.total(),
            profile.name()
        );
    }
    Ok(())
}

async fn list_profiles(
    profiles: &ProfileService,
    args: Args,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(name) = args.new_profile.name {
        let age = args
            .new_profile
            .age
            .ok_or(ArgsError::MissingFlag { flag: "--age" })?;
        let grade = args
            .overrides
            .grade
            .ok_or(ArgsError::MissingFlag { flag: "--grade" })?;
        let created = profiles.create_profile(&name, age, grade).await?;
        profiles.select_profile(created.id()).await?;
        println!("Added {}.", created.label());
    } else if args.clear_selection {
        profiles.clear_selection().await?;
        println!("No learner selected.");
    } else if let Some(selector) = args.profile.as_deref() {
        if let Some(profile) = resolve_learner(profiles, Some(selector)).await? {
            profiles.select_profile(profile.id()).await?;
            println!("Selected {}.", profile.label());
        }
    }

    let current = profiles.current_profile().await?.map(|p| p.id());
    let all = profiles.list_profiles().await?;
    if all.is_empty() {
        println!("No learners yet. Add one with `profiles --add <name> --age <n> --grade <1-5>`.");
    }
    for profile in all {
        let marker = if Some(profile.id()) == current { '*' } else { ' ' };
        println!(
            "{marker} {}  age {}  id {}",
            profile.label(),
            profile.age(),
            profile.id()
        );
    }
    Ok(())
}

async fn show_history(
    profiles: &ProfileService,
    args: Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let learner = resolve_learner(profiles, args.profile.as_deref())
        .await?
        .ok_or(ArgsError::NoProfile)?;

    let history = profiles.recent_history(learner.id()).await?;
    println!("History for {}:", learner.label());
    if history.is_empty() {
        println!("  no sessions yet");
    }
    for item in history {
        println!(
            "  {}  {:<12} {:>2}/{:<2} {}",
            history_label(item.completed_at),
            item.mode.as_str(),
            item.score,
            item.total,
            item.difficulty
        );
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
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
