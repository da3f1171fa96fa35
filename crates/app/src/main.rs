use std::fmt;
use std::sync::Arc;

use prepare_core::model::{Catalog, LessonId, ModuleId, UserId};
use services::{AppServices, CompletionStore, ModulesOverview};
use storage::repository::RemoteDocumentStore;
use storage::{HttpDocumentStore, RemoteConfig};
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingPositional { command: &'static str, name: &'static str },
    UnknownArg(String),
    InvalidPageIndex { raw: String },
    InvalidDbUrl { raw: String },
    UnknownLesson { module: ModuleId, lesson: LessonId },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingPositional { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPageIndex { raw } => write!(f, "invalid page index: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownLesson { module, lesson } => {
                write!(f, "no lesson {lesson} in module {module}")
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

fn require_positional(
    args: &mut impl Iterator<Item = String>,
    command: &'static str,
    name: &'static str,
) -> Result<String, ArgsError> {
    match args.next() {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => Err(ArgsError::MissingPositional { command, name }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- overview                           [options]");
    eprintln!("  cargo run -p app -- advance <module> <lesson> <page>  [options]");
    eprintln!("  cargo run -p app -- complete <module> <lesson>        [options]");
    eprintln!("  cargo run -p app -- sync                               [options]");
    eprintln!("  cargo run -p app -- reset                              [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   default sqlite://prepare.sqlite3");
    eprintln!("  --user <user_id>    signed-in user; enables the remote mirror");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREPARE_DB_URL, PREPARE_USER_ID, PREPARE_REMOTE_URL, PREPARE_REMOTE_TOKEN");
    eprintln!("  RUST_LOG (default app=info,services=info,storage=warn)");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Overview,
    Advance {
        module: ModuleId,
        lesson: LessonId,
        page: usize,
    },
    Complete {
        module: ModuleId,
        lesson: LessonId,
    },
    Sync,
    Reset,
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        match name {
            "overview" => Ok(Self::Overview),
            "advance" => {
                let module = require_positional(args, "advance", "module")?;
                let lesson = require_positional(args, "advance", "lesson")?;
                let raw = require_positional(args, "advance", "page")?;
                let page = raw
                    .parse()
                    .map_err(|_| ArgsError::InvalidPageIndex { raw: raw.clone() })?;
                Ok(Self::Advance {
                    module: module.into(),
                    lesson: lesson.into(),
                    page,
                })
            }
            "complete" => {
                let module = require_positional(args, "complete", "module")?;
                let lesson = require_positional(args, "complete", "lesson")?;
                Ok(Self::Complete {
                    module: module.into(),
                    lesson: lesson.into(),
                })
            }
            "sync" => Ok(Self::Sync),
            "reset" => Ok(Self::Reset),
            other => Err(ArgsError::UnknownArg(other.to_owned())),
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    user: Option<UserId>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Option<Self>, ArgsError> {
        let mut iter = argv.into_iter().peekable();

        // Default behavior: print the overview when no subcommand is given.
        let explicit = iter.peek().is_some_and(|first| !first.starts_with("--"));
        let command = match iter.next_if(|_| explicit) {
            Some(name) => Command::parse(&name, &mut iter)?,
            None => Command::Overview,
        };

        let mut db_url = std::env::var("PREPARE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://prepare.sqlite3".into(), normalize_sqlite_url);
        let mut user = std::env::var("PREPARE_USER_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(UserId::from);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut iter, "--user")?;
                    user = Some(UserId::from(value));
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            command,
            db_url,
            user,
        }))
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

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info,storage=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_overview(overview: &ModulesOverview) {
    for module in &overview.modules {
        let mark = if module.completed { "x" } else { " " };
        println!(
            "[{mark}] {} {} ({:.0}%)",
            module.id,
            module.title,
            module.progress * 100.0
        );
        for lesson in &module.lessons {
            let mark = if lesson.completed { "x" } else { " " };
            println!(
                "    [{mark}] {} {} page {}/{} ({:.0}%)",
                lesson.id,
                lesson.title,
                lesson.current_page_index,
                lesson.page_count,
                lesson.progress * 100.0
            );
        }
    }
    println!("overall {:.0}%", overview.overall_progress() * 100.0);
}

fn ensure_lesson(
    store: &CompletionStore,
    module: &ModuleId,
    lesson: &LessonId,
) -> Result<(), ArgsError> {
    if store.catalog().find_lesson(module, lesson).is_some() {
        return Ok(());
    }
    warn!(%module, %lesson, "lesson not in catalog");
    Err(ArgsError::UnknownLesson {
        module: module.clone(),
        lesson: lesson.clone(),
    })
}

async fn execute(store: &CompletionStore, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Overview => {
            print_overview(&store.modules_with_completion().await);
        }
        Command::Advance {
            module,
            lesson,
            page,
        } => {
            ensure_lesson(store, &module, &lesson)?;
            let state = store.set_lesson_current_page(&module, &lesson, page).await?;
            let entry = state.lesson(&module, &lesson).copied().unwrap_or_default();
            println!(
                "{lesson}: page {}/{}{}",
                entry.current_page_index,
                entry.page_count,
                if entry.completed { " (completed)" } else { "" }
            );
        }
        Command::Complete { module, lesson } => {
            ensure_lesson(store, &module, &lesson)?;
            let state = store.mark_lesson_completed(&module, &lesson).await?;
            let module_done = state.module(&module).is_some_and(|m| m.completed);
            println!(
                "{lesson}: completed{}",
                if module_done { "; module completed" } else { "" }
            );
        }
        Command::Sync => {
            let state = store.sync_remote_to_local().await;
            let overview = ModulesOverview::build(store.catalog(), &state);
            print_overview(&overview);
        }
        Command::Reset => {
            store.reset().await?;
            println!("local completion state cleared");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match Args::parse(argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    init_tracing();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;

    let remote = RemoteConfig::from_env().map(|config| {
        info!(base_url = %config.base_url, "remote backend configured");
        Arc::new(HttpDocumentStore::new(config)) as Arc<dyn RemoteDocumentStore>
    });

    let services =
        AppServices::new_sqlite(&parsed.db_url, Catalog::builtin()?, parsed.user, remote).await?;
    let store = services.completion();

    let result = execute(&store, parsed.command).await;
    store.flush_remote().await;
    result
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
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
