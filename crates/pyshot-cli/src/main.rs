//! Py-SHOT CLI
//!
//! Terminal front end for the Py-SHOT tutorial: browse lessons, submit
//! attempts, and work through the course in an interactive shell.

mod render;
mod shell;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pyshot_engine::{curriculum, Config, FileStore, ProgressStore, SessionController};
use tracing_subscriber::EnvFilter;

/// Py-SHOT - learn Python one lesson at a time
///
/// Lessons unlock in order as you pass them. Progress is saved between runs.
#[derive(Parser, Debug)]
#[command(name = "pyshot")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: pyshot.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Curriculum JSON file to use instead of the built-in lessons
    #[arg(long, value_name = "FILE", global = true)]
    curriculum: Option<String>,

    /// Directory where progress is saved
    #[arg(long, value_name = "DIR", global = true)]
    state_dir: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List lessons and which ones are unlocked
    List,

    /// Show a lesson's theory, example and task
    Show {
        /// Lesson id (e.g. 1-1)
        id: String,
    },

    /// Submit one attempt for a lesson
    Check {
        /// Lesson id (e.g. 1-1)
        id: String,

        /// File with the code to submit (default: read stdin)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Forget all progress
    Reset,

    /// Interactive tutorial shell (default)
    Shell,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Runs the selected command.
///
/// Returns a failure exit code (without an error) when a checked attempt fails.
fn run(args: Args) -> anyhow::Result<ExitCode> {
    let (mut config, base) = load_config(args.config.as_deref())?;
    let mut curriculum_path = config.curriculum_in(&base);
    let mut state_dir = config.state_dir_in(&base);

    // Command-line paths stay relative to the working directory
    if let Some(ref path) = args.curriculum {
        config.curriculum = Some(path.clone());
        curriculum_path = Some(PathBuf::from(path));
    }
    if let Some(ref path) = args.state_dir {
        config.state_dir.clone_from(path);
        state_dir = PathBuf::from(path);
    }

    // Re-validate after overrides
    config.validate()?;

    let mut session = open_session(&config, curriculum_path.as_deref(), state_dir)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command.unwrap_or(Command::Shell) {
        Command::List if args.json => render::json(&mut out, &render::lesson_entries(&session))?,
        Command::List => render::lesson_list(&mut out, &session)?,
        Command::Show { id } => {
            let lesson = session
                .unlocked_lesson(&id)
                .map_err(|e| anyhow::anyhow!(render::learner_message(&e)))?;
            if args.json {
                render::json(&mut out, &render::LessonDetail::from(lesson))?;
            } else {
                render::lesson(&mut out, lesson)?;
            }
        }
        Command::Check { id, file } => {
            let code = read_submission(file.as_deref())?;
            session
                .select_lesson(&id)
                .map_err(|e| anyhow::anyhow!(render::learner_message(&e)))?;

            let view = session.submit(&code);
            let passed = view.verdict.as_ref().is_some_and(|v| v.passed);
            if args.json {
                render::json(&mut out, &view)?;
            } else if let Some(verdict) = &view.verdict {
                render::verdict(&mut out, verdict)?;
            }
            if let Some(error) = &view.persistence_error {
                tracing::warn!(error = %error, "Progress not saved");
            }
            if !passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Reset => {
            let view = session.reset();
            if args.json {
                render::json(&mut out, &view)?;
            } else {
                writeln!(out, "Progreso borrado.")?;
            }
            if let Some(error) = view.persistence_error {
                anyhow::bail!("{error}");
            }
        }
        Command::Shell => {
            let stdin = io::stdin();
            shell::run(&mut session, stdin.lock(), &mut out, args.json)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Loads configuration from the specified path or default location.
///
/// Also returns the directory that relative paths in the file are resolved
/// against. For the default location that is the working directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<(Config, PathBuf)> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            let config = Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            Ok((config, base))
        }
        None => {
            let config = Config::load().map_err(|e| anyhow::anyhow!("{e}"))?;
            Ok((config, PathBuf::new()))
        }
    }
}

/// Builds the registry, the file-backed progress store and the controller.
fn open_session(
    config: &Config,
    curriculum_path: Option<&Path>,
    state_dir: PathBuf,
) -> anyhow::Result<SessionController> {
    let registry = curriculum::load_or_builtin(curriculum_path)?;
    tracing::info!(
        lessons = registry.len(),
        curriculum = %curriculum_path
            .map_or_else(|| "built-in".to_string(), |path| path.display().to_string()),
        "Curriculum loaded"
    );

    let store = FileStore::new(state_dir);
    tracing::debug!(path = %store.path_for(&config.storage_key).display(), "Progress file");

    let progress = ProgressStore::open(Arc::new(registry), store, config.storage_key.clone());
    Ok(SessionController::new(progress))
}

/// Reads the code to check from `file`, or from stdin.
fn read_submission(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read '{}': {e}\n\nSuggestion: Check the path or pipe the code through stdin",
                path.display()
            )
        }),
        None => {
            let mut code = String::new();
            io::stdin().read_to_string(&mut code)?;
            Ok(code)
        }
    }
}
