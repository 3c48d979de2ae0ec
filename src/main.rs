//! Binary entry point for the tugsense CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Scope chain at a cursor offset
//! tugsense scope --snapshot snap.json --file ui/Main.qml --offset 120
//!
//! # Type an expression fragment, expanding C++ macros first
//! tugsense eval --snapshot snap.json --file main.cpp --offset 80 --expr "qApp" --preprocess
//!
//! # Run a completion request after typing "."
//! tugsense complete --snapshot snap.json --file main.cpp --offset 80 --typed .
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tugsense::cli::{run_complete, run_eval, run_scope, Position};
use tugsense::config::{CliOverrides, ResolvedConfig};
use tugsense::error::{OutputErrorCode, SenseError};
use tugsense::output::{emit_response, ErrorResponse};
use tugsense::snapshot::Snapshot;

// ============================================================================
// CLI Structure
// ============================================================================

/// Scope-aware code completion for C++ and QML/JS.
///
/// All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "tugsense", version, about = "Scope-aware code completion for C++ and QML/JS")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snippet definition file (overrides config and environment).
    #[arg(long, global = true)]
    snippets: Option<PathBuf>,

    /// QML import search path; repeat for several, searched in order.
    #[arg(long = "import-path", global = true)]
    import_paths: Vec<String>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Snapshot file and cursor position.
#[derive(Args, Debug)]
struct PositionArgs {
    /// Snapshot JSON file written by the host parser.
    #[arg(long)]
    snapshot: PathBuf,
    /// Document path as keyed in the snapshot.
    #[arg(long)]
    file: String,
    /// Cursor byte offset.
    #[arg(long)]
    offset: usize,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the scope chain at a position.
    Scope {
        #[command(flatten)]
        at: PositionArgs,
    },
    /// Evaluate an expression fragment at a position.
    Eval {
        #[command(flatten)]
        at: PositionArgs,
        /// The fragment, e.g. `foo->bar()`.
        #[arg(long)]
        expr: String,
        /// Expand C++ macros before evaluating.
        #[arg(long)]
        preprocess: bool,
    },
    /// Run a completion request at a position.
    Complete {
        #[command(flatten)]
        at: PositionArgs,
        /// Text typed at the offset before completing (e.g. `.` or `->`).
        #[arg(long)]
        typed: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), SenseError> {
    let overrides = CliOverrides {
        snippets: cli.global.snippets.clone(),
        import_paths: cli.global.import_paths.clone(),
    };
    let config = ResolvedConfig::resolve(cli.global.config.as_deref(), &overrides)?.config;

    match cli.command {
        Command::Scope { at } => {
            let snapshot = Snapshot::load(&at.snapshot)?;
            let response = run_scope(&snapshot, &config, position(&at))?;
            emit(&response)
        }
        Command::Eval {
            at,
            expr,
            preprocess,
        } => {
            let snapshot = Snapshot::load(&at.snapshot)?;
            let response = run_eval(&snapshot, &config, position(&at), &expr, preprocess)?;
            emit(&response)
        }
        Command::Complete { at, typed } => {
            let snapshot = Arc::new(Snapshot::load(&at.snapshot)?);
            let response = run_complete(snapshot, config, position(&at), typed.as_deref())?;
            emit(&response)
        }
    }
}

fn position(args: &PositionArgs) -> Position<'_> {
    Position {
        file: &args.file,
        offset: args.offset,
    }
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), SenseError> {
    let mut stdout = io::stdout();
    emit_response(response, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
