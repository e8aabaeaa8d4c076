use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use taskd::{
    auth,
    cli::{self, TaskAction},
    config::TaskdConfig,
    ipc::event::EventBroadcaster,
    tasks::TaskStore,
    ui::TaskUi,
    AppContext,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "taskd — local task-tracking daemon with a JSON-RPC gateway",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON-RPC WebSocket server port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Data directory for the auth token and config.toml
    #[arg(long, env = "TASKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Bind address for the WebSocket server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon server (default when no subcommand given).
    ///
    /// Runs taskd in the foreground. The task store is in-memory only and
    /// is lost when the process exits.
    ///
    /// Examples:
    ///   taskd serve
    ///   taskd
    Serve,
    /// Open the interactive terminal task manager.
    ///
    /// Requires a running daemon (`taskd serve`).
    Ui,
    /// Check whether the daemon is running and print its status.
    Status {
        /// Print raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Manage tasks from the command line.
    ///
    /// All subcommands talk to the running daemon over JSON-RPC.
    ///
    /// Examples:
    ///   taskd task add "write the report" -d "due friday"
    ///   taskd task list --all
    ///   taskd task rm <id> -y
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format =
        std::env::var("TASKD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    match args.command {
        Some(Command::Ui) => {
            let config = TaskdConfig::new(args.port, args.data_dir, Some("error".to_string()), None);
            TaskUi::new(&config).run().await?;
        }
        Some(Command::Status { json }) => {
            let config = TaskdConfig::new(args.port, args.data_dir, Some("error".to_string()), None);
            let exit_code = cli::run_status(&config, json).await;
            std::process::exit(exit_code);
        }
        Some(Command::Task { action }) => {
            let config = TaskdConfig::new(args.port, args.data_dir, Some("error".to_string()), None);
            cli::run_task(action, &config).await?;
        }
        None | Some(Command::Serve) => {
            run_server(args.port, args.data_dir, args.log, args.bind_address).await?;
        }
    }

    Ok(())
}

async fn run_server(
    port: Option<u16>,
    data_dir: Option<std::path::PathBuf>,
    log: Option<String>,
    bind_address: Option<String>,
) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "taskd starting");

    let config = Arc::new(TaskdConfig::new(port, data_dir, log, bind_address));
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "config loaded"
    );

    let auth_token = auth::get_or_create_token(&config.data_dir)?;

    let ctx = Arc::new(AppContext {
        config,
        store: Arc::new(TaskStore::new()),
        broadcaster: Arc::new(EventBroadcaster::new()),
        started_at: std::time::Instant::now(),
        auth_token,
    });

    taskd::ipc::run(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(log_level)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(log_level)
                    .compact()
                    .init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
        return Some(guard);
    }

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
    None
}
