use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use telematics::events::spawn_quit_listener;
use telematics::plot::{plot_node, PlotContent, DEFAULT_PLOT_DURATION};
use telematics::store::series_path;
use telematics::ui::Dashboard;
use telematics::{run_collection, Overrides, PlainDashboard, Settings, TerminalDashboard, Theme};

#[derive(Parser, Debug)]
#[command(name = "telematics", version)]
#[command(about = "Collects, aggregates and displays telemetry from a fleet of nodes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every node, log its samples and show the live dashboard
    Log(LogArgs),
    /// Chart one node's stored samples as an SVG
    Plot(PlotArgs),
}

#[derive(Args, Debug)]
struct LogArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Polling interval (e.g. "1", "2s", "1m")
    #[arg(short, long)]
    interval: Option<String>,

    /// Rows retained per node series
    #[arg(short, long)]
    duration: Option<usize>,

    /// Roster file (name,id,host,p2p_port,api_port,scale_id)
    #[arg(short, long)]
    nodes_file: Option<PathBuf>,

    /// Directory for per-node series stores
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for per-node CSV logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Plain text dashboard instead of the full-screen one
    #[arg(long)]
    plain: bool,

    /// Reject snapshots with missing or unknown fields
    #[arg(long)]
    strict: bool,

    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// Node to chart
    #[arg(long, default_value = "node_1")]
    node: String,

    /// What to chart: txrate, confirm, depth, delay or gas
    #[arg(short, long, default_value = "txrate")]
    content: PlotContent,

    /// Directory holding the series stores
    #[arg(long, default_value = "./seriesData")]
    data_dir: PathBuf,

    /// SVG file to write
    #[arg(short, long, default_value = "output.svg")]
    output: PathBuf,

    /// Window start in unix seconds (default: first stored sample)
    #[arg(long)]
    start: Option<u64>,

    /// Window length in seconds
    #[arg(long, default_value_t = DEFAULT_PLOT_DURATION)]
    duration: u64,

    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Log(args) => run_log(args),
        Command::Plot(args) => run_plot(args),
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level: {}", level))?,
    };

    match file {
        // The dashboard owns the terminal, so diagnostics go to a file
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run_log(args: LogArgs) -> Result<()> {
    let overrides = Overrides {
        interval: args.interval,
        duration: args.duration,
        nodes_file: args.nodes_file,
        data_dir: args.data_dir,
        log_dir: args.log_dir,
        plain: args.plain,
        strict: args.strict,
        log_level: args.log_level,
    };
    let settings = Settings::load(args.config.as_deref(), &overrides)?;
    init_tracing(&settings.log_level, Some(&settings.log_file_path()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        nodes_file = %settings.nodes_file.display(),
        "starting telematics"
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if settings.plain {
        let dashboard = PlainDashboard::new(io::stdout());
        rt.block_on(collect(&settings, Box::new(dashboard), shutdown_tx, shutdown_rx))
    } else {
        run_tui(&rt, &settings, shutdown_tx, shutdown_rx)
    }
}

/// Run the collector, stopping on Ctrl-C or when `shutdown_tx` fires.
async fn collect(
    settings: &Settings,
    dashboard: Box<dyn Dashboard>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, shutting down");
            shutdown_tx.send_replace(true);
        }
    });

    run_collection(settings, dashboard, shutdown_rx).await
}

/// Run the collector behind the full-screen dashboard.
fn run_tui(
    rt: &tokio::runtime::Runtime,
    settings: &Settings,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    // Query the background before raw mode takes over the terminal
    let theme = Theme::auto_detect();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        original_hook(panic);
    }));

    let result = (|| -> Result<()> {
        let dashboard = TerminalDashboard::new(CrosstermBackend::new(stdout), theme)?;
        let listener = spawn_quit_listener(shutdown_tx.clone())?;

        let result = rt.block_on(collect(
            settings,
            Box::new(dashboard),
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        // Stop the keyboard thread if collection ended on its own
        shutdown_tx.send_replace(true);
        let _ = listener.join();
        result
    })();

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)?;

    result
}

fn run_plot(args: PlotArgs) -> Result<()> {
    init_tracing(&args.log_level, None)?;

    let store = series_path(&args.data_dir, &args.node);
    plot_node(
        &store,
        &args.node,
        args.content,
        args.start,
        args.duration,
        &args.output,
    )?;

    println!("Wrote {}", args.output.display());
    Ok(())
}
