use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use rustpower_web::{
    api::{self, AppState},
    basic::NewtonEngine,
    config::Config,
    report,
    service::{PowerFlowRequest, PowerFlowService, SessionStore, loader, runner},
    telemetry,
};

/// Power flow calculations on pandapower networks.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Solve a network file and print the results
    Run(RunArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Configuration file (defaults to rustpower-web.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// The network file
    #[arg(required = true)]
    input: PathBuf,

    /// Power flow algorithm.
    #[arg(long, default_value = "nr")]
    algorithm: String,

    /// Maximum number of iterations; the algorithm's default when omitted.
    #[arg(long)]
    max_iteration: Option<usize>,

    /// Initialization: auto, flat, dc or results.
    #[arg(long, default_value = "auto")]
    init: String,

    /// Termination tolerance on the power mismatch in MVA.
    #[arg(long, default_value_t = 1e-8)]
    tolerance_mva: f64,

    /// Enforce generator reactive power limits.
    #[arg(long, default_value_t = false)]
    enforce_q_lims: bool,

    /// Ignore transformer phase shifts.
    #[arg(long, default_value_t = false)]
    no_voltage_angles: bool,
}

async fn serve(args: ServeArgs) -> Result<()> {
    let cfg = Config::load(args.config.as_deref())?;
    let _guard = telemetry::init_tracing(&cfg.logging);

    let store = SessionStore::open(&cfg.session.dir)
        .with_context(|| format!("opening session directory {}", cfg.session.dir.display()))?;
    info!(
        dir = %cfg.session.dir.display(),
        ttl_secs = cfg.session.ttl_secs,
        sessions = store.count(),
        "session store ready"
    );
    let app = api::router(AppState::new(PowerFlowService::new(store)), &cfg.server);

    let addr = cfg.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    telemetry::init_cli_tracing();
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let (mut network, _) = loader::load_network(&bytes, filename)?;

    let request = PowerFlowRequest {
        algorithm: args.algorithm,
        max_iteration: args.max_iteration,
        enforce_q_lims: args.enforce_q_lims,
        calculate_voltage_angles: !args.no_voltage_angles,
        init: args.init,
        tolerance_mva: args.tolerance_mva,
    };
    request.validate()?;

    let result = runner::run_power_flow(&NewtonEngine::new(), &mut network, &request);
    println!("{}", report::render(&result, &["res_bus", "res_line"]));
    if !result.converged {
        bail!("{}", result.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Run(args) => run(args),
    }
}
