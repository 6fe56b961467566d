use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use decisim::tools::{RobustnessRequest, ScenarioRequest, TornadoRequest, ValidateRequest};
use decisim::{InputLimits, ToolRequest, init_logging, load_request};

#[derive(Parser, Debug)]
#[command(name = "decisim")]
#[command(about = "Monte Carlo confidence checks for decisions")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Write logs to `decisim.log` in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Override the request's random seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Override the request's trial count
    #[arg(long, global = true)]
    simulations: Option<usize>,

    /// Emit single-line JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate confidence in a recommendation against a success criterion
    Validate { request: PathBuf },
    /// Stress-test the assumptions behind an answer
    Robustness { request: PathBuf },
    /// Simulate multi-period business profitability
    Scenario { request: PathBuf },
    /// Rank variables by low/high impact
    Tornado { request: PathBuf },
}

fn run_tool<T: ToolRequest>(path: &Path, args: &Args) -> color_eyre::Result<String> {
    let mut request: T = load_request(path)?;
    request.apply_overrides(args.seed, args.simulations);
    let report = request.run(&InputLimits::default())?;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    Ok(json)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(args.log_dir.as_deref(), &args.log_level)?;

    let output = match &args.command {
        Command::Validate { request } => run_tool::<ValidateRequest>(request, &args)?,
        Command::Robustness { request } => run_tool::<RobustnessRequest>(request, &args)?,
        Command::Scenario { request } => run_tool::<ScenarioRequest>(request, &args)?,
        Command::Tornado { request } => run_tool::<TornadoRequest>(request, &args)?,
    };
    println!("{output}");

    tracing::debug!("decisim finished");
    Ok(())
}
