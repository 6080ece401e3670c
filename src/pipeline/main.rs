use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use market_sentinel::trading_core::{
    analyze_asset, compare_assets, format_snapshot_time, run_cycle, CycleContext, SnapshotStore,
};
use market_sentinel::{CsvDataSource, SentinelConfig};

#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(about = "Multi-timeframe structure, momentum and trade viability for a risk asset and a macro hedge")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing <SYMBOL>_<tf>.csv and <SYMBOL>_derivatives.json
    #[arg(short, long, global = true, env = "SENTINEL_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Snapshot file carried between cycles
    #[arg(short, long, global = true, env = "SENTINEL_SNAPSHOT", default_value = "snapshot_memory.json")]
    snapshot: PathBuf,

    /// Display timezone for snapshot times
    #[arg(long, global = true, env = "SENTINEL_TZ", default_value = "Asia/Kolkata")]
    timezone: String,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one cycle and print the market state
    Analyze,

    /// Analyse two symbols and print scores and the winner
    Compare {
        #[arg(default_value = "BTCUSDT")]
        symbol_a: String,

        #[arg(default_value = "PAXGUSDT")]
        symbol_b: String,
    },

    /// Print one symbol's trade plan
    Plan {
        symbol: String,
    },

    /// Repeat cycles until interrupted
    Watch {
        /// Seconds between cycles
        #[arg(short, long, default_value = "300")]
        interval: u64,
    },

    /// Print the last persisted snapshot
    Snapshot,
}

fn build_config(args: &Args) -> Result<SentinelConfig> {
    let timezone: Tz = args
        .timezone
        .parse()
        .map_err(|e| anyhow!("unknown timezone {}: {}", args.timezone, e))?;

    Ok(SentinelConfig {
        data_dir: args.data_dir.clone(),
        snapshot_path: args.snapshot.clone(),
        timezone,
        ..SentinelConfig::default()
    })
}

fn run_analyze(config: &SentinelConfig) -> Result<()> {
    let source = CsvDataSource::new(&config.data_dir);
    let store = SnapshotStore::new(&config.snapshot_path, config.timezone);
    let mut ctx = CycleContext::new();

    let report = run_cycle(&source, config, &mut ctx, &store, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&report.state)?);
    Ok(())
}

fn run_compare(config: &SentinelConfig, symbol_a: &str, symbol_b: &str) -> Result<()> {
    let source = CsvDataSource::new(&config.data_dir);
    let comparison = compare_assets(&source, symbol_a, symbol_b, config.candle_limit)?;

    println!("{:<10} {:>6.2}  {}", comparison.asset_a, comparison.score_a, comparison.plan_a.direction);
    println!("{:<10} {:>6.2}  {}", comparison.asset_b, comparison.score_b, comparison.plan_b.direction);
    println!("Winner: {}", comparison.winner);
    Ok(())
}

fn run_plan(config: &SentinelConfig, symbol: &str) -> Result<()> {
    let source = CsvDataSource::new(&config.data_dir);
    let plan = analyze_asset(&source, symbol, config.candle_limit)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run_watch(config: SentinelConfig) -> Result<()> {
    let source = CsvDataSource::new(&config.data_dir);
    let store = SnapshotStore::new(&config.snapshot_path, config.timezone);
    let mut ctx = CycleContext::new();

    info!(
        "Watching {} / {} every {}s",
        config.risk_symbol,
        config.hedge_symbol,
        config.refresh_interval.as_secs()
    );

    let mut interval = tokio::time::interval(config.refresh_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }

        match run_cycle(&source, &config, &mut ctx, &store, Utc::now()) {
            Ok(report) => {
                if let Some(changes) = report.state.state_diff.as_ref().and_then(|d| d.changes()) {
                    for (field, change) in changes {
                        info!("{}: {} -> {}", field, change.before, change.now);
                    }
                }
                println!("{}", serde_json::to_string(&report.state)?);
            }
            Err(e) => warn!("Cycle failed: {}", e),
        }
    }
}

fn run_snapshot(config: &SentinelConfig) -> Result<()> {
    let store = SnapshotStore::new(&config.snapshot_path, config.timezone);
    let snapshot = store
        .load()
        .with_context(|| format!("no snapshot at {}", config.snapshot_path.display()))?;

    println!("Last snapshot: {}", format_snapshot_time(&snapshot.timestamp, config.timezone));
    println!("{}", serde_json::to_string_pretty(&snapshot.state)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&args)?;

    match args.command {
        Commands::Analyze => run_analyze(&config)?,
        Commands::Compare { symbol_a, symbol_b } => run_compare(&config, &symbol_a, &symbol_b)?,
        Commands::Plan { symbol } => run_plan(&config, &symbol)?,
        Commands::Watch { interval } => {
            let config = SentinelConfig {
                refresh_interval: std::time::Duration::from_secs(interval),
                ..config
            };
            run_watch(config).await?;
        }
        Commands::Snapshot => run_snapshot(&config)?,
    }

    Ok(())
}
