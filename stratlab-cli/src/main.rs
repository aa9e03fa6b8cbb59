//! StratLab CLI: browse the strategy catalog and replay strategies.
//!
//! Commands:
//! - `list`: every registered strategy with its description
//! - `params`: parameter surface of one strategy
//! - `run`: replay a strategy over CSV or synthetic candles, one instance
//!   per instrument, and print intents, trades and the run fingerprint

mod run_config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use run_config::{parse_override, CandleSource, RunConfig};
use std::path::PathBuf;
use stratlab_core::config::EngineConfig;
use stratlab_core::domain::Timeframe;
use stratlab_core::engine::{replay, ReplayOptions, ReplayReport, StrategyRunner};
use stratlab_core::strategy::Strategy;
use stratlab_core::synthetic::SyntheticSpec;
use stratlab_strategies::StrategyRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CANDLE_TYPE: &str = "CandleType";

#[derive(Parser)]
#[command(name = "stratlab", about = "StratLab CLI: candle-driven strategy replays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the strategy catalog.
    List {
        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the parameters of a strategy.
    Params {
        /// Registry name (e.g., ma_crossover).
        strategy: String,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay a strategy over candles.
    Run {
        /// Registry name. Overrides the config file's strategy.
        #[arg(long)]
        strategy: Option<String>,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candle CSV (open_time,open,high,low,close,volume). `{instrument}`
        /// in the path is replaced per instrument.
        #[arg(long, conflicts_with = "synthetic")]
        csv: Option<PathBuf>,

        /// Use generated candles.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Number of synthetic candles.
        #[arg(long)]
        bars: Option<usize>,

        /// Master seed for synthetic candles.
        #[arg(long)]
        seed: Option<u64>,

        /// Instrument to replay; repeat for several.
        #[arg(long = "instrument")]
        instruments: Vec<String>,

        /// Parameter override, Name=Value; repeat for several.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        overrides: Vec<String>,

        /// Timeframe of the source candles (e.g., 1h, 15m).
        #[arg(long)]
        timeframe: Option<Timeframe>,

        /// Also feed in-progress higher-timeframe candles.
        #[arg(long, default_value_t = false)]
        partials: bool,

        /// Print the reports as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Run-command flags layered over a config file.
#[derive(Debug, Default)]
struct RunArgs {
    strategy: Option<String>,
    config: Option<PathBuf>,
    csv: Option<PathBuf>,
    synthetic: bool,
    bars: Option<usize>,
    seed: Option<u64>,
    instruments: Vec<String>,
    overrides: Vec<String>,
    timeframe: Option<Timeframe>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = StrategyRegistry::builtin();

    match cli.command {
        Commands::List { json } => run_list(&registry, json),
        Commands::Params { strategy, json } => run_params(&registry, &strategy, json),
        Commands::Run {
            strategy,
            config,
            csv,
            synthetic,
            bars,
            seed,
            instruments,
            overrides,
            timeframe,
            partials,
            json,
        } => {
            let args = RunArgs {
                strategy,
                config,
                csv,
                synthetic,
                bars,
                seed,
                instruments,
                overrides,
                timeframe,
            };
            let run_config = build_run_config(args)?;
            let options = ReplayOptions {
                emit_partials: partials,
            };
            let reports = run_replays(&registry, &run_config, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_report(report);
                }
            }
            Ok(())
        }
    }
}

fn run_list(registry: &StrategyRegistry, json: bool) -> Result<()> {
    let rows = registry.list();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in &rows {
        println!(
            "{:<width$}  {:>2} params  {}",
            row.name, row.param_count, row.description
        );
    }
    Ok(())
}

fn run_params(registry: &StrategyRegistry, name: &str, json: bool) -> Result<()> {
    let strategy = registry.create(name)?;
    let info = strategy.params().info();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("=== {} ===", strategy.name());
    println!("{}", strategy.description());
    println!();
    for p in &info {
        let range = match (p.min, p.max, p.step) {
            (Some(min), Some(max), Some(step)) => format!("[{min} .. {max} step {step}]"),
            _ => String::new(),
        };
        let optimize = if p.can_optimize { "opt" } else { "" };
        println!(
            "{:<22} {:<9} {:>8}  {:<28} {:<3}  {}",
            p.name, p.type_name, p.value, range, optimize, p.display_description
        );
    }
    Ok(())
}

/// Config file (if any) with command-line flags applied on top.
fn build_run_config(args: RunArgs) -> Result<RunConfig> {
    let mut config = match (&args.config, &args.strategy) {
        (Some(path), _) => RunConfig::from_file(path)?,
        (None, Some(strategy)) => RunConfig::new(strategy.clone()),
        (None, None) => bail!("one of --strategy or --config is required"),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(timeframe) = args.timeframe {
        config.timeframe = timeframe;
    }
    if !args.instruments.is_empty() {
        config.instruments = args.instruments;
    }

    if let Some(path) = args.csv {
        config.source = CandleSource::Csv { path };
    } else if args.synthetic && !matches!(config.source, CandleSource::Synthetic(_)) {
        config.source = CandleSource::Synthetic(SyntheticSpec::default());
    }
    if args.bars.is_some() || args.seed.is_some() {
        let CandleSource::Synthetic(spec) = &mut config.source else {
            bail!("--bars and --seed apply to synthetic candles only");
        };
        if let Some(bars) = args.bars {
            spec.bars = bars;
        }
        if let Some(seed) = args.seed {
            spec.seed = seed;
        }
    }

    for arg in &args.overrides {
        let (name, value) = parse_override(arg)?;
        config.params.insert(name, toml::Value::String(value));
    }
    Ok(config)
}

/// Registry instance with the run's parameter values applied.
///
/// `CandleType` follows the source timeframe unless it is overridden.
fn prepare_strategy(registry: &StrategyRegistry, config: &RunConfig) -> Result<Box<dyn Strategy>> {
    let mut strategy = registry.create(&config.strategy)?;
    let params = strategy.params_mut();
    if params.descriptor(CANDLE_TYPE).is_some() && !config.params.contains_key(CANDLE_TYPE) {
        params.set_str(CANDLE_TYPE, &config.timeframe.to_string())?;
    }
    for (name, value) in config.param_overrides()? {
        params
            .set_str(&name, &value)
            .with_context(|| format!("setting {name}={value}"))?;
    }
    Ok(strategy)
}

/// One clone of the configured strategy per instrument, replayed in parallel.
fn run_replays(
    registry: &StrategyRegistry,
    config: &RunConfig,
    options: &ReplayOptions,
) -> Result<Vec<ReplayReport>> {
    let strategy = prepare_strategy(registry, config)?;
    let jobs: Vec<(String, Box<dyn Strategy>)> = config
        .instruments()
        .into_iter()
        .map(|instrument| (instrument, strategy.create_clone()))
        .collect();

    info!(
        strategy = %config.strategy,
        instruments = jobs.len(),
        params = %strategy.params().hash(),
        "starting replay"
    );

    jobs.into_par_iter()
        .map(|(instrument, instance)| {
            let candles = config.source.load(&instrument, config.timeframe)?;
            if candles.is_empty() {
                bail!("{instrument}: no candles to replay");
            }
            let engine = EngineConfig {
                instrument: instrument.clone(),
                ..config.engine.clone()
            };
            let mut runner = StrategyRunner::simulated(instance, engine);
            let report = replay(&mut runner, &candles, options)
                .with_context(|| format!("replaying {instrument}"))?;
            info!(
                instrument = %instrument,
                candles = report.candles,
                trades = report.trades.len(),
                fingerprint = report.fingerprint.short(),
                "replay finished"
            );
            Ok(report)
        })
        .collect()
}

fn print_report(report: &ReplayReport) {
    let submitted = report
        .intents
        .iter()
        .filter(|r| r.outcome.is_submitted())
        .count();
    let rejected = report
        .intents
        .iter()
        .filter(|r| r.outcome.is_rejected())
        .count();

    println!();
    println!("=== {} on {} ===", report.strategy, report.instrument);
    println!("Candles:       {}", report.candles);
    println!("Final state:   {}", report.final_state);
    println!(
        "Position:      {} @ {:.4}",
        report.final_position.quantity, report.final_position.entry_price
    );
    println!(
        "Intents:       {} ({submitted} submitted, {rejected} rejected)",
        report.intents.len()
    );
    println!("Trades:        {}", report.trades.len());
    println!("Incidents:     {}", report.incidents.len());
    println!("Fingerprint:   {}", report.fingerprint.run_hash);

    if !report.intents.is_empty() {
        println!();
        println!("--- Intents ---");
        for r in &report.intents {
            println!(
                "{}  {:<10} {:<16} {}",
                r.time.format("%Y-%m-%d %H:%M"),
                format!("{:?}", r.source),
                r.intent.to_string(),
                r.outcome
            );
        }
    }
    if !report.trades.is_empty() {
        println!();
        println!("--- Trades ---");
        for t in &report.trades {
            println!(
                "{}  {:<4} {:>10} @ {:.4}",
                t.time.format("%Y-%m-%d %H:%M"),
                t.side,
                t.volume,
                t.price
            );
        }
    }
    for incident in &report.incidents {
        println!("! {}: {}", incident.kind, incident.message);
    }
}
