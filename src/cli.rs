//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvPriceAdapter, read_holdings, write_history};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::adapters::run_marker::FileRunMarker;
use crate::domain::config::AppConfig;
use crate::domain::config_validation::load_config;
use crate::domain::engine::{DecisionEngine, Evaluation};
use crate::domain::error::TacticianError;
use crate::domain::live::{LiveCycleOutcome, LiveTrader, run_live_cycle};
use crate::domain::metrics::Metrics;
use crate::domain::simulation::SimulationDriver;
use crate::ports::data_port::PriceProvider;

#[derive(Parser, Debug)]
#[command(name = "tactician", about = "Regime-switching allocation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay history day by day and report performance
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <TICKER>.csv price files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Write the equity history as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the regime and target portfolio for one date
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Run one rebalancing cycle against a paper account
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Holdings snapshot CSV (ticker,market_value)
        #[arg(long)]
        holdings: PathBuf,
        #[arg(long)]
        cash: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Simulate {
            config,
            data_dir,
            output,
        } => run_simulate(&config, data_dir, output.as_deref()),
        Command::Evaluate {
            config,
            data_dir,
            as_of,
        } => run_evaluate(&config, data_dir, as_of),
        Command::Rebalance {
            config,
            data_dir,
            holdings,
            cash,
            date,
        } => run_rebalance(&config, data_dir, &holdings, cash, date),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate an INI file.
pub fn load_app_config(path: &Path) -> Result<AppConfig, TacticianError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    load_config(&adapter)
}

fn price_adapter(app: &AppConfig, data_dir: Option<PathBuf>) -> CsvPriceAdapter {
    let dir = data_dir.unwrap_or_else(|| app.data.directory.clone());
    CsvPriceAdapter::new(dir, app.engine.universe.all_tickers())
}

fn run_simulate(config: &Path, data_dir: Option<PathBuf>, output: Option<&Path>) -> Result<(), TacticianError> {
    let app = load_app_config(config)?;
    let provider = price_adapter(&app, data_dir);
    let metrics = run_simulation(&app, &provider, output)?;
    eprint!("{}", format_metrics(&metrics));
    Ok(())
}

/// Fetch, replay and optionally write the history CSV.
pub fn run_simulation(
    app: &AppConfig,
    provider: &dyn PriceProvider,
    output: Option<&Path>,
) -> Result<Metrics, TacticianError> {
    let panel = provider.get_panel(app.simulation.end_date)?;
    eprintln!(
        "Running simulation: {} instruments, {} dates",
        panel.tickers().count(),
        panel.len()
    );

    let result = SimulationDriver::new(&app.engine, app.simulation.clone()).run(&panel)?;
    if let Some(path) = output {
        write_history(path, &result.points)?;
        eprintln!("History written to: {}", path.display());
    }
    Ok(Metrics::compute(&result))
}

pub fn format_metrics(m: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Simulation Results ===");
    let _ = writeln!(out, "Final Equity:     {:.2}", m.final_equity);
    let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Annualized:       {:.2}%", m.annualized_return * 100.0);
    let _ = writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Sortino Ratio:    {:.2}", m.sortino_ratio);
    let _ = writeln!(out, "Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Drawdown Days:    {}", m.max_drawdown_duration);
    if let Some(b) = m.benchmark_return {
        let _ = writeln!(out, "Benchmark:        {:.2}%", b * 100.0);
    }
    let _ = writeln!(out, "ATTACK/DEFENSE:   {}/{} days", m.attack_days, m.defense_days);
    let _ = writeln!(out, "Trades:           {}", m.trade_count);
    let _ = writeln!(out, "Costs Paid:       {:.2}", m.total_cost);
    out
}

fn run_evaluate(config: &Path, data_dir: Option<PathBuf>, as_of: Option<NaiveDate>) -> Result<(), TacticianError> {
    let app = load_app_config(config)?;
    let provider = price_adapter(&app, data_dir);
    let evaluation = evaluate_once(&app, &provider, as_of)?;
    print!("{}", format_evaluation(&evaluation));
    Ok(())
}

/// Evaluate on the last date on or before `as_of` (latest when absent).
pub fn evaluate_once(
    app: &AppConfig,
    provider: &dyn PriceProvider,
    as_of: Option<NaiveDate>,
) -> Result<Evaluation, TacticianError> {
    let panel = provider.get_panel(as_of)?;
    let view = panel.latest().ok_or_else(|| TacticianError::NoData {
        ticker: app.engine.universe.benchmark.clone(),
    })?;
    Ok(DecisionEngine::from_config(&app.engine).evaluate(&view))
}

pub fn format_evaluation(evaluation: &Evaluation) -> String {
    let d = &evaluation.decision;
    let mut out = String::new();
    let _ = writeln!(out, "date:     {}", evaluation.date);
    let _ = writeln!(out, "regime:   {}", d.regime);
    let _ = writeln!(out, "trend:    {:+.2}%", d.trend_distance * 100.0);
    if let Some(asset) = &d.defense_asset {
        let _ = writeln!(out, "refuge:   {asset}");
    }
    for (ticker, score) in &d.canary_momentum {
        let _ = writeln!(out, "canary:   {ticker} {score:+.3}");
    }
    if evaluation.target.is_empty() {
        let _ = writeln!(out, "target:   cash");
    }
    for line in &evaluation.target.lines {
        let _ = writeln!(
            out,
            "target:   {:<6} {:>6.2}%  {:<9} score {:.3} vol {:.3} atr {:.2}",
            line.ticker,
            line.weight * 100.0,
            line.rationale.to_string(),
            line.score,
            line.volatility,
            line.atr
        );
    }
    let _ = writeln!(out, "cash:     {:.2}%", (1.0 - evaluation.target.total_weight()).max(0.0) * 100.0);
    out
}

fn run_rebalance(
    config: &Path,
    data_dir: Option<PathBuf>,
    holdings: &Path,
    cash: f64,
    date: Option<NaiveDate>,
) -> Result<(), TacticianError> {
    let app = load_app_config(config)?;
    let provider = price_adapter(&app, data_dir);
    let mut broker = PaperBroker::new(cash, read_holdings(holdings)?);
    let mut gate = FileRunMarker::new(app.live.run_marker.clone());
    let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let trader = LiveTrader::from_config(&app.engine);
    match run_live_cycle(today, &trader, &provider, &mut broker, &mut gate)? {
        LiveCycleOutcome::AlreadyRan(date) => {
            println!("already ran for {date}");
        }
        LiveCycleOutcome::Executed {
            evaluation,
            submitted,
        } => {
            print!("{}", format_evaluation(&evaluation));
            for order in &submitted {
                println!("order:    {} {} {:.2}", order.side, order.ticker, order.notional());
            }
            println!("cash:     {:.2} after {} orders", broker.cash(), submitted.len());
        }
    }
    Ok(())
}

fn run_validate(config: &Path) -> Result<(), TacticianError> {
    let app = load_app_config(config)?;
    let u = &app.engine.universe;
    eprintln!("Universe:");
    eprintln!("  benchmark:  {}", u.benchmark);
    eprintln!("  canaries:   {}", u.canaries.join(", "));
    eprintln!("  defense:    {}", u.defense.join(", "));
    eprintln!("  candidates: {}", u.attack_candidates().join(", "));
    eprintln!("  cash:       {}", u.cash_symbol);
    eprintln!("\nConfiguration is valid");
    Ok(())
}
