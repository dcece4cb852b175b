//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::{write_leveraged_series, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, RunSummary};
use crate::domain::config_validation::{
    build_backtest_config, build_leverage_params, build_strategy_config, parse_date,
    validate_window,
};
use crate::domain::error::LadderError;
use crate::domain::leveraged::{simulate, LeverageParams};
use crate::domain::metrics::{summarize, Summary};
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ladderbt", about = "Staged dollar-cost-averaging backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the buy/sell ladder over a price history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// First simulated date (YYYY-MM-DD), overrides [backtest] start_date
        #[arg(long)]
        start: Option<String>,
        /// Last simulated date (YYYY-MM-DD), overrides [backtest] end_date
        #[arg(long)]
        end: Option<String>,
        /// Directory for the CSV outputs, overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Build a synthetic leveraged series from an underlying index
    Synthesize {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Config with a [leverage] section; defaults apply without one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            start,
            end,
            output,
        } => run_backtest_command(
            &config,
            data.as_deref(),
            start.as_deref(),
            end.as_deref(),
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Synthesize {
            input,
            output,
            config,
        } => run_synthesize(&input, &output, config.as_deref()),
    }
}

fn fail(e: &LadderError) -> ExitCode {
    error!("{e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LadderError> {
    FileConfigAdapter::from_file(path).map_err(|e| LadderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Everything `backtest` needs, after CLI overrides are applied.
#[derive(Debug)]
pub struct BacktestPlan {
    pub strategy: StrategyConfig,
    pub window: BacktestConfig,
    pub data_path: PathBuf,
    pub output_dir: Option<PathBuf>,
}

pub fn build_plan(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
    start_override: Option<&str>,
    end_override: Option<&str>,
    output_override: Option<&Path>,
) -> Result<BacktestPlan, LadderError> {
    let strategy = build_strategy_config(config)?;

    let mut window = build_backtest_config(config)?;
    if let Some(s) = start_override {
        window.start_date = Some(parse_date("backtest", "start_date", s)?);
    }
    if let Some(s) = end_override {
        window.end_date = Some(parse_date("backtest", "end_date", s)?);
    }
    validate_window(&window)?;

    let data_path = match data_override {
        Some(p) => p.to_path_buf(),
        None => config
            .get_string("data", "path")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| LadderError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };

    let output_dir = output_override.map(Path::to_path_buf).or_else(|| {
        config
            .get_string("report", "output_dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    });

    Ok(BacktestPlan {
        strategy,
        window,
        data_path,
        output_dir,
    })
}

/// Result of a completed run. Either failure below leaves the transaction
/// log and snapshots intact.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: BacktestResult,
    pub statistics: Result<Summary, LadderError>,
}

impl RunOutcome {
    /// The failure that decides the exit status, if any. Statistics errors
    /// are only logged; a run with no trades is still a successful run.
    pub fn failure(&self) -> Option<&LadderError> {
        self.result.summary.as_ref().err()
    }
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &StrategyConfig,
    window: &BacktestConfig,
    report: Option<&dyn ReportPort>,
) -> Result<RunOutcome, LadderError> {
    // Stage 1: Load prices
    let series = data_port.fetch_series()?;
    if series.skipped() > 0 {
        warn!(skipped = series.skipped(), "rows skipped while loading prices");
    }

    // Stage 2: Simulate
    print_rules(strategy);
    info!(
        days = series.len(),
        start = ?window.start_date,
        end = ?window.end_date,
        "running backtest"
    );
    let result = run_backtest(&series, strategy, window);

    match &result.summary {
        Ok(summary) => print_run_summary(summary),
        Err(e) => error!("{e}"),
    }

    // Stage 3: Statistics
    let statistics = summarize(&result.snapshots, window.end_date);
    match &statistics {
        Ok(stats) => print_statistics(stats),
        Err(e) => warn!("statistics unavailable: {e}"),
    }

    // Stage 4: Write outputs
    if let Some(report) = report {
        report.write(&result, statistics.as_ref().ok())?;
    }

    Ok(RunOutcome { result, statistics })
}

fn run_backtest_command(
    config_path: &Path,
    data: Option<&Path>,
    start: Option<&str>,
    end: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    info!("loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let plan = match build_plan(&adapter, data, start, end, output) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(plan.data_path.clone());
    let report = plan.output_dir.clone().map(CsvReportAdapter::new);

    let outcome = match run_backtest_pipeline(
        &data_port,
        &plan.strategy,
        &plan.window,
        report.as_ref().map(|r| r as &dyn ReportPort),
    ) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    match outcome.failure() {
        Some(e) => e.into(),
        None => ExitCode::SUCCESS,
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    info!("validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let plan = match build_plan(&adapter, None, None, None, None) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    if let Err(e) = build_leverage_params(&adapter) {
        return fail(&e);
    }

    print_rules(&plan.strategy);
    println!("Data:   {}", plan.data_path.display());
    println!(
        "Window: {} to {}",
        plan.window
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "start of data".into()),
        plan.window
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "end of data".into()),
    );
    println!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

/// Read `input`, build the leveraged series and write it to `output`.
/// Returns the number of rows written.
pub fn synthesize(
    input: &Path,
    output: &Path,
    params: &LeverageParams,
) -> Result<usize, LadderError> {
    let underlying = CsvAdapter::new(input.to_path_buf()).fetch_series()?;
    let days = simulate(&underlying, params);
    if days.is_empty() {
        warn!("leveraged series is empty");
    }
    write_leveraged_series(output, &days)?;
    info!(rows = days.len(), file = %output.display(), "leveraged series written");
    Ok(days.len())
}

fn run_synthesize(input: &Path, output: &Path, config_path: Option<&Path>) -> ExitCode {
    let params = match config_path {
        Some(path) => match load_config(path).and_then(|c| build_leverage_params(&c)) {
            Ok(p) => p,
            Err(e) => return fail(&e),
        },
        None => LeverageParams::default(),
    };

    match synthesize(input, output, &params) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

pub fn print_rules(strategy: &StrategyConfig) {
    println!("=== Ladder Rules ===");
    if !strategy.is_tradable() {
        println!("Ladder is empty: no trades will be placed.");
    }
    println!("Buy ladder (drop from cycle peak):");
    for (i, drop) in strategy.drop_levels.iter().enumerate() {
        println!(
            "  Level {}: {:>9.4}% drop, buy ${:.2}",
            i + 1,
            drop * 100.0,
            strategy.buy_amount(i),
        );
    }
    println!("Buy growth factor: {}x per level", strategy.buy_multiple);
    println!("Sell ladder (multiple of first buy price):");
    for (i, m) in strategy.sell_multipliers.iter().enumerate() {
        println!("  Target {}: {}x", i + 1, m);
    }
    println!(
        "Each sell: {:.2}% of holdings",
        strategy.sell_fraction * 100.0
    );
    println!();
}

pub fn print_run_summary(summary: &RunSummary) {
    println!("\n=== Final Summary ===");
    println!("Final Date:       {}", summary.final_date);
    println!("Final Close:      ${:.2}", summary.final_close);
    println!("Holding Shares:   {:.4}", summary.holding_shares);
    println!("Total Invested:   ${:.2}", summary.total_invested);
    println!("Total Sold:       ${:.2}", summary.total_sold);
    println!("Holding Value:    ${:.2}", summary.final_holding_value);
    println!("Net Profit:       ${:.2}", summary.net_profit);
    println!("Total Value:      ${:.2}", summary.total_value);
    println!("Multiple:         {:.2}x", summary.multiple);
}

pub fn print_statistics(stats: &Summary) {
    println!("\n=== Statistics ===");
    println!("Period:           {} to {}", stats.start_date, stats.end_date);
    println!("Initial Value:    ${:.2}", stats.initial_value);
    println!("Final Value:      ${:.2}", stats.final_value);
    println!("Annual Return:    {:.2}%", stats.annual_return * 100.0);
    println!("Max Drawdown:     {:.2}%", stats.max_drawdown * 100.0);
    match stats.sharpe_ratio {
        Some(s) => println!("Sharpe Ratio:     {:.2}", s),
        None => println!("Sharpe Ratio:     n/a"),
    }
    if let Some(best) = &stats.best_year {
        println!("Best Year:        {} ({:.2}%)", best.year, best.return_pct * 100.0);
    }
    if let Some(worst) = &stats.worst_year {
        println!("Worst Year:       {} ({:.2}%)", worst.year, worst.return_pct * 100.0);
    }
    if !stats.annual_returns.is_empty() {
        println!("\nYear   Start Value      End Value    Return");
        for y in &stats.annual_returns {
            println!(
                "{}  {:>12.2}  {:>13.2}  {:>7.2}%",
                y.year,
                y.start_value,
                y.end_value,
                y.return_pct * 100.0
            );
        }
    }
}
