//! CLI definition and dispatch.

use chrono::{Days, Local, NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::calendar::is_last_business_day_of_month;
use crate::domain::config_validation::{
    parse_date, validate_data_config, validate_execution_config, validate_strategy_config,
};
use crate::domain::error::DualmomError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::momentum::DEFAULT_LOOKBACK;
use crate::domain::order::TimeInForce;
use crate::domain::price::{AlignedPrices, PriceSeries};
use crate::domain::reconcile::{self, ExecutionConfig, ReconcileOutcome, DEFAULT_CAPITAL_FRACTION};
use crate::domain::signal::{AssetPair, Signal};
use crate::ports::broker_port::BrokerPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

/// Decisions are made after the 4 p.m. close.
pub const DEFAULT_RUN_AFTER_HOUR: u32 = 16;

#[derive(Parser, Debug)]
#[command(name = "dualmom", about = "Monthly dual-momentum rotation between two ETFs")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a historical backtest of the rotation
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the monthly strategy series as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the raw and lagged monthly decisions
    Signal {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Move the brokerage account onto the current decision
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        /// Plan orders without submitting them
        #[arg(long)]
        dry_run: bool,
        /// Skip the month-end and market-close checks
        #[arg(long)]
        force: bool,
        /// Decide as of this date instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Check brokerage connectivity and print account equity
    Account {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, output } => run_backtest(&config, output.as_ref()),
        Command::Signal { config } => run_signal(&config),
        Command::Rebalance {
            config,
            dry_run,
            force,
            date,
        } => run_rebalance(&config, dry_run, force, date),
        Command::Account { config } => run_account(&config),
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

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, DualmomError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn run_validate(config_path: &PathBuf) -> Result<(), DualmomError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_data_config(&adapter)?;
    validate_execution_config(&adapter)?;
    println!("{}: ok", config_path.display());
    Ok(())
}

fn run_backtest(config_path: &PathBuf, output_path: Option<&PathBuf>) -> Result<(), DualmomError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_data_config(&adapter)?;

    let default_end = today().checked_sub_days(Days::new(1)).unwrap_or_else(today);
    let bt_config = build_backtest_config(&adapter, default_end)?;
    let price_port = open_price_port(&adapter)?;

    let run = run_backtest_pipeline(price_port.as_ref(), &bt_config)?;
    print_report(&run.result, &run.report);

    if let Some(path) = output_path {
        let path = path.display().to_string();
        CsvReportAdapter.write(&run.result, &run.report, &path)?;
        info!(
            "Wrote strategy series to {path} and metrics to {}",
            crate::adapters::csv_report_adapter::summary_path(&path).display()
        );
    }
    Ok(())
}

fn run_signal(config_path: &PathBuf) -> Result<(), DualmomError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_data_config(&adapter)?;

    let bt_config = build_backtest_config(&adapter, today())?;
    let price_port = open_price_port(&adapter)?;
    let prices = fetch_prices(
        price_port.as_ref(),
        &bt_config.pair,
        bt_config.start_date,
        bt_config.end_date,
    )?;
    let signal = Signal::compute(&prices, &bt_config.pair, bt_config.lookback)?;
    print_signal(&signal);
    Ok(())
}

fn run_rebalance(
    config_path: &PathBuf,
    dry_run: bool,
    force: bool,
    date: Option<NaiveDate>,
) -> Result<(), DualmomError> {
    let adapter = load_config(config_path)?;
    validate_strategy_config(&adapter)?;
    validate_data_config(&adapter)?;
    validate_execution_config(&adapter)?;

    let as_of = date.unwrap_or_else(today);
    if force {
        warn!("--force given, skipping invocation checks");
    } else {
        let run_after = adapter.get_int("execution", "run_after_hour", DEFAULT_RUN_AFTER_HOUR as i64);
        // The close check only makes sense for a live run.
        let hour = date.is_none().then(|| Local::now().hour());
        if let Err(reason) = invocation_gate(as_of, hour, run_after as u32) {
            println!("{reason}; not rebalancing");
            return Ok(());
        }
    }

    let bt_config = build_backtest_config(&adapter, as_of)?;
    let exec_config = build_execution_config(&adapter)?;
    let price_port = open_price_port(&adapter)?;
    let broker = open_broker(&adapter)?;

    match run_rebalance_pipeline(
        price_port.as_ref(),
        broker.as_ref(),
        &bt_config,
        &exec_config,
        as_of,
        dry_run,
    )? {
        Some(outcome) => print_outcome(&outcome, dry_run),
        None => println!("No valid signal on or before {as_of}; nothing to do"),
    }
    Ok(())
}

fn run_account(config_path: &PathBuf) -> Result<(), DualmomError> {
    let adapter = load_config(config_path)?;
    let broker = open_broker(&adapter)?;
    let equity = broker.get_account_equity()?;
    println!("Connected to brokerage account");
    println!("Equity: {equity:.2}");
    Ok(())
}

/// Rebalancing happens only on the last business day of the month and, for
/// a live run, after the close.
pub fn invocation_gate(
    as_of: NaiveDate,
    hour: Option<u32>,
    run_after_hour: u32,
) -> Result<(), String> {
    if let Some(hour) = hour {
        if hour < run_after_hour {
            return Err(format!(
                "market not closed yet (hour {hour} < {run_after_hour})"
            ));
        }
    }
    if !is_last_business_day_of_month(as_of) {
        return Err(format!("{as_of} is not the last trading day of the month"));
    }
    Ok(())
}

/// `default_end` applies when `[strategy] end_date` is not set.
pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    default_end: NaiveDate,
) -> Result<BacktestConfig, DualmomError> {
    let asset_a = adapter
        .get_string("strategy", "asset_a")
        .unwrap_or_else(|| "SPY".to_string());
    let asset_b = adapter
        .get_string("strategy", "asset_b")
        .unwrap_or_else(|| "QQQ".to_string());

    let start_date = parse_date(
        adapter.get_string("strategy", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = match adapter.get_string("strategy", "end_date") {
        Some(s) => parse_date(Some(&s), "end_date")?,
        None => default_end,
    };
    if start_date >= end_date {
        return Err(DualmomError::config_invalid(
            "strategy",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let lookback = adapter.get_int("strategy", "lookback", DEFAULT_LOOKBACK as i64);
    let lookback = usize::try_from(lookback)
        .ok()
        .filter(|&l| l > 0)
        .ok_or_else(|| DualmomError::config_invalid("strategy", "lookback", "must be positive"))?;

    Ok(BacktestConfig {
        pair: AssetPair::new(asset_a.to_uppercase(), asset_b.to_uppercase()),
        start_date,
        end_date,
        lookback,
        risk_free_rate: adapter.get_double("strategy", "risk_free_rate", 0.02),
    })
}

pub fn build_execution_config(adapter: &dyn ConfigPort) -> Result<ExecutionConfig, DualmomError> {
    let time_in_force = match adapter.get_string("execution", "time_in_force") {
        Some(s) => s
            .parse::<TimeInForce>()
            .map_err(|reason| DualmomError::config_invalid("execution", "time_in_force", reason))?,
        None => TimeInForce::Day,
    };
    Ok(ExecutionConfig {
        capital_fraction: adapter.get_double(
            "execution",
            "capital_fraction",
            DEFAULT_CAPITAL_FRACTION,
        ),
        time_in_force,
        strict_universe: adapter.get_bool("execution", "strict_universe", false),
    })
}

#[cfg(feature = "alpaca")]
pub fn build_alpaca_config(
    adapter: &dyn ConfigPort,
    env: &dyn Fn(&str) -> Option<String>,
) -> crate::adapters::alpaca_adapter::AlpacaConfig {
    use crate::adapters::alpaca_adapter::{AlpacaConfig, DATA_URL, PAPER_TRADING_URL};

    let credential = |key: &str, env_name: &str| {
        adapter
            .get_string("alpaca", key)
            .or_else(|| env(env_name))
            .unwrap_or_default()
    };
    let delay_ms = adapter.get_int("alpaca", "request_delay_ms", 250).max(0) as u64;

    AlpacaConfig {
        key_id: credential("key_id", "ALPACA_API_KEY_ID"),
        secret_key: credential("secret_key", "ALPACA_API_SECRET_KEY"),
        trading_url: adapter
            .get_string("alpaca", "trading_url")
            .or_else(|| env("ALPACA_BASE_URL"))
            .unwrap_or_else(|| PAPER_TRADING_URL.to_string()),
        data_url: adapter
            .get_string("alpaca", "data_url")
            .unwrap_or_else(|| DATA_URL.to_string()),
        feed: adapter
            .get_string("alpaca", "feed")
            .unwrap_or_else(|| "iex".to_string()),
        request_delay: std::time::Duration::from_millis(delay_ms),
    }
}

#[cfg(feature = "alpaca")]
fn alpaca_client(
    adapter: &dyn ConfigPort,
) -> Result<crate::adapters::alpaca_adapter::AlpacaClient, DualmomError> {
    let config = build_alpaca_config(adapter, &|name| std::env::var(name).ok());
    crate::adapters::alpaca_adapter::AlpacaClient::new(config)
}

pub fn open_price_port(adapter: &dyn ConfigPort) -> Result<Box<dyn PricePort>, DualmomError> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();
    match source.as_str() {
        "csv" => {
            let dir = adapter
                .get_string("data", "csv_dir")
                .ok_or_else(|| DualmomError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvPriceAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "alpaca")]
        "alpaca" => Ok(Box::new(alpaca_client(adapter)?)),
        other => Err(DualmomError::config_invalid(
            "data",
            "source",
            format!("unsupported source '{other}'"),
        )),
    }
}

pub fn open_broker(adapter: &dyn ConfigPort) -> Result<Box<dyn BrokerPort>, DualmomError> {
    #[cfg(feature = "alpaca")]
    {
        Ok(Box::new(alpaca_client(adapter)?))
    }

    #[cfg(not(feature = "alpaca"))]
    {
        let _ = adapter;
        Err(DualmomError::Broker {
            reason: "alpaca feature is required for brokerage access".into(),
        })
    }
}

/// Fetch both legs and join them on the union of their dates. Either leg
/// having no bars aborts the run.
pub fn fetch_prices(
    port: &dyn PricePort,
    pair: &AssetPair,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<AlignedPrices, DualmomError> {
    let mut series = Vec::with_capacity(2);
    for symbol in pair.symbols() {
        let closes = port.get_daily_closes(symbol, start_date, end_date)?;
        if closes.is_empty() {
            return Err(DualmomError::DataUnavailable {
                symbol: symbol.to_string(),
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }
        if let Some(bad) = closes.iter().find(|c| !c.is_valid()) {
            return Err(DualmomError::PriceSource {
                reason: format!(
                    "{symbol} close on {} is not a positive price: {}",
                    bad.date, bad.close
                ),
            });
        }
        info!(symbol, bars = closes.len(), "fetched daily closes");
        series.push(PriceSeries::new(symbol, closes));
    }
    Ok(AlignedPrices::align(&series))
}

pub struct BacktestRun {
    pub signal: Signal,
    pub result: BacktestResult,
    pub report: PerformanceReport,
}

pub fn run_backtest_pipeline(
    port: &dyn PricePort,
    bt_config: &BacktestConfig,
) -> Result<BacktestRun, DualmomError> {
    let prices = fetch_prices(port, &bt_config.pair, bt_config.start_date, bt_config.end_date)?;
    let signal = Signal::compute(&prices, &bt_config.pair, bt_config.lookback)?;

    match (signal.first_actionable(), signal.last_actionable()) {
        (Some(first), Some(last)) => {
            info!(first = %first.date, last = %last.date, "actionable signal window")
        }
        _ => warn!("no actionable decisions in range"),
    }

    let result = backtest_engine::run_backtest(&prices, &signal.lagged, &bt_config.pair);
    let report = PerformanceReport::compute(&result, bt_config.risk_free_rate)?;
    Ok(BacktestRun {
        signal,
        result,
        report,
    })
}

/// `None` when no actionable decision exists on or before `as_of`.
pub fn run_rebalance_pipeline(
    price_port: &dyn PricePort,
    broker: &dyn BrokerPort,
    bt_config: &BacktestConfig,
    exec_config: &ExecutionConfig,
    as_of: NaiveDate,
    dry_run: bool,
) -> Result<Option<ReconcileOutcome>, DualmomError> {
    let end_date = bt_config.end_date.min(as_of);
    let prices = fetch_prices(price_port, &bt_config.pair, bt_config.start_date, end_date)?;
    let signal = Signal::compute(&prices, &bt_config.pair, bt_config.lookback)?;

    let Some(point) = signal.lagged_as_of(as_of) else {
        return Ok(None);
    };
    let Some(target) = signal.symbol_of(point) else {
        info!(date = %point.date, "decision undefined for this period");
        return Ok(None);
    };
    info!(date = %point.date, symbol = target, "signal says to hold");

    let outcome = reconcile::reconcile(broker, &bt_config.pair, target, exec_config, dry_run)?;
    Ok(Some(outcome))
}

fn fmt_pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn print_report(result: &BacktestResult, report: &PerformanceReport) {
    println!("=== Strategy Performance ({} / {}) ===", result.pair.a, result.pair.b);
    println!("CAGR:          {}", fmt_pct(report.cagr));
    println!("Volatility:    {}", fmt_pct(report.volatility));
    match report.sharpe_ratio {
        Some(s) => println!("Sharpe Ratio:  {s:.2}"),
        None => println!("Sharpe Ratio:  n/a (zero volatility)"),
    }
    println!("Total Return:  {}", fmt_pct(report.total_return));
    println!("Max Drawdown:  {}", fmt_pct(report.max_drawdown));
    println!(
        "Window:        {} -> {} ({} months, {} undefined)",
        report.start_date,
        report.end_date,
        report.months,
        result.undefined_months()
    );
}

fn print_signal(signal: &Signal) {
    println!(
        "{:<12} {:>10} {:>10} {:>8} {:>8}",
        "date",
        format!("mom {}", signal.pair.a),
        format!("mom {}", signal.pair.b),
        "raw",
        "hold"
    );
    let fmt_mom = |m: Option<f64>| m.map(fmt_pct).unwrap_or_else(|| "-".to_string());
    for (raw, lagged) in signal.raw.iter().zip(&signal.lagged) {
        println!(
            "{:<12} {:>10} {:>10} {:>8} {:>8}",
            raw.date.to_string(),
            fmt_mom(raw.momentum_a),
            fmt_mom(raw.momentum_b),
            signal.symbol_of(raw).unwrap_or("-"),
            signal.symbol_of(lagged).unwrap_or("-"),
        );
    }
}

fn print_outcome(outcome: &ReconcileOutcome, dry_run: bool) {
    println!("Target: {}", outcome.plan.target);
    println!(
        "Equity: {:.2}  Target notional: {:.2}",
        outcome.equity, outcome.notional
    );
    let orders = outcome.plan.intent.orders();
    if orders.is_empty() {
        println!("Already holding {}; no orders", outcome.plan.target);
        return;
    }
    let verb = if dry_run { "would submit" } else { "submitted" };
    for order in orders {
        println!("  {verb}: {order}");
    }
    for position in &outcome.plan.unmanaged {
        println!("  ignored holding: {} x{}", position.symbol, position.quantity);
    }
}
