//! CLI definition and dispatch.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::binance_adapter::{BinanceAdapter, DEFAULT_BASE_URL};
use crate::adapters::cryptopanic_adapter::CryptopanicAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_journal::SqliteJournal;
use crate::domain::breaker::{CircuitBreaker, CircuitBreakerState};
use crate::domain::cycle::{run_cycle, CycleOutcome, CycleReport};
use crate::domain::error::KestrelError;
use crate::domain::executor::PaperTrader;
use crate::domain::settings::Settings;
use crate::domain::universe::select_targets;
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_port::JournalPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::sentiment_port::SentimentPort;

#[derive(Parser, Debug)]
#[command(name = "kestrel", about = "Contrarian crypto paper-trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan top pairs and trade in a loop
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Analyse a single symbol once and exit
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
    },
    /// Show recent closed trades
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Export the trade journal to CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Clear the circuit-breaker loss streak and cooldown
    ResetBreaker {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();

    let result = match cli.command {
        Command::Run { config } => run_auto(&config),
        Command::Analyze { config, symbol } => run_manual(&config, &symbol),
        Command::History { config, limit } => run_history(&config, limit),
        Command::Export { config, output } => run_export(&config, &output),
        Command::ResetBreaker { config } => run_reset_breaker(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Everything a trading session needs, wired from one config file.
struct Engine {
    settings: Settings,
    journal: SqliteJournal,
    market: BinanceAdapter,
    sentiment: CryptopanicAdapter,
    trader: PaperTrader,
}

fn load_settings(path: &Path) -> Result<(FileConfigAdapter, Settings), KestrelError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let settings = Settings::from_config(&adapter)?;
    Ok((adapter, settings))
}

fn build_engine(config_path: &Path) -> Result<Engine, KestrelError> {
    let (adapter, settings) = load_settings(config_path)?;

    let journal = SqliteJournal::from_config(&adapter)?;
    let base_url = adapter
        .get_string("market", "base_url")
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let market = BinanceAdapter::new(base_url, settings.market.blacklist.clone())?;
    let sentiment = CryptopanicAdapter::new(
        settings.news.api_key.clone(),
        Duration::from_secs(settings.news.poll_interval_secs),
    )?;

    // The breaker picks up where the last run left off.
    let breaker_state = journal.load_circuit_state()?;
    if breaker_state != CircuitBreakerState::default() {
        warn!(
            consecutive_losses = breaker_state.consecutive_losses,
            cooldown_until = ?breaker_state.cooldown_until,
            "restored circuit-breaker state from journal"
        );
    }
    let breaker = CircuitBreaker::with_state(
        breaker_state,
        settings.breaker.max_consecutive_losses,
        settings.breaker.cooldown_hours,
    );

    let trader = PaperTrader::new(
        settings.trading.initial_balance_usd,
        settings.trading.trade_size_usd,
        breaker,
    );
    info!(
        balance = settings.trading.initial_balance_usd,
        trade_size = settings.trading.trade_size_usd,
        "paper trader initialised"
    );

    Ok(Engine {
        settings,
        journal,
        market,
        sentiment,
        trader,
    })
}

fn run_auto(config_path: &Path) -> Result<(), KestrelError> {
    let mut engine = build_engine(config_path)?;
    info!(
        top_pairs = engine.settings.market.top_pairs,
        interval_secs = engine.settings.trading.poll_interval_secs,
        "auto mode started"
    );

    loop {
        run_scan_cycle(&mut engine)?;
        info!(
            secs = engine.settings.trading.poll_interval_secs,
            "sleeping before next scan"
        );
        std::thread::sleep(Duration::from_secs(
            engine.settings.trading.poll_interval_secs,
        ));
    }
}

fn run_scan_cycle(engine: &mut Engine) -> Result<(), KestrelError> {
    let (fng_value, fng_class) = engine.sentiment.fear_and_greed();
    info!(value = fng_value, classification = %fng_class, "fear & greed index");

    let scanned = match engine.market.top_pairs(engine.settings.market.top_pairs) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!(error = %e, "pair scan failed, falling back to BTCUSDT");
            vec!["BTCUSDT".to_string()]
        }
    };

    // Held symbols ride along so an open position is never abandoned.
    let held = engine.trader.portfolio.symbols();
    let targets = select_targets(&scanned, &held, &engine.settings.market.blacklist);
    info!(count = targets.len(), targets = %targets.join(","), "cycle targets");

    for symbol in &targets {
        let report = run_cycle(
            &engine.market,
            &mut engine.sentiment,
            &mut engine.trader,
            &engine.journal,
            &engine.settings,
            symbol,
            Utc::now(),
        )?;
        log_report(&report);
    }

    info!(
        balance = engine.trader.portfolio.balance,
        open_positions = engine.trader.portfolio.position_count(),
        exposure = engine.trader.portfolio.open_exposure(),
        "cycle complete"
    );
    Ok(())
}

fn log_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Executed(outcome) => {
            info!(
                symbol = %report.symbol,
                action = ?outcome.action,
                pnl = outcome.pnl,
                "cycle result"
            );
        }
        CycleOutcome::SkippedChoppy { adx } => {
            info!(symbol = %report.symbol, adx, "cycle result: skipped (choppy)");
        }
        CycleOutcome::SkippedInsufficientData { bars, minimum } => {
            info!(
                symbol = %report.symbol,
                bars,
                minimum,
                "cycle result: skipped (insufficient data)"
            );
        }
        CycleOutcome::FetchFailed { reason } => {
            warn!(symbol = %report.symbol, %reason, "cycle result: fetch failed");
        }
    }
}

fn run_manual(config_path: &Path, symbol: &str) -> Result<(), KestrelError> {
    let mut engine = build_engine(config_path)?;
    let symbol = symbol.to_uppercase();

    let (fng_value, fng_class) = engine.sentiment.fear_and_greed();
    info!(value = fng_value, classification = %fng_class, "fear & greed index");

    let report = run_cycle(
        &engine.market,
        &mut engine.sentiment,
        &mut engine.trader,
        &engine.journal,
        &engine.settings,
        &symbol,
        Utc::now(),
    )?;
    log_report(&report);

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|e| KestrelError::Io(std::io::Error::other(e)))?;
    println!("{rendered}");
    Ok(())
}

fn run_history(config_path: &Path, limit: usize) -> Result<(), KestrelError> {
    let (adapter, _settings) = load_settings(config_path)?;
    let journal = SqliteJournal::from_config(&adapter)?;

    let trades = journal.recent_trades(limit)?;
    if trades.is_empty() {
        println!("no closed trades");
        return Ok(());
    }

    println!(
        "{:<5} {:<25} {:<12} {:<5} {:>14} {:>10} {:>10}  {}",
        "id", "timestamp", "symbol", "side", "price", "size_usd", "pnl", "status"
    );
    for trade in &trades {
        println!(
            "{:<5} {:<25} {:<12} {:<5} {:>14.4} {:>10.2} {:>10.4}  {}",
            trade.id.unwrap_or_default(),
            trade.timestamp.to_rfc3339(),
            trade.symbol,
            trade.side.to_string(),
            trade.price,
            trade.size_usd,
            trade.pnl,
            trade.status
        );
    }
    Ok(())
}

fn run_export(config_path: &Path, output: &Path) -> Result<(), KestrelError> {
    let (adapter, _settings) = load_settings(config_path)?;
    let journal = SqliteJournal::from_config(&adapter)?;

    let mut trades = journal.recent_trades(usize::MAX)?;
    trades.reverse(); // chronological order for the export

    let mut writer = csv::Writer::from_path(output).map_err(csv_err)?;
    writer
        .write_record([
            "id",
            "timestamp",
            "symbol",
            "side",
            "price",
            "size_usd",
            "pnl",
            "status",
        ])
        .map_err(csv_err)?;
    for trade in &trades {
        writer
            .write_record([
                trade.id.unwrap_or_default().to_string(),
                trade.timestamp.to_rfc3339(),
                trade.symbol.clone(),
                trade.side.to_string(),
                trade.price.to_string(),
                trade.size_usd.to_string(),
                trade.pnl.to_string(),
                trade.status.to_string(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;

    println!("exported {} trades to {}", trades.len(), output.display());
    Ok(())
}

fn run_reset_breaker(config_path: &Path) -> Result<(), KestrelError> {
    let (adapter, _settings) = load_settings(config_path)?;
    let journal = SqliteJournal::from_config(&adapter)?;

    journal.save_circuit_state(&CircuitBreakerState::default())?;
    println!("circuit breaker reset");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), KestrelError> {
    let (_adapter, settings) = load_settings(config_path)?;
    println!(
        "configuration OK: rsi({}) adx({}) bb({},{}) breaker({} losses / {}h cooldown)",
        settings.indicators.rsi_period,
        settings.indicators.adx_period,
        settings.indicators.bb_period,
        settings.indicators.bb_std,
        settings.breaker.max_consecutive_losses,
        settings.breaker.cooldown_hours
    );
    Ok(())
}

fn csv_err(e: csv::Error) -> KestrelError {
    KestrelError::Io(std::io::Error::other(e))
}
