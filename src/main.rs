//! CryptoNote Pool Payment Processor CLI
//!
//! Runs settlement cycles on a fixed delay, armed only after the previous
//! cycle fully completes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cn_pool_payments::{
    amounts,
    config::{Config, StoreBackend},
    engine::{CycleOutcome, PaymentEngine},
    notify::{self, NotificationPayload},
    rpc::{DaemonClient, HttpWalletClient},
    store::{FileStore, MemoryStore, StoreDocument, WorkerStore},
};

#[derive(Parser)]
#[command(name = "cn-pool-payments")]
#[command(about = "Payment batching and settlement engine for CryptoNote mining pools")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "payments.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run settlement cycles continuously
    Run {
        /// Run one cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Show store contents and recent payments
    Status,

    /// Validate configuration file
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            if matches!(cli.command, Commands::ValidateConfig) {
                eprintln!("Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            anyhow::bail!("Failed to load config from {:?}: {}", cli.config, e);
        }
    };

    match cli.command {
        Commands::Run { once } => run_processor(config, once).await,
        Commands::Status => show_status(&config),
        Commands::ValidateConfig => {
            println!("Configuration is valid.");
            println!("  Coin: {} ({})", config.coin.name, config.coin.symbol);
            println!(
                "  Minimum payout: {}",
                amounts::format_amount(&config.coin, config.payments.min_payment)
            );
            println!("  Denomination: {}", config.payments.denomination);
            println!("  Max addresses per tx: {}", config.payments.max_addresses);
            println!("  Cycle interval: {}s", config.payments.interval_secs);
            println!("  Wallet: {} ({:?})", config.wallet.url, config.wallet.family);
            println!("  Migration enabled: {}", config.migration.enabled);
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn build_store(config: &Config) -> Result<Box<dyn WorkerStore>> {
    Ok(match config.store.backend {
        StoreBackend::File => Box::new(FileStore::open(&config.store.path)?),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    })
}

async fn run_processor(config: Config, once: bool) -> Result<()> {
    tracing::info!(
        coin = %config.coin.name,
        interval_secs = config.payments.interval_secs,
        "starting payment processor"
    );

    let store = build_store(&config)?;
    let wallet = HttpWalletClient::from_config(&config.wallet, &config.payments)?;
    let daemon = DaemonClient::from_config(&config.daemon)?;
    let sink = notify::create_sink(&config.notifications)?;

    let coin = config.coin.clone();
    let engine = PaymentEngine::new(config, store, Box::new(wallet), Box::new(daemon));

    loop {
        match engine.run_cycle().await {
            Ok(CycleOutcome::Skipped(reason)) => {
                tracing::debug!(?reason, "cycle skipped");
            }
            Ok(CycleOutcome::Settled(report)) => {
                for payment in &report.notifications {
                    tracing::info!(
                        "payment of {} to {}",
                        amounts::format_amount(&coin, payment.amount),
                        amounts::truncate_address(&payment.address)
                    );
                }

                if let Some(sink) = &sink {
                    let payloads: Vec<NotificationPayload> = report
                        .notifications
                        .iter()
                        .map(|n| NotificationPayload::new(n, &coin))
                        .collect();
                    if let Err(e) = sink.notify_batch(&payloads).await {
                        tracing::warn!("notification delivery failed: {}", e);
                    }
                }
            }
            Err(e) => {
                tracing::error!("settlement cycle aborted: {}", e);
            }
        }

        if once {
            tracing::info!("single cycle complete, exiting");
            break;
        }

        // Rearm only after the cycle fully completed, whatever the outcome
        tokio::time::sleep(engine.interval()).await;
    }

    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let document = match config.store.backend {
        StoreBackend::File => FileStore::open(&config.store.path)?.document(),
        StoreBackend::Memory => {
            println!("Memory store backend holds no persistent state.");
            return Ok(());
        }
    };

    print_status(config, &document);
    Ok(())
}

fn print_status(config: &Config, document: &StoreDocument) {
    println!("Workers: {}", document.workers.len());
    for (worker, entry) in &document.workers {
        println!(
            "  {}  balance {}  paid {}",
            amounts::truncate_address(worker),
            amounts::format_amount(&config.coin, entry.balance),
            amounts::format_amount(&config.coin, entry.paid)
        );
    }

    let pending: u64 = document.workers.values().map(|e| e.balance).sum();
    println!(
        "Pending balances: {}",
        amounts::format_amount(&config.coin, pending)
    );

    println!("Payments recorded: {}", document.payments_all.len());
    for entry in document.payments_all.iter().rev().take(10) {
        let when = chrono::DateTime::from_timestamp(entry.time as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {}  {}", when, entry.member);
    }
}
