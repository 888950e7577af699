use account_ledger::application::outbox::spawn_publisher;
use account_ledger::application::service::LedgerService;
use account_ledger::config::LedgerConfig;
use account_ledger::domain::ports::LedgerStoreHandle;
use account_ledger::infrastructure::account_number::RandomAccountNumberGenerator;
use account_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use account_ledger::infrastructure::publisher::TracingEventPublisher;
use account_ledger::interfaces::batch::BatchRunner;
use account_ledger::interfaces::csv::account_writer::AccountWriter;
use account_ledger::interfaces::csv::command_reader::CommandReader;
use account_ledger::telemetry::{self, LogFormat};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input ledger commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Overrides `storage_timeout_ms` from the configuration
    #[arg(long)]
    storage_timeout_ms: Option<u64>,
}

#[cfg_attr(not(feature = "storage-rocksdb"), allow(unused_variables))]
fn open_store(db_path: Option<PathBuf>, config: &LedgerConfig) -> Result<LedgerStoreHandle> {
    if let Some(db_path) = db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            use account_ledger::infrastructure::rocksdb::RocksDbLedgerStore;

            let store = RocksDbLedgerStore::open(&db_path, config.lock_timeout_ms).into_diagnostic()?;
            tracing::info!(path = %db_path.display(), "using RocksDB storage");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        tracing::warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    if let Some(timeout) = cli.storage_timeout_ms {
        config.storage_timeout_ms = timeout;
    }
    config.validate().into_diagnostic()?;

    let store = open_store(cli.db_path, &config)?;
    let (ledger, events) = LedgerService::new(store, Box::new(RandomAccountNumberGenerator), &config);
    let publisher = spawn_publisher(events, Box::new(TracingEventPublisher));

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = BatchRunner::new(&ledger);
    for (index, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    tracing::error!(record = index + 1, error = %e, "Error applying command");
                }
            }
            Err(e) => {
                tracing::error!(record = index + 1, error = %e, "Error reading command");
            }
        }
    }

    let report = runner.report().await.into_diagnostic()?;
    drop(runner);
    drop(ledger);
    let delivered = publisher.await.into_diagnostic()?;
    tracing::debug!(delivered, "event publisher drained");

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer
        .write_accounts(report.iter().map(|(alias, account)| (alias.as_str(), account)))
        .into_diagnostic()?;

    Ok(())
}
