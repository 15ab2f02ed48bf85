use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use washbay::application::ledger::BookingLedger;
use washbay::application::revocation::TokenRevocationRegistry;
use washbay::application::service::BookingService;
use washbay::config::{Config, ConfigArgs};
use washbay::domain::ports::{BookingStoreBox, CatalogStoreBox};
use washbay::infrastructure::in_memory::{InMemoryBookingStore, InMemoryCatalogStore};
use washbay::infrastructure::payment::build_registry;
use washbay::interfaces::csv::booking_writer::BookingWriter;
use washbay::interfaces::csv::command_reader::CommandReader;
use washbay::interfaces::session::Session;
use washbay::logging;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command script CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<(BookingStoreBox, CatalogStoreBox)> {
    use washbay::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open(db_path)?;
            Ok((Box::new(store.clone()), Box::new(store)))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<(BookingStoreBox, CatalogStoreBox)> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (BookingStoreBox, CatalogStoreBox) {
    (
        Box::new(InMemoryBookingStore::new()),
        Box::new(InMemoryCatalogStore::new()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from(cli.config);
    logging::init(&config.log_filter);

    let (bookings, catalog) = open_stores(cli.db_path)?;
    let service = BookingService::new(
        BookingLedger::new(bookings),
        catalog,
        build_registry(&config.payment),
        config.booking,
    );
    let mut session = Session::new(service, TokenRevocationRegistry::new());

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (line, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                let op = command.op;
                if let Err(e) = session.execute(command).await {
                    warn!(line = line + 2, ?op, kind = e.kind(), "Error processing command: {}", e);
                }
            }
            Err(e) => {
                warn!(line = line + 2, "Error reading command: {}", e);
            }
        }
    }

    let rows = session.report().await?;

    let stdout = io::stdout();
    let mut writer = BookingWriter::new(stdout.lock());
    writer.write_bookings(rows).into_diagnostic()?;

    Ok(())
}
