//! slotstore CLI
//!
//! Inspects and edits a collection of JSON documents on disk.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use slotstore::{Collection, Config, Document, JsonCodec, NoProjection, RecordId, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// slotstore
#[derive(Parser, Debug)]
#[command(name = "slotstore")]
#[command(about = "Embeddable slot-log collection store")]
#[command(version)]
struct Args {
    /// Data directory of the collection
    #[arg(short, long, default_value = "./slotstore_data")]
    data_dir: PathBuf,

    /// Slot size in bytes (must match the collection's log)
    #[arg(short, long, default_value = "2048")]
    slot_size: usize,

    /// Projected-fields capacity of index records
    #[arg(short, long, default_value = "256")]
    projection_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record, slot and byte counts
    Stats,

    /// Scan the log and check it against the index
    Verify,

    /// Print every live document as JSON
    Dump,

    /// Create a document, or update it if its id already exists
    Put {
        /// The document, a JSON object
        json: String,
    },

    /// Print one document
    Get {
        /// Record id (UUID)
        id: RecordId,
    },

    /// Delete one document
    Delete {
        /// Record id (UUID)
        id: RecordId,
    },

    /// Compact the log once
    Compact,

    /// Rebuild the index from the log
    RebuildIndex,
}

type Documents = Collection<Document, JsonCodec<Document>, NoProjection>;

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,slotstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("slotstore v{}", slotstore::VERSION);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .slot_size(args.slot_size)
        .projection_capacity(args.projection_capacity)
        .build();

    let documents: Documents = match Collection::open(config, JsonCodec::new(), NoProjection) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to open collection: {}", e);
            process::exit(1);
        }
    };

    let result = run(&documents, args.command);
    let closed = documents.close();

    if let Err(e) = result.and(closed) {
        tracing::error!("{}", e);
        process::exit(if e.is_not_found() { 2 } else { 1 });
    }
}

fn run(documents: &Documents, command: Commands) -> slotstore::Result<()> {
    match command {
        Commands::Stats => {
            let stats = documents.stats()?;
            println!("records:   {}", stats.records);
            println!("log slots: {}", stats.log_slots);
            println!("log bytes: {}", stats.log_bytes);
        }
        Commands::Verify => {
            let report = documents.verify()?;
            println!("indexed:     {}", report.indexed);
            println!("active:      {}", report.active);
            println!("deleted:     {}", report.deleted);
            println!("corrupt:     {}", report.corrupt);
            println!("undecodable: {}", report.undecodable);
            println!("orphaned:    {}", report.orphaned);
            if !report.is_consistent() {
                return Err(StoreError::IndexCorruption(
                    "log and index disagree, run rebuild-index".to_string(),
                ));
            }
            println!("ok");
        }
        Commands::Dump => {
            for document in documents.read_all()? {
                println!("{}", to_json(&document)?);
            }
        }
        Commands::Put { json } => {
            let value = serde_json::from_str(&json)
                .map_err(|e| StoreError::Decoding(format!("invalid JSON: {}", e)))?;
            let document = Document::from_value(value)?;
            let stored = if !document.id.is_nil() && documents.contains(document.id)? {
                documents.update(document)?
            } else {
                documents.create(document)?
            };
            println!("{}", stored.id);
        }
        Commands::Get { id } => {
            println!("{}", to_json(&documents.read(id)?)?);
        }
        Commands::Delete { id } => {
            documents.delete(id)?;
            println!("deleted {}", id);
        }
        Commands::Compact => {
            let stats = documents.compact()?;
            println!("live records: {}", stats.live_records);
            println!("slots:        {} -> {}", stats.slots_before, stats.slots_after);
            println!("reclaimed:    {} bytes", stats.bytes_reclaimed());
            if stats.skipped > 0 {
                println!("skipped:      {}", stats.skipped);
            }
        }
        Commands::RebuildIndex => {
            let stats = documents.rebuild_index()?;
            println!("live:    {}", stats.live);
            println!("deleted: {}", stats.deleted);
            println!("skipped: {}", stats.skipped);
        }
    }
    Ok(())
}

fn to_json(document: &Document) -> slotstore::Result<String> {
    serde_json::to_string(document).map_err(|e| StoreError::Encoding(e.to_string()))
}
