//! BytesDB CLI
//!
//! Inspect and modify table segments directly on disk.

use std::process;

use bytesdb::{Config, RecordPosition, Session, StorageManager};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// BytesDB CLI
#[derive(Parser, Debug)]
#[command(name = "bytesdb-cli")]
#[command(about = "CLI for BytesDB segment storage")]
#[command(version)]
struct Args {
    /// Root data directory
    #[arg(short, long, default_value = "./bytesdb_data")]
    root: String,

    /// Storage backend
    #[arg(short, long, default_value = "local_file")]
    storage_type: String,

    /// Maximum active segment size in bytes
    #[arg(short, long, default_value_t = bytesdb::config::DEFAULT_MAX_SEGMENT_SIZE)]
    max_segment_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a key/value record
    Put {
        schema: String,
        table: String,
        key: String,
        value: String,
    },

    /// Read the record at a position
    Get {
        schema: String,
        table: String,
        segment: u64,
        offset: u64,
        size: u64,
    },

    /// Append a tombstone for a key
    Del {
        schema: String,
        table: String,
        key: String,
    },

    /// Print the active segment size
    Size { schema: String, table: String },

    /// Print every record with its position
    Scan { schema: String, table: String },

    /// Remove every segment of a table
    Drop { schema: String, table: String },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,bytesdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .root_path(&args.root)
        .storage_type(&args.storage_type)
        .max_segment_size(args.max_segment_size)
        .build();

    let manager = match StorageManager::new(&config) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            process::exit(1);
        }
    };

    let result = run(&manager, args.command);
    let closed = manager.close();

    if let Err(e) = result.and(closed) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(manager: &StorageManager, command: Commands) -> bytesdb::Result<()> {
    match command {
        Commands::Put {
            schema,
            table,
            key,
            value,
        } => {
            let session = Session::new(schema, table);
            let record = bytesdb::Record::new(key.into_bytes(), value.into_bytes());
            let position = manager.write(&session, &record)?;
            manager.flush(&session)?;
            println!("{}", format_position(&position));
        }
        Commands::Get {
            schema,
            table,
            segment,
            offset,
            size,
        } => {
            let session = Session::new(schema, table);
            let position = RecordPosition {
                segment,
                position: offset,
                size,
            };
            let record = manager.read(&session, &position)?;
            println!(
                "{:?} {} = {}",
                record.typ,
                String::from_utf8_lossy(&record.key),
                String::from_utf8_lossy(&record.value)
            );
        }
        Commands::Del { schema, table, key } => {
            let session = Session::new(schema, table);
            let position = manager.delete(&session, key.into_bytes())?;
            manager.flush(&session)?;
            println!("{}", format_position(&position));
        }
        Commands::Size { schema, table } => {
            println!("{}", manager.size(&Session::new(schema, table))?);
        }
        Commands::Scan { schema, table } => {
            for item in manager.scan(&Session::new(schema, table))? {
                let (position, record) = item?;
                println!(
                    "{} {:?} {} = {}",
                    format_position(&position),
                    record.typ,
                    String::from_utf8_lossy(&record.key),
                    String::from_utf8_lossy(&record.value)
                );
            }
        }
        Commands::Drop { schema, table } => {
            manager.remove_all_data(&Session::new(schema, table))?;
        }
    }
    Ok(())
}

/// "segment:offset+size"
fn format_position(position: &RecordPosition) -> String {
    format!("{}:{}+{}", position.segment, position.position, position.size)
}
