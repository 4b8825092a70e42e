//! bigcell CLI Client
//!
//! Command-line interface for interacting with a bigcell emulator.

use std::collections::BTreeMap;

use bigcell::client::{Client, ReadRowsQuery};
use bigcell::config::{DEFAULT_EMULATOR_HOST, EMULATOR_HOST_ENV};
use bigcell::model::{prefix_row_set, ColumnFamily, GcRule, Row, RowSet};
use bigcell::smoke::{self, DEFAULT_INSTANCE_ID, DEFAULT_PROJECT_ID, DEFAULT_TABLE_ID};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// bigcell CLI
#[derive(Parser, Debug)]
#[command(name = "bigcell-cli")]
#[command(about = "CLI for the bigcell emulator")]
struct Args {
    /// Emulator address
    #[arg(long, env = EMULATOR_HOST_ENV, default_value = DEFAULT_EMULATOR_HOST)]
    host: String,

    #[arg(long, default_value = DEFAULT_PROJECT_ID)]
    project: String,

    #[arg(long, default_value = DEFAULT_INSTANCE_ID)]
    instance: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the emulator
    Ping,

    /// List tables of the instance
    Ls,

    /// Create a table
    CreateTable {
        table: String,

        /// Column family to create (repeatable)
        #[arg(short, long = "family", required = true)]
        families: Vec<String>,

        /// Keep at most N versions per column
        #[arg(long)]
        max_versions: Option<u32>,
    },

    /// Delete a table
    DeleteTable { table: String },

    /// Delete every row of a table
    Truncate { table: String },

    /// Write one cell
    Set {
        table: String,
        key: String,
        family: String,
        qualifier: String,
        value: String,
    },

    /// Read one row
    Lookup { table: String, key: String },

    /// Scan a table
    Read {
        table: String,

        /// Only rows whose key starts with `<PREFIX>#`
        #[arg(long)]
        prefix: Option<String>,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// Run the end-to-end walkthrough
    Smoke {
        #[arg(default_value = DEFAULT_TABLE_ID)]
        table: String,
    },
}

fn print_row(row: &Row) {
    println!("{}", String::from_utf8_lossy(&row.key));
    for (family, columns) in &row.families {
        for (qualifier, cells) in columns {
            for cell in cells {
                println!(
                    "  {}:{} @{} = {}",
                    family,
                    String::from_utf8_lossy(qualifier),
                    cell.timestamp_micros,
                    String::from_utf8_lossy(&cell.value)
                );
            }
        }
    }
}

fn run(args: Args) -> bigcell::Result<()> {
    let client = Client::connect(&args.host, &args.project, &args.instance)?;

    match args.command {
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Ls => {
            for table in client.list_tables()? {
                println!("{}", table);
            }
        }
        Commands::CreateTable {
            table,
            families,
            max_versions,
        } => {
            let gc_rule = max_versions.map(GcRule::max_versions);
            let families: BTreeMap<String, ColumnFamily> = families
                .into_iter()
                .map(|id| (id, ColumnFamily::new(gc_rule.clone())))
                .collect();
            match client.table(&table).create(families) {
                Ok(()) => println!("OK"),
                Err(e) if e.is_already_exists() => println!("Table {} already exists", table),
                Err(e) => return Err(e),
            }
        }
        Commands::DeleteTable { table } => {
            client.table(&table).delete()?;
            println!("OK");
        }
        Commands::Truncate { table } => {
            let dropped = client.table(&table).truncate()?;
            println!("Dropped {} rows", dropped);
        }
        Commands::Set {
            table,
            key,
            family,
            qualifier,
            value,
        } => {
            let table = client.table(&table);
            table
                .direct_row(key)
                .set_cell(&family, qualifier, value)
                .commit()?;
            println!("OK");
        }
        Commands::Lookup { table, key } => match client.table(&table).read_row(key, None)? {
            Some(row) => print_row(&row),
            None => println!("(not found)"),
        },
        Commands::Read {
            table,
            prefix,
            limit,
        } => {
            let row_set = prefix.map(prefix_row_set).unwrap_or_else(RowSet::new);
            let mut query = ReadRowsQuery::rows(row_set);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            let rows = client.table(&table).read_rows(&query)?;
            for row in &rows {
                print_row(row);
            }
            println!("({} rows)", rows.len());
        }
        Commands::Smoke { table } => {
            smoke::run(&client, &table)?;
            println!("Walkthrough passed");
        }
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
