//! TailSQL daemon
//!
//! The `tailsqld` binary:
//! - Loads the server configuration and registers one relation per stream
//! - Replays input files through the ingestion workers
//! - Runs queries and prints result rows as line-delimited JSON
//!
//! # Usage
//!
//! ```bash
//! # Replay a file into the "events" relation and query it
//! tailsqld --config tailsql.toml \
//!     --input events=events.jsonl \
//!     --query "events=SELECT amount FROM events WHERE name = 'x'"
//!
//! # Print the effective configuration
//! tailsqld --config tailsql.toml --print-config
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tailsql_server::config::ServerConfig;
use tailsql_server::database::Datastore;
use tailsql_server::ingest::{spawn_ingest, IngestRecord, IngestSender};
use tailsql_server::output::write_json_rows;

/// TailSQL daemon
#[derive(Parser, Debug)]
#[command(
    name = "tailsqld",
    version,
    about = "Columnar SQL over ingested record streams",
    long_about = "Ingests raw records per relation into columnar batches and answers\n\
                  single-relation equality queries over them."
)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "TAILSQL_CONFIG")]
    config: Option<PathBuf>,

    /// Replay file for a relation, one raw record per line
    #[arg(short = 'i', long = "input", value_name = "RELATION=FILE", value_parser = parse_assignment)]
    inputs: Vec<(String, String)>,

    /// Query to run against a relation once ingestion finished
    #[arg(short = 'q', long = "query", value_name = "RELATION=SQL", value_parser = parse_assignment)]
    queries: Vec<(String, String)>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "TAILSQL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected RELATION=VALUE, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path).context("Failed to load config file")?,
        None => ServerConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    init_logging(&config.log_level);

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    run(config, args).await
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "tailsql_server={level},tailsql_sql={level},tailsql_common={level},tailsqld={level}"
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Rows go to stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

async fn run(config: ServerConfig, args: Args) -> Result<()> {
    let datastore = Datastore::from_config(&config);
    info!(
        instance_id = %config.instance_id,
        streams = config.streams.len(),
        "starting tailsqld"
    );

    let mut writers = HashMap::new();
    for stream in &config.streams {
        let writer = datastore
            .register(stream)
            .with_context(|| format!("Failed to register stream '{}'", stream.topic))?;
        writers.insert(stream.topic.clone(), (writer, stream.on_decode_error));
    }

    let mut workers = Vec::new();
    for (relation, path) in &args.inputs {
        let (writer, policy) = writers
            .remove(relation)
            .ok_or_else(|| anyhow!("no stream configured for input '{relation}' (or given twice)"))?;
        let (sender, worker) = spawn_ingest(writer, config.ingest_queue_capacity, policy);
        let sent = replay(&sender, path).await?;
        info!(relation = %relation, records = sent, path = %path, "replayed input");
        drop(sender);
        workers.push((relation.clone(), worker));
    }

    for (relation, worker) in workers {
        let stats = worker
            .await
            .context("Ingestion worker panicked")?
            .with_context(|| format!("Ingestion into '{relation}' failed"))?;
        info!(
            relation = %relation,
            accepted = stats.accepted,
            skipped = stats.skipped,
            "ingestion finished"
        );
    }

    if args.queries.is_empty() {
        warn!("no queries given");
    }
    for (relation, sql) in &args.queries {
        let results = datastore
            .query(relation, sql)
            .with_context(|| format!("Query against '{relation}' failed"))?;
        let stdout = std::io::stdout();
        let rows = write_json_rows(stdout.lock(), results)
            .with_context(|| format!("Query against '{relation}' failed"))?;
        info!(relation = %relation, rows, "query finished");
    }

    Ok(())
}

async fn replay(sender: &IngestSender, path: &str) -> Result<u64> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open input {path}"))?;
    let mut lines = BufReader::new(file).lines();
    let mut offset = 0i64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let record = IngestRecord::new(offset, Bytes::new(), Bytes::from(line));
        if sender.send(record).await.is_err() {
            // The worker stopped; its error surfaces from the join handle.
            break;
        }
        offset += 1;
    }
    if offset == 0 && sender.is_closed() {
        bail!("ingestion worker for {} stopped before reading input", sender.relation());
    }
    Ok(offset as u64)
}
