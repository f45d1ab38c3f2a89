//! Repertoire Report Binary
//!
//! Reads movetext from stdin (one line per row; `[Tag "value"]` lines set
//! repertoire headers), builds a repertoire and prints one JSON document with
//! its snapshot, frequencies, pruned snapshot, chunks and rows.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REP_SIDE`: `white` or `black` (default: white)
//! - `REP_START_FEN`: root position (default: standard initial position)
//! - `REP_MAX_PLIES`: ply cap per chunk (default: 1000)
//! - `REP_DESCRIPTION_PLIES`: tokens in fallback row descriptions (default: 6)
//! - `REP_ON_LINE_ERROR`: `skip` or `abort` (default: skip)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr; stdout carries only the report.
//!
//! ## Usage
//!
//! ```bash
//! REP_SIDE=black REP_MAX_PLIES=8 repertoire_report < lines.txt
//! ```

use std::io::{self, BufRead, Write};

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repertoire_graph::notation::parse_tag_pair;
use repertoire_graph::{
    chunk_label, frequencies, prune, rows, split, Chunk, EngineConfig, FrequencyReport,
    LineRequest, RepertoireSnapshot, Row,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "repertoire_report=info,repertoire_graph=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    }
}

#[derive(Serialize)]
struct LabelledChunk {
    label: String,
    #[serde(flatten)]
    chunk: Chunk,
}

#[derive(Serialize)]
struct Rejected {
    line: usize,
    error: String,
}

#[derive(Serialize)]
struct Report {
    config: EngineConfig,
    config_hash: String,
    snapshot: RepertoireSnapshot,
    rejected: Vec<Rejected>,
    frequencies: FrequencyReport,
    pruned_snapshot: RepertoireSnapshot,
    chunks: Vec<LabelledChunk>,
    rows: Vec<Row>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = EngineConfig::from_env()?;
    let config_hash = config.params_hash();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        side = %config.side,
        config_hash = %config_hash,
        "Starting repertoire report"
    );

    let mut repertoire = config.repertoire()?;
    // Input line numbers, for mapping batch indices back to the source.
    let mut line_numbers: Vec<usize> = Vec::new();
    let mut lines: Vec<LineRequest> = Vec::new();

    for (number, text) in io::stdin().lock().lines().enumerate() {
        let text = text?;
        if text.trim().is_empty() {
            continue;
        }
        if let Some((name, value)) = parse_tag_pair(&text) {
            repertoire.headers_mut().insert(name, value);
            continue;
        }
        line_numbers.push(number + 1);
        lines.push(LineRequest::from_movetext(&text));
    }

    let report = repertoire.ingest_batch(lines, config.line_error_policy)?;
    let rejected: Vec<Rejected> = report
        .rejected
        .iter()
        .map(|r| Rejected {
            line: line_numbers.get(r.index).copied().unwrap_or(r.index + 1),
            error: r.error.to_string(),
        })
        .collect();
    for r in &rejected {
        warn!(line = r.line, error = %r.error, "Skipped input line");
    }

    if repertoire.ensure_populated().is_err() {
        warn!("No moves ingested; report will be empty");
    }

    let pruned = prune(&repertoire);
    let chunks: Vec<LabelledChunk> = split(&repertoire, config.max_plies)
        .map(|chunk| LabelledChunk {
            label: chunk_label(&repertoire, &chunk),
            chunk,
        })
        .collect();

    let output = Report {
        snapshot: repertoire.snapshot(),
        rejected,
        frequencies: FrequencyReport::new(frequencies(&repertoire), config_hash.clone()),
        pruned_snapshot: pruned.snapshot(),
        rows: rows(&repertoire, &config.row_options()),
        chunks,
        config_hash,
        config,
    };

    info!(
        nodes = output.snapshot.node_count,
        pruned_nodes = output.pruned_snapshot.node_count,
        chunks = output.chunks.len(),
        rows = output.rows.len(),
        "Report complete"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &output)?;
    writeln!(out)?;
    Ok(())
}
