//! dotset: project, flatten and unflatten JSON documents
//!
//! Usage:
//!   # Keep a few fields, renaming and casting on the way
//!   dotset users.json --fields 'id:int,profile.name__as__name,tags..label'
//!
//!   # Everything but secrets, with defaults, from stdin
//!   cat events.jsonl | dotset --ndjson --fields '*,-token' --defaults '{"status": "new"}'
//!
//!   # Flatten nested documents into dotted keys
//!   dotset --flat config.json
//!
//! Output is one JSON document per line.

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use dotset::{document_from_value, flatten, merge, unflatten, Document, Extractor, Projection};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dotset")]
#[command(about = "Project, flatten and unflatten JSON documents", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Process newline-delimited JSON (one JSON object per line)
    #[arg(long)]
    ndjson: bool,

    /// Field spec applied to every document, e.g. 'a,b.c__as__d:int,-e'
    #[arg(long, short = 'f')]
    fields: Option<String>,

    /// JSON object whose keys fill gaps in every output document
    #[arg(long, short = 'd')]
    defaults: Option<String>,

    /// Flatten output into dotted keys, keeping lists whole
    #[arg(long, conflicts_with_all = ["flat_all", "unflat"])]
    flat: bool,

    /// Flatten output into dotted keys, lists included
    #[arg(long, conflicts_with = "unflat")]
    flat_all: bool,

    /// Rebuild nested documents from dotted keys
    #[arg(long)]
    unflat: bool,

    /// Skip documents that end up empty
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("dotset=warn".parse()?))
        .init();

    let args = Args::parse();

    let defaults = args
        .defaults
        .as_deref()
        .map(parse_defaults)
        .transpose()?;

    let extractor = Extractor::default();
    let projection = args
        .fields
        .as_deref()
        .map(|fields| extractor.compile(fields))
        .transpose()
        .context("Invalid --fields")?;

    let reader = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {file_path}"))?;
        Box::new(BufReader::new(file)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };
    let records = read_records(reader, args.ndjson)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (idx, record) in records.into_iter().enumerate() {
        let doc = document_from_value(record).with_context(|| format!("Record {idx} is not an object"))?;
        let doc = reshape(&extractor, &args, projection.as_deref(), defaults.as_ref(), doc)
            .with_context(|| format!("Failed to process record {idx}"))?;

        if args.compact && doc.is_empty() {
            continue;
        }
        serde_json::to_writer(&mut out, &doc)?;
        writeln!(out)?;
    }
    out.flush()?;

    Ok(())
}

fn parse_defaults(raw: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(raw).context("Failed to parse --defaults")?;
    document_from_value(value).context("--defaults must be a JSON object")
}

fn reshape(
    extractor: &Extractor,
    args: &Args,
    projection: Option<&Projection>,
    defaults: Option<&Document>,
    doc: Document,
) -> Result<Document> {
    let mut doc = match projection {
        Some(projection) => extractor.project(&doc, projection, defaults)?,
        None => {
            let mut doc = doc;
            if let Some(defaults) = defaults {
                merge(&mut doc, defaults);
            }
            doc
        }
    };

    if args.flat || args.flat_all {
        doc = flatten(&doc, !args.flat_all);
    } else if args.unflat {
        doc = unflatten(&doc)?;
    }
    Ok(doc)
}

/// Read every record, using SIMD-accelerated parsing when possible
fn read_records(reader: Box<dyn Read>, ndjson: bool) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_end(&mut content)?;

    if ndjson {
        return read_lines(&content);
    }

    // Try SIMD parsing first - use OwnedValue to avoid borrow issues
    let mut records = Vec::new();
    match simd_json::to_owned_value(&mut content.clone()) {
        Ok(simd_json::OwnedValue::Array(arr)) => {
            for elem in arr.iter() {
                let json_str = simd_json::to_string(elem)?;
                records.push(serde_json::from_str(&json_str)?);
            }
        }
        Ok(elem) => {
            let json_str = simd_json::to_string(&elem)?;
            records.push(serde_json::from_str(&json_str)?);
        }
        // Fallback to serde_json for NDJSON
        Err(_) => records = read_lines(&content)?,
    }
    Ok(records)
}

fn read_lines(content: &[u8]) -> Result<Vec<Value>> {
    let content_str = String::from_utf8_lossy(content);
    let mut records = Vec::new();
    for (line_no, line) in content_str.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", line_no + 1))?;
        records.push(value);
    }
    Ok(records)
}
