// hfts-cli/src/main.rs

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use hfts_common::{Clock, HfConfig, Point, SystemClock};
use hfts_compress::IngestSession;
use hfts_decompress::{extract_points, verify_session, ChunkReader, VerifyReport};

#[derive(Parser)]
#[command(name = "hfts")]
#[command(about = "hfts: chunked zstd storage for high-frequency time series", long_about = None)]
struct Cli {
    /// Configuration override as key=value, e.g. hf_compress.bufferSize=65536
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest sequential points; with --sessions > 1 each session's series is suffixed _0, _1, ...
    Ingest {
        #[arg(short, long, default_value = "sequentialPoints")]
        name: String,

        #[arg(short, long, default_value_t = 1_000_000)]
        points: usize,

        #[arg(short, long, default_value_t = 1)]
        batches: usize,

        #[arg(short, long, default_value_t = 1)]
        sessions: usize,
    },

    /// Read a session back through its ledger record
    Extract {
        #[arg(short, long)]
        ledger: PathBuf,

        #[arg(short, long, default_value = "point")]
        name: String,

        /// Number of points to print
        #[arg(long, default_value_t = 10)]
        show: usize,
    },

    /// Check that every chunk of a session decodes
    Verify {
        #[arg(short, long)]
        ledger: PathBuf,
    },
}

fn load_config(overrides: &[String]) -> Result<HfConfig> {
    let mut source = HashMap::new();
    for item in overrides {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("override {:?} is not KEY=VALUE", item))?;
        source.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(HfConfig::from_source(&source)?)
}

/// Sessions of one run start within the same second, so each needs its own series.
fn series_name(name: &str, session: usize, sessions: usize) -> String {
    if sessions > 1 {
        format!("{}_{}", name, session)
    } else {
        name.to_string()
    }
}

fn sequential_points(name: &str, count: usize, begin: f64, clock: &impl Clock) -> Vec<Point> {
    let base = clock.now_nanos();
    (0..count)
        .map(|i| Point::new(name, begin + i as f64, base + i as i64))
        .collect()
}

fn print_verify(report: &VerifyReport) {
    println!("Chunks total:        {}", report.total_chunks);
    println!("Chunks verified:     {}", report.verified_chunks);
    println!("Chunks corrupt:      {}", report.corrupt_chunks);
    println!("Compressed bytes:    {}", report.compressed_bytes);
    println!("Verified bytes:      {}", report.verified_bytes);
    for path in &report.corrupt {
        println!("  corrupt: {}", path.display());
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli.overrides).context("invalid configuration")?;

    match cli.command {
        Commands::Ingest {
            name,
            points,
            batches,
            sessions,
        } => {
            let clock = SystemClock;
            let mut session = IngestSession::new(config)?;
            let per_batch = points.div_ceil(batches.max(1));

            for i in 0..sessions {
                let series = series_name(&name, i, sessions);
                session.initialize()?;
                let mut remaining = points;
                let mut begin = 0.0;
                while remaining > 0 {
                    let n = per_batch.min(remaining);
                    session.insert(&sequential_points(&series, n, begin, &clock))?;
                    begin += n as f64;
                    remaining -= n;
                }
                let summary = session.close()?;
                let report = &summary.report;
                info!(
                    "[hfts] session #{} {} written to {}",
                    summary.ordinal,
                    summary.layout.stem,
                    summary.ledger_path.display()
                );
                println!("\nSession #{} done:", summary.ordinal);
                println!("Ledger:              {}", summary.ledger_path.display());
                println!("Chunk directory:     {}", summary.layout.target_dir().display());
                println!("Points:              {}", report.points);
                println!("Input bytes:         {}", report.input_bytes);
                println!("Output bytes:        {}", report.output_bytes);
                println!("Compression ratio:   {:.2}%", report.compression_ratio());
                println!("Chunks:              {}", report.chunks);
                println!("Throughput:          {:.1} MiB/s", report.throughput_mib_s());
                println!("Mean batch latency:  {:?}", report.mean_batch_latency());
            }
        }

        Commands::Extract { ledger, name, show } => {
            let reader = ChunkReader::new(true);
            let points = extract_points(&reader, &config, &ledger, &name)
                .with_context(|| format!("reading {}", ledger.display()))?;
            info!("[hfts] extracted {} points from {}", points.len(), ledger.display());
            println!("{} points", points.len());
            for p in points.iter().take(show) {
                println!("{},{},{}", p.name, p.timestamp, p.value);
            }
        }

        Commands::Verify { ledger } => {
            let report = verify_session(&config, &ledger).with_context(|| format!("verifying {}", ledger.display()))?;
            print_verify(&report);
            if !report.is_clean() {
                warn!("[hfts] {}: {} of {} chunks corrupt", ledger.display(), report.corrupt_chunks, report.total_chunks);
                return Err(anyhow!("{} corrupt chunks", report.corrupt_chunks));
            }
        }
    }

    Ok(())
}
