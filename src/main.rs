//! OSM Payload CLI
//!
//! Usage:
//!   osm-payload decode 01504d3130020103...       decode hex payload
//!   cat uplinks.txt | osm-payload decode --json  decode tiap baris stdin
//!   osm-payload encode CMD "interval CNT1 5"     encode command downlink
//!   osm-payload build                            contoh uplink dari builder
//!   osm-payload bench                            benchmark decode/encode

use std::error::Error;
use std::hint::black_box;
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

use osm_payload::config::DEFAULT_MAX_PAYLOAD_LEN;
use osm_payload::protocol::DEFAULT_PAYLOAD_CAPACITY;
use osm_payload::{
    decode_partial, decode_with, try_encode_command, Aggregate, DecoderConfig, PayloadBuilder,
    Readings, Sample,
};

#[derive(Parser)]
#[command(
    name = "osm-payload",
    version,
    about = "OpenSmartMonitor uplink payload codec"
)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode hex payloads from arguments or stdin
    Decode(DecodeArgs),
    /// Encode a single-field command payload
    Encode {
        /// Field name (max 4 characters)
        name: String,
        /// Command text
        text: String,
    },
    /// Build a sample uplink with the device-side builder
    Build {
        /// Payload capacity in bytes
        #[arg(long, default_value_t = DEFAULT_PAYLOAD_CAPACITY)]
        capacity: usize,
    },
    /// In-process decode/encode latency benchmark
    Bench {
        #[arg(long, default_value_t = 1_000_000)]
        iterations: usize,
    },
}

#[derive(Args)]
struct DecodeArgs {
    /// Hex payloads; read from stdin (one per line) when empty
    payloads: Vec<String>,

    /// Accepted protocol versions
    #[arg(long, env = "OSM_VERSIONS", value_delimiter = ',', default_values_t = [1u8, 2])]
    versions: Vec<u8>,

    /// Accept protocol version 1 only
    #[arg(long)]
    strict: bool,

    /// Reject payloads longer than this
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD_LEN)]
    max_len: usize,

    /// Print one JSON object per payload
    #[arg(long)]
    json: bool,
}

impl DecodeArgs {
    fn config(&self) -> DecoderConfig {
        let config = if self.strict {
            DecoderConfig::strict()
        } else {
            DecoderConfig::default().with_versions(self.versions.clone())
        };
        config.with_max_payload_len(self.max_len)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Decode(args) => run_decode(&args),
        Command::Encode { name, text } => run_encode(name, text),
        Command::Build { capacity } => run_build(capacity),
        Command::Bench { iterations } => run_bench(iterations),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_decode(args: &DecodeArgs) -> Result<ExitCode, Box<dyn Error>> {
    let config = args.config();

    let inputs: Vec<String> = if args.payloads.is_empty() {
        io::stdin().lock().lines().collect::<io::Result<_>>()?
    } else {
        args.payloads.clone()
    };

    let mut failed = false;
    for line in inputs.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let bytes = match parse_hex(line) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("❌ Invalid hex {:?}: {}", line, e);
                failed = true;
                continue;
            }
        };

        let (readings, err) = decode_partial(&bytes, &config);
        if args.json {
            println!("{}", readings.to_json()?);
        } else {
            print_readings(&bytes, &readings);
        }
        if let Some(err) = err {
            eprintln!("⚠️  {}", err);
            failed = true;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Hex dengan prefix `0x` opsional, spasi diabaikan
fn parse_hex(line: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let line = line.strip_prefix("0x").unwrap_or(line);
    let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(digits)
}

fn print_readings(bytes: &[u8], readings: &Readings) {
    match bytes.first() {
        Some(version) => println!("📦 Payload v{} ({} bytes)", version, bytes.len()),
        None => println!("📦 Empty payload"),
    }
    if readings.is_empty() {
        println!("   (no readings)");
    }
    for (name, value) in readings {
        println!("   {:<10} {}", name, value);
    }
}

fn run_encode(name: String, text: String) -> Result<ExitCode, Box<dyn Error>> {
    let mut fields = IndexMap::new();
    fields.insert(name, text);

    match try_encode_command(&fields) {
        Ok(bytes) => {
            println!("{}", hex::encode(bytes));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("❌ Command rejected: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Measurement contoh dari satu interval sensor
fn sample_measurements() -> Vec<(&'static str, Sample)> {
    vec![
        (
            "TEMP",
            Sample::Float(Aggregate {
                sum: 66_150,
                min: 21_800,
                max: 22_400,
                count: 3,
                samplecount: 3,
            }),
        ),
        ("HUMI", Sample::Float(Aggregate::single(48_250))),
        (
            "CNT1",
            Sample::Integer(Aggregate {
                sum: 1_200,
                min: 180,
                max: 620,
                count: 4,
                samplecount: 4,
            }),
        ),
        ("PM25", Sample::Integer(Aggregate::single(7))),
        ("FW", Sample::Text("a1b2c3d4".to_string())),
    ]
}

fn build_sample(builder: &mut PayloadBuilder) -> usize {
    let mut dropped = 0;
    for (name, sample) in sample_measurements() {
        if let Err(e) = builder.append_measurement(name, &sample) {
            eprintln!("⚠️  {}: {}", name, e);
            dropped += 1;
        }
    }
    dropped
}

fn run_build(capacity: usize) -> Result<ExitCode, Box<dyn Error>> {
    println!("🔧 Sample Uplink (capacity {} bytes)", capacity);
    println!("------------------------------------");

    let mut builder = PayloadBuilder::new(capacity);
    let dropped = build_sample(&mut builder);

    println!("  Hex:     {}", hex::encode(builder.as_bytes()));
    println!("  Length:  {} bytes ({} available)", builder.len(), builder.available());
    if dropped > 0 {
        println!("  Dropped: {} measurement(s)", dropped);
    }

    let readings = decode_with(builder.as_bytes(), &DecoderConfig::default())?;
    println!("  Decoded: {}", readings.to_json()?);

    Ok(ExitCode::SUCCESS)
}

fn run_bench(iterations: usize) -> Result<ExitCode, Box<dyn Error>> {
    println!("📊 Codec Benchmark (Tagged Binary Records)");
    println!("------------------------------------------");

    let mut builder = PayloadBuilder::default();
    build_sample(&mut builder);
    let payload = builder.as_bytes().to_vec();
    let config = DecoderConfig::default();
    let samples = sample_measurements();

    // Warm up
    for _ in 0..1000 {
        black_box(decode_with(&payload, &config)?);
    }

    // Benchmark decode
    let start = Instant::now();
    for _ in 0..iterations {
        black_box(decode_with(black_box(&payload), &config)?);
    }
    let decode_duration = start.elapsed();

    // Benchmark encode
    let start = Instant::now();
    for _ in 0..iterations {
        builder.reset();
        for (name, sample) in &samples {
            builder.append_measurement(name, sample)?;
        }
        black_box(builder.as_bytes());
    }
    let encode_duration = start.elapsed();

    let decode_ns = decode_duration.as_nanos() as f64 / iterations.max(1) as f64;
    let encode_ns = encode_duration.as_nanos() as f64 / iterations.max(1) as f64;

    println!("  Payload size: {} bytes, {} records", payload.len(), samples.len());
    println!("  Operations:   {}", iterations);
    println!(
        "  Decode latency: {:.2} ns/payload ({:.3} μs/payload)",
        decode_ns,
        decode_ns / 1000.0
    );
    println!(
        "  Encode latency: {:.2} ns/payload ({:.3} μs/payload)",
        encode_ns,
        encode_ns / 1000.0
    );
    println!(
        "  Decode throughput: {:.2} M payloads/sec",
        iterations as f64 / decode_duration.as_secs_f64() / 1_000_000.0
    );

    println!("\n✅ Benchmark complete!");
    Ok(ExitCode::SUCCESS)
}
