//! Compare estimator variants over repeated trials of random string streams.
//!
//! ```sh
//! RUST_LOG=info cargo run --release --example comparison -- --trials 20 --stream-len 200000
//! ```

use cardinality_trials::{
    HarnessConfig, RandomStrings, RegisterBank, SketchConfig, TrialHarness, Variant,
    DEFAULT_STEP_SIZE,
};
use clap::Parser;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "Compare HyperLogLog variants over repeated trials")]
struct Args {
    /// Number of bucket selector bits
    #[arg(short, long, default_value_t = 10)]
    precision: u8,

    /// Register width of the compact variant
    #[arg(short = 'w', long, default_value_t = 5)]
    compact_width: u8,

    /// Estimator variants to compare
    #[arg(long, value_delimiter = ',', default_values_t = Variant::ALL)]
    variants: Vec<Variant>,

    /// Number of independent trials
    #[arg(short, long, default_value_t = 10)]
    trials: usize,

    /// Number of elements generated per trial
    #[arg(short = 'n', long, default_value_t = 100_000)]
    stream_len: usize,

    /// Number of elements between checkpoints
    #[arg(short, long, default_value_t = DEFAULT_STEP_SIZE)]
    step_size: usize,

    /// Base seed of all trials
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run trials on a dedicated pool with this many threads
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> cardinality_trials::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let sketch = SketchConfig::new(args.precision, args.compact_width, &args.variants)?;
    let mut config = HarnessConfig::new(
        sketch.clone(),
        args.step_size,
        args.trials,
        args.stream_len,
        args.seed,
    )?;
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    println!(
        "precision: {}, registers: {}, trials: {}, stream length: {}, step: {}",
        sketch.precision(),
        sketch.num_registers(),
        config.trials(),
        config.stream_len(),
        config.step_size()
    );
    println!("\nMemory usage:");
    for &variant in sketch.variants() {
        let bank = RegisterBank::new(sketch.precision(), variant.encoding(sketch.compact_width()))?;
        println!("  {variant:<10} {:>8} bytes", bank.storage_bytes());
    }

    let harness = TrialHarness::new(config, RandomStrings::default())?;
    let table = harness.run();

    let mut builder = Builder::default();
    builder.push_record(table.header());
    for record in table.records() {
        builder.push_record(record);
    }
    println!("\n{}", builder.build().with(Style::markdown()));

    println!("\nSummary:");
    for &variant in table.variants() {
        if let Some(summary) = table.summary(variant) {
            println!(
                "  {variant:<10} avg error {:.2}%, max error {:.2}%, avg relative std {:.2}%",
                summary.avg_error * 100.0,
                summary.max_error * 100.0,
                summary.avg_relative_std * 100.0
            );
        }
    }
    println!(
        "  theoretical standard error {:.2}%, long-run bound {:.2}%",
        Variant::standard_error(sketch.precision()) * 100.0,
        Variant::error_bound(sketch.precision()) * 100.0
    );
    Ok(())
}
