#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::hash::BuildHasherDefault;

use cardinality_trials::{
    HarnessConfig, RandomStrings, SketchConfig, StreamSketch, TrialHarness, Variant,
};
use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use hyperloglogplus::HyperLogLog as HyperLogLogTrait;
use pprof::criterion::{Output, PProfProfiler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};
use wyhash::WyHash;

/// Ingest and estimate operations are benchmarked against cardinalities ranging from 0 to
/// `DEFAULT_MAX_CARDINALITY` or environment variable `N` (if defined) with cardinality doubled
/// with every iteration as [0, 1, 2, ..., N].
const DEFAULT_MAX_CARDINALITY: usize = 65536;
/// Precision used by all estimators
const PRECISION: u8 = 12;
/// Register width of `Compact` estimator
const COMPACT_WIDTH: u8 = 5;

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Protobuf));
    targets = benchmark
}
criterion_main!(benches);

fn benchmark(c: &mut Criterion) {
    let bench_results_path = std::env::var("BENCH_RESULTS_PATH")
        .unwrap_or_else(|_| env!("CARGO_TARGET_TMPDIR").to_string());
    let max_cardinality = std::env::var("N")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CARDINALITY);

    let cardinalities: Vec<usize> = std::iter::once(0)
        .chain((0..).map(|c| 1 << c))
        .take_while(|&c| c <= max_cardinality)
        .collect();

    let mut group = c.benchmark_group("ingest");
    for &cardinality in &cardinalities {
        group.throughput(Throughput::Elements(cardinality.max(1) as u64));
        bench_ingest::<Standard>(&mut group, cardinality);
        bench_ingest::<Improved>(&mut group, cardinality);
        bench_ingest::<Compact>(&mut group, cardinality);
        bench_ingest::<HyperLogLogPlus>(&mut group, cardinality);
    }
    group.finish();

    let mut group = c.benchmark_group("estimate");
    group.throughput(Throughput::Elements(1));
    for &cardinality in &cardinalities {
        bench_estimate::<Standard>(&mut group, cardinality);
        bench_estimate::<Improved>(&mut group, cardinality);
        bench_estimate::<Compact>(&mut group, cardinality);
        bench_estimate::<HyperLogLogPlus>(&mut group, cardinality);
    }
    group.finish();

    let mut group = c.benchmark_group("trials");
    group.sample_size(10);
    for threads in [1, 4] {
        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            &threads,
            |b, &threads| {
                let sketch = SketchConfig::new(10, COMPACT_WIDTH, &Variant::ALL).unwrap();
                let config = HarnessConfig::new(sketch, 5000, 8, 20_000, 1)
                    .unwrap()
                    .with_threads(threads);
                let harness = TrialHarness::new(config, RandomStrings::default()).unwrap();
                b.iter(|| harness.run());
            },
        );
    }
    group.finish();

    let results: Vec<StatRecord> = cardinalities
        .iter()
        .map(|&cardinality| StatRecord {
            cardinality,
            standard: measure_allocations::<Standard>(cardinality),
            improved: measure_allocations::<Improved>(cardinality),
            compact: measure_allocations::<Compact>(cardinality),
            hyperloglogplus: measure_allocations::<HyperLogLogPlus>(cardinality),
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/memory_usage.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();

    let results: Vec<StatRecord> = cardinalities
        .iter()
        .map(|&cardinality| StatRecord {
            cardinality,
            standard: measure_error::<Standard>(cardinality),
            improved: measure_error::<Improved>(cardinality),
            compact: measure_error::<Compact>(cardinality),
            hyperloglogplus: measure_error::<HyperLogLogPlus>(cardinality),
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    std::fs::write(
        format!("{}/relative_error.md", bench_results_path),
        Table::new(results).with(table_config).to_string(),
    )
    .unwrap();
}

/// Common operations of benchmarked estimators.
trait BenchEstimator {
    fn new() -> Self;
    fn ingest(&mut self, item: usize);
    fn estimate(&mut self) -> f64;
    fn name() -> String;
}

fn bench_ingest<E: BenchEstimator>(group: &mut BenchmarkGroup<WallTime>, cardinality: usize) {
    group.bench_with_input(
        BenchmarkId::new(E::name(), cardinality),
        &cardinality,
        |b, &cardinality| {
            b.iter(|| {
                let mut estimator = E::new();
                for i in 0..black_box(cardinality) {
                    estimator.ingest(black_box(i));
                }
            });
        },
    );
}

fn bench_estimate<E: BenchEstimator>(group: &mut BenchmarkGroup<WallTime>, cardinality: usize) {
    group.bench_with_input(
        BenchmarkId::new(E::name(), cardinality),
        &cardinality,
        |b, &cardinality| {
            let mut estimator = E::new();
            for i in 0..black_box(cardinality) {
                estimator.ingest(black_box(i));
            }
            b.iter(|| estimator.estimate());
        },
    );
}

fn measure_allocations<E: BenchEstimator>(cardinality: usize) -> String {
    let _profiler = dhat::Profiler::builder().testing().build();
    let mut estimator = E::new();
    for i in 0..cardinality {
        estimator.ingest(i);
    }
    let stats = dhat::HeapStats::get();
    format!(
        "{} / {} / {}",
        std::mem::size_of::<E>(),
        stats.total_bytes,
        stats.total_blocks,
    )
}

fn measure_error<E: BenchEstimator>(cardinality: usize) -> String {
    let n = 100;
    let mut total_relative_error: f64 = 0.0;
    let mut rng = StdRng::seed_from_u64(12345);
    for _ in 0..n {
        let mut estimator = E::new();
        for _ in 0..cardinality {
            estimator.ingest(rng.gen());
        }
        let relative_error = if cardinality == 0 {
            0.0
        } else {
            (estimator.estimate() - cardinality as f64).abs() / cardinality as f64
        };
        total_relative_error += relative_error;
    }
    let avg_relative_error = total_relative_error / (n as f64);

    if avg_relative_error < 1.0 {
        format!("{:.4}", avg_relative_error)
    } else {
        format!("{:.2e}", avg_relative_error)
    }
}

#[derive(Tabled)]
struct StatRecord {
    cardinality: usize,
    standard: String,
    improved: String,
    compact: String,
    hyperloglogplus: String,
}

/// Sketch of a single variant without ground truth
struct VariantSketch<const V: usize>(StreamSketch<usize>);

type Standard = VariantSketch<0>;
type Improved = VariantSketch<1>;
type Compact = VariantSketch<2>;

impl<const V: usize> BenchEstimator for VariantSketch<V> {
    fn new() -> Self {
        let config = SketchConfig::new(PRECISION, COMPACT_WIDTH, &[Variant::ALL[V]]).unwrap();
        Self(StreamSketch::without_ground_truth(&config, 0))
    }

    fn ingest(&mut self, item: usize) {
        self.0.ingest(item);
    }

    fn estimate(&mut self) -> f64 {
        self.0.estimate(Variant::ALL[V]).unwrap_or_default()
    }

    fn name() -> String {
        Variant::ALL[V].to_string()
    }
}

struct HyperLogLogPlus(hyperloglogplus::HyperLogLogPlus<usize, BuildHasherDefault<WyHash>>);

impl BenchEstimator for HyperLogLogPlus {
    fn new() -> Self {
        Self(
            hyperloglogplus::HyperLogLogPlus::new(
                PRECISION,
                BuildHasherDefault::<WyHash>::default(),
            )
            .unwrap(),
        )
    }

    fn ingest(&mut self, item: usize) {
        self.0.insert(&item);
    }

    fn estimate(&mut self) -> f64 {
        self.0.count()
    }

    fn name() -> String {
        "hyperloglogplus".to_string()
    }
}
