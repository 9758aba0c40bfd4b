use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smart_surface::sensors::stats;
use smart_surface::{
    ClassificationThresholds, LastMeasurement, SensorConfig, SimulatedHardware, SurfaceEngine,
};

/// Benchmark mean and standard deviation over typical batch sizes
fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");

    for size in [5usize, 15, 50] {
        let values: Vec<f64> = (0..size).map(|i| 10.0 + (i % 7) as f64 * 0.37).collect();
        group.bench_with_input(BenchmarkId::new("mean_and_stddev", size), &values, |b, v| {
            b.iter(|| {
                let mean = stats::mean(black_box(v));
                let stddev = stats::population_std_dev(black_box(v));
                (mean, stddev)
            })
        });
    }

    group.finish();
}

/// Benchmark threshold classification
fn bench_classification(c: &mut Criterion) {
    let thresholds = ClassificationThresholds::default();
    let spreads = [0.1, 0.7, 1.6, 2.4, 3.5];

    c.bench_function("classify_all_labels", |b| {
        b.iter(|| {
            for &s in &spreads {
                black_box(thresholds.shape(black_box(s)));
                black_box(thresholds.material(black_box(s)));
                black_box(thresholds.absorption(black_box(s)));
            }
        })
    });
}

/// Benchmark a full simulated measurement cycle
fn bench_simulated_cycle(c: &mut Criterion) {
    let engine = SurfaceEngine::with_hardware(
        SensorConfig::simulated(),
        Box::new(SimulatedHardware::seeded(1)),
    );

    c.bench_function("simulated_measure_shape", |b| {
        b.iter(|| engine.measure_shape(black_box(15)))
    });

    let report = engine.measure_material(15);
    let measurement = LastMeasurement::Material(report);
    c.bench_function("measurement_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&measurement).expect("Should serialize"))
    });
}

criterion_group!(
    benches,
    bench_statistics,
    bench_classification,
    bench_simulated_cycle
);
criterion_main!(benches);
