//! Decimation benchmarks
//!
//! One block at the engine rate per iteration.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rf_core::{MAX_BUFFER_SIZE, MAX_OVERSAMPLE, PolyFloat};
use rf_dsp::{Decimator, FirHalfbandDecimator, IirHalfbandDecimator, OutputId, OutputPool, Processor};

const SAMPLE_RATE: f64 = 48000.0;

fn source(pool: &mut OutputPool, factor: usize) -> OutputId {
    let id = pool.allocate_external(MAX_BUFFER_SIZE * MAX_OVERSAMPLE, SAMPLE_RATE * factor as f64);
    if let Some(output) = pool.get_mut(id) {
        for (i, s) in output.buffer_mut().iter_mut().enumerate() {
            *s = PolyFloat::splat((i as f32 * 0.01).sin() * 0.5);
        }
    }
    id
}

// ═══════════════════════════════════════════════════════════════════════════════
// HALFBAND BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════════

fn bench_halfband(c: &mut Criterion) {
    let mut group = c.benchmark_group("Halfband");
    group.throughput(Throughput::Elements(MAX_BUFFER_SIZE as u64));

    for sharp in [false, true] {
        let mut pool = OutputPool::new();
        let input = source(&mut pool, 2);
        let mut decimator = IirHalfbandDecimator::new(&mut pool);
        decimator.set_sharp_cutoff(sharp);
        decimator.plug(input, IirHalfbandDecimator::AUDIO).unwrap();

        let name = if sharp { "iir_25" } else { "iir_9" };
        group.bench_function(name, |b| {
            b.iter(|| decimator.process(black_box(&mut pool), MAX_BUFFER_SIZE))
        });
    }

    let mut pool = OutputPool::new();
    let input = source(&mut pool, 2);
    let mut decimator = FirHalfbandDecimator::new(&mut pool);
    decimator.plug(input, FirHalfbandDecimator::AUDIO).unwrap();
    group.bench_function("fir_32", |b| {
        b.iter(|| decimator.process(black_box(&mut pool), MAX_BUFFER_SIZE))
    });

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════════
// MULTI-STAGE BENCHMARKS
// ═══════════════════════════════════════════════════════════════════════════════

fn bench_decimator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decimator");
    group.throughput(Throughput::Elements(MAX_BUFFER_SIZE as u64));

    for num_stages in 1..=4 {
        let factor = 1 << num_stages;
        let mut pool = OutputPool::new();
        let input = source(&mut pool, factor);
        let mut decimator = Decimator::new(&mut pool, 4).unwrap();
        decimator.plug(input, Decimator::AUDIO).unwrap();
        decimator.set_sample_rate(SAMPLE_RATE);

        group.bench_with_input(
            BenchmarkId::new("stages", num_stages),
            &num_stages,
            |b, _| b.iter(|| decimator.process(black_box(&mut pool), MAX_BUFFER_SIZE)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_halfband, bench_decimator);
criterion_main!(benches);
