use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sequitur_ts::{extract, run, GrammarEngine, PipelineConfig, Token};

/// Generate a token stream that cycles through a short word pattern
fn generate_repetitive_tokens(size: usize) -> Vec<Token> {
    let pattern = ["abca", "bbca", "cbaa", "acca", "abca", "ddba"];
    (0..size)
        .map(|i| Token::new(pattern[i % pattern.len()], i))
        .collect()
}

/// Generate low-repetition tokens over a large alphabet
fn generate_low_repetition(size: usize) -> Vec<Token> {
    let mut seed = 12345u64;
    (0..size)
        .map(|i| {
            // Simple LCG random
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            Token::new(format!("w{}", seed % 64), i)
        })
        .collect()
}

/// Generate a noisy periodic signal
fn generate_series(size: usize) -> Vec<f64> {
    let mut seed = 42u64;
    (0..size)
        .map(|i| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            let noise = (seed >> 33) as f64 / (1u64 << 31) as f64 - 0.5;
            (i as f64 * 0.05).sin() + 0.1 * noise
        })
        .collect()
}

fn bench_induction(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("induction");

    for size in sizes.iter() {
        let repetitive = generate_repetitive_tokens(*size);
        group.bench_with_input(
            BenchmarkId::new("repetitive", size),
            &repetitive,
            |b, tokens| {
                b.iter(|| {
                    let mut engine = GrammarEngine::new();
                    engine.extend(black_box(tokens.iter().cloned())).unwrap();
                    black_box(engine)
                });
            },
        );

        let random = generate_low_repetition(*size);
        group.bench_with_input(BenchmarkId::new("low_repetition", size), &random, |b, tokens| {
            b.iter(|| {
                let mut engine = GrammarEngine::new();
                engine.extend(black_box(tokens.iter().cloned())).unwrap();
                black_box(engine)
            });
        });
    }

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for size in [1_000, 10_000].iter() {
        let mut engine = GrammarEngine::new();
        engine.extend(generate_repetitive_tokens(*size)).unwrap();
        engine.finalize().unwrap();

        group.bench_with_input(BenchmarkId::new("repetitive", size), &engine, |b, engine| {
            b.iter(|| black_box(extract(engine).unwrap()));
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for size in [2_000, 20_000].iter() {
        let series = generate_series(*size);
        let config = PipelineConfig::new(100, 5, 4);

        group.bench_with_input(BenchmarkId::new("series", size), &series, |b, series| {
            b.iter(|| black_box(run(series, &config).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_induction, bench_extract, bench_pipeline);
criterion_main!(benches);
