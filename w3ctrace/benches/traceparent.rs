use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use w3ctrace::propagation::{extract, inject};
use w3ctrace::{parse_string, Trace};

// Run this benchmark with:
// cargo bench --bench traceparent

const HEADER: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

fn criterion_benchmark(c: &mut Criterion) {
    codec(c);
    propagation(c);
}

fn codec(c: &mut Criterion) {
    let trace = parse_string(HEADER).unwrap();

    c.bench_function("ParseTraceparent", |b| {
        b.iter(|| {
            let _t = black_box(parse_string(black_box(HEADER)));
        });
    });

    c.bench_function("ParseTraceparentMalformed", |b| {
        b.iter(|| {
            let _t = black_box(parse_string(black_box("00-4bf92f35-00f067aa0ba902b7-01")));
        });
    });

    c.bench_function("FormatTraceparent", |b| {
        b.iter(|| {
            let _h = black_box(black_box(trace).header());
        });
    });

    c.bench_function("ShortString", |b| {
        b.iter(|| {
            let _s = black_box(black_box(trace).short_string());
        });
    });

    c.bench_function("EnsureEmpty", |b| {
        b.iter(|| {
            let _t = black_box(black_box(Trace::NONE).ensure());
        });
    });
}

fn propagation(c: &mut Criterion) {
    let mut carrier = HashMap::new();
    carrier.insert("traceparent".to_string(), HEADER.to_string());

    c.bench_function("ExtractFromHashMap", |b| {
        b.iter(|| {
            let _t = black_box(extract(black_box(&carrier)));
        });
    });

    let trace = parse_string(HEADER).unwrap();
    c.bench_function("InjectIntoHashMap", |b| {
        b.iter(|| {
            let mut out: HashMap<String, String> = HashMap::with_capacity(1);
            inject(black_box(&trace), &mut out);
            black_box(out);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
      .warm_up_time(std::time::Duration::from_secs(1))
      .measurement_time(std::time::Duration::from_secs(2));
    targets = criterion_benchmark
}

criterion_main!(benches);
