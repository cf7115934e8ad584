use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use packed_json::{from_bytes, to_string, JsonBuilder, JsonRenderer, RenderOptions};

fn build_records(count: usize) -> JsonBuilder {
    let mut builder = JsonBuilder::new();
    let root = builder.root();
    let records = builder.push_array(root, "records").unwrap();
    for i in 0..count {
        let record = builder.push_object(records, "").unwrap();
        builder.push_back(record, "id", i as u64).unwrap();
        builder.push_back(record, "name", "Alice Johnson").unwrap();
        builder.push_back(record, "score", i as f64 * 0.25).unwrap();
        builder.push_back(record, "active", i % 2 == 0).unwrap();
        let tags = builder.push_array(record, "tags").unwrap();
        builder.push_back(tags, "", "alpha").unwrap();
        builder.push_back(tags, "", "beta").unwrap();
    }
    builder
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| build_records(black_box(size)))
        });
    }
    group.finish();
}

fn benchmark_build_reused(c: &mut Criterion) {
    let mut builder = JsonBuilder::new();
    c.bench_function("build_reused_100", |b| {
        b.iter(|| {
            builder.clear();
            let root = builder.root();
            for i in 0..100u32 {
                builder.push_back(root, "n", black_box(i)).unwrap();
            }
        })
    });
}

fn benchmark_render(c: &mut Criterion) {
    let builder = build_records(100);
    c.bench_function("render_compact_100", |b| b.iter(|| to_string(black_box(&builder))));

    let mut renderer = JsonRenderer::new(RenderOptions::pretty());
    c.bench_function("render_pretty_reused_100", |b| {
        b.iter(|| renderer.render(black_box(&builder)).len())
    });
}

fn benchmark_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    for size in [10, 100, 1000] {
        let bytes = build_records(size).as_bytes().to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| from_bytes(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

fn benchmark_serde(c: &mut Criterion) {
    let text = to_string(&build_records(100));
    c.bench_function("deserialize_100", |b| {
        b.iter(|| serde_json::from_str::<JsonBuilder>(black_box(&text)).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_build,
    benchmark_build_reused,
    benchmark_render,
    benchmark_validate,
    benchmark_serde
);
criterion_main!(benches);
