use api_assistant::openapi::{OpenApiDocument, format_documents};
use criterion::{Criterion, criterion_group, criterion_main};
use std::fs::{self};
use std::hint::black_box;
use std::path::Path;

pub fn criterion_benchmark(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop_api.json");
    let raw = fs::read_to_string(fixture_path).expect("can read test file");

    c.bench_function("parsing", |b| {
        b.iter(|| black_box(&raw).parse::<OpenApiDocument>())
    });

    let document: OpenApiDocument = raw.parse().expect("fixture should parse");
    c.bench_function("formatting", |b| {
        b.iter(|| format_documents(black_box(&document)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
