use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use uomsync_products::{SecondaryUom, UnitOfMeasure, UomCategory, float_round};

fn settings() -> SecondaryUom {
    let count = UomCategory::new("Count");
    let unit = UnitOfMeasure::reference("Unit", count.clone());
    let dozen = UnitOfMeasure::bigger("Dozen", count, 12.0).expect("valid unit");
    SecondaryUom::enabled(&unit, dozen, 1.0 / 12.0).expect("valid configuration")
}

fn bench_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("float_round");
    for precision in [0.01, 0.5, 0.0833] {
        group.bench_with_input(BenchmarkId::from_parameter(precision), &precision, |b, &p| {
            b.iter(|| float_round(black_box(1234.5678), black_box(p)))
        });
    }
    group.finish();
}

fn bench_conversion(c: &mut Criterion) {
    let config = settings();
    c.bench_function("convert_to_secondary", |b| {
        b.iter(|| config.convert_to_secondary(black_box(24.0)))
    });
    c.bench_function("convert_to_primary", |b| {
        b.iter(|| config.convert_to_primary(black_box(3.0)))
    });
}

criterion_group!(benches, bench_round, bench_conversion);
criterion_main!(benches);
