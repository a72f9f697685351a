//! Query execution benchmarks: filter, aggregation, and trend bucketing
//! over varying dataset sizes, plus the cached-result fast path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use deltaframe::{
    AggregateField, AggregateFunction, AggregateSpec, Column, DataType, Dataset, FilterOperator,
    FilterPredicate, QueryExecutor, QueryOp, QuerySpec, ResultCache, TrendInterval, TrendSpec,
    Value,
};

/// Synthetic orders table: 10 groups, a numeric value, a daily date spread
fn make_dataset(size: usize) -> Dataset {
    Dataset::from_columns(vec![
        Column::new(
            "bucket",
            DataType::Integer,
            (0..size).map(|i| Value::Integer((i % 10) as i64)).collect(),
        ),
        Column::new(
            "amount",
            DataType::Integer,
            (0..size).map(|i| Value::Integer(i as i64)).collect(),
        ),
        Column::new(
            "day",
            DataType::Datetime,
            (0..size)
                .map(|i| Value::Datetime((i as i64 % 365) * 86_400_000))
                .collect(),
        ),
    ])
    .expect("valid dataset")
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    for size in [1_000usize, 10_000] {
        let dataset = make_dataset(size);
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "amount",
            FilterOperator::Gte,
            serde_json::json!(size / 2),
        )]);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| executor.execute("bench", &dataset, &spec).expect("filter"));
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    for size in [1_000usize, 10_000] {
        let dataset = make_dataset(size);
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Aggregate(AggregateSpec {
            group_by: vec!["bucket".to_string()],
            aggregates: vec![
                AggregateField::new("amount", AggregateFunction::Sum),
                AggregateField::new("amount", AggregateFunction::Avg),
            ],
        }));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| executor.execute("bench", &dataset, &spec).expect("aggregate"));
        });
    }
    group.finish();
}

fn bench_trend(c: &mut Criterion) {
    let mut group = c.benchmark_group("trend");
    for size in [1_000usize, 10_000] {
        let dataset = make_dataset(size);
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Trend(TrendSpec {
            date_field: "day".to_string(),
            value_field: "amount".to_string(),
            interval: TrendInterval::Month,
            function: AggregateFunction::Sum,
        }));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| executor.execute("bench", &dataset, &spec).expect("trend"));
        });
    }
    group.finish();
}

fn bench_cached_repagination(c: &mut Criterion) {
    let dataset = make_dataset(10_000);
    let executor = QueryExecutor::with_cache(ResultCache::with_defaults());
    let spec = QuerySpec::new(QueryOp::Filter).with_pagination(Some(100), 5_000);

    // Warm the cache so the benchmark measures the hit path
    executor.execute("bench", &dataset, &spec).expect("warm");

    c.bench_function("cached_repagination", |b| {
        b.iter(|| executor.execute("bench", &dataset, &spec).expect("hit"));
    });
}

criterion_group!(
    benches,
    bench_filter,
    bench_aggregate,
    bench_trend,
    bench_cached_repagination
);
criterion_main!(benches);
