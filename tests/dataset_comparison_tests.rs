//! Dataset comparator integration tests.
//!
//! Covers the documented comparison scenarios: the region/revenue key-metric
//! case, schema partition symmetry, row-count deltas, and insight ordering.

use deltaframe::{
    Column, DataType, Dataset, DatasetComparator, Direction, MetricClassifier, Significance,
    Value,
};

fn regional_revenue(rows: &[(&str, i64)]) -> Dataset {
    Dataset::from_columns(vec![
        Column::new(
            "region",
            DataType::String,
            rows.iter().map(|(r, _)| Value::string(r)).collect(),
        ),
        Column::new(
            "revenue",
            DataType::Integer,
            rows.iter().map(|(_, v)| Value::Integer(*v)).collect(),
        ),
    ])
    .expect("valid dataset")
}

#[test]
fn test_revenue_key_metric_scenario() {
    // A: east 100 + west 50, B: east 150 + west 40
    let a = regional_revenue(&[("east", 100), ("west", 50)]);
    let b = regional_revenue(&[("east", 150), ("west", 40)]);

    let result = DatasetComparator::new().compare("march", &a, "april", &b);

    assert_eq!(result.key_metrics.metrics.len(), 1);
    let metric = &result.key_metrics.metrics[0];
    assert_eq!(metric.column, "revenue");
    assert_eq!(metric.sum_a, 150.0);
    assert_eq!(metric.sum_b, 190.0);
    assert_eq!(metric.delta, 40.0);
    assert_eq!(metric.pct_change, Some(26.67));
    assert_eq!(metric.direction, Direction::Up);
    assert_eq!(metric.significance, Significance::High);
    assert_eq!(metric.is_improvement, Some(true));
}

#[test]
fn test_schema_partition_and_inverse() {
    let a = Dataset::from_columns(vec![
        Column::new("id", DataType::Integer, vec![]),
        Column::new("legacy_flag", DataType::Boolean, vec![]),
    ])
    .expect("valid dataset");
    let b = Dataset::from_columns(vec![
        Column::new("id", DataType::Integer, vec![]),
        Column::new("created_at", DataType::Datetime, vec![]),
    ])
    .expect("valid dataset");

    let comparator = DatasetComparator::new();
    let forward = comparator.compare("a", &a, "b", &b);
    let backward = comparator.compare("b", &b, "a", &a);

    assert_eq!(forward.schema.common_columns, vec!["id"]);
    assert_eq!(forward.schema.only_in_a, vec!["legacy_flag"]);
    assert_eq!(forward.schema.only_in_b, vec!["created_at"]);
    assert_eq!(forward.schema.only_in_a, backward.schema.only_in_b);
    assert_eq!(forward.schema.only_in_b, backward.schema.only_in_a);
}

#[test]
fn test_row_delta_contract() {
    let a = regional_revenue(&[("east", 1), ("east", 2), ("west", 3)]);
    let b = regional_revenue(&[("east", 1)]);

    let result = DatasetComparator::new().compare("a", &a, "b", &b);
    assert_eq!(result.statistics.row_count_a, 3);
    assert_eq!(result.statistics.row_count_b, 1);
    assert_eq!(result.statistics.row_delta, -2);
    assert_eq!(result.statistics.row_pct_change, Some(-66.67));
}

#[test]
fn test_row_pct_change_null_only_for_empty_baseline() {
    let empty = regional_revenue(&[]);
    let full = regional_revenue(&[("east", 1)]);

    let from_empty = DatasetComparator::new().compare("a", &empty, "b", &full);
    assert_eq!(from_empty.statistics.row_pct_change, None);

    let to_empty = DatasetComparator::new().compare("a", &full, "b", &empty);
    assert_eq!(to_empty.statistics.row_pct_change, Some(-100.0));
}

#[test]
fn test_identical_datasets_produce_no_insights() {
    let a = regional_revenue(&[("east", 100), ("west", 50)]);
    let b = regional_revenue(&[("east", 100), ("west", 50)]);

    let result = DatasetComparator::new().compare("a", &a, "b", &b);
    assert!(result.insights.is_empty());
    assert!(result.schema.type_mismatches.is_empty());
    assert_eq!(result.statistics.row_delta, 0);
}

#[test]
fn test_insight_priority_order() {
    // Row count halves (priority 1), a column disappears (priority 2),
    // revenue collapses (priority 4 and 5)
    let a = Dataset::from_columns(vec![
        Column::new(
            "region",
            DataType::String,
            vec![Value::string("east"), Value::string("west")],
        ),
        Column::new(
            "revenue",
            DataType::Integer,
            vec![Value::Integer(1000), Value::Integer(1000)],
        ),
        Column::new(
            "notes",
            DataType::String,
            vec![Value::string("x"), Value::string("y")],
        ),
    ])
    .expect("valid dataset");
    let b = Dataset::from_columns(vec![
        Column::new("region", DataType::String, vec![Value::string("east")]),
        Column::new("revenue", DataType::Integer, vec![Value::Integer(100)]),
    ])
    .expect("valid dataset");

    let result = DatasetComparator::new().compare("before", &a, "after", &b);

    assert!(result.insights[0].starts_with("Row count changed"));
    assert!(result.insights[1].contains("only in before"));
    assert!(result.insights[1].contains("notes"));
    let metric_position = result
        .insights
        .iter()
        .position(|i| i.starts_with("Key metric 'revenue'"))
        .expect("metric insight");
    let mean_position = result
        .insights
        .iter()
        .position(|i| i.starts_with("Mean of 'revenue'"))
        .expect("mean insight");
    assert!(metric_position < mean_position);
}

#[test]
fn test_categorical_top_values_capped_at_five() {
    let values_a: Vec<Value> = (0..8usize)
        .flat_map(|i| std::iter::repeat(Value::string(&format!("v{i}"))).take(8 - i))
        .collect();
    let a = Dataset::from_columns(vec![Column::new(
        "category",
        DataType::String,
        values_a.clone(),
    )])
    .expect("valid dataset");
    let b = Dataset::from_columns(vec![Column::new("category", DataType::String, values_a)])
        .expect("valid dataset");

    let result = DatasetComparator::new().compare("a", &a, "b", &b);
    let delta = &result.statistics.categorical[0];
    assert_eq!(delta.cardinality_a, 8);
    assert_eq!(delta.top_a.len(), 5);
    // Most frequent value first
    assert_eq!(delta.top_a[0].value, "v0");
    assert_eq!(delta.top_a[0].count, 8);
}

#[test]
fn test_custom_classifier_swaps_heuristic() {
    struct EverythingIsAMetric;
    impl MetricClassifier for EverythingIsAMetric {
        fn is_metric(&self, _column: &str) -> bool {
            true
        }
        fn is_improvement(&self, _column: &str, delta: f64) -> Option<bool> {
            Some(delta > 0.0)
        }
    }

    let a = Dataset::from_columns(vec![Column::new(
        "headcount",
        DataType::Integer,
        vec![Value::Integer(10)],
    )])
    .expect("valid dataset");
    let b = Dataset::from_columns(vec![Column::new(
        "headcount",
        DataType::Integer,
        vec![Value::Integer(20)],
    )])
    .expect("valid dataset");

    let default_result = DatasetComparator::new().compare("a", &a, "b", &b);
    assert!(default_result.key_metrics.metrics.is_empty());

    let custom = DatasetComparator::new().with_classifier(Box::new(EverythingIsAMetric));
    let custom_result = custom.compare("a", &a, "b", &b);
    assert_eq!(custom_result.key_metrics.metrics.len(), 1);
    assert_eq!(custom_result.key_metrics.metrics[0].is_improvement, Some(true));
}

#[test]
fn test_result_serializes_to_plain_json() {
    let a = regional_revenue(&[("east", 100)]);
    let b = regional_revenue(&[("east", 150)]);

    let result = DatasetComparator::new().compare("a", &a, "b", &b);
    let json = serde_json::to_value(&result).expect("serialize");

    assert_eq!(json["dataset_a"], "a");
    assert_eq!(json["schema"]["common_columns"][0], "region");
    assert_eq!(json["key_metrics"]["metrics"][0]["direction"], "up");
    assert_eq!(json["key_metrics"]["metrics"][0]["significance"], "high");
}
