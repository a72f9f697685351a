//! # Dataset Comparator
//!
//! Pure statistical delta between two named dataset snapshots, A (baseline)
//! and B (comparison). Four stages run in a fixed order, each consuming only
//! the prior stage's output:
//!
//! ```text
//! [Schema]     → common / only-in-A / only-in-B columns, type mismatches
//!     ↓
//! [Statistics] → row-count delta, per-column numeric + categorical deltas
//!     ↓
//! [Metrics]    → heuristically selected key metrics, classified movement
//!     ↓
//! [Insights]   → at most 10 ranked sentences, fixed priority order
//! ```
//!
//! The comparator has no failure mode: both inputs are already-validated
//! datasets and every numerically unsafe intermediate collapses to null.

mod metrics;

pub use metrics::{
    compare_key_metrics, Direction, KeyMetric, KeyMetricsComparison, KeywordClassifier,
    MetricClassifier, Significance,
};

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::ComparisonConfig;
use crate::dataset::Dataset;
use crate::numeric;
use crate::value::{DataType, Value};

/// A common column whose declared types disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatch {
    pub column: String,
    pub type_a: DataType,
    pub type_b: DataType,
}

/// Column-set partition of two schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaComparison {
    /// Columns present on both sides, sorted
    pub common_columns: Vec<String>,
    /// Columns only the baseline has, sorted
    pub only_in_a: Vec<String>,
    /// Columns only the comparison has, sorted
    pub only_in_b: Vec<String>,
    pub type_mismatches: Vec<TypeMismatch>,
}

/// Null-safe summary of one numeric column, rounded to 4 decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub null_count: usize,
}

impl NumericSummary {
    /// Summarize a column's non-null numeric values
    pub fn of(dataset: &Dataset, column: &str) -> Self {
        let values: Vec<f64> = dataset
            .values(column)
            .map_or_else(Vec::new, |vs| vs.iter().filter_map(Value::as_f64).collect());
        let round = |v: Option<f64>| v.map(|x| numeric::round_to(x, 4));

        NumericSummary {
            mean: round(numeric::mean(&values)),
            median: round(numeric::median(&values)),
            std: round(numeric::sample_std(&values)),
            min: round(numeric::min(&values)),
            max: round(numeric::max(&values)),
            null_count: dataset.null_count(column),
        }
    }
}

/// Movement of one common numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericDelta {
    pub column: String,
    pub a: NumericSummary,
    pub b: NumericSummary,
    pub mean_delta: Option<f64>,
    pub mean_pct_change: Option<f64>,
}

/// One categorical value with its occurrence count and share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    /// Share of non-null occurrences, rounded to 2 decimals
    pub percent: f64,
}

/// Movement of one common string column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDelta {
    pub column: String,
    pub cardinality_a: usize,
    pub cardinality_b: usize,
    pub top_a: Vec<ValueCount>,
    pub top_b: Vec<ValueCount>,
    /// Values seen only in B, sorted, capped
    pub new_in_b: Vec<String>,
    /// Values seen only in A, sorted, capped
    pub missing_in_b: Vec<String>,
    pub null_count_a: usize,
    pub null_count_b: usize,
}

/// Row-count and per-column statistics delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsComparison {
    pub row_count_a: usize,
    pub row_count_b: usize,
    pub row_delta: i64,
    /// Null iff the baseline has zero rows
    pub row_pct_change: Option<f64>,
    pub numeric: Vec<NumericDelta>,
    pub categorical: Vec<CategoricalDelta>,
}

/// The full comparison record, serializable to plain structures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub dataset_a: String,
    pub dataset_b: String,
    pub schema: SchemaComparison,
    pub statistics: StatisticsComparison,
    pub key_metrics: KeyMetricsComparison,
    pub insights: Vec<String>,
}

/// Compares two dataset snapshots
pub struct DatasetComparator {
    classifier: Box<dyn MetricClassifier>,
    top_value_count: usize,
    value_diff_limit: usize,
    max_insights: usize,
}

impl Default for DatasetComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetComparator {
    /// Comparator with the keyword metric heuristic and default limits
    pub fn new() -> Self {
        DatasetComparator {
            classifier: Box::new(KeywordClassifier::default()),
            top_value_count: 5,
            value_diff_limit: 10,
            max_insights: 10,
        }
    }

    /// Swap in a different metric classification strategy
    pub fn with_classifier(mut self, classifier: Box<dyn MetricClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Take limits from configuration
    pub fn from_config(config: &ComparisonConfig) -> Self {
        DatasetComparator {
            classifier: Box::new(KeywordClassifier::default()),
            top_value_count: config.top_value_count,
            value_diff_limit: config.value_diff_limit,
            max_insights: config.max_insights,
        }
    }

    /// Compare baseline A against comparison B
    pub fn compare(
        &self,
        name_a: &str,
        a: &Dataset,
        name_b: &str,
        b: &Dataset,
    ) -> ComparisonResult {
        let schema = compare_schema(a, b);
        let statistics = self.compare_statistics(a, b, &schema.common_columns);
        let key_metrics =
            compare_key_metrics(self.classifier.as_ref(), a, b, &schema.common_columns);
        let insights = self.build_insights(name_a, name_b, &schema, &statistics, &key_metrics);

        ComparisonResult {
            dataset_a: name_a.to_string(),
            dataset_b: name_b.to_string(),
            schema,
            statistics,
            key_metrics,
            insights,
        }
    }

    fn compare_statistics(
        &self,
        a: &Dataset,
        b: &Dataset,
        common_columns: &[String],
    ) -> StatisticsComparison {
        let row_count_a = a.row_count();
        let row_count_b = b.row_count();

        let mut numeric_deltas = Vec::new();
        let mut categorical_deltas = Vec::new();

        for column in common_columns {
            let type_a = a.column_type(column);
            let type_b = b.column_type(column);

            let numeric_on_both = type_a.is_some_and(|t| t.is_numeric())
                && type_b.is_some_and(|t| t.is_numeric());
            if numeric_on_both {
                let summary_a = NumericSummary::of(a, column);
                let summary_b = NumericSummary::of(b, column);
                let mean_delta = match (summary_a.mean, summary_b.mean) {
                    (Some(ma), Some(mb)) => numeric::finite(mb - ma).map(|d| numeric::round_to(d, 4)),
                    _ => None,
                };
                let mean_pct_change = match (summary_a.mean, summary_b.mean) {
                    (Some(ma), Some(mb)) => {
                        numeric::pct_change(ma, mb).map(|p| numeric::round_to(p, 4))
                    }
                    _ => None,
                };
                numeric_deltas.push(NumericDelta {
                    column: column.clone(),
                    a: summary_a,
                    b: summary_b,
                    mean_delta,
                    mean_pct_change,
                });
            } else if type_a == Some(DataType::String) && type_b == Some(DataType::String) {
                categorical_deltas.push(self.compare_categorical(a, b, column));
            }
        }

        StatisticsComparison {
            row_count_a,
            row_count_b,
            row_delta: row_count_b as i64 - row_count_a as i64,
            row_pct_change: numeric::pct_change(row_count_a as f64, row_count_b as f64)
                .map(|p| numeric::round_to(p, 2)),
            numeric: numeric_deltas,
            categorical: categorical_deltas,
        }
    }

    fn compare_categorical(&self, a: &Dataset, b: &Dataset, column: &str) -> CategoricalDelta {
        let counts_a = value_counts(a, column);
        let counts_b = value_counts(b, column);

        let values_a: BTreeSet<&String> = counts_a.keys().collect();
        let values_b: BTreeSet<&String> = counts_b.keys().collect();

        let mut new_in_b: Vec<String> =
            values_b.difference(&values_a).map(|v| (*v).clone()).collect();
        new_in_b.truncate(self.value_diff_limit);
        let mut missing_in_b: Vec<String> =
            values_a.difference(&values_b).map(|v| (*v).clone()).collect();
        missing_in_b.truncate(self.value_diff_limit);

        CategoricalDelta {
            column: column.to_string(),
            cardinality_a: counts_a.len(),
            cardinality_b: counts_b.len(),
            top_a: top_values(&counts_a, self.top_value_count),
            top_b: top_values(&counts_b, self.top_value_count),
            new_in_b,
            missing_in_b,
            null_count_a: a.null_count(column),
            null_count_b: b.null_count(column),
        }
    }

    /// Fixed priority order, truncated, never reordered by magnitude
    fn build_insights(
        &self,
        name_a: &str,
        name_b: &str,
        schema: &SchemaComparison,
        statistics: &StatisticsComparison,
        key_metrics: &KeyMetricsComparison,
    ) -> Vec<String> {
        let mut insights = Vec::new();

        // 1. Material row-count movement
        match statistics.row_pct_change {
            Some(pct) if pct.abs() > 10.0 => {
                insights.push(format!(
                    "Row count changed by {pct:.1}% (from {} to {} rows)",
                    statistics.row_count_a, statistics.row_count_b
                ));
            }
            None if statistics.row_count_b > 0 && statistics.row_count_a == 0 => {
                insights.push(format!(
                    "Row count grew from 0 to {} rows",
                    statistics.row_count_b
                ));
            }
            _ => {}
        }

        // 2. Column-set differences
        if !schema.only_in_a.is_empty() {
            insights.push(column_set_insight(name_a, &schema.only_in_a));
        }
        if !schema.only_in_b.is_empty() {
            insights.push(column_set_insight(name_b, &schema.only_in_b));
        }

        // 3. Type mismatches
        if !schema.type_mismatches.is_empty() {
            insights.push(format!(
                "{} common column(s) changed type between datasets",
                schema.type_mismatches.len()
            ));
        }

        // 4. High-significance metric movement
        for metric in &key_metrics.metrics {
            if metric.significance == Significance::High {
                if let Some(pct) = metric.pct_change {
                    insights.push(format!(
                        "Key metric '{}' changed by {pct:.1}% ({} to {})",
                        metric.column, metric.sum_a, metric.sum_b
                    ));
                }
            }
        }

        // 5. Numeric means that moved materially
        for delta in &statistics.numeric {
            if let Some(pct) = delta.mean_pct_change {
                if pct.abs() > 20.0 {
                    insights.push(format!(
                        "Mean of '{}' changed by {pct:.1}%",
                        delta.column
                    ));
                }
            }
        }

        // 6. Null-count movement
        for delta in &statistics.numeric {
            push_null_insight(&mut insights, &delta.column, delta.a.null_count, delta.b.null_count);
        }
        for delta in &statistics.categorical {
            push_null_insight(&mut insights, &delta.column, delta.null_count_a, delta.null_count_b);
        }

        insights.truncate(self.max_insights);
        insights
    }
}

/// Partition the column-name union into common / only-A / only-B and flag
/// declared-type mismatches on the common part
pub fn compare_schema(a: &Dataset, b: &Dataset) -> SchemaComparison {
    let columns_a: BTreeSet<&String> = a.columns().iter().collect();
    let columns_b: BTreeSet<&String> = b.columns().iter().collect();

    let common_columns: Vec<String> = columns_a
        .intersection(&columns_b)
        .map(|c| (*c).clone())
        .collect();
    let only_in_a: Vec<String> = columns_a
        .difference(&columns_b)
        .map(|c| (*c).clone())
        .collect();
    let only_in_b: Vec<String> = columns_b
        .difference(&columns_a)
        .map(|c| (*c).clone())
        .collect();

    let type_mismatches: Vec<TypeMismatch> = common_columns
        .iter()
        .filter_map(|column| {
            let type_a = a.column_type(column)?;
            let type_b = b.column_type(column)?;
            (type_a != type_b).then(|| TypeMismatch {
                column: column.clone(),
                type_a,
                type_b,
            })
        })
        .collect();

    SchemaComparison {
        common_columns,
        only_in_a,
        only_in_b,
        type_mismatches,
    }
}

/// Non-null occurrence counts of a column's display values
fn value_counts(dataset: &Dataset, column: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    if let Some(values) = dataset.values(column) {
        for value in values {
            if value.is_null() {
                continue;
            }
            *counts.entry(value.coerce_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Top-N values by count, ties broken by value for determinism
fn top_values(counts: &HashMap<String, usize>, limit: usize) -> Vec<ValueCount> {
    let total: usize = counts.values().sum();
    let mut entries: Vec<(&String, &usize)> = counts.iter().collect();
    entries.sort_by(|(va, ca), (vb, cb)| cb.cmp(ca).then_with(|| va.cmp(vb)));
    entries
        .into_iter()
        .take(limit)
        .map(|(value, &count)| ValueCount {
            value: value.clone(),
            count,
            percent: if total == 0 {
                0.0
            } else {
                numeric::round_to(count as f64 / total as f64 * 100.0, 2)
            },
        })
        .collect()
}

/// First five names spelled out, the rest summarized as a remainder count
fn column_set_insight(owner: &str, columns: &[String]) -> String {
    let shown: Vec<&str> = columns.iter().take(5).map(String::as_str).collect();
    let remainder = columns.len().saturating_sub(5);
    if remainder > 0 {
        format!(
            "{} column(s) only in {owner}: {} (+{remainder} more)",
            columns.len(),
            shown.join(", ")
        )
    } else {
        format!("{} column(s) only in {owner}: {}", columns.len(), shown.join(", "))
    }
}

fn push_null_insight(insights: &mut Vec<String>, column: &str, nulls_a: usize, nulls_b: usize) {
    let delta = nulls_b as i64 - nulls_a as i64;
    if delta.abs() > 100 {
        insights.push(format!("Null count of '{column}' changed by {delta}"));
    }
}
