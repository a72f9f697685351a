//! Key-metric selection and classification.
//!
//! Which columns count as "business metrics" is a heuristic, so it lives
//! behind the [`MetricClassifier`] trait: the comparator consumes the trait,
//! and the keyword-containment default can be swapped without touching any
//! comparison logic.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::numeric;
use crate::value::Value;

/// Direction of a metric's movement between two datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// Magnitude classification of a percent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

/// Decides which columns are metrics and which direction is "good"
pub trait MetricClassifier {
    /// Whether a column name denotes a business metric
    fn is_metric(&self, column: &str) -> bool;

    /// Whether a delta on this column is an improvement; None when the
    /// column name gives no signal either way
    fn is_improvement(&self, column: &str, delta: f64) -> Option<bool>;
}

/// Default keyword-containment heuristic
pub struct KeywordClassifier {
    metric_keywords: Vec<&'static str>,
    positive_keywords: Vec<&'static str>,
    negative_keywords: Vec<&'static str>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        KeywordClassifier {
            metric_keywords: vec![
                "revenue", "amount", "value", "total", "count", "sales", "cost", "price",
                "profit",
            ],
            positive_keywords: vec!["revenue", "sales", "profit", "value"],
            negative_keywords: vec!["cost", "churn", "loss"],
        }
    }
}

impl MetricClassifier for KeywordClassifier {
    fn is_metric(&self, column: &str) -> bool {
        let lower = column.to_lowercase();
        self.metric_keywords.iter().any(|kw| lower.contains(kw))
    }

    fn is_improvement(&self, column: &str, delta: f64) -> Option<bool> {
        let lower = column.to_lowercase();
        if self.positive_keywords.iter().any(|kw| lower.contains(kw)) {
            return Some(delta > 0.0);
        }
        if self.negative_keywords.iter().any(|kw| lower.contains(kw)) {
            return Some(delta < 0.0);
        }
        None
    }
}

/// One key metric's movement between baseline and comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub column: String,
    pub sum_a: f64,
    pub sum_b: f64,
    pub delta: f64,
    /// Percent change, null when the baseline sum is zero
    pub pct_change: Option<f64>,
    pub direction: Direction,
    pub significance: Significance,
    /// Tri-state: improvement, decline, or undetermined
    pub is_improvement: Option<bool>,
}

/// Key-metric comparison across both datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetricsComparison {
    pub metrics: Vec<KeyMetric>,
    pub summary: String,
}

/// Compare heuristically selected metric columns common to both datasets.
///
/// Columns are taken in A's declared order; only numeric common columns
/// whose name the classifier accepts participate.
pub fn compare_key_metrics(
    classifier: &dyn MetricClassifier,
    a: &Dataset,
    b: &Dataset,
    common_columns: &[String],
) -> KeyMetricsComparison {
    let mut metrics = Vec::new();

    for column in common_columns {
        let numeric_on_both = a.column_type(column).is_some_and(|t| t.is_numeric())
            && b.column_type(column).is_some_and(|t| t.is_numeric());
        if !numeric_on_both || !classifier.is_metric(column) {
            continue;
        }

        let sum_a = column_sum(a, column);
        let sum_b = column_sum(b, column);
        let delta = sum_b - sum_a;
        let pct_change = numeric::pct_change(sum_a, sum_b).map(|p| numeric::round_to(p, 2));

        metrics.push(KeyMetric {
            column: column.clone(),
            sum_a,
            sum_b,
            delta,
            pct_change,
            direction: classify_direction(pct_change),
            significance: classify_significance(pct_change),
            is_improvement: classifier.is_improvement(column, delta),
        });
    }

    let summary = summarize(&metrics);
    KeyMetricsComparison { metrics, summary }
}

fn column_sum(dataset: &Dataset, column: &str) -> f64 {
    dataset
        .values(column)
        .map_or(0.0, |vs| vs.iter().filter_map(Value::as_f64).sum())
}

/// Up above +1%, down below -1%, otherwise flat (including no baseline)
fn classify_direction(pct_change: Option<f64>) -> Direction {
    match pct_change {
        Some(pct) if pct > 1.0 => Direction::Up,
        Some(pct) if pct < -1.0 => Direction::Down,
        _ => Direction::Flat,
    }
}

/// High above 20% magnitude, medium above 5%, otherwise low
fn classify_significance(pct_change: Option<f64>) -> Significance {
    match pct_change {
        Some(pct) if pct.abs() > 20.0 => Significance::High,
        Some(pct) if pct.abs() > 5.0 => Significance::Medium,
        _ => Significance::Low,
    }
}

fn summarize(metrics: &[KeyMetric]) -> String {
    if metrics.is_empty() {
        return "No key metric columns detected".to_string();
    }
    let improved = metrics
        .iter()
        .filter(|m| m.is_improvement == Some(true))
        .count();
    let declined = metrics
        .iter()
        .filter(|m| m.is_improvement == Some(false))
        .count();
    format!(
        "{improved} of {} key metrics improved, {declined} declined",
        metrics.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::value::DataType;

    fn dataset(revenues: Vec<i64>) -> Dataset {
        Dataset::from_columns(vec![Column::new(
            "revenue",
            DataType::Integer,
            revenues.into_iter().map(Value::Integer).collect(),
        )])
        .expect("valid dataset")
    }

    #[test]
    fn test_keyword_classifier_selects_metrics() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.is_metric("total_revenue"));
        assert!(classifier.is_metric("unit_price"));
        assert!(!classifier.is_metric("customer_name"));
    }

    #[test]
    fn test_improvement_polarity() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.is_improvement("revenue", 10.0), Some(true));
        assert_eq!(classifier.is_improvement("revenue", -10.0), Some(false));
        assert_eq!(classifier.is_improvement("cost", -10.0), Some(true));
        assert_eq!(classifier.is_improvement("cost", 10.0), Some(false));
        assert_eq!(classifier.is_improvement("user_count", 10.0), None);
    }

    #[test]
    fn test_revenue_scenario() {
        // A: 100 + 50, B: 150 + 40 => delta +40, pct +26.67, up, improvement
        let a = dataset(vec![100, 50]);
        let b = dataset(vec![150, 40]);
        let classifier = KeywordClassifier::default();
        let result =
            compare_key_metrics(&classifier, &a, &b, &["revenue".to_string()]);

        assert_eq!(result.metrics.len(), 1);
        let metric = &result.metrics[0];
        assert_eq!(metric.delta, 40.0);
        assert_eq!(metric.pct_change, Some(26.67));
        assert_eq!(metric.direction, Direction::Up);
        assert_eq!(metric.significance, Significance::High);
        assert_eq!(metric.is_improvement, Some(true));
        assert_eq!(result.summary, "1 of 1 key metrics improved, 0 declined");
    }

    #[test]
    fn test_zero_baseline_is_flat_with_null_pct() {
        let a = dataset(vec![0]);
        let b = dataset(vec![500]);
        let classifier = KeywordClassifier::default();
        let result =
            compare_key_metrics(&classifier, &a, &b, &["revenue".to_string()]);

        let metric = &result.metrics[0];
        assert_eq!(metric.pct_change, None);
        assert_eq!(metric.direction, Direction::Flat);
        assert_eq!(metric.significance, Significance::Low);
    }

    #[test]
    fn test_direction_thresholds() {
        assert_eq!(classify_direction(Some(0.5)), Direction::Flat);
        assert_eq!(classify_direction(Some(1.5)), Direction::Up);
        assert_eq!(classify_direction(Some(-1.5)), Direction::Down);
    }

    #[test]
    fn test_significance_thresholds() {
        assert_eq!(classify_significance(Some(3.0)), Significance::Low);
        assert_eq!(classify_significance(Some(10.0)), Significance::Medium);
        assert_eq!(classify_significance(Some(-25.0)), Significance::High);
    }
}
