//! # Multi-Dataset Analyzer
//!
//! Generalizes schema and metric comparison to 2–5 named datasets: per-dataset
//! summaries, a common/partial schema with consensus types, anomaly detection
//! (schema drift, type mismatch, cross-dataset metric outliers), and every
//! pairwise [`DatasetComparator`] result.
//!
//! The metric-outlier detector works on *per-dataset means*, not raw rows: a
//! dataset is flagged when its column mean sits ≥2 standard deviations from
//! the mean of all datasets' means (the standard deviation is taken over
//! those means as a full population). It answers "is this whole dataset
//! unusual", not "does this dataset contain unusual rows".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compare::{ComparisonResult, DatasetComparator};
use crate::dataset::Dataset;
use crate::numeric;
use crate::value::{DataType, Value};

/// Analyzer input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Multi-dataset analysis covers 2 to 5 datasets
    #[error("Expected between 2 and 5 datasets, got {0}")]
    DatasetCount(usize),

    /// The name slice and dataset slice must be parallel
    #[error("Got {names} names for {datasets} datasets")]
    NameMismatch { names: usize, datasets: usize },
}

/// Anomaly severity, ordered high before medium before low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

/// Kind of cross-dataset anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A column is missing from at least one dataset
    SchemaDrift,
    /// A column's declared type differs across datasets
    TypeMismatch,
    /// A dataset's column mean deviates from the cross-dataset mean
    MetricOutlier,
    /// No column is present in every dataset
    NoCommonColumns,
}

/// One detected anomaly with its structured detail payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub affected_datasets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub detail: serde_json::Value,
}

/// Null-safe numeric profile of one column in one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericProfile {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericProfile {
    fn of(dataset: &Dataset, column: &str) -> Self {
        let values: Vec<f64> = dataset
            .values(column)
            .map_or_else(Vec::new, |vs| vs.iter().filter_map(Value::as_f64).collect());
        let round = |v: Option<f64>| v.map(|x| numeric::round_to(x, 4));

        NumericProfile {
            mean: round(numeric::mean(&values)),
            std: round(numeric::sample_std(&values)),
            min: round(numeric::min(&values)),
            max: round(numeric::max(&values)),
        }
    }
}

/// Shape summary of one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub column_types: BTreeMap<String, DataType>,
    pub numeric_stats: BTreeMap<String, NumericProfile>,
}

impl DatasetSummary {
    fn of(name: &str, dataset: &Dataset) -> Self {
        let numeric_columns = dataset.numeric_columns();
        let categorical_columns: Vec<String> = dataset
            .columns()
            .iter()
            .filter(|c| !numeric_columns.contains(c))
            .cloned()
            .collect();

        let column_types: BTreeMap<String, DataType> = dataset
            .columns()
            .iter()
            .filter_map(|c| dataset.column_type(c).map(|t| (c.clone(), t)))
            .collect();

        let numeric_stats: BTreeMap<String, NumericProfile> = numeric_columns
            .iter()
            .map(|c| (c.clone(), NumericProfile::of(dataset, c)))
            .collect();

        DatasetSummary {
            name: name.to_string(),
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            numeric_columns,
            categorical_columns,
            column_types,
            numeric_stats,
        }
    }
}

/// Common and partial columns, consensus types, and type conflicts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonSchema {
    /// Columns present in every dataset, sorted
    pub common_columns: Vec<String>,
    /// Column → the subset of dataset names that have it
    pub partial_columns: BTreeMap<String, Vec<String>>,
    /// Column → majority type across the datasets that have it
    pub consensus_types: BTreeMap<String, DataType>,
    /// Column → per-dataset type map, present only when types disagree
    pub conflicts: BTreeMap<String, BTreeMap<String, DataType>>,
}

/// Full multi-dataset analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDatasetReport {
    pub summaries: Vec<DatasetSummary>,
    pub common_schema: CommonSchema,
    /// Sorted by severity; ties keep discovery order (drift, mismatch,
    /// outlier)
    pub anomalies: Vec<Anomaly>,
    /// One comparison per unordered dataset pair, in input order
    pub pairwise: Vec<ComparisonResult>,
}

/// Cross-dataset analyzer over 2–5 named snapshots
pub struct MultiDatasetAnalyzer {
    comparator: DatasetComparator,
    /// Z-score at which a dataset mean is flagged
    z_flag: f64,
    /// Z-score at which a flagged mean is high severity
    z_high: f64,
}

impl Default for MultiDatasetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiDatasetAnalyzer {
    pub fn new() -> Self {
        MultiDatasetAnalyzer {
            comparator: DatasetComparator::new(),
            z_flag: 2.0,
            z_high: 3.0,
        }
    }

    /// Use a custom comparator for the pairwise stage
    pub fn with_comparator(mut self, comparator: DatasetComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Analyze parallel slices of names and datasets.
    ///
    /// Fails fast on a count outside 2–5 or a name/dataset length mismatch;
    /// nothing is computed before these checks pass.
    pub fn analyze(
        &self,
        names: &[&str],
        datasets: &[&Dataset],
    ) -> Result<MultiDatasetReport, AnalyzeError> {
        if names.len() != datasets.len() {
            return Err(AnalyzeError::NameMismatch {
                names: names.len(),
                datasets: datasets.len(),
            });
        }
        if !(2..=5).contains(&datasets.len()) {
            return Err(AnalyzeError::DatasetCount(datasets.len()));
        }

        let summaries: Vec<DatasetSummary> = names
            .iter()
            .zip(datasets.iter())
            .map(|(name, dataset)| DatasetSummary::of(name, dataset))
            .collect();

        let common_schema = compute_common_schema(names, datasets);
        let anomalies = self.detect_anomalies(names, datasets, &summaries, &common_schema);

        let mut pairwise = Vec::new();
        for i in 0..datasets.len() {
            for j in (i + 1)..datasets.len() {
                pairwise.push(
                    self.comparator
                        .compare(names[i], datasets[i], names[j], datasets[j]),
                );
            }
        }

        Ok(MultiDatasetReport {
            summaries,
            common_schema,
            anomalies,
            pairwise,
        })
    }

    /// Discovery order is drift, mismatch, outlier; the final stable sort by
    /// severity preserves that order within each tier
    fn detect_anomalies(
        &self,
        names: &[&str],
        datasets: &[&Dataset],
        summaries: &[DatasetSummary],
        schema: &CommonSchema,
    ) -> Vec<Anomaly> {
        if schema.common_columns.is_empty() {
            return vec![Anomaly {
                kind: AnomalyKind::NoCommonColumns,
                severity: Severity::High,
                affected_datasets: names.iter().map(|n| (*n).to_string()).collect(),
                column: None,
                detail: serde_json::json!({ "dataset_count": datasets.len() }),
            }];
        }

        let mut anomalies = Vec::new();
        anomalies.extend(schema_drift_anomalies(names, schema));
        anomalies.extend(type_mismatch_anomalies(schema));
        anomalies.extend(self.metric_outlier_anomalies(names, datasets, summaries, schema));

        anomalies.sort_by_key(|a| a.severity.rank());
        anomalies
    }

    /// Flag datasets whose per-column mean deviates from the cross-dataset
    /// mean of means. Restricted to numeric columns common to all datasets;
    /// skipped when fewer than two datasets contribute a mean or the spread
    /// of means is zero.
    fn metric_outlier_anomalies(
        &self,
        names: &[&str],
        datasets: &[&Dataset],
        summaries: &[DatasetSummary],
        schema: &CommonSchema,
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for column in &schema.common_columns {
            let numeric_everywhere = datasets
                .iter()
                .all(|d| d.column_type(column).is_some_and(|t| t.is_numeric()));
            if !numeric_everywhere {
                continue;
            }

            let contributions: Vec<(&str, f64)> = names
                .iter()
                .zip(summaries.iter())
                .filter_map(|(name, summary)| {
                    summary
                        .numeric_stats
                        .get(column)
                        .and_then(|p| p.mean)
                        .map(|mean| (*name, mean))
                })
                .collect();
            if contributions.len() < 2 {
                continue;
            }

            let means: Vec<f64> = contributions.iter().map(|(_, m)| *m).collect();
            let cross_mean = match numeric::mean(&means) {
                Some(m) => m,
                None => continue,
            };
            let cross_std = match numeric::population_std(&means) {
                Some(s) if s > 0.0 => s,
                _ => continue,
            };

            for (name, mean) in &contributions {
                let z = (mean - cross_mean).abs() / cross_std;
                if z < self.z_flag {
                    continue;
                }
                let severity = if z >= self.z_high {
                    Severity::High
                } else {
                    Severity::Medium
                };
                anomalies.push(Anomaly {
                    kind: AnomalyKind::MetricOutlier,
                    severity,
                    affected_datasets: vec![(*name).to_string()],
                    column: Some(column.clone()),
                    detail: serde_json::json!({
                        "value": numeric::round_to(*mean, 4),
                        "z_score": numeric::round_to(z, 4),
                        "cross_dataset_mean": numeric::round_to(cross_mean, 4),
                        "cross_dataset_std": numeric::round_to(cross_std, 4),
                    }),
                });
            }
        }

        anomalies
    }
}

/// A column is common only when every dataset has it; anything else is
/// partial. Consensus types are majority votes among the owners.
fn compute_common_schema(names: &[&str], datasets: &[&Dataset]) -> CommonSchema {
    // Column → owning dataset names, preserving input dataset order
    let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, dataset) in names.iter().zip(datasets.iter()) {
        for column in dataset.columns() {
            owners
                .entry(column.clone())
                .or_default()
                .push((*name).to_string());
        }
    }

    let mut common_columns = Vec::new();
    let mut partial_columns = BTreeMap::new();
    let mut consensus_types = BTreeMap::new();
    let mut conflicts = BTreeMap::new();

    for (column, owning) in owners {
        // Per-dataset declared type for every owner
        let mut type_map: BTreeMap<String, DataType> = BTreeMap::new();
        for (name, dataset) in names.iter().zip(datasets.iter()) {
            if let Some(data_type) = dataset.column_type(&column) {
                type_map.insert((*name).to_string(), data_type);
            }
        }

        // Majority vote; ties resolve by type display name for determinism
        let mut votes: BTreeMap<String, (DataType, usize)> = BTreeMap::new();
        for data_type in type_map.values() {
            votes
                .entry(data_type.to_string())
                .or_insert((*data_type, 0))
                .1 += 1;
        }
        if let Some((data_type, _)) = votes
            .values()
            .max_by(|(ta, ca), (tb, cb)| ca.cmp(cb).then_with(|| tb.to_string().cmp(&ta.to_string())))
        {
            consensus_types.insert(column.clone(), *data_type);
        }

        let distinct_types = votes.len();
        if distinct_types > 1 {
            conflicts.insert(column.clone(), type_map);
        }

        if owning.len() == datasets.len() {
            common_columns.push(column);
        } else {
            partial_columns.insert(column, owning);
        }
    }

    CommonSchema {
        common_columns,
        partial_columns,
        consensus_types,
        conflicts,
    }
}

/// One anomaly per partial column: high when missing from exactly one
/// dataset, medium when present in at least half, low otherwise
fn schema_drift_anomalies(names: &[&str], schema: &CommonSchema) -> Vec<Anomaly> {
    schema
        .partial_columns
        .iter()
        .map(|(column, owning)| {
            let missing: Vec<String> = names
                .iter()
                .filter(|n| !owning.contains(&(**n).to_string()))
                .map(|n| (*n).to_string())
                .collect();
            let severity = if missing.len() == 1 {
                Severity::High
            } else if owning.len() * 2 >= names.len() {
                Severity::Medium
            } else {
                Severity::Low
            };
            Anomaly {
                kind: AnomalyKind::SchemaDrift,
                severity,
                affected_datasets: missing.clone(),
                column: Some(column.clone()),
                detail: serde_json::json!({
                    "present_in": owning,
                    "missing_from": missing,
                }),
            }
        })
        .collect()
}

/// Type conflicts are always high severity and name every owner with its
/// declared type
fn type_mismatch_anomalies(schema: &CommonSchema) -> Vec<Anomaly> {
    schema
        .conflicts
        .iter()
        .map(|(column, type_map)| {
            let types: BTreeMap<&String, String> = type_map
                .iter()
                .map(|(name, data_type)| (name, data_type.to_string()))
                .collect();
            Anomaly {
                kind: AnomalyKind::TypeMismatch,
                severity: Severity::High,
                affected_datasets: type_map.keys().cloned().collect(),
                column: Some(column.clone()),
                detail: serde_json::json!({ "types": types }),
            }
        })
        .collect()
}
