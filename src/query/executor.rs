//! Query executor: validate, evaluate, paginate.
//!
//! Evaluation is synchronous and side-effect-free; the full result is always
//! materialized before pagination so that a cached entry can serve any page.
//! The result cache is an explicitly injected handle, never global state,
//! and every cache fault degrades to a recomputation.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::ResultCache;
use super::spec::{
    AggregateFunction, AggregateSpec, CompareSpec, ComparisonType, CorrelateSpec,
    CorrelationMethod, FilterOperator, FilterPredicate, QueryKind, QueryOp, QuerySpec,
    TrendInterval, TrendSpec,
};
use super::QueryError;
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::numeric;
use crate::value::Value;

/// One output row: column name to normalized JSON cell
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The result contract consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    /// Row count of the full result, before pagination
    pub total_count: usize,
    pub has_more: bool,
    pub kind: QueryKind,
}

/// Compiles and evaluates declarative queries against one dataset
#[derive(Default)]
pub struct QueryExecutor {
    cache: Option<ResultCache>,
}

impl QueryExecutor {
    /// Executor without result caching
    pub fn new() -> Self {
        QueryExecutor { cache: None }
    }

    /// Executor with an injected cache handle
    pub fn with_cache(cache: ResultCache) -> Self {
        QueryExecutor { cache: Some(cache) }
    }

    /// Build from configuration: caching on or off per `[cache]`
    pub fn from_config(config: &EngineConfig) -> Self {
        if config.cache.enabled {
            QueryExecutor::with_cache(ResultCache::from_config(&config.cache))
        } else {
            QueryExecutor::new()
        }
    }

    /// Execute a query against a dataset.
    ///
    /// `dataset_id` identifies the dataset for cache keying only; it carries
    /// no other meaning. Validation failures abort before any row is read;
    /// a legitimate empty result is a success with zero rows.
    pub fn execute(
        &self,
        dataset_id: &str,
        dataset: &Dataset,
        spec: &QuerySpec,
    ) -> Result<QueryResult, QueryError> {
        self.validate(dataset, spec)?;

        let key = ResultCache::key(dataset_id, &spec.cache_discriminant());
        if let Some(cache) = &self.cache {
            if let Some(full) = cache.get(&key) {
                debug!(dataset_id, "query_cache_hit");
                return Ok(Self::paginate(
                    full.columns,
                    full.rows,
                    full.kind,
                    spec.limit,
                    spec.offset,
                ));
            }
        }

        let filtered = apply_filters(dataset, &spec.filters);
        let (columns, rows) = match &spec.op {
            QueryOp::Filter => eval_filter(&filtered),
            QueryOp::Aggregate(agg) => eval_aggregate(&filtered, agg),
            QueryOp::Trend(trend) => eval_trend(&filtered, trend)?,
            QueryOp::Compare(cmp) => eval_compare(&filtered, cmp),
            QueryOp::Correlate(corr) => eval_correlate(&filtered, corr),
        };

        if let Some(cache) = &self.cache {
            cache.put(
                key,
                QueryResult {
                    rows: rows.clone(),
                    columns: columns.clone(),
                    total_count: rows.len(),
                    has_more: false,
                    kind: spec.kind(),
                },
            );
        }

        Ok(Self::paginate(columns, rows, spec.kind(), spec.limit, spec.offset))
    }

    /// Check every referenced column and sub-spec shape before evaluation
    fn validate(&self, dataset: &Dataset, spec: &QuerySpec) -> Result<(), QueryError> {
        for predicate in &spec.filters {
            ensure_column(dataset, &predicate.field, "filter")?;
        }

        match &spec.op {
            QueryOp::Filter => Ok(()),
            QueryOp::Aggregate(agg) => {
                if agg.group_by.is_empty() {
                    return Err(QueryError::Validation(
                        "Aggregate query requires at least one group_by field".to_string(),
                    ));
                }
                if agg.aggregates.is_empty() {
                    return Err(QueryError::Validation(
                        "Aggregate query requires at least one aggregate".to_string(),
                    ));
                }
                for field in &agg.group_by {
                    ensure_column(dataset, field, "group_by")?;
                }
                for aggregate in &agg.aggregates {
                    ensure_column(dataset, &aggregate.field, "aggregate")?;
                }
                Ok(())
            }
            QueryOp::Trend(trend) => {
                ensure_column(dataset, &trend.date_field, "trend date_field")?;
                ensure_column(dataset, &trend.value_field, "trend value_field")
            }
            QueryOp::Compare(cmp) => {
                ensure_column(dataset, &cmp.group_field, "compare group_field")?;
                ensure_column(dataset, &cmp.value_field, "compare value_field")
            }
            QueryOp::Correlate(corr) => {
                for field in [&corr.field_a, &corr.field_b] {
                    ensure_column(dataset, field, "correlate")?;
                    let data_type = dataset
                        .column_type(field)
                        .unwrap_or(crate::value::DataType::Null);
                    if !data_type.is_numeric() {
                        return Err(QueryError::Type(format!(
                            "Column '{field}' has type {data_type}; correlate requires numeric input"
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    /// Slice the fully materialized result into the requested page
    fn paginate(
        columns: Vec<String>,
        rows: Vec<Row>,
        kind: QueryKind,
        limit: Option<usize>,
        offset: usize,
    ) -> QueryResult {
        let total_count = rows.len();
        let page: Vec<Row> = match limit {
            Some(limit) => rows.into_iter().skip(offset).take(limit).collect(),
            None => rows.into_iter().skip(offset).collect(),
        };
        let has_more = limit.is_some_and(|limit| offset + limit < total_count);

        QueryResult {
            rows: page,
            columns,
            total_count,
            has_more,
            kind,
        }
    }
}

fn ensure_column(dataset: &Dataset, field: &str, context: &str) -> Result<(), QueryError> {
    if dataset.has_column(field) {
        Ok(())
    } else {
        Err(QueryError::Validation(format!(
            "Unknown column '{field}' in {context}"
        )))
    }
}

/// AND of all predicates as a boolean mask, then mask selection
fn apply_filters(dataset: &Dataset, filters: &[FilterPredicate]) -> Dataset {
    if filters.is_empty() {
        return dataset.clone();
    }

    let mask: Vec<bool> = (0..dataset.row_count())
        .map(|row| {
            filters.iter().all(|predicate| {
                dataset
                    .value_at(&predicate.field, row)
                    .is_some_and(|cell| predicate_matches(predicate, cell))
            })
        })
        .collect();

    dataset.select(&mask)
}

fn predicate_matches(predicate: &FilterPredicate, cell: &Value) -> bool {
    use std::cmp::Ordering;

    match predicate.op {
        FilterOperator::Eq => value_eq(cell, &predicate.value),
        FilterOperator::Ne => !value_eq(cell, &predicate.value),
        FilterOperator::Gt => value_cmp(cell, &predicate.value) == Some(Ordering::Greater),
        FilterOperator::Lt => value_cmp(cell, &predicate.value) == Some(Ordering::Less),
        FilterOperator::Gte => matches!(
            value_cmp(cell, &predicate.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Lte => matches!(
            value_cmp(cell, &predicate.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::Contains => {
            if cell.is_null() {
                return false;
            }
            cell.coerce_string()
                .to_lowercase()
                .contains(&json_display(&predicate.value).to_lowercase())
        }
        FilterOperator::In => match &predicate.value {
            serde_json::Value::Array(items) => items.iter().any(|item| value_eq(cell, item)),
            // A scalar acts as a single-element list
            other => value_eq(cell, other),
        },
    }
}

/// Equality between a cell and a JSON predicate value: numeric when both
/// sides coerce, boolean against boolean, otherwise display-form equality.
/// A null cell equals only a null predicate value.
fn value_eq(cell: &Value, target: &serde_json::Value) -> bool {
    if cell.is_null() {
        return target.is_null();
    }
    if target.is_null() {
        return false;
    }
    if let (Some(a), Some(b)) = (cell.as_f64(), target.as_f64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (cell.as_bool(), target.as_bool()) {
        return a == b;
    }
    cell.coerce_string() == json_display(target)
}

/// Ordering between a cell and a JSON predicate value; None (no match) when
/// either side is null. Numeric when both coerce, lexicographic otherwise.
fn value_cmp(cell: &Value, target: &serde_json::Value) -> Option<std::cmp::Ordering> {
    if cell.is_null() || target.is_null() {
        return None;
    }
    if let (Some(a), Some(b)) = (cell.as_f64(), target.as_f64()) {
        return a.partial_cmp(&b);
    }
    Some(cell.coerce_string().cmp(&json_display(target)))
}

/// Plain display form of a JSON predicate value (no quoting)
fn json_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn eval_filter(dataset: &Dataset) -> (Vec<String>, Vec<Row>) {
    let rows = (0..dataset.row_count()).map(|row| dataset.row_json(row)).collect();
    (dataset.columns().to_vec(), rows)
}

fn eval_aggregate(dataset: &Dataset, spec: &AggregateSpec) -> (Vec<String>, Vec<Row>) {
    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for row in 0..dataset.row_count() {
        let key: Vec<Value> = spec
            .group_by
            .iter()
            .map(|field| dataset.value_at(field, row).cloned().unwrap_or(Value::Null))
            .collect();
        groups.entry(key).or_default().push(row);
    }

    let mut columns = spec.group_by.clone();
    columns.extend(spec.aggregates.iter().map(super::spec::AggregateField::output_name));

    let mut rows = Vec::with_capacity(groups.len());
    for (key, indices) in groups {
        let mut row = Row::new();
        for (field, value) in spec.group_by.iter().zip(&key) {
            row.insert(field.clone(), value.to_json());
        }
        for aggregate in &spec.aggregates {
            let cells = collect_cells(dataset, &aggregate.field, &indices);
            row.insert(aggregate.output_name(), aggregate_cells(&cells, aggregate.function));
        }
        rows.push(row);
    }

    (columns, rows)
}

fn eval_trend(
    dataset: &Dataset,
    spec: &TrendSpec,
) -> Result<(Vec<String>, Vec<Row>), QueryError> {
    let dates = dataset.values(&spec.date_field).unwrap_or(&[]);

    let mut buckets: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (row, cell) in dates.iter().enumerate() {
        if cell.is_null() {
            continue;
        }
        let date = cell
            .as_datetime_ms()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|dt| dt.date_naive())
            .ok_or_else(|| {
                QueryError::Type(format!(
                    "Column '{}' contains values that cannot be converted to timestamps",
                    spec.date_field
                ))
            })?;
        buckets
            .entry(bucket_anchor(date, spec.interval))
            .or_default()
            .push(row);
    }

    let value_column = format!("{}_{}", spec.value_field, spec.function.name());
    let columns = vec!["period".to_string(), value_column.clone()];

    let mut rows = Vec::with_capacity(buckets.len());
    for (anchor, indices) in buckets {
        let cells = collect_cells(dataset, &spec.value_field, &indices);
        let mut row = Row::new();
        row.insert(
            "period".to_string(),
            serde_json::Value::from(anchor.format("%Y-%m-%d").to_string()),
        );
        row.insert(value_column.clone(), aggregate_cells(&cells, spec.function));
        rows.push(row);
    }

    Ok((columns, rows))
}

/// Calendar bucket anchor: the day itself, the ISO-week Monday, or the end
/// of the month/quarter/year the date falls in.
fn bucket_anchor(date: NaiveDate, interval: TrendInterval) -> NaiveDate {
    match interval {
        TrendInterval::Day => date,
        TrendInterval::Week => {
            let back = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(chrono::Days::new(back)).unwrap_or(date)
        }
        TrendInterval::Month => month_end(date.year(), date.month()).unwrap_or(date),
        TrendInterval::Quarter => {
            let quarter_end_month = (date.month0() / 3) * 3 + 3;
            month_end(date.year(), quarter_end_month).unwrap_or(date)
        }
        TrendInterval::Year => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
    }
}

/// Last day of a month: first day of the next month, stepped back once
fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn eval_compare(dataset: &Dataset, spec: &CompareSpec) -> (Vec<String>, Vec<Row>) {
    let mut groups: BTreeMap<Value, Vec<usize>> = BTreeMap::new();
    let group_cells = dataset.values(&spec.group_field).unwrap_or(&[]);
    for (row, cell) in group_cells.iter().enumerate() {
        groups.entry(cell.clone()).or_default().push(row);
    }

    let value_column = format!("{}_{}", spec.value_field, spec.function.name());
    let mut columns = vec![spec.group_field.clone(), value_column.clone()];

    let aggregated: Vec<(Value, serde_json::Value)> = groups
        .into_iter()
        .map(|(group, indices)| {
            let cells = collect_cells(dataset, &spec.value_field, &indices);
            (group, aggregate_cells(&cells, spec.function))
        })
        .collect();

    let percentages = if spec.comparison_type == ComparisonType::Percentage {
        columns.push("percentage".to_string());
        let total: f64 = aggregated
            .iter()
            .filter_map(|(_, v)| v.as_f64())
            .sum();
        Some(
            aggregated
                .iter()
                .map(|(_, v)| {
                    let value = v.as_f64().unwrap_or(0.0);
                    // A zero total yields 0.0 for every group, not an error
                    if total == 0.0 {
                        0.0
                    } else {
                        numeric::round_to(value / total * 100.0, 2)
                    }
                })
                .collect::<Vec<f64>>(),
        )
    } else {
        None
    };

    let rows = aggregated
        .into_iter()
        .enumerate()
        .map(|(i, (group, value))| {
            let mut row = Row::new();
            row.insert(spec.group_field.clone(), group.to_json());
            row.insert(value_column.clone(), value);
            if let Some(percentages) = &percentages {
                row.insert("percentage".to_string(), serde_json::json!(percentages[i]));
            }
            row
        })
        .collect();

    (columns, rows)
}

fn eval_correlate(dataset: &Dataset, spec: &CorrelateSpec) -> (Vec<String>, Vec<Row>) {
    let xs = dataset.values(&spec.field_a).unwrap_or(&[]);
    let ys = dataset.values(&spec.field_b).unwrap_or(&[]);

    // Pairwise-complete: entries that fail numeric coercion become null and
    // drop out with their partner
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();

    let coefficient = match spec.method {
        CorrelationMethod::Pearson => numeric::pearson(&pairs),
        CorrelationMethod::Spearman => numeric::spearman(&pairs),
    };

    let columns = vec![
        "field_a".to_string(),
        "field_b".to_string(),
        "method".to_string(),
        "correlation".to_string(),
        "sample_size".to_string(),
    ];

    let mut row = Row::new();
    row.insert("field_a".to_string(), serde_json::json!(spec.field_a));
    row.insert("field_b".to_string(), serde_json::json!(spec.field_b));
    row.insert("method".to_string(), serde_json::json!(spec.method.name()));
    row.insert(
        "correlation".to_string(),
        coefficient
            .map(|c| numeric::round_to(c, 4))
            .and_then(serde_json::Number::from_f64)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
    );
    row.insert("sample_size".to_string(), serde_json::json!(pairs.len()));

    (columns, vec![row])
}

fn collect_cells<'a>(dataset: &'a Dataset, field: &str, indices: &[usize]) -> Vec<&'a Value> {
    indices
        .iter()
        .filter_map(|&row| dataset.value_at(field, row))
        .collect()
}

fn aggregate_cells(cells: &[&Value], function: AggregateFunction) -> serde_json::Value {
    match function {
        AggregateFunction::Sum => {
            let sum: f64 = cells.iter().filter_map(|v| v.as_f64()).sum();
            serde_json::Number::from_f64(sum)
                .map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        AggregateFunction::Avg => {
            let values: Vec<f64> = cells.iter().filter_map(|v| v.as_f64()).collect();
            numeric::mean(&values)
                .and_then(serde_json::Number::from_f64)
                .map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        AggregateFunction::Min => cells
            .iter()
            .filter(|v| !v.is_null())
            .min()
            .map_or(serde_json::Value::Null, |v| v.to_json()),
        AggregateFunction::Max => cells
            .iter()
            .filter(|v| !v.is_null())
            .max()
            .map_or(serde_json::Value::Null, |v| v.to_json()),
        AggregateFunction::Count => serde_json::json!(cells.len()),
        AggregateFunction::Distinct => {
            let distinct: HashSet<&Value> =
                cells.iter().filter(|v| !v.is_null()).copied().collect();
            serde_json::json!(distinct.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::value::DataType;

    fn sales_dataset() -> Dataset {
        Dataset::from_columns(vec![
            Column::new(
                "department",
                DataType::String,
                vec![
                    Value::string("Sales"),
                    Value::string("Sales"),
                    Value::string("Sales"),
                    Value::string("Engineering"),
                    Value::string("Engineering"),
                ],
            ),
            Column::new(
                "salary",
                DataType::Integer,
                vec![
                    Value::Integer(50_000),
                    Value::Integer(60_000),
                    Value::Integer(55_000),
                    Value::Integer(75_000),
                    Value::Integer(80_000),
                ],
            ),
        ])
        .expect("valid dataset")
    }

    #[test]
    fn test_unknown_filter_column_fails_validation() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "missing",
            FilterOperator::Eq,
            serde_json::json!(1),
        )]);
        let err = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect_err("unknown column");
        assert_eq!(
            err,
            QueryError::Validation("Unknown column 'missing' in filter".to_string())
        );
    }

    #[test]
    fn test_aggregate_requires_group_by() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Aggregate(AggregateSpec {
            group_by: vec![],
            aggregates: vec![super::super::spec::AggregateField::new(
                "salary",
                AggregateFunction::Sum,
            )],
        }));
        let err = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect_err("no group_by");
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_aggregate_department_salary_sum() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Aggregate(AggregateSpec {
            group_by: vec!["department".to_string()],
            aggregates: vec![super::super::spec::AggregateField::new(
                "salary",
                AggregateFunction::Sum,
            )],
        }));
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("aggregate");

        assert_eq!(result.kind, QueryKind::Aggregate);
        assert_eq!(result.total_count, 2);
        assert_eq!(
            result.columns,
            vec!["department".to_string(), "salary_sum".to_string()]
        );
        // Groups sort by key: Engineering before Sales
        assert_eq!(result.rows[0]["department"], "Engineering");
        assert_eq!(result.rows[0]["salary_sum"].as_f64(), Some(155_000.0));
        assert_eq!(result.rows[1]["department"], "Sales");
        assert_eq!(result.rows[1]["salary_sum"].as_f64(), Some(165_000.0));
    }

    #[test]
    fn test_filter_contains_case_insensitive() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "department",
            FilterOperator::Contains,
            serde_json::json!("SALES"),
        )]);
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("filter");
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn test_filter_in_scalar_acts_as_list() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "department",
            FilterOperator::In,
            serde_json::json!("Engineering"),
        )]);
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("filter");
        assert_eq!(result.total_count, 2);
    }

    #[test]
    fn test_filter_numeric_comparison() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "salary",
            FilterOperator::Gte,
            serde_json::json!(60_000),
        )]);
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("filter");
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn test_null_cell_matches_nothing_except_ne() {
        let dataset = Dataset::from_columns(vec![Column::new(
            "v",
            DataType::Integer,
            vec![Value::Integer(1), Value::Null],
        )])
        .expect("valid dataset");
        let executor = QueryExecutor::new();

        let eq = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "v",
            FilterOperator::Eq,
            serde_json::json!(1),
        )]);
        assert_eq!(executor.execute("d", &dataset, &eq).expect("eq").total_count, 1);

        let ne = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "v",
            FilterOperator::Ne,
            serde_json::json!(1),
        )]);
        assert_eq!(executor.execute("d", &dataset, &ne).expect("ne").total_count, 1);

        let gt = QuerySpec::new(QueryOp::Filter).with_filters(vec![FilterPredicate::new(
            "v",
            FilterOperator::Gt,
            serde_json::json!(0),
        )]);
        assert_eq!(executor.execute("d", &dataset, &gt).expect("gt").total_count, 1);
    }

    #[test]
    fn test_pagination_window() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_pagination(Some(2), 1);
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("filter");
        assert_eq!(result.total_count, 5);
        assert_eq!(result.rows.len(), 2);
        assert!(result.has_more);

        let last_page = QuerySpec::new(QueryOp::Filter).with_pagination(Some(2), 4);
        let result = executor
            .execute("sales", &sales_dataset(), &last_page)
            .expect("filter");
        assert_eq!(result.rows.len(), 1);
        assert!(!result.has_more);
    }

    #[test]
    fn test_offset_past_end_is_empty_success() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Filter).with_pagination(Some(10), 100);
        let result = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect("filter");
        assert_eq!(result.rows.len(), 0);
        assert_eq!(result.total_count, 5);
        assert!(!result.has_more);
    }

    #[test]
    fn test_trend_month_buckets_period_end() {
        let dataset = Dataset::from_columns(vec![
            Column::new(
                "day",
                DataType::String,
                vec![
                    Value::string("2024-01-05"),
                    Value::string("2024-01-20"),
                    Value::string("2024-02-10"),
                ],
            ),
            Column::new(
                "amount",
                DataType::Integer,
                vec![Value::Integer(10), Value::Integer(20), Value::Integer(5)],
            ),
        ])
        .expect("valid dataset");

        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Trend(TrendSpec {
            date_field: "day".to_string(),
            value_field: "amount".to_string(),
            interval: TrendInterval::Month,
            function: AggregateFunction::Sum,
        }));
        let result = executor.execute("d", &dataset, &spec).expect("trend");

        assert_eq!(result.total_count, 2);
        assert_eq!(result.rows[0]["period"], "2024-01-31");
        assert_eq!(result.rows[0]["amount_sum"].as_f64(), Some(30.0));
        assert_eq!(result.rows[1]["period"], "2024-02-29");
        assert_eq!(result.rows[1]["amount_sum"].as_f64(), Some(5.0));
    }

    #[test]
    fn test_trend_unparseable_date_is_type_error() {
        let dataset = Dataset::from_columns(vec![
            Column::new(
                "day",
                DataType::String,
                vec![Value::string("2024-01-05"), Value::string("soon")],
            ),
            Column::new("amount", DataType::Integer, vec![Value::Integer(1), Value::Integer(2)]),
        ])
        .expect("valid dataset");

        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Trend(TrendSpec {
            date_field: "day".to_string(),
            value_field: "amount".to_string(),
            interval: TrendInterval::Day,
            function: AggregateFunction::Sum,
        }));
        let err = executor.execute("d", &dataset, &spec).expect_err("bad date");
        assert!(matches!(err, QueryError::Type(msg) if msg.contains("day")));
    }

    #[test]
    fn test_compare_percentage_zero_total() {
        let dataset = Dataset::from_columns(vec![
            Column::new(
                "group",
                DataType::String,
                vec![Value::string("a"), Value::string("b")],
            ),
            Column::new(
                "v",
                DataType::Integer,
                vec![Value::Integer(0), Value::Integer(0)],
            ),
        ])
        .expect("valid dataset");

        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Compare(CompareSpec {
            group_field: "group".to_string(),
            value_field: "v".to_string(),
            comparison_type: ComparisonType::Percentage,
            function: AggregateFunction::Sum,
        }));
        let result = executor.execute("d", &dataset, &spec).expect("compare");
        for row in &result.rows {
            assert_eq!(row["percentage"].as_f64(), Some(0.0));
        }
    }

    #[test]
    fn test_correlate_degenerate_is_null_not_error() {
        let dataset = Dataset::from_columns(vec![
            Column::new(
                "x",
                DataType::Integer,
                vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
            ),
            Column::new(
                "y",
                DataType::Integer,
                vec![Value::Integer(5), Value::Integer(5), Value::Integer(5)],
            ),
        ])
        .expect("valid dataset");

        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Correlate(CorrelateSpec {
            field_a: "x".to_string(),
            field_b: "y".to_string(),
            method: CorrelationMethod::Pearson,
        }));
        let result = executor.execute("d", &dataset, &spec).expect("correlate");
        assert_eq!(result.rows[0]["correlation"], serde_json::Value::Null);
        assert_eq!(result.rows[0]["sample_size"], serde_json::json!(3));
    }

    #[test]
    fn test_correlate_string_column_is_type_error() {
        let executor = QueryExecutor::new();
        let spec = QuerySpec::new(QueryOp::Correlate(CorrelateSpec {
            field_a: "department".to_string(),
            field_b: "salary".to_string(),
            method: CorrelationMethod::Pearson,
        }));
        let err = executor
            .execute("sales", &sales_dataset(), &spec)
            .expect_err("string correlate");
        assert!(matches!(err, QueryError::Type(msg) if msg.contains("department")));
    }

    #[test]
    fn test_cache_hit_repaginates() {
        let cache = ResultCache::with_defaults();
        let executor = QueryExecutor::with_cache(cache.clone());
        let dataset = sales_dataset();

        let page1 = QuerySpec::new(QueryOp::Filter).with_pagination(Some(2), 0);
        let page2 = QuerySpec::new(QueryOp::Filter).with_pagination(Some(2), 2);

        let first = executor.execute("sales", &dataset, &page1).expect("page 1");
        assert_eq!(first.rows.len(), 2);
        assert_eq!(cache.stats().misses, 1);

        // Same query minus pagination: served from the cached full result
        let second = executor.execute("sales", &dataset, &page2).expect("page 2");
        assert_eq!(second.rows.len(), 2);
        assert_eq!(second.total_count, 5);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_bucket_anchors() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).expect("date");
        assert_eq!(bucket_anchor(date, TrendInterval::Day), date);
        // 2024-05-15 is a Wednesday; the ISO week starts Monday 2024-05-13
        assert_eq!(
            bucket_anchor(date, TrendInterval::Week),
            NaiveDate::from_ymd_opt(2024, 5, 13).expect("date")
        );
        assert_eq!(
            bucket_anchor(date, TrendInterval::Month),
            NaiveDate::from_ymd_opt(2024, 5, 31).expect("date")
        );
        assert_eq!(
            bucket_anchor(date, TrendInterval::Quarter),
            NaiveDate::from_ymd_opt(2024, 6, 30).expect("date")
        );
        assert_eq!(
            bucket_anchor(date, TrendInterval::Year),
            NaiveDate::from_ymd_opt(2024, 12, 31).expect("date")
        );
    }
}
