//! # DeltaFrame Tabular Analysis Engine
//!
//! An in-memory analysis core over immutable tabular datasets, with three
//! tightly coupled responsibilities:
//!
//! 1. **Query execution**: compile a declarative [`QuerySpec`] into one of
//!    five operation kinds (filter, aggregate, trend, compare, correlate)
//!    and evaluate it against a single dataset, with pagination and an
//!    optional best-effort result cache
//! 2. **Dataset comparison**: schema, statistical, and key-metric deltas
//!    between exactly two named datasets, with ranked insight sentences
//! 3. **Multi-dataset analysis**: schema-drift, type-mismatch, and
//!    cross-dataset metric-outlier detection over 2–5 related datasets,
//!    composed with every pairwise comparison
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Tabular Dataset (materialized by an external loader)
//!     ↓
//! [Query Executor]          → validate → filter → evaluate → paginate
//!     ↓                       (ResultCache: best-effort, TTL, injected)
//! QueryResult
//!
//! Dataset A + Dataset B
//!     ↓
//! [Dataset Comparator]      → schema → statistics → metrics → insights
//!     ↓
//! ComparisonResult
//!
//! Datasets 1..N (2 ≤ N ≤ 5)
//!     ↓
//! [Multi-Dataset Analyzer]  → summaries → common schema → anomalies
//!     ↓                       → pairwise comparator composition
//! MultiDatasetReport
//! ```
//!
//! ## Design Constraints
//!
//! Every component is a synchronous, side-effect-free function over
//! immutable snapshots: no network or disk I/O, no retries, no internal
//! locking beyond the shared result cache. Validation and type failures
//! abort an operation before any row is touched; a legitimate empty result
//! stays distinguishable from a failure. Numeric paths never emit NaN or
//! Infinity; unsafe values collapse to explicit nulls at the
//! serialization boundary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deltaframe::{
//!     Column, DataType, Dataset, QueryExecutor, QueryOp, QuerySpec, Value,
//! };
//!
//! let dataset = Dataset::from_columns(vec![
//!     Column::new("region", DataType::String, vec![
//!         Value::string("east"), Value::string("west"),
//!     ]),
//!     Column::new("revenue", DataType::Integer, vec![
//!         Value::Integer(100), Value::Integer(50),
//!     ]),
//! ])?;
//!
//! let executor = QueryExecutor::new();
//! let result = executor.execute("sales", &dataset, &QuerySpec::new(QueryOp::Filter))?;
//! assert_eq!(result.total_count, 2);
//! ```

// Value type system (closed tag, deterministic ordering, null-safe JSON)
pub mod value;

// Immutable columnar dataset with typed accessors
pub mod dataset;

// Null-safe numeric kernels shared across components
pub mod numeric;

// Query compilation, evaluation, pagination, result caching
pub mod query;

// Two-dataset statistical comparison
pub mod compare;

// 2-5 dataset drift and outlier analysis
pub mod analyze;

// Configuration system
pub mod config;

// Re-export the core types for convenience
pub use value::{DataType, Value};

pub use dataset::{Column, Dataset, DatasetError, DatasetResult};

pub use query::{
    AggregateField, AggregateFunction, AggregateSpec, CacheStats, CompareSpec, ComparisonType,
    CorrelateSpec, CorrelationMethod, FilterOperator, FilterPredicate, QueryError, QueryExecutor,
    QueryKind, QueryOp, QueryResult, QuerySpec, ResultCache, Row, TrendInterval, TrendSpec,
};

pub use compare::{
    CategoricalDelta, ComparisonResult, DatasetComparator, Direction, KeyMetric,
    KeyMetricsComparison, KeywordClassifier, MetricClassifier, NumericDelta, NumericSummary,
    SchemaComparison, Significance, StatisticsComparison, TypeMismatch, ValueCount,
};

pub use analyze::{
    AnalyzeError, Anomaly, AnomalyKind, CommonSchema, DatasetSummary, MultiDatasetAnalyzer,
    MultiDatasetReport, NumericProfile, Severity,
};

pub use config::{CacheConfig, ComparisonConfig, EngineConfig, LoggingConfig};
