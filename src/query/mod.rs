//! # Query Execution Module
//!
//! Compiles a declarative [`QuerySpec`] into one of five operation kinds and
//! evaluates it against a single in-memory [`crate::dataset::Dataset`]:
//!
//! ```text
//! QuerySpec
//!     ↓
//! [Validate]        → unknown columns / malformed sub-specs fail here,
//!     ↓               before any row is touched
//! [Cache probe]     → optional, best-effort, keyed by (dataset, query)
//!     ↓               minus pagination
//! [Pre-filter]      → AND of shared predicates, boolean-mask selection
//!     ↓
//! [Evaluate]        → filter | aggregate | trend | compare | correlate
//!     ↓
//! [Paginate]        → rows[offset..offset+limit] over the full result
//! ```

mod cache;
mod executor;
mod spec;

pub use cache::{CacheStats, ResultCache, DEFAULT_MAX_ENTRIES, DEFAULT_RESULT_TTL};
pub use executor::{QueryExecutor, QueryResult, Row};
pub use spec::{
    AggregateField, AggregateFunction, AggregateSpec, CompareSpec, ComparisonType,
    CorrelateSpec, CorrelationMethod, FilterOperator, FilterPredicate, QueryKind, QueryOp,
    QuerySpec, TrendInterval, TrendSpec,
};

/// Query compilation and evaluation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Unknown column or malformed sub-spec, caught before evaluation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A column cannot be coerced to the type the operation needs
    #[error("Type error: {0}")]
    Type(String),
}
