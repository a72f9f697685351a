//! Declarative query specifications.
//!
//! A [`QuerySpec`] is a closed tagged union over the five operation kinds,
//! plus a shared pre-filter list and pagination. The executor compiles and
//! validates a spec before touching any row; there is no "is this sub-spec
//! present" runtime checking because the sum type makes an absent sub-spec
//! unrepresentable.

use serde::{Deserialize, Serialize};

/// Comparison operator for filter predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Case-insensitive substring match on the display form
    Contains,
    /// Membership test; a non-array value acts as a single-element list
    In,
}

/// One filter predicate: `field <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub field: String,
    pub op: FilterOperator,
    pub value: serde_json::Value,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, op: FilterOperator, value: serde_json::Value) -> Self {
        FilterPredicate {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Aggregation function applied to a column within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    Distinct,
}

impl AggregateFunction {
    /// The function name used in default output aliases.
    ///
    /// These strings are externally visible (`salary_sum`, `price_avg`) and
    /// stable; in particular `avg` stays `avg` even though it computes the
    /// arithmetic mean.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
            AggregateFunction::Distinct => "distinct",
        }
    }
}

/// One aggregate output: a column, a function, and an optional alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateField {
    pub field: String,
    pub function: AggregateFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl AggregateField {
    pub fn new(field: impl Into<String>, function: AggregateFunction) -> Self {
        AggregateField {
            field: field.into(),
            function,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output column name: the alias, or `{field}_{function}`
    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.field, self.function.name()))
    }
}

/// Group-by aggregation spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub group_by: Vec<String>,
    pub aggregates: Vec<AggregateField>,
}

/// Calendar bucketing interval for trend queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendInterval {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Time-series aggregation spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSpec {
    pub date_field: String,
    pub value_field: String,
    pub interval: TrendInterval,
    pub function: AggregateFunction,
}

/// How compare results are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonType {
    Absolute,
    /// Adds a `percentage` column with each group's share of the total
    Percentage,
}

/// Group comparison spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareSpec {
    pub group_field: String,
    pub value_field: String,
    pub comparison_type: ComparisonType,
    pub function: AggregateFunction,
}

/// Correlation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
        }
    }
}

/// Correlation spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelateSpec {
    pub field_a: String,
    pub field_b: String,
    pub method: CorrelationMethod,
}

/// The five operation kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryOp {
    /// Row selection only; the shared pre-filter list does the work
    Filter,
    Aggregate(AggregateSpec),
    Trend(TrendSpec),
    Compare(CompareSpec),
    Correlate(CorrelateSpec),
}

/// Operation kind echoed back in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Filter,
    Aggregate,
    Trend,
    Compare,
    Correlate,
}

/// A complete declarative query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(flatten)]
    pub op: QueryOp,
    /// Pre-filter predicates, AND semantics, applied before any operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl QuerySpec {
    pub fn new(op: QueryOp) -> Self {
        QuerySpec {
            op,
            filters: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterPredicate>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_pagination(mut self, limit: Option<usize>, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// The operation kind of this query
    pub fn kind(&self) -> QueryKind {
        match &self.op {
            QueryOp::Filter => QueryKind::Filter,
            QueryOp::Aggregate(_) => QueryKind::Aggregate,
            QueryOp::Trend(_) => QueryKind::Trend,
            QueryOp::Compare(_) => QueryKind::Compare,
            QueryOp::Correlate(_) => QueryKind::Correlate,
        }
    }

    /// Canonical form of the query *minus pagination*, used as the cache
    /// key half: two queries differing only in limit/offset share one
    /// cached full result.
    pub fn cache_discriminant(&self) -> String {
        #[derive(Serialize)]
        struct Discriminant<'a> {
            op: &'a QueryOp,
            filters: &'a [FilterPredicate],
        }
        serde_json::to_string(&Discriminant {
            op: &self.op,
            filters: &self.filters,
        })
        .unwrap_or_default()
    }
}
