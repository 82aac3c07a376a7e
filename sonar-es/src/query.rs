//! Query DSL clauses used to shape search requests
//!
//! Only request shaping lives here: each clause renders itself to the JSON
//! the engine expects. Nothing in this module interprets results.

use serde_json::{json, Map, Value};

/// A query clause tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Match { field: String, text: String },
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Range(RangeQuery),
    Exists { field: String },
    Ids { values: Vec<String> },
    Prefix { field: String, prefix: String },
    Bool(BoolQuery),
    /// Pre-built clause passed through untouched.
    Raw(Value),
}

impl Query {
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    pub fn match_text(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: impl Into<String>) -> RangeQuery {
        RangeQuery {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists { field: field.into() }
    }

    pub fn ids<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Query::Ids {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Query::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn bool() -> BoolQuery {
        BoolQuery::default()
    }

    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match { field, text } => json!({ "match": { field.as_str(): { "query": text } } }),
            Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Query::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Query::Range(range) => range.to_json(),
            Query::Exists { field } => json!({ "exists": { "field": field } }),
            Query::Ids { values } => json!({ "ids": { "values": values } }),
            Query::Prefix { field, prefix } => json!({ "prefix": { field.as_str(): prefix } }),
            Query::Bool(b) => b.to_json(),
            Query::Raw(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeQuery {
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        for (name, bound) in [("gt", &self.gt), ("gte", &self.gte), ("lt", &self.lt), ("lte", &self.lte)] {
            if let Some(v) = bound {
                bounds.insert(name.to_string(), v.clone());
            }
        }
        json!({ "range": { self.field.as_str(): bounds } })
    }
}

impl From<RangeQuery> for Query {
    fn from(range: RangeQuery) -> Self {
        Query::Range(range)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub filter: Vec<Query>,
}

impl BoolQuery {
    pub fn must(mut self, query: impl Into<Query>) -> Self {
        self.must.push(query.into());
        self
    }

    pub fn should(mut self, query: impl Into<Query>) -> Self {
        self.should.push(query.into());
        self
    }

    pub fn must_not(mut self, query: impl Into<Query>) -> Self {
        self.must_not.push(query.into());
        self
    }

    pub fn filter(mut self, query: impl Into<Query>) -> Self {
        self.filter.push(query.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut clauses = Map::new();
        for (name, queries) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ] {
            if !queries.is_empty() {
                clauses.insert(
                    name.to_string(),
                    Value::Array(queries.iter().map(Query::to_json).collect()),
                );
            }
        }
        json!({ "bool": clauses })
    }
}

impl From<BoolQuery> for Query {
    fn from(b: BoolQuery) -> Self {
        Query::Bool(b)
    }
}

/// Metric and bucket aggregations.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    Max { field: String },
    Min { field: String },
    Sum { field: String },
    ValueCount { field: String },
    Terms { field: String, size: Option<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub name: String,
    pub kind: AggregationKind,
}

impl Aggregation {
    pub fn max(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AggregationKind::Max { field: field.into() },
        }
    }

    pub fn min(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AggregationKind::Min { field: field.into() },
        }
    }

    pub fn sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AggregationKind::Sum { field: field.into() },
        }
    }

    pub fn value_count(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AggregationKind::ValueCount { field: field.into() },
        }
    }

    pub fn terms(name: impl Into<String>, field: impl Into<String>, size: Option<usize>) -> Self {
        Self {
            name: name.into(),
            kind: AggregationKind::Terms {
                field: field.into(),
                size,
            },
        }
    }

    /// Render the aggregation body (without its name).
    pub fn to_json(&self) -> Value {
        match &self.kind {
            AggregationKind::Max { field } => json!({ "max": { "field": field } }),
            AggregationKind::Min { field } => json!({ "min": { "field": field } }),
            AggregationKind::Sum { field } => json!({ "sum": { "field": field } }),
            AggregationKind::ValueCount { field } => json!({ "value_count": { "field": field } }),
            AggregationKind::Terms { field, size } => match size {
                Some(size) => json!({ "terms": { "field": field, "size": size } }),
                None => json!({ "terms": { "field": field } }),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    pub fn to_json(&self) -> Value {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        json!({ self.field.as_str(): { "order": order } })
    }
}
