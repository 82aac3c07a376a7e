//! Typed views of the engine's responses
//!
//! Fields the facade has no use for are kept as raw JSON rather than being
//! modeled exhaustively; the engine's response is never rewritten.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
}

/// Search (and scroll page) response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_scroll_id", default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
    pub hits: SearchHits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<HashMap<String, Value>>,
}

impl SearchResponse {
    /// Value of a single-value metric aggregation (`max`, `min`, `sum`...).
    ///
    /// `None` when the aggregation is absent or its value is null, which is
    /// what the engine returns for a max over zero documents.
    pub fn aggregation_value(&self, name: &str) -> Option<f64> {
        self.aggregations
            .as_ref()?
            .get(name)?
            .get("value")?
            .as_f64()
    }

    pub fn total_hits(&self) -> u64 {
        self.hits.total.value()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Older engines return a bare number, newer ones an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object { value: u64, relation: String },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(v) => *v,
            TotalHits::Object { value, .. } => *value,
        }
    }
}

impl Default for TotalHits {
    fn default() -> Self {
        TotalHits::Count(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiGetResponse {
    pub docs: Vec<MultiGetItemResponse>,
}

/// One document of a multi-get: either a lookup result or a per-item error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiGetItemResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl DeleteResponse {
    pub fn deleted(&self) -> bool {
        self.found.unwrap_or(false) || self.result.as_deref() == Some("deleted")
    }
}

/// Aggregate bulk response.
///
/// Per-item failures are reported here and never raised as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItemResponse>,
}

impl BulkResponse {
    pub fn has_failures(&self) -> bool {
        self.errors || self.items.iter().any(BulkItemResponse::is_failed)
    }

    pub fn successes(&self) -> usize {
        self.items.iter().filter(|item| !item.is_failed()).count()
    }

    pub fn failures(&self) -> Vec<&BulkItemResult> {
        self.items
            .iter()
            .filter_map(BulkItemResponse::result)
            .filter(|result| result.is_failed())
            .collect()
    }

    /// One line per failed item, for logging.
    pub fn failure_message(&self) -> String {
        self.failures()
            .iter()
            .map(|r| {
                format!(
                    "[{}/{}] status {}: {}",
                    r.index,
                    r.id.as_deref().unwrap_or("-"),
                    r.status,
                    r.error.as_ref().map(Value::to_string).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Each bulk item is keyed by the action it answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkItemResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<BulkItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<BulkItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<BulkItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<BulkItemResult>,
}

impl BulkItemResponse {
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.index
            .as_ref()
            .or(self.create.as_ref())
            .or(self.update.as_ref())
            .or(self.delete.as_ref())
    }

    pub fn is_failed(&self) -> bool {
        self.result().map(BulkItemResult::is_failed).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl BulkItemResult {
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.status >= 400
    }
}

/// Response of broadcast index operations (refresh, flush, force merge, cache clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shards_acknowledged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicesExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicesStatsResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardStats,
    #[serde(rename = "_all", default)]
    pub all: Value,
    #[serde(default)]
    pub indices: HashMap<String, Value>,
}

impl IndicesStatsResponse {
    /// Primary document count of an index, if reported.
    pub fn doc_count(&self, index: &str) -> Option<u64> {
        self.indices
            .get(index)?
            .pointer("/primaries/docs/count")?
            .as_u64()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesStatsResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub nodes: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStateResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_node: Option<String>,
    #[serde(flatten)]
    pub sections: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStatsResponse {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterHealthStatus>,
    #[serde(default)]
    pub indices: Value,
    #[serde(default)]
    pub nodes: Value,
}

/// Cluster health, ordered from worst (`Red`) to best (`Green`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterHealthStatus {
    Red,
    Yellow,
    Green,
}

impl ClusterHealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterHealthStatus::Red => "red",
            ClusterHealthStatus::Yellow => "yellow",
            ClusterHealthStatus::Green => "green",
        }
    }

    /// Whether this status satisfies a wait for `required`.
    pub fn satisfies(&self, required: ClusterHealthStatus) -> bool {
        *self >= required
    }
}

impl fmt::Display for ClusterHealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterHealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(ClusterHealthStatus::Red),
            "yellow" => Ok(ClusterHealthStatus::Yellow),
            "green" => Ok(ClusterHealthStatus::Green),
            other => Err(format!("unknown cluster health status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterHealthResponse {
    #[serde(default)]
    pub cluster_name: String,
    pub status: ClusterHealthStatus,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: u32,
    #[serde(default)]
    pub number_of_data_nodes: u32,
    #[serde(default)]
    pub active_primary_shards: u32,
    #[serde(default)]
    pub active_shards: u32,
    #[serde(default)]
    pub relocating_shards: u32,
    #[serde(default)]
    pub initializing_shards: u32,
    #[serde(default)]
    pub unassigned_shards: u32,
    #[serde(default)]
    pub number_of_pending_tasks: u32,
}
