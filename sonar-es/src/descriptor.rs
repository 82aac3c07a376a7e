//! Operation descriptors: immutable values describing one request to the cluster.

use crate::query::{Aggregation, Query, Sort};
use crate::response::ClusterHealthStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// Every operation the facade can send to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Search,
    SearchScroll,
    Count,
    Get,
    MultiGet,
    Index,
    Delete,
    Bulk,
    Refresh,
    Flush,
    ForceMerge,
    ClearCache,
    CreateIndex,
    PutMapping,
    IndicesExist,
    IndicesStats,
    NodesStats,
    ClusterHealth,
    ClusterState,
    ClusterStats,
}

impl OperationKind {
    pub const ALL: [OperationKind; 20] = [
        OperationKind::Search,
        OperationKind::SearchScroll,
        OperationKind::Count,
        OperationKind::Get,
        OperationKind::MultiGet,
        OperationKind::Index,
        OperationKind::Delete,
        OperationKind::Bulk,
        OperationKind::Refresh,
        OperationKind::Flush,
        OperationKind::ForceMerge,
        OperationKind::ClearCache,
        OperationKind::CreateIndex,
        OperationKind::PutMapping,
        OperationKind::IndicesExist,
        OperationKind::IndicesStats,
        OperationKind::NodesStats,
        OperationKind::ClusterHealth,
        OperationKind::ClusterState,
        OperationKind::ClusterStats,
    ];

    /// Get kind as a string for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Search => "search",
            OperationKind::SearchScroll => "search_scroll",
            OperationKind::Count => "count",
            OperationKind::Get => "get",
            OperationKind::MultiGet => "multi_get",
            OperationKind::Index => "index",
            OperationKind::Delete => "delete",
            OperationKind::Bulk => "bulk",
            OperationKind::Refresh => "refresh",
            OperationKind::Flush => "flush",
            OperationKind::ForceMerge => "force_merge",
            OperationKind::ClearCache => "clear_cache",
            OperationKind::CreateIndex => "create_index",
            OperationKind::PutMapping => "put_mapping",
            OperationKind::IndicesExist => "indices_exist",
            OperationKind::IndicesStats => "indices_stats",
            OperationKind::NodesStats => "nodes_stats",
            OperationKind::ClusterHealth => "cluster_health",
            OperationKind::ClusterState => "cluster_state",
            OperationKind::ClusterStats => "cluster_stats",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operation is addressed to.
///
/// An empty `indices` list means "all indices".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub indices: Vec<String>,
    pub node_ids: Vec<String>,
    pub doc_type: Option<String>,
    pub id: Option<String>,
}

impl Target {
    pub fn indices<S: AsRef<str>>(indices: &[S]) -> Self {
        Self {
            indices: indices.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn nodes<S: AsRef<str>>(node_ids: &[S]) -> Self {
        Self {
            node_ids: node_ids.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn document(index: &str, doc_type: &str, id: Option<&str>) -> Self {
        Self {
            indices: vec![index.to_string()],
            node_ids: Vec::new(),
            doc_type: Some(doc_type.to_string()),
            id: id.map(str::to_string),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indices.is_empty() {
            f.write_str("all indices")?;
        } else {
            write!(f, "indices [{}]", self.indices.join(","))?;
        }
        if let Some(doc_type) = &self.doc_type {
            write!(f, ", type [{}]", doc_type)?;
        }
        if let Some(id) = &self.id {
            write!(f, ", id [{}]", id)?;
        }
        if !self.node_ids.is_empty() {
            write!(f, ", nodes [{}]", self.node_ids.join(","))?;
        }
        Ok(())
    }
}

/// Body of a search or count request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchBody {
    pub types: Vec<String>,
    pub query: Option<Query>,
    pub post_filter: Option<Query>,
    pub size: Option<usize>,
    pub from: Option<usize>,
    pub sorts: Vec<Sort>,
    pub aggregations: Vec<Aggregation>,
    /// `None` keeps the engine default, `Some(false)` disables `_source`.
    pub fetch_source: Option<bool>,
    pub source_includes: Vec<String>,
    pub routing: Option<String>,
    pub track_scores: bool,
    /// Keep-alive of the scroll cursor opened by this search.
    pub scroll: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollBody {
    pub scroll_id: String,
    pub keep_alive: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetBody {
    pub routing: Option<String>,
    pub fetch_source: Option<bool>,
    pub realtime: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiGetItem {
    pub index: String,
    pub doc_type: Option<String>,
    pub id: String,
    pub routing: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBody {
    pub source: Value,
    pub routing: Option<String>,
    pub refresh: bool,
    /// Fail if a document with the same id already exists.
    pub create_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteBody {
    pub routing: Option<String>,
    pub refresh: bool,
}

/// One sub-action of a bulk submission.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    Index {
        index: String,
        doc_type: String,
        id: Option<String>,
        routing: Option<String>,
        source: Value,
    },
    Update {
        index: String,
        doc_type: String,
        id: String,
        routing: Option<String>,
        doc: Value,
        upsert: bool,
    },
    Delete {
        index: String,
        doc_type: String,
        id: String,
        routing: Option<String>,
    },
}

impl BulkAction {
    pub fn name(&self) -> &'static str {
        match self {
            BulkAction::Index { .. } => "index",
            BulkAction::Update { .. } => "update",
            BulkAction::Delete { .. } => "delete",
        }
    }

    pub fn index(&self) -> &str {
        match self {
            BulkAction::Index { index, .. }
            | BulkAction::Update { index, .. }
            | BulkAction::Delete { index, .. } => index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkBody {
    pub actions: Vec<BulkAction>,
    pub refresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushOptions {
    pub force: bool,
    pub wait_if_ongoing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForceMergeOptions {
    pub max_num_segments: Option<u32>,
    pub only_expunge_deletes: bool,
    pub flush: bool,
}

impl Default for ForceMergeOptions {
    fn default() -> Self {
        Self {
            max_num_segments: Some(1),
            only_expunge_deletes: false,
            flush: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearCacheOptions {
    pub query: bool,
    pub fielddata: bool,
    pub request: bool,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIndexBody {
    pub settings: Option<Value>,
    /// Mapping definitions keyed by document type, in insertion order.
    pub mappings: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingBody {
    pub doc_type: String,
    pub source: Value,
}

/// Priority of queued cluster events a health request waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Immediate,
    Urgent,
    High,
    Normal,
    Low,
    Languid,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Languid => "languid",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthOptions {
    pub wait_for_status: Option<ClusterHealthStatus>,
    pub wait_for_events: Option<Priority>,
    pub wait_for_nodes: Option<String>,
    pub wait_for_no_relocating_shards: bool,
    /// Server-side wait budget.
    pub timeout: Option<Duration>,
}

/// Which sections of a stats or state response to return. Empty = all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSelection {
    pub metrics: Vec<String>,
}

/// Kind-specific body of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Search(SearchBody),
    Scroll(ScrollBody),
    Get(GetBody),
    MultiGet(Vec<MultiGetItem>),
    Document(DocumentBody),
    Delete(DeleteBody),
    Bulk(BulkBody),
    Flush(FlushOptions),
    ForceMerge(ForceMergeOptions),
    ClearCache(ClearCacheOptions),
    CreateIndex(CreateIndexBody),
    Mapping(MappingBody),
    Health(HealthOptions),
    Metrics(MetricsSelection),
}

impl Payload {
    /// Distinct indices named by the items of a multi-document payload, in
    /// first-seen order. Empty for every other payload.
    pub fn item_indices(&self) -> Vec<String> {
        let names: Vec<&str> = match self {
            Payload::Bulk(bulk) => bulk.actions.iter().map(BulkAction::index).collect(),
            Payload::MultiGet(items) => items.iter().map(|item| item.index.as_str()).collect(),
            _ => Vec::new(),
        };
        let mut indices: Vec<String> = Vec::new();
        for name in names {
            if !indices.iter().any(|seen| seen == name) {
                indices.push(name.to_string());
            }
        }
        indices
    }
}

/// One request to the cluster.
///
/// Created by a request builder at terminal-call time and never modified
/// afterwards; all fields are read through accessors.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    kind: OperationKind,
    target: Target,
    payload: Payload,
    issued_at: Instant,
}

impl OperationDescriptor {
    pub fn new(kind: OperationKind, target: Target, payload: Payload) -> Self {
        Self {
            kind,
            target,
            payload,
            issued_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Human-readable context attached to logs and errors.
    pub fn describe(&self) -> String {
        match &self.payload {
            Payload::Scroll(scroll) => {
                format!("{} request with scroll id [{}]", self.kind, scroll.scroll_id)
            }
            Payload::Bulk(bulk) => format!(
                "{} request with {} actions on indices [{}]",
                self.kind,
                bulk.actions.len(),
                self.payload.item_indices().join(",")
            ),
            Payload::MultiGet(items) => format!(
                "{} request on {} documents in indices [{}]",
                self.kind,
                items.len(),
                self.payload.item_indices().join(",")
            ),
            _ => format!("{} request on {}", self.kind, self.target),
        }
    }
}
