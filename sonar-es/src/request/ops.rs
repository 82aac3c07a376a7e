//! Marker types for the kinds served by [`super::OperationBuilder`]

use super::operation::Operation;
use crate::descriptor::{
    ClearCacheOptions, CreateIndexBody, FlushOptions, ForceMergeOptions, HealthOptions,
    MappingBody, MetricsSelection, MultiGetItem, OperationKind, Payload, ScrollBody, SearchBody,
    Target,
};
use crate::response::{
    AcknowledgedResponse, BroadcastResponse, ClusterHealthResponse, ClusterStateResponse,
    ClusterStatsResponse, CountResponse, IndicesExistsResponse, IndicesStatsResponse,
    MultiGetResponse, NodesStatsResponse, SearchResponse,
};
use serde_json::Value;
use std::time::Duration;

/// Keep-alive used by scroll requests that do not set one.
pub const DEFAULT_SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(60);

pub struct SearchScroll;
pub struct Count;
pub struct MultiGet;
pub struct Refresh;
pub struct Flush;
pub struct ForceMerge;
pub struct ClearCache;
pub struct CreateIndex;
pub struct PutMapping;
pub struct IndicesExist;
pub struct IndicesStats;
pub struct NodesStats;
pub struct ClusterHealth;
pub struct ClusterState;
pub struct ClusterStats;

#[derive(Debug, Clone)]
pub struct ScrollOptions {
    pub scroll_id: String,
    pub keep_alive: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            scroll_id: String::new(),
            keep_alive: DEFAULT_SCROLL_KEEP_ALIVE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingOptions {
    pub doc_type: Option<String>,
    pub source: Option<Value>,
}

impl Operation for SearchScroll {
    const KIND: OperationKind = OperationKind::SearchScroll;
    type Options = ScrollOptions;
    type Response = SearchResponse;

    fn validate(_: &Target, options: &ScrollOptions) -> Result<(), String> {
        if options.scroll_id.trim().is_empty() {
            return Err("scroll id is required".to_string());
        }
        Ok(())
    }

    fn into_payload(options: ScrollOptions) -> Payload {
        Payload::Scroll(ScrollBody {
            scroll_id: options.scroll_id,
            keep_alive: options.keep_alive,
        })
    }
}

impl Operation for Count {
    const KIND: OperationKind = OperationKind::Count;
    type Options = SearchBody;
    type Response = CountResponse;

    fn into_payload(options: SearchBody) -> Payload {
        Payload::Search(options)
    }
}

impl Operation for MultiGet {
    const KIND: OperationKind = OperationKind::MultiGet;
    type Options = Vec<MultiGetItem>;
    type Response = MultiGetResponse;

    fn validate(_: &Target, items: &Vec<MultiGetItem>) -> Result<(), String> {
        if items.is_empty() {
            return Err("no document to get".to_string());
        }
        Ok(())
    }

    fn into_payload(items: Vec<MultiGetItem>) -> Payload {
        Payload::MultiGet(items)
    }
}

impl Operation for Refresh {
    const KIND: OperationKind = OperationKind::Refresh;
    type Options = ();
    type Response = BroadcastResponse;

    fn into_payload(_: ()) -> Payload {
        Payload::None
    }
}

impl Operation for Flush {
    const KIND: OperationKind = OperationKind::Flush;
    type Options = FlushOptions;
    type Response = BroadcastResponse;

    fn into_payload(options: FlushOptions) -> Payload {
        Payload::Flush(options)
    }
}

impl Operation for ForceMerge {
    const KIND: OperationKind = OperationKind::ForceMerge;
    type Options = ForceMergeOptions;
    type Response = BroadcastResponse;

    fn into_payload(options: ForceMergeOptions) -> Payload {
        Payload::ForceMerge(options)
    }
}

impl Operation for ClearCache {
    const KIND: OperationKind = OperationKind::ClearCache;
    type Options = ClearCacheOptions;
    type Response = BroadcastResponse;

    fn into_payload(options: ClearCacheOptions) -> Payload {
        Payload::ClearCache(options)
    }
}

impl Operation for CreateIndex {
    const KIND: OperationKind = OperationKind::CreateIndex;
    type Options = CreateIndexBody;
    type Response = AcknowledgedResponse;

    fn into_payload(options: CreateIndexBody) -> Payload {
        Payload::CreateIndex(options)
    }
}

impl Operation for PutMapping {
    const KIND: OperationKind = OperationKind::PutMapping;
    type Options = MappingOptions;
    type Response = AcknowledgedResponse;

    fn validate(_: &Target, options: &MappingOptions) -> Result<(), String> {
        if options.doc_type.is_none() {
            return Err("mapping type is required".to_string());
        }
        if options.source.is_none() {
            return Err("mapping source is required".to_string());
        }
        Ok(())
    }

    fn into_payload(options: MappingOptions) -> Payload {
        Payload::Mapping(MappingBody {
            doc_type: options.doc_type.unwrap_or_default(),
            source: options.source.unwrap_or(Value::Null),
        })
    }
}

impl Operation for IndicesExist {
    const KIND: OperationKind = OperationKind::IndicesExist;
    type Options = ();
    type Response = IndicesExistsResponse;

    fn validate(target: &Target, _: &()) -> Result<(), String> {
        if target.indices.is_empty() {
            return Err("at least one index is required".to_string());
        }
        Ok(())
    }

    fn into_payload(_: ()) -> Payload {
        Payload::None
    }
}

impl Operation for IndicesStats {
    const KIND: OperationKind = OperationKind::IndicesStats;
    type Options = MetricsSelection;
    type Response = IndicesStatsResponse;

    fn into_payload(options: MetricsSelection) -> Payload {
        Payload::Metrics(options)
    }
}

impl Operation for NodesStats {
    const KIND: OperationKind = OperationKind::NodesStats;
    type Options = MetricsSelection;
    type Response = NodesStatsResponse;

    fn into_payload(options: MetricsSelection) -> Payload {
        Payload::Metrics(options)
    }
}

impl Operation for ClusterHealth {
    const KIND: OperationKind = OperationKind::ClusterHealth;
    type Options = HealthOptions;
    type Response = ClusterHealthResponse;

    fn into_payload(options: HealthOptions) -> Payload {
        Payload::Health(options)
    }
}

impl Operation for ClusterState {
    const KIND: OperationKind = OperationKind::ClusterState;
    type Options = MetricsSelection;
    type Response = ClusterStateResponse;

    fn into_payload(options: MetricsSelection) -> Payload {
        Payload::Metrics(options)
    }
}

impl Operation for ClusterStats {
    const KIND: OperationKind = OperationKind::ClusterStats;
    type Options = ();
    type Response = ClusterStatsResponse;

    fn into_payload(_: ()) -> Payload {
        Payload::None
    }
}
