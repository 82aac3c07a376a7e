//! Elasticsearch REST transport over reqwest

use super::{Transport, TransportError};
use crate::config::EsClientConfig;
use crate::descriptor::{
    BulkAction, OperationDescriptor, OperationKind, Payload, SearchBody, Target,
};
use crate::error::{EsError, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Request body as it goes on the wire
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Body {
    Json(Value),
    NdJson(String),
}

/// Fully resolved HTTP call for one descriptor
#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Body>,
}

/// Transport speaking the Elasticsearch REST API.
///
/// Requests are spread round-robin over the configured hosts. Connection
/// pooling is left to reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    hosts: Vec<Url>,
    next_host: AtomicUsize,
    request_timeout: Duration,
    credentials: Option<(String, Option<String>)>,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Create a transport from the endpoint configuration
    pub fn new(config: &EsClientConfig) -> Result<Self> {
        if config.hosts.is_empty() {
            return Err(EsError::illegal_state("No Elasticsearch host configured"));
        }

        let hosts = config
            .hosts
            .iter()
            .map(|h| parse_host(h))
            .collect::<Result<Vec<_>>>()?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                EsError::illegal_state(format!("Failed to build HTTP client: {}", e))
            })?;

        info!(
            target: crate::interceptor::LOG_TARGET,
            hosts = %config.hosts.join(","),
            "Elasticsearch HTTP transport ready"
        );

        Ok(Self {
            client,
            hosts,
            next_host: AtomicUsize::new(0),
            request_timeout: config.request_timeout(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
            closed: AtomicBool::new(false),
        })
    }

    fn pick_host(&self) -> &Url {
        let i = self.next_host.fetch_add(1, Ordering::Relaxed);
        &self.hosts[i % self.hosts.len()]
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.request_timeout)
        } else if err.is_builder() {
            TransportError::Encode(err.to_string())
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, descriptor: &OperationDescriptor) -> std::result::Result<Value, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let request = build_request(self.pick_host(), descriptor)?;
        debug!(
            target: crate::interceptor::LOG_TARGET,
            method = %request.method,
            url = %request.url,
            "Sending ES request"
        );

        let is_head = request.method == Method::HEAD;
        let mut builder = self.client.request(request.method, request.url);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_ref());
        }
        builder = match request.body {
            Some(Body::Json(body)) => builder.json(&body),
            Some(Body::NdJson(lines)) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(lines),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if is_head {
            return match status {
                StatusCode::OK => Ok(json!({ "exists": true })),
                StatusCode::NOT_FOUND => Ok(json!({ "exists": false })),
                other => Err(TransportError::Rejected {
                    status: other.as_u16(),
                    error_type: "unknown".to_string(),
                    reason: format!("unexpected status for existence check: {}", other),
                }),
            };
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        interpret_response(descriptor.kind(), status, &bytes)
    }

    async fn close(&self) -> std::result::Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        info!(target: crate::interceptor::LOG_TARGET, "Elasticsearch HTTP transport closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn parse_host(host: &str) -> Result<Url> {
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| EsError::illegal_state(format!("Invalid Elasticsearch host '{}': {}", host, e)))?;
    if url.cannot_be_a_base() {
        return Err(EsError::illegal_state(format!(
            "Invalid Elasticsearch host '{}'",
            host
        )));
    }
    Ok(url)
}

/// Turn a status and raw body into the response value or a rejection.
pub(crate) fn interpret_response(
    kind: OperationKind,
    status: StatusCode,
    bytes: &[u8],
) -> std::result::Result<Value, TransportError> {
    let parsed: std::result::Result<Value, _> = if bytes.is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_slice(bytes)
    };

    if status.is_success() {
        return parsed.map_err(|e| TransportError::Decode(e.to_string()));
    }

    match parsed {
        Ok(body) if accepts_error_status(kind, status, &body) => Ok(body),
        Ok(body) => Err(TransportError::from_error_body(status.as_u16(), &body)),
        Err(_) => Err(TransportError::Rejected {
            status: status.as_u16(),
            error_type: "unknown".to_string(),
            reason: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

/// Non-2xx statuses that still carry a regular answer.
fn accepts_error_status(kind: OperationKind, status: StatusCode, body: &Value) -> bool {
    match (kind, status) {
        (OperationKind::Get, StatusCode::NOT_FOUND) => body.get("found").is_some(),
        (OperationKind::Delete, StatusCode::NOT_FOUND) => {
            body.get("found").is_some() || body.get("result").is_some()
        }
        (OperationKind::ClusterHealth, StatusCode::REQUEST_TIMEOUT) => body.get("status").is_some(),
        _ => false,
    }
}

fn unexpected_payload(descriptor: &OperationDescriptor) -> TransportError {
    TransportError::Encode(format!(
        "unexpected payload for {} request",
        descriptor.kind()
    ))
}

fn indices_segment(target: &Target) -> String {
    if target.indices.is_empty() {
        "_all".to_string()
    } else {
        target.indices.join(",")
    }
}

/// Index segment for endpoints where omitting it means "all indices".
fn optional_indices(target: &Target) -> Vec<String> {
    if target.indices.is_empty() {
        Vec::new()
    } else {
        vec![target.indices.join(",")]
    }
}

fn required<'a>(value: &'a Option<String>, what: &str) -> std::result::Result<&'a str, TransportError> {
    value
        .as_deref()
        .ok_or_else(|| TransportError::Encode(format!("missing document {}", what)))
}

fn millis(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

/// Map a descriptor to its REST call.
pub(crate) fn build_request(
    base: &Url,
    descriptor: &OperationDescriptor,
) -> std::result::Result<HttpRequest, TransportError> {
    let target = descriptor.target();
    let payload = descriptor.payload();
    let mut params: Vec<(&str, String)> = Vec::new();

    let (method, segments, body) = match (descriptor.kind(), payload) {
        (OperationKind::Search, Payload::Search(search)) => {
            let mut segments = vec![indices_segment(target)];
            if !search.types.is_empty() {
                segments.push(search.types.join(","));
            }
            segments.push("_search".to_string());
            if let Some(scroll) = search.scroll {
                params.push(("scroll", millis(scroll)));
            }
            if let Some(routing) = &search.routing {
                params.push(("routing", routing.clone()));
            }
            (Method::POST, segments, Some(Body::Json(search_body(search))))
        }
        (OperationKind::Count, Payload::Search(search)) => {
            let mut segments = vec![indices_segment(target)];
            if !search.types.is_empty() {
                segments.push(search.types.join(","));
            }
            segments.push("_count".to_string());
            let body = match &search.query {
                Some(query) => json!({ "query": query.to_json() }),
                None => json!({}),
            };
            (Method::POST, segments, Some(Body::Json(body)))
        }
        (OperationKind::SearchScroll, Payload::Scroll(scroll)) => (
            Method::POST,
            vec!["_search".to_string(), "scroll".to_string()],
            Some(Body::Json(json!({
                "scroll": millis(scroll.keep_alive),
                "scroll_id": scroll.scroll_id,
            }))),
        ),
        (OperationKind::Get, Payload::Get(get)) => {
            let index = target
                .indices
                .first()
                .ok_or_else(|| TransportError::Encode("missing document index".into()))?;
            let doc_type = target.doc_type.clone().unwrap_or_else(|| "_all".to_string());
            let id = required(&target.id, "id")?;
            if let Some(routing) = &get.routing {
                params.push(("routing", routing.clone()));
            }
            if let Some(fetch) = get.fetch_source {
                params.push(("_source", fetch.to_string()));
            }
            if let Some(realtime) = get.realtime {
                params.push(("realtime", realtime.to_string()));
            }
            (Method::GET, vec![index.clone(), doc_type, id.to_string()], None)
        }
        (OperationKind::MultiGet, Payload::MultiGet(items)) => {
            let docs: Vec<Value> = items
                .iter()
                .map(|item| {
                    let mut doc = Map::new();
                    doc.insert("_index".into(), json!(item.index));
                    if let Some(doc_type) = &item.doc_type {
                        doc.insert("_type".into(), json!(doc_type));
                    }
                    doc.insert("_id".into(), json!(item.id));
                    if let Some(routing) = &item.routing {
                        doc.insert("routing".into(), json!(routing));
                    }
                    Value::Object(doc)
                })
                .collect();
            (
                Method::POST,
                vec!["_mget".to_string()],
                Some(Body::Json(json!({ "docs": docs }))),
            )
        }
        (OperationKind::Index, Payload::Document(doc)) => {
            let index = target
                .indices
                .first()
                .ok_or_else(|| TransportError::Encode("missing document index".into()))?;
            let doc_type = required(&target.doc_type, "type")?;
            let mut segments = vec![index.clone(), doc_type.to_string()];
            let method = match &target.id {
                Some(id) => {
                    segments.push(id.clone());
                    Method::PUT
                }
                None => Method::POST,
            };
            if doc.refresh {
                params.push(("refresh", "true".to_string()));
            }
            if doc.create_only {
                params.push(("op_type", "create".to_string()));
            }
            if let Some(routing) = &doc.routing {
                params.push(("routing", routing.clone()));
            }
            (method, segments, Some(Body::Json(doc.source.clone())))
        }
        (OperationKind::Delete, Payload::Delete(delete)) => {
            let index = target
                .indices
                .first()
                .ok_or_else(|| TransportError::Encode("missing document index".into()))?;
            let doc_type = required(&target.doc_type, "type")?;
            let id = required(&target.id, "id")?;
            if delete.refresh {
                params.push(("refresh", "true".to_string()));
            }
            if let Some(routing) = &delete.routing {
                params.push(("routing", routing.clone()));
            }
            (
                Method::DELETE,
                vec![index.clone(), doc_type.to_string(), id.to_string()],
                None,
            )
        }
        (OperationKind::Bulk, Payload::Bulk(bulk)) => {
            if bulk.refresh {
                params.push(("refresh", "true".to_string()));
            }
            (
                Method::POST,
                vec!["_bulk".to_string()],
                Some(Body::NdJson(bulk_lines(&bulk.actions)?)),
            )
        }
        (OperationKind::Refresh, Payload::None) => {
            let mut segments = optional_indices(target);
            segments.push("_refresh".to_string());
            (Method::POST, segments, None)
        }
        (OperationKind::Flush, Payload::Flush(flush)) => {
            let mut segments = optional_indices(target);
            segments.push("_flush".to_string());
            if flush.force {
                params.push(("force", "true".to_string()));
            }
            if flush.wait_if_ongoing {
                params.push(("wait_if_ongoing", "true".to_string()));
            }
            (Method::POST, segments, None)
        }
        (OperationKind::ForceMerge, Payload::ForceMerge(merge)) => {
            let mut segments = optional_indices(target);
            segments.push("_forcemerge".to_string());
            if let Some(max) = merge.max_num_segments {
                params.push(("max_num_segments", max.to_string()));
            }
            if merge.only_expunge_deletes {
                params.push(("only_expunge_deletes", "true".to_string()));
            }
            params.push(("flush", merge.flush.to_string()));
            (Method::POST, segments, None)
        }
        (OperationKind::ClearCache, Payload::ClearCache(cache)) => {
            let mut segments = optional_indices(target);
            segments.push("_cache".to_string());
            segments.push("clear".to_string());
            for (name, enabled) in [
                ("query", cache.query),
                ("fielddata", cache.fielddata),
                ("request", cache.request),
            ] {
                if enabled {
                    params.push((name, "true".to_string()));
                }
            }
            if !cache.fields.is_empty() {
                params.push(("fields", cache.fields.join(",")));
            }
            (Method::POST, segments, None)
        }
        (OperationKind::CreateIndex, Payload::CreateIndex(create)) => {
            let index = target
                .indices
                .first()
                .ok_or_else(|| TransportError::Encode("missing index name".into()))?;
            let mut body = Map::new();
            if let Some(settings) = &create.settings {
                body.insert("settings".into(), settings.clone());
            }
            if !create.mappings.is_empty() {
                let mappings: Map<String, Value> = create.mappings.iter().cloned().collect();
                body.insert("mappings".into(), Value::Object(mappings));
            }
            (Method::PUT, vec![index.clone()], Some(Body::Json(Value::Object(body))))
        }
        (OperationKind::PutMapping, Payload::Mapping(mapping)) => (
            Method::PUT,
            vec![
                indices_segment(target),
                "_mapping".to_string(),
                mapping.doc_type.clone(),
            ],
            Some(Body::Json(mapping.source.clone())),
        ),
        (OperationKind::IndicesExist, Payload::None) => {
            (Method::HEAD, vec![target.indices.join(",")], None)
        }
        (OperationKind::IndicesStats, Payload::Metrics(selection)) => {
            let mut segments = optional_indices(target);
            segments.push("_stats".to_string());
            if !selection.metrics.is_empty() {
                segments.push(selection.metrics.join(","));
            }
            (Method::GET, segments, None)
        }
        (OperationKind::NodesStats, Payload::Metrics(selection)) => {
            let mut segments = vec!["_nodes".to_string()];
            if !target.node_ids.is_empty() {
                segments.push(target.node_ids.join(","));
            }
            segments.push("stats".to_string());
            if !selection.metrics.is_empty() {
                segments.push(selection.metrics.join(","));
            }
            (Method::GET, segments, None)
        }
        (OperationKind::ClusterHealth, Payload::Health(health)) => {
            let mut segments = vec!["_cluster".to_string(), "health".to_string()];
            segments.extend(optional_indices(target));
            if let Some(status) = health.wait_for_status {
                params.push(("wait_for_status", status.as_str().to_string()));
            }
            if let Some(priority) = health.wait_for_events {
                params.push(("wait_for_events", priority.as_str().to_string()));
            }
            if let Some(nodes) = &health.wait_for_nodes {
                params.push(("wait_for_nodes", nodes.clone()));
            }
            if health.wait_for_no_relocating_shards {
                params.push(("wait_for_no_relocating_shards", "true".to_string()));
            }
            if let Some(timeout) = health.timeout {
                params.push(("timeout", millis(timeout)));
            }
            (Method::GET, segments, None)
        }
        (OperationKind::ClusterState, Payload::Metrics(selection)) => {
            let mut segments = vec!["_cluster".to_string(), "state".to_string()];
            if !selection.metrics.is_empty() || !target.indices.is_empty() {
                segments.push(if selection.metrics.is_empty() {
                    "_all".to_string()
                } else {
                    selection.metrics.join(",")
                });
            }
            segments.extend(optional_indices(target));
            (Method::GET, segments, None)
        }
        (OperationKind::ClusterStats, Payload::None) => (
            Method::GET,
            vec!["_cluster".to_string(), "stats".to_string()],
            None,
        ),
        _ => return Err(unexpected_payload(descriptor)),
    };

    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| TransportError::Encode(format!("invalid base url {}", base)))?;
        path.pop_if_empty();
        path.extend(segments.iter().map(String::as_str));
    }
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in &params {
            query.append_pair(key, value);
        }
    }

    Ok(HttpRequest { method, url, body })
}

fn search_body(search: &SearchBody) -> Value {
    let mut body = Map::new();
    if let Some(query) = &search.query {
        body.insert("query".into(), query.to_json());
    }
    if let Some(filter) = &search.post_filter {
        body.insert("post_filter".into(), filter.to_json());
    }
    if let Some(size) = search.size {
        body.insert("size".into(), json!(size));
    }
    if let Some(from) = search.from {
        body.insert("from".into(), json!(from));
    }
    if !search.sorts.is_empty() {
        body.insert(
            "sort".into(),
            Value::Array(search.sorts.iter().map(|s| s.to_json()).collect()),
        );
    }
    if !search.aggregations.is_empty() {
        let aggs: Map<String, Value> = search
            .aggregations
            .iter()
            .map(|a| (a.name.clone(), a.to_json()))
            .collect();
        body.insert("aggs".into(), Value::Object(aggs));
    }
    if !search.source_includes.is_empty() {
        body.insert("_source".into(), json!(search.source_includes));
    } else if let Some(fetch) = search.fetch_source {
        body.insert("_source".into(), json!(fetch));
    }
    if search.track_scores {
        body.insert("track_scores".into(), json!(true));
    }
    Value::Object(body)
}

fn bulk_meta(index: &str, doc_type: &str, id: Option<&str>, routing: Option<&str>) -> Value {
    let mut meta = Map::new();
    meta.insert("_index".into(), json!(index));
    meta.insert("_type".into(), json!(doc_type));
    if let Some(id) = id {
        meta.insert("_id".into(), json!(id));
    }
    if let Some(routing) = routing {
        meta.insert("routing".into(), json!(routing));
    }
    Value::Object(meta)
}

/// Render bulk actions as NDJSON, one trailing newline per line.
pub(crate) fn bulk_lines(actions: &[BulkAction]) -> std::result::Result<String, TransportError> {
    let mut out = String::new();
    let mut push = |line: &Value| -> std::result::Result<(), TransportError> {
        let encoded = serde_json::to_string(line).map_err(|e| TransportError::Encode(e.to_string()))?;
        out.push_str(&encoded);
        out.push('\n');
        Ok(())
    };

    for action in actions {
        match action {
            BulkAction::Index { index, doc_type, id, routing, source } => {
                push(&json!({ "index": bulk_meta(index, doc_type, id.as_deref(), routing.as_deref()) }))?;
                push(source)?;
            }
            BulkAction::Update { index, doc_type, id, routing, doc, upsert } => {
                push(&json!({ "update": bulk_meta(index, doc_type, Some(id), routing.as_deref()) }))?;
                push(&json!({ "doc": doc, "doc_as_upsert": upsert }))?;
            }
            BulkAction::Delete { index, doc_type, id, routing } => {
                push(&json!({ "delete": bulk_meta(index, doc_type, Some(id), routing.as_deref()) }))?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        BulkBody, ClearCacheOptions, CreateIndexBody, DocumentBody, ForceMergeOptions, GetBody,
        HealthOptions, MappingBody, MetricsSelection, Priority, ScrollBody,
    };
    use crate::query::{Aggregation, Query};
    use crate::response::ClusterHealthStatus;

    fn base() -> Url {
        Url::parse("http://localhost:9200").unwrap()
    }

    fn build(kind: OperationKind, target: Target, payload: Payload) -> HttpRequest {
        build_request(&base(), &OperationDescriptor::new(kind, target, payload)).unwrap()
    }

    #[test]
    fn test_search_with_types_and_scroll() {
        let search = SearchBody {
            types: vec!["issue".into()],
            query: Some(Query::match_all()),
            size: Some(0),
            aggregations: vec![Aggregation::max("latest", "updatedAt")],
            scroll: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let request = build(OperationKind::Search, Target::indices(&["issues"]), Payload::Search(search));

        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.url.as_str(),
            "http://localhost:9200/issues/issue/_search?scroll=60000ms"
        );
        assert_eq!(
            request.body,
            Some(Body::Json(json!({
                "query": {"match_all": {}},
                "size": 0,
                "aggs": {"latest": {"max": {"field": "updatedAt"}}}
            })))
        );
    }

    #[test]
    fn test_search_all_indices() {
        let request = build(OperationKind::Search, Target::default(), Payload::Search(SearchBody::default()));
        assert_eq!(request.url.path(), "/_all/_search");
    }

    #[test]
    fn test_base_path_is_kept() {
        let base = Url::parse("http://proxy:8080/es/").unwrap();
        let descriptor = OperationDescriptor::new(OperationKind::ClusterStats, Target::default(), Payload::None);
        let request = build_request(&base, &descriptor).unwrap();
        assert_eq!(request.url.as_str(), "http://proxy:8080/es/_cluster/stats");
    }

    #[test]
    fn test_scroll() {
        let request = build(
            OperationKind::SearchScroll,
            Target::default(),
            Payload::Scroll(ScrollBody {
                scroll_id: "abc".into(),
                keep_alive: Duration::from_secs(5),
            }),
        );
        assert_eq!(request.url.path(), "/_search/scroll");
        assert_eq!(
            request.body,
            Some(Body::Json(json!({"scroll": "5000ms", "scroll_id": "abc"})))
        );
    }

    #[test]
    fn test_get_escapes_id() {
        let request = build(
            OperationKind::Get,
            Target::document("components", "component", Some("my project:src/a b.rs")),
            Payload::Get(GetBody {
                fetch_source: Some(false),
                ..Default::default()
            }),
        );
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url.as_str(),
            "http://localhost:9200/components/component/my%20project:src%2Fa%20b.rs?_source=false"
        );
    }

    #[test]
    fn test_index_with_and_without_id() {
        let doc = DocumentBody {
            source: json!({"key": "R1"}),
            routing: None,
            refresh: true,
            create_only: false,
        };
        let with_id = build(
            OperationKind::Index,
            Target::document("rules", "rule", Some("R1")),
            Payload::Document(doc.clone()),
        );
        assert_eq!(with_id.method, Method::PUT);
        assert_eq!(with_id.url.as_str(), "http://localhost:9200/rules/rule/R1?refresh=true");

        let without_id = build(
            OperationKind::Index,
            Target::document("rules", "rule", None),
            Payload::Document(doc),
        );
        assert_eq!(without_id.method, Method::POST);
        assert_eq!(without_id.url.path(), "/rules/rule");
    }

    #[test]
    fn test_bulk_ndjson() {
        let actions = vec![
            BulkAction::Index {
                index: "issues".into(),
                doc_type: "issue".into(),
                id: Some("1".into()),
                routing: Some("P1".into()),
                source: json!({"key": "1"}),
            },
            BulkAction::Update {
                index: "issues".into(),
                doc_type: "issue".into(),
                id: "2".into(),
                routing: None,
                doc: json!({"status": "CLOSED"}),
                upsert: false,
            },
            BulkAction::Delete {
                index: "issues".into(),
                doc_type: "issue".into(),
                id: "3".into(),
                routing: None,
            },
        ];
        let request = build(
            OperationKind::Bulk,
            Target::default(),
            Payload::Bulk(BulkBody { actions, refresh: false }),
        );

        let Some(Body::NdJson(lines)) = request.body else {
            panic!("expected ndjson body");
        };
        let lines: Vec<Value> = lines
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            json!({"index": {"_index": "issues", "_type": "issue", "_id": "1", "routing": "P1"}})
        );
        assert_eq!(lines[1], json!({"key": "1"}));
        assert_eq!(lines[3], json!({"doc": {"status": "CLOSED"}, "doc_as_upsert": false}));
        assert_eq!(lines[4], json!({"delete": {"_index": "issues", "_type": "issue", "_id": "3"}}));
    }

    #[test]
    fn test_admin_paths() {
        let refresh = build(OperationKind::Refresh, Target::default(), Payload::None);
        assert_eq!(refresh.url.path(), "/_refresh");

        let merge = build(
            OperationKind::ForceMerge,
            Target::indices(&["issues"]),
            Payload::ForceMerge(ForceMergeOptions::default()),
        );
        assert_eq!(
            merge.url.as_str(),
            "http://localhost:9200/issues/_forcemerge?max_num_segments=1&flush=true"
        );

        let cache = build(
            OperationKind::ClearCache,
            Target::indices(&["a", "b"]),
            Payload::ClearCache(ClearCacheOptions {
                fielddata: true,
                ..Default::default()
            }),
        );
        assert_eq!(cache.url.as_str(), "http://localhost:9200/a,b/_cache/clear?fielddata=true");

        let exists = build(OperationKind::IndicesExist, Target::indices(&["rules"]), Payload::None);
        assert_eq!(exists.method, Method::HEAD);
        assert_eq!(exists.url.path(), "/rules");
    }

    #[test]
    fn test_create_index_and_mapping() {
        let create = build(
            OperationKind::CreateIndex,
            Target::indices(&["rules"]),
            Payload::CreateIndex(CreateIndexBody {
                settings: Some(json!({"number_of_shards": 1})),
                mappings: vec![("rule".into(), json!({"properties": {}}))],
            }),
        );
        assert_eq!(create.method, Method::PUT);
        assert_eq!(
            create.body,
            Some(Body::Json(json!({
                "settings": {"number_of_shards": 1},
                "mappings": {"rule": {"properties": {}}}
            })))
        );

        let mapping = build(
            OperationKind::PutMapping,
            Target::indices(&["rules"]),
            Payload::Mapping(MappingBody {
                doc_type: "rule".into(),
                source: json!({"properties": {"key": {"type": "keyword"}}}),
            }),
        );
        assert_eq!(mapping.url.path(), "/rules/_mapping/rule");
    }

    #[test]
    fn test_cluster_paths() {
        let health = build(
            OperationKind::ClusterHealth,
            Target::default(),
            Payload::Health(HealthOptions {
                wait_for_status: Some(ClusterHealthStatus::Yellow),
                wait_for_events: Some(Priority::Languid),
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            }),
        );
        assert_eq!(
            health.url.as_str(),
            "http://localhost:9200/_cluster/health?wait_for_status=yellow&wait_for_events=languid&timeout=30000ms"
        );

        let nodes = build(
            OperationKind::NodesStats,
            Target::nodes(&["n1"]),
            Payload::Metrics(MetricsSelection {
                metrics: vec!["jvm".into(), "os".into()],
            }),
        );
        assert_eq!(nodes.url.path(), "/_nodes/n1/stats/jvm,os");

        let state = build(
            OperationKind::ClusterState,
            Target::indices(&["issues"]),
            Payload::Metrics(MetricsSelection::default()),
        );
        assert_eq!(state.url.path(), "/_cluster/state/_all/issues");

        let stats = build(
            OperationKind::IndicesStats,
            Target::default(),
            Payload::Metrics(MetricsSelection::default()),
        );
        assert_eq!(stats.url.path(), "/_stats");
    }

    #[test]
    fn test_mismatched_payload_is_encode_error() {
        let descriptor = OperationDescriptor::new(OperationKind::Search, Target::default(), Payload::None);
        let err = build_request(&base(), &descriptor).unwrap_err();
        assert!(matches!(err, TransportError::Encode(_)));
    }

    #[test]
    fn test_interpret_not_found_get_is_answer() {
        let body = br#"{"_index":"rules","_type":"rule","_id":"x","found":false}"#;
        let value = interpret_response(OperationKind::Get, StatusCode::NOT_FOUND, body).unwrap();
        assert_eq!(value["found"], json!(false));
    }

    #[test]
    fn test_interpret_error_body() {
        let body = br#"{"error":{"type":"index_not_found_exception","reason":"no such index"},"status":404}"#;
        let err = interpret_response(OperationKind::Search, StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(matches!(err, TransportError::Rejected { status: 404, .. }));
    }

    #[test]
    fn test_interpret_non_json_error() {
        let err = interpret_response(OperationKind::Refresh, StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .unwrap_err();
        match err {
            TransportError::Rejected { status, reason, .. } => {
                assert_eq!(status, 502);
                assert!(reason.contains("bad gateway"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_interpret_garbage_success_is_decode_error() {
        let err = interpret_response(OperationKind::Refresh, StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_parse_host_adds_scheme() {
        assert_eq!(parse_host("es1:9200").unwrap().as_str(), "http://es1:9200/");
        assert!(parse_host("http://").is_err());
    }
}
