//! Test doubles for code that depends on the facade
//!
//! [`FakeTransport`] answers every operation kind with a plausible engine
//! response unless told otherwise, records every call, and counts closes.
//! [`LogCapture`] collects `tracing` events so tests can assert on what the
//! interceptor logged.

use crate::descriptor::{BulkAction, OperationDescriptor, OperationKind, Payload};
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Clone)]
struct Reply {
    delay: Duration,
    result: Result<Value, TransportError>,
}

/// Scriptable in-memory transport.
#[derive(Default)]
pub struct FakeTransport {
    latency: Duration,
    queued: Mutex<HashMap<OperationKind, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<OperationKind, Reply>>,
    calls: Mutex<Vec<OperationDescriptor>>,
    close_count: AtomicUsize,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Always answer `kind` with `body`.
    pub fn respond(&self, kind: OperationKind, body: Value) {
        self.sticky.lock().insert(
            kind,
            Reply {
                delay: Duration::ZERO,
                result: Ok(body),
            },
        );
    }

    /// Always answer `kind` with `body`, after `delay`.
    pub fn respond_after(&self, kind: OperationKind, delay: Duration, body: Value) {
        self.sticky.lock().insert(
            kind,
            Reply {
                delay,
                result: Ok(body),
            },
        );
    }

    /// Always fail `kind` with `error`.
    pub fn fail(&self, kind: OperationKind, error: TransportError) {
        self.sticky.lock().insert(
            kind,
            Reply {
                delay: Duration::ZERO,
                result: Err(error),
            },
        );
    }

    /// Answer the next call of `kind` with `result`; queued replies win over
    /// sticky ones.
    pub fn enqueue(&self, kind: OperationKind, result: Result<Value, TransportError>) {
        self.queued.lock().entry(kind).or_default().push_back(Reply {
            delay: Duration::ZERO,
            result,
        });
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, kind: OperationKind) -> usize {
        self.calls.lock().iter().filter(|d| d.kind() == kind).count()
    }

    pub fn calls(&self) -> Vec<OperationDescriptor> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<OperationDescriptor> {
        self.calls.lock().last().cloned()
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn next_reply(&self, descriptor: &OperationDescriptor) -> Reply {
        let kind = descriptor.kind();
        if let Some(reply) = self.queued.lock().get_mut(&kind).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(reply) = self.sticky.lock().get(&kind) {
            return reply.clone();
        }
        Reply {
            delay: Duration::ZERO,
            result: Ok(default_response(descriptor)),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, descriptor: &OperationDescriptor) -> Result<Value, TransportError> {
        self.calls.lock().push(descriptor.clone());
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let reply = self.next_reply(descriptor);
        let wait = self.latency + reply.delay;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        reply.result
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

fn shards() -> Value {
    json!({"total": 1, "successful": 1, "failed": 0})
}

/// A successful engine response for `descriptor`.
pub fn default_response(descriptor: &OperationDescriptor) -> Value {
    let target = descriptor.target();
    let index = target.indices.first().cloned().unwrap_or_default();
    let doc_type = target.doc_type.clone();
    let id = target.id.clone();

    match descriptor.kind() {
        OperationKind::Search | OperationKind::SearchScroll => json!({
            "took": 1,
            "timed_out": false,
            "_shards": shards(),
            "hits": {"total": 0, "max_score": null, "hits": []}
        }),
        OperationKind::Count => json!({"count": 0, "_shards": shards()}),
        OperationKind::Get => json!({
            "_index": index, "_type": doc_type, "_id": id.unwrap_or_default(), "found": false
        }),
        OperationKind::MultiGet => {
            let docs: Vec<Value> = match descriptor.payload() {
                Payload::MultiGet(items) => items
                    .iter()
                    .map(|item| json!({
                        "_index": item.index, "_type": item.doc_type, "_id": item.id, "found": false
                    }))
                    .collect(),
                _ => Vec::new(),
            };
            json!({ "docs": docs })
        }
        OperationKind::Index => json!({
            "_index": index,
            "_type": doc_type,
            "_id": id.unwrap_or_else(|| "generated".to_string()),
            "_version": 1,
            "result": "created",
            "created": true
        }),
        OperationKind::Delete => json!({
            "_index": index, "_type": doc_type, "_id": id.unwrap_or_default(),
            "found": true, "result": "deleted"
        }),
        OperationKind::Bulk => {
            let items: Vec<Value> = match descriptor.payload() {
                Payload::Bulk(bulk) => bulk.actions.iter().map(bulk_item_success).collect(),
                _ => Vec::new(),
            };
            json!({"took": 1, "errors": false, "items": items})
        }
        OperationKind::Refresh
        | OperationKind::Flush
        | OperationKind::ForceMerge
        | OperationKind::ClearCache => json!({"_shards": shards()}),
        OperationKind::CreateIndex => json!({
            "acknowledged": true, "shards_acknowledged": true, "index": index
        }),
        OperationKind::PutMapping => json!({"acknowledged": true}),
        OperationKind::IndicesExist => json!({"exists": true}),
        OperationKind::IndicesStats => json!({"_shards": shards(), "_all": {}, "indices": {}}),
        OperationKind::NodesStats => json!({"cluster_name": "fake", "nodes": {}}),
        OperationKind::ClusterHealth => json!({
            "cluster_name": "fake",
            "status": "green",
            "timed_out": false,
            "number_of_nodes": 1,
            "number_of_data_nodes": 1,
            "active_primary_shards": 1,
            "active_shards": 1
        }),
        OperationKind::ClusterState => json!({"cluster_name": "fake", "master_node": "node-1"}),
        OperationKind::ClusterStats => json!({
            "cluster_name": "fake", "status": "green", "indices": {}, "nodes": {}
        }),
    }
}

fn bulk_item_success(action: &BulkAction) -> Value {
    let (index, doc_type, id, status) = match action {
        BulkAction::Index { index, doc_type, id, .. } => (index, doc_type, id.clone(), 201),
        BulkAction::Update { index, doc_type, id, .. } => (index, doc_type, Some(id.clone()), 200),
        BulkAction::Delete { index, doc_type, id, .. } => (index, doc_type, Some(id.clone()), 200),
    };
    json!({ action.name(): {"_index": index, "_type": doc_type, "_id": id, "status": status} })
}

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Collects `tracing` events emitted while installed.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer {
            capture: self.clone(),
        }
    }

    /// Install as the default subscriber for the current thread.
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.layer());
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn at(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Layer feeding a [`LogCapture`]
pub struct CaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.capture.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Target;

    #[tokio::test]
    async fn test_queued_reply_wins_over_sticky() {
        let fake = FakeTransport::new();
        fake.respond(OperationKind::Count, json!({"count": 1}));
        fake.enqueue(OperationKind::Count, Ok(json!({"count": 2})));
        let descriptor = OperationDescriptor::new(OperationKind::Count, Target::default(), Payload::None);

        assert_eq!(fake.send(&descriptor).await.unwrap(), json!({"count": 2}));
        assert_eq!(fake.send(&descriptor).await.unwrap(), json!({"count": 1}));
        assert_eq!(fake.calls_for(OperationKind::Count), 2);
    }

    #[tokio::test]
    async fn test_closed_fake_refuses() {
        let fake = FakeTransport::new();
        fake.close().await.unwrap();
        let descriptor = OperationDescriptor::new(OperationKind::Refresh, Target::default(), Payload::None);

        assert_eq!(fake.send(&descriptor).await, Err(TransportError::Closed));
        assert_eq!(fake.close_count(), 1);
    }

    #[test]
    fn test_capture_collects_fields() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();

        tracing::warn!(target: "es", kind = "search", duration_ms = 12u64, "slow");

        let events = capture.at(Level::WARN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "slow");
        assert_eq!(events[0].fields["kind"], "search");
        assert_eq!(events[0].fields["duration_ms"], "12");
    }
}
