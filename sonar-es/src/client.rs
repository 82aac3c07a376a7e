//! Client facade: the single entry point to the cluster
//!
//! [`EsClient`] hands out one builder per operation kind and owns the
//! transport together with its start/stop lifecycle. Clones share the same
//! transport and lifecycle, so one facade serves any number of concurrent
//! tasks.

use crate::config::EsClientConfig;
use crate::descriptor::{OperationDescriptor, OperationKind, Priority, Target};
use crate::error::{EsError, Result};
use crate::interceptor::{Interceptor, LOG_TARGET};
use crate::lifecycle::Lifecycle;
use crate::query::{Aggregation, Query};
use crate::request::ops::{self, ScrollOptions};
use crate::request::{
    index_names, BulkRequestBuilder, ClearCacheRequestBuilder, ClusterHealthRequestBuilder,
    ClusterStateRequestBuilder, ClusterStatsRequestBuilder, CountRequestBuilder,
    CreateIndexRequestBuilder, DeleteRequestBuilder, FlushRequestBuilder, ForceMergeRequestBuilder,
    GetRequestBuilder, IndexRequestBuilder, IndicesExistsRequestBuilder,
    IndicesStatsRequestBuilder, MultiGetRequestBuilder, NodesStatsRequestBuilder,
    Operation, OperationBuilder, PutMappingRequestBuilder, RefreshRequestBuilder, RequestBuilder,
    SearchRequestBuilder, SearchScrollRequestBuilder,
};
use crate::response::{ClusterHealthResponse, ClusterHealthStatus};
use crate::transport::{HttpTransport, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the aggregation used by [`EsClient::get_max_field_value`].
const MAX_VALUE_AGGREGATION: &str = "latest";

/// State shared by the facade and every builder it created.
pub(crate) struct ClientInner {
    interceptor: Interceptor,
    transport: Arc<dyn Transport>,
    lifecycle: Lifecycle,
    stop_grace: Duration,
    max_result_window: usize,
}

impl ClientInner {
    pub(crate) fn max_result_window(&self) -> usize {
        self.max_result_window
    }

    /// Run `descriptor` through the interceptor unless the facade is closing.
    pub(crate) async fn dispatch<R: DeserializeOwned>(&self, descriptor: &OperationDescriptor) -> Result<R> {
        let _in_flight = self.lifecycle.enter(descriptor.kind())?;
        self.interceptor.execute(descriptor).await
    }
}

/// Instrumented facade over an Elasticsearch cluster.
#[derive(Clone)]
pub struct EsClient {
    inner: Arc<ClientInner>,
}

impl EsClient {
    /// Wrap an already connected transport with default settings.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, &EsClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: &EsClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                interceptor: Interceptor::new(transport.clone(), config.slow_request_threshold()),
                transport,
                lifecycle: Lifecycle::default(),
                stop_grace: config.stop_grace_period(),
                max_result_window: config.max_result_window,
            }),
        }
    }

    /// Connect to the configured hosts over HTTP.
    pub fn connect(config: &EsClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_config(Arc::new(transport), config))
    }

    /// The transport shared by every operation.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn slow_request_threshold(&self) -> Duration {
        self.inner.interceptor.slow_threshold()
    }

    /// Whether [`EsClient::stop`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lifecycle.is_closing()
    }

    /// Operations currently between the facade and the transport.
    pub fn in_flight(&self) -> usize {
        self.inner.lifecycle.in_flight()
    }

    /// The transport is connected at construction, so this only checks that
    /// the facade was not stopped.
    pub fn start(&self) -> Result<()> {
        self.open(None)?;
        debug!(target: LOG_TARGET, transport = self.inner.transport.name(), "ES client started");
        Ok(())
    }

    /// Stop accepting operations, wait for in-flight ones up to the grace
    /// period, then close the transport.
    ///
    /// Only the first call does anything; later calls return immediately.
    pub async fn stop(&self) -> Result<()> {
        let lifecycle = &self.inner.lifecycle;
        if !lifecycle.signal_close() {
            debug!(target: LOG_TARGET, "ES client already stopped");
            return Ok(());
        }

        info!(
            target: LOG_TARGET,
            in_flight = lifecycle.in_flight(),
            "Stopping ES client"
        );
        if tokio::time::timeout(self.inner.stop_grace, lifecycle.drain())
            .await
            .is_err()
        {
            warn!(
                target: LOG_TARGET,
                in_flight = lifecycle.in_flight(),
                grace_ms = self.inner.stop_grace.as_millis() as u64,
                "Closing ES transport with operations still in flight"
            );
        }

        self.inner
            .transport
            .close()
            .await
            .map_err(|e| EsError::from_transport("Fail to close ES transport", e))?;
        info!(target: LOG_TARGET, "ES client stopped");
        Ok(())
    }

    fn open(&self, kind: Option<OperationKind>) -> Result<()> {
        match kind {
            Some(kind) => self.inner.lifecycle.ensure_open(kind),
            None if self.is_closed() => Err(EsError::illegal_state(crate::lifecycle::CLOSED_MESSAGE)),
            None => Ok(()),
        }
    }

    fn indices_target<S: AsRef<str>>(&self, kind: OperationKind, indices: &[S]) -> Result<Target> {
        self.open(Some(kind))?;
        Ok(Target {
            indices: index_names(kind, indices)?,
            ..Default::default()
        })
    }

    fn prepare_operation<O: Operation, S: AsRef<str>>(&self, indices: &[S]) -> Result<OperationBuilder<O>> {
        let target = self.indices_target(O::KIND, indices)?;
        Ok(OperationBuilder::new(self.inner.clone(), target))
    }

    pub fn prepare_refresh<S: AsRef<str>>(&self, indices: &[S]) -> Result<RefreshRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_flush<S: AsRef<str>>(&self, indices: &[S]) -> Result<FlushRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_stats<S: AsRef<str>>(&self, indices: &[S]) -> Result<IndicesStatsRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_nodes_stats<S: AsRef<str>>(&self, node_ids: &[S]) -> Result<NodesStatsRequestBuilder> {
        let kind = OperationKind::NodesStats;
        self.open(Some(kind))?;
        if node_ids.iter().any(|id| id.as_ref().trim().is_empty()) {
            return Err(EsError::illegal_state(format!(
                "Invalid {} request: node id must not be blank",
                kind
            )));
        }
        Ok(OperationBuilder::new(self.inner.clone(), Target::nodes(node_ids)))
    }

    pub fn prepare_cluster_stats(&self) -> Result<ClusterStatsRequestBuilder> {
        self.prepare_operation::<ops::ClusterStats, &str>(&[])
    }

    pub fn prepare_state(&self) -> Result<ClusterStateRequestBuilder> {
        self.prepare_operation::<ops::ClusterState, &str>(&[])
    }

    pub fn prepare_health<S: AsRef<str>>(&self, indices: &[S]) -> Result<ClusterHealthRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_indices_exist<S: AsRef<str>>(&self, indices: &[S]) -> Result<IndicesExistsRequestBuilder> {
        let kind = OperationKind::IndicesExist;
        let target = self.indices_target(kind, indices)?;
        if target.indices.is_empty() {
            return Err(EsError::illegal_state(format!(
                "Invalid {} request: at least one index is required",
                kind
            )));
        }
        Ok(OperationBuilder::new(self.inner.clone(), target))
    }

    pub fn prepare_create(&self, index: &str) -> Result<CreateIndexRequestBuilder> {
        self.prepare_operation(&[index])
    }

    pub fn prepare_put_mapping<S: AsRef<str>>(&self, indices: &[S]) -> Result<PutMappingRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_search<S: AsRef<str>>(&self, indices: &[S]) -> Result<SearchRequestBuilder> {
        let target = self.indices_target(OperationKind::Search, indices)?;
        Ok(SearchRequestBuilder::new(self.inner.clone(), target.indices))
    }

    /// Fetch the next page of a scroll opened by a search.
    pub fn prepare_search_scroll(&self, scroll_id: &str) -> Result<SearchScrollRequestBuilder> {
        self.open(Some(OperationKind::SearchScroll))?;
        let options = ScrollOptions {
            scroll_id: scroll_id.to_string(),
            ..Default::default()
        };
        Ok(OperationBuilder::with_options(
            self.inner.clone(),
            Target::default(),
            options,
        ))
    }

    pub fn prepare_get(&self) -> Result<GetRequestBuilder> {
        self.open(Some(OperationKind::Get))?;
        Ok(GetRequestBuilder::new(self.inner.clone()))
    }

    pub fn prepare_get_doc(&self, index: &str, doc_type: &str, id: &str) -> Result<GetRequestBuilder> {
        let mut builder = self.prepare_get()?;
        builder.set_index(index)?.set_type(doc_type)?.set_id(id)?;
        Ok(builder)
    }

    pub fn prepare_multi_get(&self) -> Result<MultiGetRequestBuilder> {
        self.prepare_operation::<ops::MultiGet, &str>(&[])
    }

    /// Count matching documents. Prefer a search with size 0.
    pub fn prepare_count<S: AsRef<str>>(&self, indices: &[S]) -> Result<CountRequestBuilder> {
        self.prepare_operation(indices)
    }

    pub fn prepare_bulk(&self) -> Result<BulkRequestBuilder> {
        self.open(Some(OperationKind::Bulk))?;
        Ok(BulkRequestBuilder::new(self.inner.clone()))
    }

    pub fn prepare_delete(&self, index: &str, doc_type: &str, id: &str) -> Result<DeleteRequestBuilder> {
        let kind = OperationKind::Delete;
        self.open(Some(kind))?;
        check_document_address(kind, index, doc_type, Some(id))?;
        Ok(DeleteRequestBuilder::new(
            self.inner.clone(),
            Target::document(index, doc_type, Some(id)),
        ))
    }

    pub fn prepare_index(&self, index: &str, doc_type: &str) -> Result<IndexRequestBuilder> {
        let kind = OperationKind::Index;
        self.open(Some(kind))?;
        check_document_address(kind, index, doc_type, None)?;
        Ok(IndexRequestBuilder::new(
            self.inner.clone(),
            index.to_string(),
            doc_type.to_string(),
        ))
    }

    /// Force merge down to a single segment unless told otherwise.
    pub fn prepare_force_merge(&self, index: &str) -> Result<ForceMergeRequestBuilder> {
        self.prepare_operation(&[index])
    }

    pub fn prepare_clear_cache<S: AsRef<str>>(&self, indices: &[S]) -> Result<ClearCacheRequestBuilder> {
        self.prepare_operation(indices)
    }

    /// Block until the cluster reaches at least `status` or the server-side
    /// wait expires.
    ///
    /// Pending cluster events of every priority are processed first. A
    /// response flagged `timed_out` is logged and returned as is.
    pub async fn wait_for_status(&self, status: ClusterHealthStatus) -> Result<ClusterHealthResponse> {
        let mut request = self.prepare_health::<&str>(&[])?;
        request
            .set_wait_for_events(Priority::Languid)?
            .set_wait_for_status(status)?;
        let response = request.execute().await?;

        if response.timed_out {
            warn!(
                target: LOG_TARGET,
                expected = %status,
                actual = %response.status,
                "Timed out waiting for cluster status {}, current status is {}",
                status,
                response.status
            );
        }
        Ok(response)
    }

    /// Highest value of a numeric `field` over all documents of `doc_type`.
    pub async fn get_max_field_value(&self, index: &str, doc_type: &str, field: &str) -> Result<i64> {
        let mut request = self.prepare_search(&[index])?;
        request
            .set_types(&[doc_type])?
            .set_query(Query::match_all())?
            .set_size(0)?
            .add_aggregation(Aggregation::max(MAX_VALUE_AGGREGATION, field))?;
        let response = request.execute().await?;

        response
            .aggregation_value(MAX_VALUE_AGGREGATION)
            .map(|value| value as i64)
            .ok_or_else(|| {
                EsError::remote(format!(
                    "Fail to get max value of field [{}] on indices [{}], type [{}]: aggregation not present",
                    field, index, doc_type
                ))
            })
    }
}

fn check_document_address(kind: OperationKind, index: &str, doc_type: &str, id: Option<&str>) -> Result<()> {
    let blank = [("index", Some(index)), ("type", Some(doc_type)), ("id", id)]
        .into_iter()
        .find_map(|(what, value)| match value {
            Some(v) if v.trim().is_empty() => Some(what),
            _ => None,
        });
    match blank {
        Some(what) => Err(EsError::illegal_state(format!(
            "Invalid {} request: {} must not be blank",
            kind, what
        ))),
        None => Ok(()),
    }
}
