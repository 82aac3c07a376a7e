use super::ops::{self, MappingOptions};
use super::{ensure_keep_alive, BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{MultiGetItem, OperationKind, Priority, Target};
use crate::error::{EsError, Result};
use crate::query::Query;
use crate::response::ClusterHealthStatus;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Static description of one operation kind served by [`OperationBuilder`].
pub trait Operation: Send + Sync + 'static {
    const KIND: OperationKind;

    /// Options accumulated by the builder's setters.
    type Options: Default + Send;

    type Response: DeserializeOwned + Send;

    /// Checks run at terminal-call time.
    fn validate(_target: &Target, _options: &Self::Options) -> std::result::Result<(), String> {
        Ok(())
    }

    fn into_payload(options: Self::Options) -> crate::descriptor::Payload;
}

/// Builder shared by every kind without a dedicated configuration surface.
pub struct OperationBuilder<O: Operation> {
    core: BuilderCore,
    target: Target,
    options: O::Options,
}

pub type SearchScrollRequestBuilder = OperationBuilder<ops::SearchScroll>;
pub type CountRequestBuilder = OperationBuilder<ops::Count>;
pub type MultiGetRequestBuilder = OperationBuilder<ops::MultiGet>;
pub type RefreshRequestBuilder = OperationBuilder<ops::Refresh>;
pub type FlushRequestBuilder = OperationBuilder<ops::Flush>;
pub type ForceMergeRequestBuilder = OperationBuilder<ops::ForceMerge>;
pub type ClearCacheRequestBuilder = OperationBuilder<ops::ClearCache>;
pub type CreateIndexRequestBuilder = OperationBuilder<ops::CreateIndex>;
pub type PutMappingRequestBuilder = OperationBuilder<ops::PutMapping>;
pub type IndicesExistsRequestBuilder = OperationBuilder<ops::IndicesExist>;
pub type IndicesStatsRequestBuilder = OperationBuilder<ops::IndicesStats>;
pub type NodesStatsRequestBuilder = OperationBuilder<ops::NodesStats>;
pub type ClusterHealthRequestBuilder = OperationBuilder<ops::ClusterHealth>;
pub type ClusterStateRequestBuilder = OperationBuilder<ops::ClusterState>;
pub type ClusterStatsRequestBuilder = OperationBuilder<ops::ClusterStats>;

impl<O: Operation> OperationBuilder<O> {
    pub(crate) fn new(client: Arc<ClientInner>, target: Target) -> Self {
        Self::with_options(client, target, O::Options::default())
    }

    pub(crate) fn with_options(client: Arc<ClientInner>, target: Target, options: O::Options) -> Self {
        Self {
            core: BuilderCore::new(client, O::KIND),
            target,
            options,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> &O::Options {
        &self.options
    }

    fn update(&mut self, apply: impl FnOnce(&mut O::Options)) -> Result<&mut Self> {
        self.core.configure()?;
        apply(&mut self.options);
        Ok(self)
    }

    /// Owned copies of `values`, failing the builder on a blank one.
    fn names<S: AsRef<str>>(&mut self, what: &str, values: &[S]) -> Result<Vec<String>> {
        self.core.configure()?;
        for value in values {
            self.core.ensure_name(what, value.as_ref())?;
        }
        Ok(values.iter().map(|v| v.as_ref().to_string()).collect())
    }
}

#[async_trait]
impl<O: Operation> RequestBuilder for OperationBuilder<O> {
    type Response = O::Response;

    fn kind(&self) -> OperationKind {
        O::KIND
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<O::Response> {
        self.core.usable()?;
        if let Err(reason) = O::validate(&self.target, &self.options) {
            return Err(self.core.reject(reason));
        }
        self.core.begin_execute()?;

        let payload = O::into_payload(std::mem::take(&mut self.options));
        let mut target = std::mem::take(&mut self.target);
        if target.indices.is_empty() {
            target.indices = payload.item_indices();
        }
        self.core.submit(target, payload).await
    }
}

impl OperationBuilder<ops::SearchScroll> {
    pub fn set_scroll(&mut self, keep_alive: Duration) -> Result<&mut Self> {
        self.core.configure()?;
        ensure_keep_alive(&mut self.core, keep_alive)?;
        self.options.keep_alive = keep_alive;
        Ok(self)
    }
}

impl OperationBuilder<ops::Count> {
    pub fn set_types<S: AsRef<str>>(&mut self, types: &[S]) -> Result<&mut Self> {
        self.core.configure()?;
        for doc_type in types {
            self.core.ensure_name("type", doc_type.as_ref())?;
        }
        self.options.types = types.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(self)
    }

    pub fn set_query(&mut self, query: impl Into<Query>) -> Result<&mut Self> {
        let query = query.into();
        self.update(|options| options.query = Some(query))
    }
}

impl OperationBuilder<ops::MultiGet> {
    pub fn add(&mut self, index: &str, doc_type: &str, id: &str) -> Result<&mut Self> {
        self.add_item(MultiGetItem {
            index: index.to_string(),
            doc_type: Some(doc_type.to_string()),
            id: id.to_string(),
            routing: None,
        })
    }

    pub fn add_item(&mut self, item: MultiGetItem) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("index", &item.index)?;
        self.core.ensure_name("id", &item.id)?;
        self.options.push(item);
        Ok(self)
    }
}

impl OperationBuilder<ops::Flush> {
    pub fn set_force(&mut self, force: bool) -> Result<&mut Self> {
        self.update(|options| options.force = force)
    }

    pub fn set_wait_if_ongoing(&mut self, wait: bool) -> Result<&mut Self> {
        self.update(|options| options.wait_if_ongoing = wait)
    }
}

impl OperationBuilder<ops::ForceMerge> {
    pub fn set_max_num_segments(&mut self, max: u32) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure(max > 0, "max_num_segments must be positive")?;
        self.options.max_num_segments = Some(max);
        Ok(self)
    }

    pub fn set_only_expunge_deletes(&mut self, only: bool) -> Result<&mut Self> {
        self.update(|options| options.only_expunge_deletes = only)
    }

    pub fn set_flush(&mut self, flush: bool) -> Result<&mut Self> {
        self.update(|options| options.flush = flush)
    }
}

impl OperationBuilder<ops::ClearCache> {
    pub fn set_query_cache(&mut self, clear: bool) -> Result<&mut Self> {
        self.update(|options| options.query = clear)
    }

    pub fn set_fielddata_cache(&mut self, clear: bool) -> Result<&mut Self> {
        self.update(|options| options.fielddata = clear)
    }

    pub fn set_request_cache(&mut self, clear: bool) -> Result<&mut Self> {
        self.update(|options| options.request = clear)
    }

    /// Restrict field data clearing to these fields.
    pub fn set_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<&mut Self> {
        self.options.fields = self.names("field", fields)?;
        Ok(self)
    }
}

impl OperationBuilder<ops::CreateIndex> {
    pub fn set_settings(&mut self, settings: Value) -> Result<&mut Self> {
        self.core.configure()?;
        self.core
            .ensure(settings.is_object(), "index settings must be a JSON object")?;
        self.options.settings = Some(settings);
        Ok(self)
    }

    pub fn add_mapping(&mut self, doc_type: &str, mapping: Value) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("type", doc_type)?;
        let duplicate = self.options.mappings.iter().any(|(t, _)| t == doc_type);
        self.core
            .ensure(!duplicate, format!("mapping for type [{}] is defined twice", doc_type))?;
        self.options.mappings.push((doc_type.to_string(), mapping));
        Ok(self)
    }
}

impl OperationBuilder<ops::PutMapping> {
    pub fn set_type(&mut self, doc_type: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("type", doc_type)?;
        self.options.doc_type = Some(doc_type.to_string());
        Ok(self)
    }

    pub fn set_source(&mut self, source: Value) -> Result<&mut Self> {
        self.core.configure()?;
        self.core
            .ensure(source.is_object(), "mapping source must be a JSON object")?;
        self.options.source = Some(source);
        Ok(self)
    }

    pub fn set_source_serialize<T: Serialize>(&mut self, mapping: &T) -> Result<&mut Self> {
        self.core.configure()?;
        let source = serde_json::to_value(mapping).map_err(|e| {
            let err = EsError::serialization("Fail to serialize mapping", e);
            self.core.fail(err)
        })?;
        self.set_source(source)
    }

    pub fn mapping(&self) -> &MappingOptions {
        &self.options
    }
}

impl OperationBuilder<ops::IndicesStats> {
    pub fn set_metrics<S: AsRef<str>>(&mut self, metrics: &[S]) -> Result<&mut Self> {
        self.options.metrics = self.names("metric", metrics)?;
        Ok(self)
    }
}

impl OperationBuilder<ops::NodesStats> {
    /// Restrict to sections like `jvm`, `os` or `fs`.
    pub fn set_metrics<S: AsRef<str>>(&mut self, metrics: &[S]) -> Result<&mut Self> {
        self.options.metrics = self.names("metric", metrics)?;
        Ok(self)
    }
}

impl OperationBuilder<ops::ClusterState> {
    pub fn set_metrics<S: AsRef<str>>(&mut self, metrics: &[S]) -> Result<&mut Self> {
        self.options.metrics = self.names("metric", metrics)?;
        Ok(self)
    }

    pub fn set_indices<S: AsRef<str>>(&mut self, indices: &[S]) -> Result<&mut Self> {
        self.target.indices = self.names("index", indices)?;
        Ok(self)
    }
}

impl OperationBuilder<ops::ClusterHealth> {
    pub fn set_wait_for_status(&mut self, status: ClusterHealthStatus) -> Result<&mut Self> {
        self.update(|options| options.wait_for_status = Some(status))
    }

    pub fn set_wait_for_yellow_status(&mut self) -> Result<&mut Self> {
        self.set_wait_for_status(ClusterHealthStatus::Yellow)
    }

    pub fn set_wait_for_green_status(&mut self) -> Result<&mut Self> {
        self.set_wait_for_status(ClusterHealthStatus::Green)
    }

    pub fn set_wait_for_events(&mut self, priority: Priority) -> Result<&mut Self> {
        self.update(|options| options.wait_for_events = Some(priority))
    }

    /// Node count expression such as `>=3`.
    pub fn set_wait_for_nodes(&mut self, nodes: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("wait_for_nodes", nodes)?;
        self.options.wait_for_nodes = Some(nodes.to_string());
        Ok(self)
    }

    pub fn set_wait_for_no_relocating_shards(&mut self, wait: bool) -> Result<&mut Self> {
        self.update(|options| options.wait_for_no_relocating_shards = wait)
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<&mut Self> {
        self.core.configure()?;
        self.core
            .ensure(!timeout.is_zero(), "health timeout must be positive")?;
        self.options.timeout = Some(timeout);
        Ok(self)
    }
}
