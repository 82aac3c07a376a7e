//! Request builders
//!
//! Every builder is single use. Setters validate eagerly and return
//! `Result<&mut Self>` so calls chain with `?`; the terminal
//! [`RequestBuilder::execute`] materializes an [`OperationDescriptor`] and
//! hands it to the interceptor. A builder moves through
//! `Unconfigured -> Configuring -> Executed | Failed` and never leaves the last
//! two states.
//!
//! Search, Get, Index, Delete and Bulk have dedicated builders. Every other
//! kind goes through [`OperationBuilder`], parametrized by a marker type from
//! [`ops`].

mod bulk;
mod delete;
mod get;
mod index;
mod operation;
pub mod ops;
mod search;

pub use bulk::BulkRequestBuilder;
pub use delete::DeleteRequestBuilder;
pub use get::GetRequestBuilder;
pub use index::IndexRequestBuilder;
pub use operation::{
    ClearCacheRequestBuilder, ClusterHealthRequestBuilder, ClusterStateRequestBuilder,
    ClusterStatsRequestBuilder, CountRequestBuilder, CreateIndexRequestBuilder, FlushRequestBuilder,
    ForceMergeRequestBuilder, IndicesExistsRequestBuilder, IndicesStatsRequestBuilder,
    MultiGetRequestBuilder, NodesStatsRequestBuilder, Operation, OperationBuilder,
    PutMappingRequestBuilder, RefreshRequestBuilder, SearchScrollRequestBuilder,
};
pub use search::SearchRequestBuilder;

use crate::client::ClientInner;
use crate::descriptor::{OperationDescriptor, OperationKind, Payload, Target};
use crate::error::{EsError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Default largest `from + size` window a search may request, matching the
/// engine's default `index.max_result_window`.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Unconfigured,
    Configuring,
    Executed,
    Failed,
}

/// Terminal call shared by every builder.
#[async_trait]
pub trait RequestBuilder: Send {
    type Response;

    fn kind(&self) -> OperationKind;

    fn state(&self) -> BuilderState;

    /// Submit the request. Only the first call reaches the cluster.
    async fn execute(&mut self) -> Result<Self::Response>;
}

/// State and client handle common to all builders.
pub(crate) struct BuilderCore {
    client: Arc<ClientInner>,
    kind: OperationKind,
    state: BuilderState,
}

impl BuilderCore {
    pub fn new(client: Arc<ClientInner>, kind: OperationKind) -> Self {
        Self {
            client,
            kind,
            state: BuilderState::Unconfigured,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn max_result_window(&self) -> usize {
        self.client.max_result_window()
    }

    fn finished_error(&self) -> Option<EsError> {
        match self.state {
            BuilderState::Executed => Some(EsError::illegal_state(format!(
                "{} builder already executed",
                self.kind
            ))),
            BuilderState::Failed => Some(EsError::illegal_state(format!(
                "{} builder failed validation and cannot be used",
                self.kind
            ))),
            BuilderState::Unconfigured | BuilderState::Configuring => None,
        }
    }

    /// Gate a setter.
    pub fn configure(&mut self) -> Result<()> {
        if let Some(err) = self.finished_error() {
            return Err(err);
        }
        self.state = BuilderState::Configuring;
        Ok(())
    }

    /// Move to `Failed` and build the validation error.
    pub fn reject(&mut self, reason: impl std::fmt::Display) -> EsError {
        self.state = BuilderState::Failed;
        EsError::illegal_state(format!("Invalid {} request: {}", self.kind, reason))
    }

    /// Run `check`, failing the builder if it does not hold.
    pub fn ensure(&mut self, check: bool, reason: impl std::fmt::Display) -> Result<()> {
        if check {
            Ok(())
        } else {
            Err(self.reject(reason))
        }
    }

    /// Reject a blank name, failing the builder.
    pub fn ensure_name(&mut self, what: &str, value: &str) -> Result<()> {
        self.ensure(!value.trim().is_empty(), format!("{} must not be blank", what))
    }

    /// Move to `Failed`, passing `err` through.
    pub fn fail(&mut self, err: EsError) -> EsError {
        self.state = BuilderState::Failed;
        err
    }

    /// Fail if the builder already executed or failed.
    pub fn usable(&self) -> Result<()> {
        match self.finished_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Guard the terminal call; marks the builder as executed.
    pub fn begin_execute(&mut self) -> Result<()> {
        self.usable()?;
        self.state = BuilderState::Executed;
        Ok(())
    }

    pub async fn submit<R: DeserializeOwned>(&self, target: Target, payload: Payload) -> Result<R> {
        let descriptor = OperationDescriptor::new(self.kind, target, payload);
        self.client.dispatch(&descriptor).await
    }
}

/// Owned index names, rejecting blank ones.
pub(crate) fn index_names<S: AsRef<str>>(kind: OperationKind, indices: &[S]) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|index| {
            let index = index.as_ref();
            if index.trim().is_empty() {
                Err(EsError::illegal_state(format!(
                    "Invalid {} request: index name must not be blank",
                    kind
                )))
            } else {
                Ok(index.to_string())
            }
        })
        .collect()
}

pub(crate) fn ensure_keep_alive(core: &mut BuilderCore, keep_alive: Duration) -> Result<()> {
    core.ensure(!keep_alive.is_zero(), "scroll keep-alive must be positive")
}
