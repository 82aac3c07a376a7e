use super::{BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{BulkAction, BulkBody, OperationKind, Payload, Target};
use crate::error::{EsError, Result};
use crate::response::BulkResponse;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Ordered batch of index, update and delete actions sent in one call.
///
/// Per-item failures come back inside [`BulkResponse`]; only a failure of the
/// whole call is an error.
pub struct BulkRequestBuilder {
    core: BuilderCore,
    body: BulkBody,
}

impl BulkRequestBuilder {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self {
            core: BuilderCore::new(client, OperationKind::Bulk),
            body: BulkBody::default(),
        }
    }

    pub fn number_of_actions(&self) -> usize {
        self.body.actions.len()
    }

    pub fn add(&mut self, action: BulkAction) -> Result<&mut Self> {
        self.core.configure()?;
        let (index, doc_type, id) = match &action {
            BulkAction::Index {
                index,
                doc_type,
                id,
                source,
                ..
            } => {
                self.core
                    .ensure(source.is_object(), "index action source must be a JSON object")?;
                (index, doc_type, id.as_deref())
            }
            BulkAction::Update {
                index, doc_type, id, ..
            }
            | BulkAction::Delete {
                index, doc_type, id, ..
            } => (index, doc_type, Some(id.as_str())),
        };
        self.core.ensure_name("index", index)?;
        self.core.ensure_name("type", doc_type)?;
        if let Some(id) = id {
            self.core.ensure_name("id", id)?;
        }
        self.body.actions.push(action);
        Ok(self)
    }

    pub fn add_index(
        &mut self,
        index: &str,
        doc_type: &str,
        id: Option<&str>,
        source: Value,
    ) -> Result<&mut Self> {
        self.add(BulkAction::Index {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id: id.map(str::to_string),
            routing: None,
            source,
        })
    }

    pub fn add_index_serialize<T: Serialize>(
        &mut self,
        index: &str,
        doc_type: &str,
        id: Option<&str>,
        document: &T,
    ) -> Result<&mut Self> {
        self.core.configure()?;
        let source = serde_json::to_value(document).map_err(|e| {
            let err = EsError::serialization(
                format!("Fail to serialize bulk document for index [{}]", index),
                e,
            );
            self.core.fail(err)
        })?;
        self.add_index(index, doc_type, id, source)
    }

    /// Partial update; with `upsert` the document is created when missing.
    pub fn add_update(
        &mut self,
        index: &str,
        doc_type: &str,
        id: &str,
        doc: Value,
        upsert: bool,
    ) -> Result<&mut Self> {
        self.add(BulkAction::Update {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id: id.to_string(),
            routing: None,
            doc,
            upsert,
        })
    }

    pub fn add_delete(&mut self, index: &str, doc_type: &str, id: &str) -> Result<&mut Self> {
        self.add(BulkAction::Delete {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id: id.to_string(),
            routing: None,
        })
    }

    pub fn set_refresh(&mut self, refresh: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.refresh = refresh;
        Ok(self)
    }
}

#[async_trait]
impl RequestBuilder for BulkRequestBuilder {
    type Response = BulkResponse;

    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<BulkResponse> {
        self.core.usable()?;
        if self.body.actions.is_empty() {
            return Err(self.core.reject("no actions to submit"));
        }
        self.core.begin_execute()?;

        let payload = Payload::Bulk(std::mem::take(&mut self.body));
        let target = Target {
            indices: payload.item_indices(),
            ..Default::default()
        };
        self.core.submit(target, payload).await
    }
}
