use super::{BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{DocumentBody, OperationKind, Payload, Target};
use crate::error::{EsError, Result};
use crate::response::IndexResponse;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Index (create or replace) one document.
pub struct IndexRequestBuilder {
    core: BuilderCore,
    index: String,
    doc_type: String,
    id: Option<String>,
    source: Option<Value>,
    routing: Option<String>,
    refresh: bool,
    create_only: bool,
}

impl IndexRequestBuilder {
    pub(crate) fn new(client: Arc<ClientInner>, index: String, doc_type: String) -> Self {
        Self {
            core: BuilderCore::new(client, OperationKind::Index),
            index,
            doc_type,
            id: None,
            source: None,
            routing: None,
            refresh: false,
            create_only: false,
        }
    }

    /// Without an id the cluster generates one.
    pub fn set_id(&mut self, id: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("id", id)?;
        self.id = Some(id.to_string());
        Ok(self)
    }

    pub fn set_source(&mut self, source: Value) -> Result<&mut Self> {
        self.core.configure()?;
        self.core
            .ensure(source.is_object(), "document source must be a JSON object")?;
        self.source = Some(source);
        Ok(self)
    }

    pub fn set_source_serialize<T: Serialize>(&mut self, document: &T) -> Result<&mut Self> {
        self.core.configure()?;
        let source = serde_json::to_value(document).map_err(|e| {
            let err = EsError::serialization(
                format!("Fail to serialize document for index [{}]", self.index),
                e,
            );
            self.core.fail(err)
        })?;
        self.set_source(source)
    }

    pub fn set_routing(&mut self, routing: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("routing", routing)?;
        self.routing = Some(routing.to_string());
        Ok(self)
    }

    /// Make the document visible to search before returning.
    pub fn set_refresh(&mut self, refresh: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.refresh = refresh;
        Ok(self)
    }

    /// Fail instead of replacing an existing document.
    pub fn set_create(&mut self, create_only: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.create_only = create_only;
        Ok(self)
    }
}

#[async_trait]
impl RequestBuilder for IndexRequestBuilder {
    type Response = IndexResponse;

    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<IndexResponse> {
        self.core.usable()?;
        let Some(source) = self.source.take() else {
            return Err(self.core.reject("document source is required"));
        };
        self.core.begin_execute()?;

        let target = Target::document(&self.index, &self.doc_type, self.id.as_deref());
        let body = DocumentBody {
            source,
            routing: self.routing.take(),
            refresh: self.refresh,
            create_only: self.create_only,
        };
        self.core.submit(target, Payload::Document(body)).await
    }
}
