use super::{BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{GetBody, OperationKind, Payload, Target};
use crate::error::Result;
use crate::response::GetResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Fetch one document by id. A missing document is a regular response with
/// `found == false`.
pub struct GetRequestBuilder {
    core: BuilderCore,
    index: Option<String>,
    doc_type: Option<String>,
    id: Option<String>,
    body: GetBody,
}

impl GetRequestBuilder {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self {
            core: BuilderCore::new(client, OperationKind::Get),
            index: None,
            doc_type: None,
            id: None,
            body: GetBody::default(),
        }
    }

    pub fn set_index(&mut self, index: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("index", index)?;
        self.index = Some(index.to_string());
        Ok(self)
    }

    pub fn set_type(&mut self, doc_type: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("type", doc_type)?;
        self.doc_type = Some(doc_type.to_string());
        Ok(self)
    }

    pub fn set_id(&mut self, id: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("id", id)?;
        self.id = Some(id.to_string());
        Ok(self)
    }

    pub fn set_routing(&mut self, routing: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("routing", routing)?;
        self.body.routing = Some(routing.to_string());
        Ok(self)
    }

    pub fn set_fetch_source(&mut self, fetch: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.fetch_source = Some(fetch);
        Ok(self)
    }

    pub fn set_realtime(&mut self, realtime: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.realtime = Some(realtime);
        Ok(self)
    }
}

#[async_trait]
impl RequestBuilder for GetRequestBuilder {
    type Response = GetResponse;

    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<GetResponse> {
        self.core.usable()?;
        let (index, id) = match (self.index.take(), self.id.take()) {
            (Some(index), Some(id)) => (index, id),
            (None, _) => return Err(self.core.reject("index is required")),
            (_, None) => return Err(self.core.reject("id is required")),
        };
        self.core.begin_execute()?;

        let target = Target {
            indices: vec![index],
            node_ids: Vec::new(),
            doc_type: self.doc_type.take(),
            id: Some(id),
        };
        let body = std::mem::take(&mut self.body);
        self.core.submit(target, Payload::Get(body)).await
    }
}
