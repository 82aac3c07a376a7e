use super::{BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{DeleteBody, OperationKind, Payload, Target};
use crate::error::Result;
use crate::response::DeleteResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Delete one document. Deleting a missing document is not an error, check
/// [`DeleteResponse::deleted`].
pub struct DeleteRequestBuilder {
    core: BuilderCore,
    target: Target,
    body: DeleteBody,
}

impl DeleteRequestBuilder {
    pub(crate) fn new(client: Arc<ClientInner>, target: Target) -> Self {
        Self {
            core: BuilderCore::new(client, OperationKind::Delete),
            target,
            body: DeleteBody::default(),
        }
    }

    pub fn set_routing(&mut self, routing: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("routing", routing)?;
        self.body.routing = Some(routing.to_string());
        Ok(self)
    }

    pub fn set_refresh(&mut self, refresh: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.refresh = refresh;
        Ok(self)
    }
}

#[async_trait]
impl RequestBuilder for DeleteRequestBuilder {
    type Response = DeleteResponse;

    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<DeleteResponse> {
        self.core.begin_execute()?;
        let target = std::mem::take(&mut self.target);
        let body = std::mem::take(&mut self.body);
        self.core.submit(target, Payload::Delete(body)).await
    }
}
