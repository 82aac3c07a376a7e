use super::{ensure_keep_alive, BuilderCore, BuilderState, RequestBuilder};
use crate::client::ClientInner;
use crate::descriptor::{OperationKind, Payload, SearchBody, Target};
use crate::error::Result;
use crate::query::{Aggregation, Query, Sort};
use crate::response::SearchResponse;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Search over one or more indices, optionally opening a scroll cursor.
pub struct SearchRequestBuilder {
    core: BuilderCore,
    indices: Vec<String>,
    body: SearchBody,
}

impl SearchRequestBuilder {
    pub(crate) fn new(client: Arc<ClientInner>, indices: Vec<String>) -> Self {
        Self {
            core: BuilderCore::new(client, OperationKind::Search),
            indices,
            body: SearchBody::default(),
        }
    }

    pub fn set_types<S: AsRef<str>>(&mut self, types: &[S]) -> Result<&mut Self> {
        self.core.configure()?;
        for doc_type in types {
            self.core.ensure_name("type", doc_type.as_ref())?;
        }
        self.body.types = types.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(self)
    }

    pub fn set_query(&mut self, query: impl Into<Query>) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.query = Some(query.into());
        Ok(self)
    }

    pub fn set_post_filter(&mut self, filter: impl Into<Query>) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.post_filter = Some(filter.into());
        Ok(self)
    }

    pub fn set_size(&mut self, size: usize) -> Result<&mut Self> {
        self.core.configure()?;
        self.check_window(self.body.from.unwrap_or(0), size)?;
        self.body.size = Some(size);
        Ok(self)
    }

    pub fn set_from(&mut self, from: usize) -> Result<&mut Self> {
        self.core.configure()?;
        let scrolling = self.body.scroll.is_some();
        self.core.ensure(!scrolling, "from cannot be combined with scroll")?;
        self.check_window(from, self.body.size.unwrap_or(0))?;
        self.body.from = Some(from);
        Ok(self)
    }

    pub fn add_sort(&mut self, sort: Sort) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("sort field", &sort.field)?;
        self.body.sorts.push(sort);
        Ok(self)
    }

    pub fn add_aggregation(&mut self, aggregation: Aggregation) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("aggregation name", &aggregation.name)?;
        let duplicate = self.body.aggregations.iter().any(|a| a.name == aggregation.name);
        self.core.ensure(
            !duplicate,
            format!("aggregation [{}] is defined twice", aggregation.name),
        )?;
        self.body.aggregations.push(aggregation);
        Ok(self)
    }

    pub fn set_fetch_source(&mut self, fetch: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.fetch_source = Some(fetch);
        Ok(self)
    }

    /// Only return these `_source` fields.
    pub fn set_source_includes<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.source_includes = fields.iter().map(|f| f.as_ref().to_string()).collect();
        Ok(self)
    }

    pub fn set_routing(&mut self, routing: &str) -> Result<&mut Self> {
        self.core.configure()?;
        self.core.ensure_name("routing", routing)?;
        self.body.routing = Some(routing.to_string());
        Ok(self)
    }

    pub fn set_track_scores(&mut self, track: bool) -> Result<&mut Self> {
        self.core.configure()?;
        self.body.track_scores = track;
        Ok(self)
    }

    /// Open a scroll cursor kept alive for `keep_alive` between pages.
    pub fn set_scroll(&mut self, keep_alive: Duration) -> Result<&mut Self> {
        self.core.configure()?;
        ensure_keep_alive(&mut self.core, keep_alive)?;
        let paged = self.body.from.is_some();
        self.core.ensure(!paged, "scroll cannot be combined with from")?;
        self.body.scroll = Some(keep_alive);
        Ok(self)
    }

    fn check_window(&mut self, from: usize, size: usize) -> Result<()> {
        let limit = self.core.max_result_window();
        self.core.ensure(
            from.saturating_add(size) <= limit,
            format!(
                "result window is too large, from + size must be less than or equal to {} but was {}",
                limit,
                from.saturating_add(size)
            ),
        )
    }
}

#[async_trait]
impl RequestBuilder for SearchRequestBuilder {
    type Response = SearchResponse;

    fn kind(&self) -> OperationKind {
        self.core.kind()
    }

    fn state(&self) -> BuilderState {
        self.core.state()
    }

    async fn execute(&mut self) -> Result<SearchResponse> {
        self.core.begin_execute()?;
        let target = Target::indices(&self.indices);
        let body = std::mem::take(&mut self.body);
        self.core.submit(target, Payload::Search(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::request::DEFAULT_MAX_RESULT_WINDOW;
    use crate::testing::FakeTransport;
    use crate::{EsClient, EsClientConfig};

    fn client() -> (EsClient, Arc<FakeTransport>) {
        let fake = Arc::new(FakeTransport::new());
        (EsClient::new(fake.clone()), fake)
    }

    #[test]
    fn test_size_beyond_window_fails_builder() {
        let (client, _) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();

        let err = search.set_size(DEFAULT_MAX_RESULT_WINDOW + 1).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert_eq!(search.state(), BuilderState::Failed);
        assert!(search.set_size(10).is_err());
    }

    #[test]
    fn test_from_plus_size_window() {
        let (client, _) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();
        search.set_size(5000).unwrap();
        assert!(search.set_from(5000).is_ok());
        assert!(search.set_from(5001).is_err());
    }

    #[test]
    fn test_window_follows_configuration() {
        let config = EsClientConfig {
            max_result_window: 50_000,
            ..Default::default()
        };
        let client = EsClient::with_config(Arc::new(FakeTransport::new()), &config);
        let mut search = client.prepare_search(&["issues"]).unwrap();

        search.set_size(20_000).unwrap().set_from(30_000).unwrap();
        let err = search.set_size(20_001).err().unwrap();
        assert!(err.context().contains("less than or equal to 50000"));
    }

    #[test]
    fn test_from_and_scroll_are_exclusive() {
        let (client, _) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();
        search.set_scroll(Duration::from_secs(60)).unwrap();
        assert!(search.set_from(10).is_err());

        let mut search = client.prepare_search(&["issues"]).unwrap();
        search.set_from(10).unwrap();
        assert!(search.set_scroll(Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_zero_keep_alive_rejected() {
        let (client, _) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();
        assert!(search.set_scroll(Duration::ZERO).is_err());
    }

    #[test]
    fn test_duplicate_aggregation_rejected() {
        let (client, _) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();
        search.add_aggregation(Aggregation::max("latest", "createdAt")).unwrap();
        assert!(search.add_aggregation(Aggregation::min("latest", "createdAt")).is_err());
    }

    #[tokio::test]
    async fn test_execute_sends_configured_body() {
        let (client, fake) = client();
        let mut search = client.prepare_search(&["issues"]).unwrap();
        search
            .set_types(&["issue"])
            .unwrap()
            .set_query(Query::term("status", "OPEN"))
            .unwrap()
            .set_size(20)
            .unwrap()
            .add_sort(Sort::desc("updatedAt"))
            .unwrap();
        assert_eq!(search.state(), BuilderState::Configuring);

        let response = search.execute().await.unwrap();
        assert_eq!(response.total_hits(), 0);
        assert_eq!(search.state(), BuilderState::Executed);

        let call = fake.last_call().unwrap();
        assert_eq!(call.target().indices, vec!["issues"]);
        match call.payload() {
            Payload::Search(body) => {
                assert_eq!(body.types, vec!["issue"]);
                assert_eq!(body.size, Some(20));
                assert_eq!(body.sorts.len(), 1);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
