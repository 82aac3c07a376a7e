//! End-to-end behavior of the facade against a scripted transport

use serde_json::json;
use sonar_es::descriptor::OperationKind;
use sonar_es::testing::{FakeTransport, LogCapture};
use sonar_es::{
    BuilderState, ClusterHealthStatus, ErrorKind, EsClient, EsClientConfig, Query, RequestBuilder,
    TransportError, LOG_TARGET,
};
use std::collections::HashSet;
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;

fn config(slow_ms: u64, grace_ms: u64) -> EsClientConfig {
    EsClientConfig {
        slow_request_threshold_ms: slow_ms,
        stop_grace_period_ms: grace_ms,
        ..Default::default()
    }
}

fn setup() -> (EsClient, Arc<FakeTransport>) {
    let fake = Arc::new(FakeTransport::new());
    let client = EsClient::with_config(fake.clone(), &config(60_000, 1_000));
    (client, fake)
}

/// Execute once successfully, then check the second call is refused
/// without reaching the transport.
async fn assert_single_use<B: RequestBuilder>(mut builder: B, fake: &FakeTransport) -> OperationKind {
    let kind = builder.kind();
    let before = fake.calls_for(kind);

    if let Err(e) = builder.execute().await {
        panic!("{} failed: {}", kind, e);
    }
    assert_eq!(builder.state(), BuilderState::Executed);

    let err = builder
        .execute()
        .await
        .err()
        .unwrap_or_else(|| panic!("second {} execute succeeded", kind));
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert!(err.context().contains("already executed"), "{}", err);
    assert_eq!(fake.calls_for(kind), before + 1, "{}", kind);
    kind
}

#[tokio::test]
async fn test_every_kind_executes_once() {
    let (client, fake) = setup();
    let mut seen = HashSet::new();

    seen.insert(assert_single_use(client.prepare_refresh(&["issues"]).unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_flush::<&str>(&[]).unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_stats(&["issues"]).unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_nodes_stats::<&str>(&[]).unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_cluster_stats().unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_state().unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_health::<&str>(&[]).unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_indices_exist(&["rules"]).unwrap(), &fake).await);

    let mut create = client.prepare_create("rules").unwrap();
    create.add_mapping("rule", json!({"properties": {}})).unwrap();
    seen.insert(assert_single_use(create, &fake).await);

    let mut mapping = client.prepare_put_mapping(&["rules"]).unwrap();
    mapping.set_type("rule").unwrap().set_source(json!({"properties": {}})).unwrap();
    seen.insert(assert_single_use(mapping, &fake).await);

    let mut search = client.prepare_search(&["issues"]).unwrap();
    search.set_query(Query::match_all()).unwrap();
    seen.insert(assert_single_use(search, &fake).await);

    seen.insert(assert_single_use(client.prepare_search_scroll("c2Nhbg==").unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_get_doc("rules", "rule", "R1").unwrap(), &fake).await);

    let mut mget = client.prepare_multi_get().unwrap();
    mget.add("rules", "rule", "R1").unwrap();
    seen.insert(assert_single_use(mget, &fake).await);

    seen.insert(assert_single_use(client.prepare_count(&["issues"]).unwrap(), &fake).await);

    let mut bulk = client.prepare_bulk().unwrap();
    bulk.add_delete("issues", "issue", "1").unwrap();
    seen.insert(assert_single_use(bulk, &fake).await);

    seen.insert(assert_single_use(client.prepare_delete("issues", "issue", "1").unwrap(), &fake).await);

    let mut index = client.prepare_index("rules", "rule").unwrap();
    index.set_source(json!({"key": "R1"})).unwrap();
    seen.insert(assert_single_use(index, &fake).await);

    seen.insert(assert_single_use(client.prepare_force_merge("issues").unwrap(), &fake).await);
    seen.insert(assert_single_use(client.prepare_clear_cache(&["issues"]).unwrap(), &fake).await);

    let all: HashSet<OperationKind> = OperationKind::ALL.into_iter().collect();
    assert_eq!(seen, all);
    assert_eq!(fake.call_count(), OperationKind::ALL.len());
}

#[tokio::test]
async fn test_failed_execute_cannot_be_retried() {
    let (client, fake) = setup();
    fake.fail(OperationKind::Refresh, TransportError::Connection("refused".into()));
    let mut refresh = client.prepare_refresh(&["issues"]).unwrap();

    let err = refresh.execute().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    let err = refresh.execute().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert_eq!(fake.calls_for(OperationKind::Refresh), 1);
}

#[tokio::test]
async fn test_slow_operation_logs_one_warning_with_kind_and_targets() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let fake = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(30)));
    let client = EsClient::with_config(fake.clone(), &config(5, 1_000));

    client.prepare_refresh(&["issues", "rules"]).unwrap().execute().await.unwrap();

    let warnings: Vec<_> = capture
        .at(Level::WARN)
        .into_iter()
        .filter(|e| e.target == LOG_TARGET)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].fields["kind"], "refresh");
    assert_eq!(warnings[0].fields["targets"], "indices [issues,rules]");
    assert!(warnings[0].fields["duration_ms"].parse::<u64>().unwrap() >= 30);
}

#[tokio::test]
async fn test_slow_multi_document_operations_name_their_indices() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let fake = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(20)));
    let client = EsClient::with_config(fake.clone(), &config(1, 1_000));

    let mut mget = client.prepare_multi_get().unwrap();
    mget.add("rules", "rule", "R1").unwrap().add("rules", "rule", "R2").unwrap();
    mget.execute().await.unwrap();

    let mut bulk = client.prepare_bulk().unwrap();
    bulk.add_delete("issues", "issue", "1")
        .unwrap()
        .add_index("rules", "rule", Some("R3"), json!({"key": "R3"}))
        .unwrap();
    bulk.execute().await.unwrap();

    let warnings: Vec<_> = capture
        .at(Level::WARN)
        .into_iter()
        .filter(|e| e.target == LOG_TARGET)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].fields["kind"], "multi_get");
    assert_eq!(warnings[0].fields["targets"], "indices [rules]");
    assert!(warnings[0].message.contains("indices [rules]"), "{}", warnings[0].message);
    assert_eq!(warnings[1].fields["kind"], "bulk");
    assert_eq!(warnings[1].fields["targets"], "indices [issues,rules]");

    let calls = fake.calls();
    assert_eq!(calls[0].target().indices, vec!["rules"]);
    assert_eq!(calls[1].target().indices, vec!["issues", "rules"]);
}

#[tokio::test]
async fn test_fast_operation_logs_no_warning() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let (client, _fake) = setup();

    client.prepare_refresh(&["issues"]).unwrap().execute().await.unwrap();
    client.prepare_cluster_stats().unwrap().execute().await.unwrap();

    assert_eq!(capture.count_at(Level::WARN), 0);
    assert_eq!(capture.count_at(Level::DEBUG), 2);
}

#[tokio::test]
async fn test_wait_for_status_returns_immediately_when_green() {
    let (client, fake) = setup();

    let started = Instant::now();
    let health = client.wait_for_status(ClusterHealthStatus::Green).await.unwrap();

    assert_eq!(health.status, ClusterHealthStatus::Green);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(fake.calls_for(OperationKind::ClusterHealth), 1);

    let call = fake.last_call().unwrap();
    match call.payload() {
        sonar_es::Payload::Health(options) => {
            assert_eq!(options.wait_for_status, Some(ClusterHealthStatus::Green));
            assert_eq!(options.wait_for_events, Some(sonar_es::Priority::Languid));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_for_status_blocks_until_cluster_answers() {
    let (client, fake) = setup();
    // The cluster holds the request while red and answers once yellow is reached.
    fake.respond_after(
        OperationKind::ClusterHealth,
        Duration::from_millis(200),
        json!({"cluster_name": "sonarqube", "status": "yellow", "timed_out": false}),
    );

    let started = Instant::now();
    let health = client.wait_for_status(ClusterHealthStatus::Yellow).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(health.status, ClusterHealthStatus::Yellow);
    assert_eq!(fake.calls_for(OperationKind::ClusterHealth), 1);
}

#[tokio::test]
async fn test_wait_for_status_timeout_is_reported_not_raised() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let (client, fake) = setup();
    fake.respond(
        OperationKind::ClusterHealth,
        json!({"cluster_name": "sonarqube", "status": "red", "timed_out": true}),
    );

    let health = client.wait_for_status(ClusterHealthStatus::Green).await.unwrap();

    assert!(health.timed_out);
    assert_eq!(health.status, ClusterHealthStatus::Red);
    assert_eq!(capture.count_at(Level::WARN), 1);
}

#[tokio::test]
async fn test_max_field_value() {
    let (client, fake) = setup();
    fake.respond(
        OperationKind::Search,
        json!({"hits": {"total": 3, "hits": []}, "aggregations": {"latest": {"value": 42.0}}}),
    );

    assert_eq!(client.get_max_field_value("idx", "t", "f").await.unwrap(), 42);
}

#[tokio::test]
async fn test_max_field_value_without_aggregation_is_remote_error() {
    let (client, fake) = setup();
    fake.respond(OperationKind::Search, json!({"hits": {"total": 0, "hits": []}}));

    let err = client.get_max_field_value("idx", "t", "f").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(err.context().contains("aggregation not present"));
}

#[tokio::test]
async fn test_max_field_value_null_is_remote_error() {
    let (client, fake) = setup();
    fake.respond(
        OperationKind::Search,
        json!({"hits": {"total": 0, "hits": []}, "aggregations": {"latest": {"value": null}}}),
    );

    let err = client.get_max_field_value("idx", "t", "f").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
}

#[tokio::test]
async fn test_factories_fail_after_stop() {
    let (client, fake) = setup();
    client.stop().await.unwrap();

    let results = [
        client.prepare_refresh(&["i"]).err(),
        client.prepare_flush(&["i"]).err(),
        client.prepare_stats(&["i"]).err(),
        client.prepare_nodes_stats::<&str>(&[]).err(),
        client.prepare_cluster_stats().err(),
        client.prepare_state().err(),
        client.prepare_health::<&str>(&[]).err(),
        client.prepare_indices_exist(&["i"]).err(),
        client.prepare_create("i").err(),
        client.prepare_put_mapping(&["i"]).err(),
        client.prepare_search(&["i"]).err(),
        client.prepare_search_scroll("s").err(),
        client.prepare_get().err(),
        client.prepare_get_doc("i", "t", "1").err(),
        client.prepare_multi_get().err(),
        client.prepare_count(&["i"]).err(),
        client.prepare_bulk().err(),
        client.prepare_delete("i", "t", "1").err(),
        client.prepare_index("i", "t").err(),
        client.prepare_force_merge("i").err(),
        client.prepare_clear_cache(&["i"]).err(),
    ];
    for err in results {
        let err = err.expect("factory must fail after stop");
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert!(err.context().contains("closed"));
    }

    assert!(client.wait_for_status(ClusterHealthStatus::Green).await.is_err());
    assert!(client.get_max_field_value("i", "t", "f").await.is_err());
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_builder_created_before_stop_is_refused() {
    let (client, fake) = setup();
    let mut refresh = client.prepare_refresh(&["issues"]).unwrap();

    client.stop().await.unwrap();

    let err = refresh.execute().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn test_stop_closes_transport_exactly_once() {
    let (client, fake) = setup();
    client.start().unwrap();

    client.stop().await.unwrap();
    client.stop().await.unwrap();
    client.clone().stop().await.unwrap();

    assert_eq!(fake.close_count(), 1);
    assert!(client.start().is_err());
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_operation() {
    let fake = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(150)));
    let client = EsClient::with_config(fake.clone(), &config(60_000, 5_000));

    let running = {
        let client = client.clone();
        tokio::spawn(async move { client.prepare_refresh(&["issues"])?.execute().await })
    };
    while client.in_flight() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    client.stop().await.unwrap();

    assert_eq!(client.in_flight(), 0);
    assert!(running.await.unwrap().is_ok());
    assert_eq!(fake.close_count(), 1);
}

#[tokio::test]
async fn test_stop_grace_period_bounds_the_drain() {
    let fake = Arc::new(FakeTransport::new().with_latency(Duration::from_secs(2)));
    let client = EsClient::with_config(fake.clone(), &config(60_000, 50));

    let running = {
        let client = client.clone();
        tokio::spawn(async move { client.prepare_refresh(&["issues"])?.execute().await })
    };
    while client.in_flight() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    client.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(fake.close_count(), 1);

    let err = running.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_bulk_partial_failure_is_not_an_error() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let (client, fake) = setup();
    fake.respond(
        OperationKind::Bulk,
        json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "issues", "_type": "issue", "_id": "1", "status": 201}},
                {"index": {"_index": "issues", "_type": "issue", "_id": "2", "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse [line]"}}},
                {"delete": {"_index": "issues", "_type": "issue", "_id": "3", "status": 200}}
            ]
        }),
    );

    let mut bulk = client.prepare_bulk().unwrap();
    bulk.add_index("issues", "issue", Some("1"), json!({"line": 1}))
        .unwrap()
        .add_index("issues", "issue", Some("2"), json!({"line": "x"}))
        .unwrap()
        .add_delete("issues", "issue", "3")
        .unwrap();
    let response = bulk.execute().await.unwrap();

    assert!(response.has_failures());
    assert_eq!(response.successes(), 2);
    assert_eq!(response.failures().len(), 1);
    assert_eq!(response.failures()[0].id.as_deref(), Some("2"));
    assert!(response.failure_message().contains("mapper_parsing_exception"));
    assert_eq!(capture.count_at(Level::ERROR), 0);
}

#[tokio::test]
async fn test_multi_get_failure_is_single_error() {
    let (client, fake) = setup();
    fake.fail(
        OperationKind::MultiGet,
        TransportError::Rejected {
            status: 404,
            error_type: "index_not_found_exception".into(),
            reason: "no such index".into(),
        },
    );

    let mut mget = client.prepare_multi_get().unwrap();
    mget.add("missing", "doc", "1").unwrap().add("rules", "rule", "2").unwrap();

    let err = mget.execute().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(err.context().contains("indices [missing,rules]"), "{}", err);
}

#[tokio::test]
async fn test_remote_error_keeps_cluster_diagnostic() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();
    let (client, fake) = setup();
    fake.fail(
        OperationKind::Search,
        TransportError::Rejected {
            status: 400,
            error_type: "parsing_exception".into(),
            reason: "[bool] malformed query".into(),
        },
    );

    let mut search = client.prepare_search(&["issues"]).unwrap();
    let err = search.execute().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(err.context().contains("search request on indices [issues]"));
    assert!(err.source().unwrap().to_string().contains("[bool] malformed query"));
    assert_eq!(capture.count_at(Level::ERROR), 1);
}

#[tokio::test]
async fn test_undecodable_response_is_serialization_error() {
    let (client, fake) = setup();
    fake.respond(OperationKind::ClusterHealth, json!({"status": "purple"}));

    let err = client
        .prepare_health::<&str>(&[])
        .unwrap()
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_facade() {
    let fake = Arc::new(FakeTransport::new().with_latency(Duration::from_millis(20)));
    let client = EsClient::with_config(fake.clone(), &config(60_000, 1_000));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let mut get = client.prepare_get_doc("rules", "rule", &format!("R{}", i))?;
                get.execute().await
            })
        })
        .collect();

    let started = Instant::now();
    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }

    assert!(started.elapsed() < Duration::from_millis(16 * 20));
    assert_eq!(fake.calls_for(OperationKind::Get), 16);
    assert_eq!(client.in_flight(), 0);
}
