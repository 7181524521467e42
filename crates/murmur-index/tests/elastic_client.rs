//! Integration tests for `ElasticClient` and `run_filter` against a mock
//! Elasticsearch.

use chrono::{TimeZone, Utc};
use murmur_core::{Account, ElasticConfig, Envelope, Platform, Post};
use murmur_index::{
    index_batch, run_filter, Combine, DocumentIndex, ElasticClient, FilterRequest, IndexError,
    IndexOutcome,
};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn envelope(id: &str) -> Envelope {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut env = Envelope::new(
        Platform::Bluesky,
        Post {
            id: id.to_owned(),
            created_at: at,
            content: "Sunny day in Perth".to_owned(),
            sensitive: false,
            favourites_count: 0,
            replies_count: 0,
            tags: vec!["perth".to_owned()],
            url: format!("https://bsky.app/profile/a.bsky.social/post/{id}"),
            account: Account::unknown(),
        },
        at,
    );
    env.apply_enrichment(0.4, vec!["sunny".to_owned(), "perth".to_owned()]);
    env
}

fn client(server: &MockServer) -> ElasticClient {
    ElasticClient::with_base_url(&server.uri(), "socialplatform", 5).unwrap()
}

// ---------------------------------------------------------------------------
// create-only indexing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_document_uses_create_endpoint_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/socialplatform/_create/bluesky_3kabc"))
        .and(basic_auth("elastic", "changeme"))
        .and(body_partial_json(json!({
            "platform": "Bluesky",
            "sentimentLabel": "positive",
            "data": { "id": "3kabc" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ElasticConfig {
        url: server.uri(),
        username: Some("elastic".to_owned()),
        password: Some("changeme".to_owned()),
        index: "socialplatform".to_owned(),
    };
    let client = ElasticClient::new(&config, 5).unwrap();
    let env = envelope("3kabc");

    let outcome = client.create_document(&env.document_id(), &env).await.unwrap();
    assert_eq!(outcome, IndexOutcome::Created);
}

#[tokio::test]
async fn conflict_is_a_duplicate_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/socialplatform/_create/bluesky_dup"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { "type": "version_conflict_engine_exception" },
            "status": 409
        })))
        .mount(&server)
        .await;

    let env = envelope("dup");
    let outcome = DocumentIndex::create_document(&client(&server), "bluesky_dup", &env)
        .await
        .unwrap();
    assert_eq!(outcome, IndexOutcome::Duplicate);
}

#[tokio::test]
async fn document_id_is_a_single_encoded_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/socialplatform/_create/mastodon_a%2Fb%20c%3Fd%23e"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .create_document("mastodon_a/b c?d#e", &envelope("a/b c?d#e"))
        .await
        .unwrap();
    assert_eq!(outcome, IndexOutcome::Created);
}

#[tokio::test]
async fn mapping_rejection_is_dropped_by_the_worker() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "type": "mapper_parsing_exception" },
            "status": 400
        })))
        .expect(2)
        .mount(&server)
        .await;

    let queue = murmur_harvest::MemoryQueue::new();
    for id in ["m1", "m2"] {
        murmur_core::MessageQueue::push(
            &queue,
            murmur_core::ELASTIC_TOPIC,
            &serde_json::to_vec(&envelope(id)).unwrap(),
        )
        .await
        .unwrap();
    }

    let report = index_batch(&queue, &client(&server), 10).await.unwrap();

    assert_eq!(report.rejected, 2);
    assert_eq!(report.requeued, 0);
    assert_eq!(queue.len(murmur_core::ELASTIC_TOPIC).await, 0);
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let env = envelope("x");
    let err = client(&server)
        .create_document("bluesky_x", &env)
        .await
        .unwrap_err();

    assert!(
        matches!(err, IndexError::UnexpectedStatus { status: 503, ref body, .. } if body == "unavailable"),
        "got {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn reindexing_the_same_envelope_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/socialplatform/_create/bluesky_once"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/socialplatform/_create/bluesky_once"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let queue = murmur_harvest::MemoryQueue::new();
    let payload = serde_json::to_vec(&envelope("once")).unwrap();
    for _ in 0..3 {
        murmur_core::MessageQueue::push(&queue, murmur_core::ELASTIC_TOPIC, &payload)
            .await
            .unwrap();
    }

    let report = index_batch(&queue, &client(&server), 10).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.duplicates, 2);
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

fn hit(id: &str) -> serde_json::Value {
    json!({
        "_index": "socialplatform",
        "_id": id,
        "_source": {
            "platform": "Reddit",
            "sentiment": 0.1,
            "sentimentLabel": "positive",
            "keywords": ["rent"],
            "data": { "createdAt": "2024-03-01T00:00:00Z", "tags": ["sydney"] }
        }
    })
}

#[tokio::test]
async fn filter_scrolls_until_exhausted_and_clears_scroll() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/socialplatform/_search"))
        .and(query_param("scroll", "2m"))
        .and(body_partial_json(json!({
            "query": { "bool": { "filter": [{ "terms": { "data.tags": ["sydney"] } }] } },
            "sort": [{ "data.createdAt": { "order": "desc" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "scroll-1",
            "hits": { "total": { "value": 3, "relation": "eq" }, "hits": [hit("reddit_a"), hit("reddit_b")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll_id": "scroll-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "scroll-2",
            "hits": { "hits": [hit("reddit_c")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll_id": "scroll-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "scroll-2",
            "hits": { "hits": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll_id": ["scroll-2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"succeeded": true})))
        .expect(1)
        .mount(&server)
        .await;

    let request = FilterRequest {
        tags: vec!["Sydney".to_owned()],
        size: Some(2),
        ..FilterRequest::default()
    };
    let response = run_filter(&client(&server), &request).await.unwrap();

    assert_eq!(response.total, 3);
    let ids: Vec<&str> = response
        .data
        .iter()
        .map(|doc| doc["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["reddit_a", "reddit_b", "reddit_c"]);
    assert_eq!(response.data[0]["sentimentLabel"], "positive");
}

#[tokio::test]
async fn filter_stops_at_max_docs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/socialplatform/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "s",
            "hits": { "total": { "value": 100 }, "hits": [hit("r1"), hit("r2"), hit("r3")] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = FilterRequest {
        content: vec!["rent".to_owned()],
        combine: Combine::Or,
        max_docs: Some(2),
        ..FilterRequest::default()
    };
    let response = run_filter(&client(&server), &request).await.unwrap();

    assert_eq!(response.total, 100);
    assert_eq!(response.data.len(), 2);
}

#[tokio::test]
async fn failed_scroll_still_clears_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/socialplatform/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "s",
            "hits": { "total": { "value": 10 }, "hits": [hit("r1")] }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let request = FilterRequest {
        keywords: vec!["rent".to_owned()],
        ..FilterRequest::default()
    };
    let err = run_filter(&client(&server), &request).await.unwrap_err();
    assert!(matches!(err, IndexError::UnexpectedStatus { status: 500, .. }));
}
