use super::enqueue::is_known_topic;
use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use murmur_core::{MessageQueue, Platform, PopOrder};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(pool: PgPool, elastic: Option<ElasticClient>) -> Router {
    build_app(
        AppState::new(pool, PoolConfig::default(), elastic),
        AuthState::disabled(),
        default_rate_limit_state(),
    )
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        (ErrorCode::BadRequest, StatusCode::BAD_REQUEST),
        (ErrorCode::NotFound, StatusCode::NOT_FOUND),
        (ErrorCode::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (ErrorCode::IndexUnavailable, StatusCode::SERVICE_UNAVAILABLE),
        (ErrorCode::UpstreamError, StatusCode::BAD_GATEWAY),
        (ErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code:?}");
    }
}

#[test]
fn error_codes_serialize_as_snake_case() {
    let json = serde_json::to_value(ApiError::new("req-1", ErrorCode::IndexUnavailable, "m"))
        .expect("serialize");
    assert_eq!(json["error"]["code"], "index_unavailable");
    assert_eq!(json["meta"]["request_id"], "req-1");
}

#[test]
fn enqueue_topics_are_platforms_and_elastic() {
    for topic in ["reddit", "mastodon", "bluesky", "elastic"] {
        assert!(is_known_topic(topic), "{topic}");
    }
    assert!(!is_known_topic("Reddit"));
    assert!(!is_known_topic("twitter"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_database_and_index(pool: sqlx::PgPool) {
    let response = app(pool, None)
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-health"
    );
    let json = body_json(response).await;
    assert_eq!(json["data"]["database"], "ok");
    assert_eq!(json["data"]["index"], "not_configured");
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[sqlx::test(migrations = "../../migrations")]
async fn enqueue_pushes_body_onto_topic(pool: sqlx::PgPool) {
    let payload = json!({ "platform": "Mastodon", "data": { "id": "1" } });
    let response = app(pool.clone(), None)
        .oneshot(post_json("/api/v1/enqueue/mastodon", &payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["topic"], "mastodon");

    let queue = PgMessageQueue::new(pool, PoolConfig::default());
    let popped = queue
        .pop(Platform::Mastodon.slug(), PopOrder::Fifo)
        .await
        .unwrap()
        .expect("message queued");
    let popped: serde_json::Value = serde_json::from_slice(&popped).unwrap();
    assert_eq!(popped, payload);
}

#[sqlx::test(migrations = "../../migrations")]
async fn enqueue_rejects_unknown_topic(pool: sqlx::PgPool) {
    let response = app(pool.clone(), None)
        .oneshot(post_json("/api/v1/enqueue/twitter", &json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(murmur_db::queue_depth(&pool, "twitter").await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn protected_routes_require_bearer_token(pool: sqlx::PgPool) {
    let auth = AuthState::from_keys("secret", false).expect("auth");
    let app = build_app(
        AppState::new(pool, PoolConfig::default(), None),
        auth,
        default_rate_limit_state(),
    );

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/enqueue/reddit", &json!({"a": 1})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "unauthorized");

    let mut request = post_json("/api/v1/enqueue/reddit", &json!({"a": 1}));
    request
        .headers_mut()
        .insert("authorization", "Bearer secret".parse().unwrap());
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn queue_depth_counts_pending_messages(pool: sqlx::PgPool) {
    let queue = PgMessageQueue::new(pool.clone(), PoolConfig::default());
    queue.push("elastic", b"{}").await.unwrap();
    queue.push("elastic", b"{}").await.unwrap();

    let response = app(pool, None)
        .oneshot(
            Request::builder()
                .uri("/api/v1/queues/elastic")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["depth"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn harvest_runs_are_listed(pool: sqlx::PgPool) {
    let run = murmur_db::create_harvest_run(&pool, Platform::Bluesky, "scheduler")
        .await
        .unwrap();

    let response = app(pool, None)
        .oneshot(
            Request::builder()
                .uri("/api/v1/harvest-runs?limit=5")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = json["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["harvest_run_id"], run.public_id.to_string());
    assert_eq!(data[0]["platform"], "bluesky");
    assert_eq!(data[0]["status"], "queued");
}

#[sqlx::test(migrations = "../../migrations")]
async fn filter_without_index_is_unavailable(pool: sqlx::PgPool) {
    let response = app(pool, None)
        .oneshot(post_json("/api/v1/filter", &json!({ "tags": ["sydney"] })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "index_unavailable");
}

#[sqlx::test(migrations = "../../migrations")]
async fn filter_returns_total_and_documents(pool: sqlx::PgPool) {
    let es = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/socialplatform/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "s1",
            "hits": {
                "total": { "value": 1 },
                "hits": [{ "_id": "reddit_abc", "_source": { "platform": "Reddit", "keywords": ["rent"] } }]
            }
        })))
        .mount(&es)
        .await;
    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_scroll_id": "s1",
            "hits": { "hits": [] }
        })))
        .mount(&es)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&es)
        .await;

    let client = ElasticClient::with_base_url(&es.uri(), "socialplatform", 5).unwrap();
    let response = app(pool, Some(client))
        .oneshot(post_json(
            "/api/v1/filter",
            &json!({ "keywords": ["rent"], "combine": "or" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["_id"], "reddit_abc");
    assert_eq!(json["data"][0]["platform"], "Reddit");
    assert!(json["meta"]["request_id"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn filter_rejects_unknown_combine(pool: sqlx::PgPool) {
    let response = app(pool, None)
        .oneshot(post_json("/api/v1/filter", &json!({ "combine": "xor" })))
        .await
        .expect("response");

    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../migrations")]
async fn rate_limit_applies_to_protected_routes_only(pool: sqlx::PgPool) {
    let app = build_app(
        AppState::new(pool, PoolConfig::default(), None),
        AuthState::disabled(),
        RateLimitState::new(1, std::time::Duration::from_secs(60)),
    );
    let get = |uri: &str| {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    };

    let first = app.clone().oneshot(get("/api/v1/queues/reddit")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(get("/api/v1/queues/reddit")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));

    let health = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
