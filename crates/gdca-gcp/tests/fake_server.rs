//! GcpClient against a local fake of the Google REST surface.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use gdca_gcp::compute::ComputeClient;
use gdca_gcp::gke::GkeClient;
use gdca_gcp::kms::KmsClient;
use gdca_gcp::logging::LoggingClient;
use gdca_gcp::pubsub::PubSubClient;
use gdca_gcp::storage::{EncryptionKey, StorageClient, UploadOptions};
use gdca_gcp::{Credentials, GcpClient, GcpClientConfig};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Fake {
    operation_polls: AtomicU32,
    log_queries: std::sync::Mutex<Vec<serde_json::Value>>,
}

fn not_found(what: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "code": 404, "message": format!("Resource not found ({})", what), "status": "NOT_FOUND" } })),
    )
}

async fn get_topic(
    Path((project, topic)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-token") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": 401, "message": "bad token", "status": "UNAUTHENTICATED" } })),
        );
    }
    if topic == "present" {
        (
            StatusCode::OK,
            Json(json!({ "name": format!("projects/{}/topics/{}", project, topic) })),
        )
    } else {
        not_found(&topic)
    }
}

async fn list_topics(
    Path(project): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let topic = |id: &str| json!({ "name": format!("projects/{}/topics/{}", project, id) });
    match q.get("pageToken").map(String::as_str) {
        None => Json(json!({ "topics": [topic("alpha")], "nextPageToken": "t2" })),
        _ => Json(json!({ "topics": [topic("beta")] })),
    }
}

async fn get_cluster(
    Path((project, location, cluster)): Path<(String, String, String)>,
) -> impl IntoResponse {
    if cluster != "samples" {
        return not_found(&cluster);
    }
    (
        StatusCode::OK,
        Json(json!({
            "name": cluster,
            "location": location,
            "status": "RUNNING",
            "currentMasterVersion": "1.29.1-gke.100",
            "currentNodeCount": 3,
            "selfLink": format!("https://container.googleapis.com/v1/projects/{}/locations/{}/clusters/{}", project, location, cluster)
        })),
    )
}

async fn get_key_ring(
    Path((project, location, ring)): Path<(String, String, String)>,
) -> Json<serde_json::Value> {
    Json(json!({
        "name": format!("projects/{}/locations/{}/keyRings/{}", project, location, ring),
        "createTime": "2024-01-01T00:00:00Z"
    }))
}

/// Custom-method paths such as `entries:list` are matched by hand.
async fn custom_methods(
    State(fake): State<Arc<Fake>>,
    method: Method,
    uri: Uri,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    match (method, uri.path()) {
        (Method::POST, "/v2/entries:list") => {
            let query: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
            fake.log_queries.lock().unwrap().push(query);
            (
                StatusCode::OK,
                Json(json!({ "entries": [
                    { "logName": "projects/sample-project/logs/my-log", "severity": "ERROR", "textPayload": "Goodbye, world!" },
                    { "logName": "projects/sample-project/logs/my-log", "textPayload": "Hello, world!" }
                ] })),
            )
        }
        (_, path) => not_found(path),
    }
}

async fn list_instances(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    match q.get("pageToken").map(String::as_str) {
        None => Json(json!({ "items": [{ "name": "vm-1" }, { "name": "vm-2" }], "nextPageToken": "p2" })),
        Some("p2") => Json(json!({ "items": [{ "name": "vm-3" }] })),
        Some(_) => Json(json!({})),
    }
}

async fn zone_operation(
    State(fake): State<Arc<Fake>>,
    Path((_project, _zone, op)): Path<(String, String, String)>,
) -> Json<serde_json::Value> {
    let polls = fake.operation_polls.fetch_add(1, Ordering::SeqCst) + 1;
    let status = if polls < 3 { "RUNNING" } else { "DONE" };
    Json(json!({ "name": op, "status": status }))
}

async fn denied_instance() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": { "code": 403, "message": "Required 'compute.instances.get' permission", "status": "PERMISSION_DENIED" } })),
    )
}

async fn upload(
    Path(bucket): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let sha = headers
        .get("x-goog-encryption-key-sha256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        StatusCode::OK,
        Json(json!({
            "name": q.get("name").cloned().unwrap_or_default(),
            "bucket": bucket,
            "size": body.len().to_string(),
            "generation": "1700000000000001",
            "customerEncryption": { "encryptionAlgorithm": "AES256", "keySha256": sha }
        })),
    )
}

async fn spawn_fake() -> (GcpClient, Arc<Fake>) {
    let fake = Arc::new(Fake::default());
    let app = Router::new()
        .route("/v1/projects/:project/topics", get(list_topics))
        .route("/v1/projects/:project/topics/:topic", get(get_topic))
        .route(
            "/v1/projects/:project/locations/:location/clusters/:cluster",
            get(get_cluster),
        )
        .route(
            "/v1/projects/:project/locations/:location/keyRings/:ring",
            get(get_key_ring),
        )
        .route(
            "/compute/v1/projects/:project/zones/:zone/instances",
            get(list_instances),
        )
        .route(
            "/compute/v1/projects/:project/zones/:zone/instances/:name",
            get(denied_instance),
        )
        .route(
            "/compute/v1/projects/:project/zones/:zone/operations/:op",
            get(zone_operation),
        )
        .route("/upload/storage/v1/b/:bucket/o", post(upload))
        .fallback(custom_methods)
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GcpClientConfig::new("sample-project", Credentials::AccessToken("test-token".into()))
        .with_endpoint_override(format!("http://{}", addr));
    (GcpClient::new(config).unwrap(), fake)
}

#[tokio::test]
async fn topic_exists_maps_not_found_to_false() {
    let (mut client, _) = spawn_fake().await;
    assert!(PubSubClient::topic_exists(&mut client, "sample-project", "present")
        .await
        .unwrap());
    assert!(!PubSubClient::topic_exists(&mut client, "sample-project", "test-topic")
        .await
        .unwrap());
}

#[tokio::test]
async fn api_errors_are_parsed_and_named() {
    let (mut client, _) = spawn_fake().await;
    let err = ComputeClient::get_instance(&mut client, "sample-project", "us-central1-a", "vm-1")
        .await
        .map_err(|e| e.with_method("Instances.Get"))
        .unwrap_err();
    assert_eq!(err.code, 403);
    assert_eq!(err.status, "PERMISSION_DENIED");
    assert_eq!(err.service, "compute");
    assert!(err.to_string().starts_with("Instances.Get: "));
}

#[tokio::test]
async fn pages_are_followed() {
    let (mut client, _) = spawn_fake().await;
    let instances = ComputeClient::list_instances(&mut client, "sample-project", "us-central1-a")
        .await
        .unwrap();
    let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["vm-1", "vm-2", "vm-3"]);
}

#[tokio::test]
async fn operations_are_polled_until_done() {
    let (mut client, fake) = spawn_fake().await;
    let op = ComputeClient::wait_for_zone_operation(
        &mut client,
        "sample-project",
        "us-central1-a",
        "operation-1",
        5,
        Duration::from_millis(5),
    )
    .await
    .unwrap();
    assert!(op.is_done());
    assert_eq!(fake.operation_polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn operation_polling_gives_up() {
    let (mut client, fake) = spawn_fake().await;
    let err = ComputeClient::wait_for_zone_operation(
        &mut client,
        "sample-project",
        "us-central1-a",
        "operation-1",
        2,
        Duration::from_millis(5),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, "DEADLINE_EXCEEDED");
    assert_eq!(fake.operation_polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn last_unsuccessful_poll_does_not_sleep() {
    let (mut client, fake) = spawn_fake().await;
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ComputeClient::wait_for_zone_operation(
            &mut client,
            "sample-project",
            "us-central1-a",
            "operation-1",
            1,
            Duration::from_secs(30),
        ),
    )
    .await
    .expect("gave up without waiting out the poll interval");
    assert_eq!(result.unwrap_err().status, "DEADLINE_EXCEEDED");
    assert_eq!(fake.operation_polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn single_operation_read() {
    let (mut client, fake) = spawn_fake().await;
    let op = ComputeClient::get_zone_operation(&mut client, "sample-project", "us-central1-a", "operation-7")
        .await
        .unwrap();
    assert_eq!(op.name, "operation-7");
    assert!(!op.is_done());
    assert_eq!(fake.operation_polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn topics_are_listed_across_pages() {
    let (mut client, _) = spawn_fake().await;
    let topics = PubSubClient::list_topics(&mut client, "sample-project").await.unwrap();
    let ids: Vec<&str> = topics.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn cluster_is_fetched_by_name() {
    let (mut client, _) = spawn_fake().await;
    let cluster = GkeClient::get_cluster(&mut client, "sample-project", "us-central1", "samples")
        .await
        .unwrap();
    assert_eq!(cluster.name, "samples");
    assert_eq!(cluster.location, "us-central1");
    assert_eq!(cluster.status, "RUNNING");
    assert_eq!(cluster.current_node_count, 3);

    let err = GkeClient::get_cluster(&mut client, "sample-project", "us-central1", "missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn key_ring_is_fetched_by_resource_name() {
    let (mut client, _) = spawn_fake().await;
    let name = "projects/sample-project/locations/us-east1/keyRings/gdca-ring";
    let ring = KmsClient::get_key_ring(&mut client, name).await.unwrap();
    assert_eq!(ring.name, name);
    assert!(ring.create_time.is_some());
}

#[tokio::test]
async fn log_entries_are_listed_newest_first() {
    let (mut client, fake) = spawn_fake().await;
    let entries = LoggingClient::list_entries(
        &mut client,
        "sample-project",
        Some("logName=\"projects/sample-project/logs/my-log\""),
        10,
    )
    .await
    .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text_payload.as_deref(), Some("Goodbye, world!"));
    assert_eq!(entries[0].severity.as_deref(), Some("ERROR"));

    let queries = fake.log_queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["resourceNames"], json!(["projects/sample-project"]));
    assert_eq!(queries[0]["orderBy"], "timestamp desc");
    assert_eq!(queries[0]["pageSize"], 10);
    assert_eq!(queries[0]["filter"], "logName=\"projects/sample-project/logs/my-log\"");
}

#[tokio::test]
async fn upload_sends_customer_supplied_key() {
    let (mut client, _) = spawn_fake().await;
    let key = EncryptionKey::generate();
    let options = UploadOptions {
        content_type: Some("text/plain".into()),
        encryption_key: Some(key.clone()),
        kms_key_name: None,
    };
    let object = StorageClient::upload_object(
        &mut client,
        "sample-bucket",
        "foo/secret.txt",
        bytes::Bytes::from_static(b"top secret"),
        &options,
    )
    .await
    .unwrap();
    assert_eq!(object.name, "foo/secret.txt");
    assert_eq!(object.size, "10");
    assert_eq!(object.generation_number(), 1_700_000_000_000_001);
    assert_eq!(
        object.customer_encryption.unwrap().key_sha256,
        key.sha256_base64()
    );
}
