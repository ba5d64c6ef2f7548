//! Fixtures against a local fake of the Storage and KMS REST surface.

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use gdca_gcp::{Credentials, GcpClient, GcpClientConfig};
use gdca_testutil::fixtures::{clean_bucket, KmsFixture};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

const PROJECT: &str = "sample-project";
const RING_PREFIX: &str = "/v1/projects/sample-project/locations/us-east1/keyRings/";

#[derive(Default)]
struct Fake {
    bucket_exists: bool,
    /// Create requests answered with 503 before the bucket "appears".
    create_failures: u32,
    creates: AtomicU32,
    events: Mutex<Vec<String>>,
}

impl Fake {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

fn error(code: StatusCode, status: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        code,
        Json(json!({ "error": { "code": code.as_u16(), "message": status.to_lowercase(), "status": status } })),
    )
}

fn ok(body: serde_json::Value) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(body))
}

async fn handle(
    State(fake): State<Arc<Fake>>,
    method: Method,
    uri: Uri,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    match (method, path.as_str()) {
        // ── Storage ──
        (Method::GET, "/storage/v1/b/scratch") if fake.bucket_exists => ok(json!({ "name": "scratch" })),
        (Method::GET, "/storage/v1/b/scratch") => error(StatusCode::NOT_FOUND, "NOT_FOUND"),
        (Method::GET, "/storage/v1/b/scratch/o") => {
            fake.record(format!("list versions={}", q.get("versions").map(String::as_str).unwrap_or("")));
            ok(json!({ "items": [
                { "name": "foo.txt", "bucket": "scratch", "generation": "1" },
                { "name": "foo.txt", "bucket": "scratch", "generation": "2" },
                { "name": "bar.txt", "bucket": "scratch", "generation": "3" }
            ] }))
        }
        (Method::DELETE, "/storage/v1/b/scratch") => {
            fake.record("delete bucket".into());
            (StatusCode::NO_CONTENT, Json(json!({})))
        }
        (Method::DELETE, object) if object.starts_with("/storage/v1/b/scratch/o/") => {
            let name = object.trim_start_matches("/storage/v1/b/scratch/o/");
            let generation = q.get("generation").cloned().unwrap_or_default();
            fake.record(format!("delete {}#{}", name, generation));
            // Already gone: a concurrent cleanup got there first.
            if name == "bar.txt" {
                error(StatusCode::NOT_FOUND, "NOT_FOUND")
            } else {
                (StatusCode::NO_CONTENT, Json(json!({})))
            }
        }
        (Method::POST, "/storage/v1/b") => {
            let n = fake.creates.fetch_add(1, Ordering::SeqCst) + 1;
            fake.record(format!("create project={}", q.get("project").map(String::as_str).unwrap_or("")));
            if n <= fake.create_failures {
                error(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
            } else if fake.bucket_exists {
                error(StatusCode::CONFLICT, "ALREADY_EXISTS")
            } else {
                ok(json!({ "name": "scratch" }))
            }
        }

        // ── KMS ──
        (Method::POST, "/v1/projects/sample-project/locations/us-east1/keyRings") => {
            let id = q.get("keyRingId").cloned().unwrap_or_default();
            fake.record("create ring".into());
            ok(json!({ "name": format!("projects/{}/locations/us-east1/keyRings/{}", PROJECT, id) }))
        }
        (Method::GET, p) if p.starts_with(RING_PREFIX) && p.ends_with("/cryptoKeys") => {
            let ring = p.trim_start_matches("/v1/").trim_end_matches("/cryptoKeys");
            fake.record("list keys".into());
            ok(json!({ "cryptoKeys": [
                { "name": format!("{}/cryptoKeys/k1", ring) },
                { "name": format!("{}/cryptoKeys/k2", ring) }
            ] }))
        }
        (Method::GET, p) if p.starts_with(RING_PREFIX) && p.ends_with("/cryptoKeyVersions") => {
            let key = p.trim_start_matches("/v1/").trim_end_matches("/cryptoKeyVersions");
            let filter = q.get("filter").cloned().unwrap_or_default();
            fake.record(format!("list versions of {} filter={}", tail(key), filter));
            let versions = if key.ends_with("/k1") { vec!["1", "2"] } else { vec!["1"] };
            let versions: Vec<serde_json::Value> = versions
                .into_iter()
                .map(|v| json!({ "name": format!("{}/cryptoKeyVersions/{}", key, v), "state": "ENABLED" }))
                .collect();
            ok(json!({ "cryptoKeyVersions": versions }))
        }
        (Method::POST, p) if p.starts_with(RING_PREFIX) && p.ends_with(":destroy") => {
            let version = p.trim_start_matches("/v1/").trim_end_matches(":destroy");
            fake.record(format!("destroy {}", tail_version(version)));
            ok(json!({ "name": version, "state": "DESTROY_SCHEDULED" }))
        }

        _ => error(StatusCode::NOT_FOUND, "NOT_FOUND"),
    }
}

/// `k1` from `.../cryptoKeys/k1`.
fn tail(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `k1/1` from `.../cryptoKeys/k1/cryptoKeyVersions/1`.
fn tail_version(name: &str) -> String {
    let parts: Vec<&str> = name.rsplit('/').collect();
    format!("{}/{}", parts[2], parts[0])
}

async fn spawn_fake(fake: Fake) -> (GcpClient, Arc<Fake>) {
    let fake = Arc::new(fake);
    let app = Router::new().fallback(handle).with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GcpClientConfig::new(PROJECT, Credentials::AccessToken("test-token".into()))
        .with_endpoint_override(format!("http://{}", addr));
    (GcpClient::new(config).unwrap(), fake)
}

#[tokio::test]
async fn clean_bucket_deletes_every_version_before_the_bucket() {
    let (client, fake) = spawn_fake(Fake {
        bucket_exists: true,
        create_failures: 1,
        ..Default::default()
    })
    .await;

    // The first create is answered 503 and retried after the create interval.
    clean_bucket(&client, PROJECT, "scratch").await.unwrap();

    assert_eq!(
        fake.events(),
        vec![
            "list versions=true",
            "delete foo.txt#1",
            "delete foo.txt#2",
            "delete bar.txt#3",
            "delete bucket",
            "create project=sample-project",
            "create project=sample-project",
        ]
    );
}

#[tokio::test]
async fn clean_bucket_creates_a_missing_bucket() {
    let (client, fake) = spawn_fake(Fake::default()).await;

    clean_bucket(&client, PROJECT, "scratch").await.unwrap();

    assert_eq!(fake.events(), vec!["create project=sample-project"]);
    assert_eq!(fake.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn kms_cleanup_destroys_enabled_versions() {
    let (client, fake) = spawn_fake(Fake::default()).await;

    let mut fixture = KmsFixture::new(&client, PROJECT).await.unwrap();
    assert!(fixture
        .key_ring_name
        .starts_with("projects/sample-project/locations/us-east1/keyRings/gdca-"));

    fixture.cleanup().await.unwrap();

    assert_eq!(
        fake.events(),
        vec![
            "create ring",
            "list keys",
            "list versions of k1 filter=state=ENABLED",
            "destroy k1/1",
            "destroy k1/2",
            "list versions of k2 filter=state=ENABLED",
            "destroy k2/1",
        ]
    );
}
