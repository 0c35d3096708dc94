//! End-to-end HTTP tests against a server bound to an ephemeral port.

use elephant_api::{router, ApiConfig, AppState};
use elephant_store::Store;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    client: Client,
    dir: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn upload(&self, name: &str, mime: &str, bytes: &[u8]) -> Value {
        let form = Form::new().part(
            "files",
            Part::bytes(bytes.to_vec())
                .file_name(name.to_string())
                .mime_str(mime)
                .unwrap(),
        );
        let resp = self
            .client
            .post(self.url("/api/media/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap()
    }

    async fn link(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/relationships"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

async fn spawn_with(config: impl FnOnce(&mut ApiConfig)) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let mut api_config = ApiConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    config(&mut api_config);

    let store = Store::open(api_config.store_config()).await.unwrap();
    let app = router(AppState::new(store, api_config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        client: Client::new(),
        dir,
    }
}

async fn spawn() -> TestServer {
    spawn_with(|_| {}).await
}

// ============================================================================
// SYSTEM
// ============================================================================

#[tokio::test]
async fn test_health() {
    let server = spawn().await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].is_number());
}

#[tokio::test]
async fn test_status_lists_endpoints() {
    let server = spawn().await;
    let body: Value = server
        .client
        .get(server.url("/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "running");
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "POST /api/relationships"));
}

// ============================================================================
// AUTH
// ============================================================================

#[tokio::test]
async fn test_login_verify_and_users() {
    let server = spawn().await;

    let users: Value = server
        .client
        .get(server.url("/api/auth/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users["users"].as_array().unwrap().len(), 2);
    assert!(users["users"][0].get("passwordHash").is_none());

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "userId": "friend1", "password": "friend1password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = resp.json().await.unwrap();
    let token = login["token"].as_str().unwrap().to_string();
    assert_eq!(login["user"]["name"], "Friend 1");

    let verify: Value = server
        .client
        .get(server.url("/api/auth/verify"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verify["valid"], true);
    assert_eq!(verify["user"]["userId"], "friend1");
}

#[tokio::test]
async fn test_login_errors() {
    let server = spawn().await;

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "userId": "friend1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "userId": "friend1", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid password");

    let resp = server
        .client
        .get(server.url("/api/auth/verify"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .get(server.url("/api/auth/verify"))
        .bearer_auth("forged.token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_auth_required_rejects_anonymous_writes() {
    let server = spawn_with(|c| c.auth_required = true).await;
    let resp = server
        .link(json!({ "itemA": 1, "itemB": 2, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let login: Value = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "userId": "friend1", "password": "friend1password" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap().to_string();

    for name in ["a.png", "b.png"] {
        let form = Form::new().part("files", Part::bytes(b"x".to_vec()).file_name(name));
        let resp = server
            .client
            .post(server.url("/api/media/upload"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = server
        .client
        .post(server.url("/api/relationships"))
        .bearer_auth(&token)
        .json(&json!({ "itemA": 1, "itemB": 2, "relationshipType": "similar" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let put = server
        .client
        .put(server.url("/api/relationships/1/2"))
        .json(&json!({ "relationshipType": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::UNAUTHORIZED);

    let delete = server
        .client
        .delete(server.url("/api/relationships/1/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::UNAUTHORIZED);

    let patch = server
        .client
        .patch(server.url("/api/media/1"))
        .json(&json!({ "title": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patch.status(), StatusCode::UNAUTHORIZED);

    // Reads stay open and show nothing changed
    let link: Value = server
        .client
        .get(server.url("/api/relationships/2/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(link["relationship"]["relationshipType"], "similar");
    let item: Value = server
        .client
        .get(server.url("/api/media/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(item["item"].get("title").map_or(true, Value::is_null));

    let put = server
        .client
        .put(server.url("/api/relationships/1/2"))
        .bearer_auth(&token)
        .json(&json!({ "relationshipType": "sequel" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);
}

// ============================================================================
// MEDIA
// ============================================================================

#[tokio::test]
async fn test_upload_with_metadata_and_serve_payload() {
    let server = spawn().await;

    let form = Form::new()
        .text("title_cat.png", "My cat")
        .text("tags_cat.png", "pet, orange")
        .part(
            "files",
            Part::bytes(b"cat-bytes".to_vec())
                .file_name("cat.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .part(
            "files",
            Part::bytes(b"notes".to_vec())
                .file_name("notes")
                .mime_str("text/plain")
                .unwrap(),
        );
    let body: Value = server
        .client
        .post(server.url("/api/media/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert!(body.get("errors").is_none());
    let cat = &body["uploaded"][0];
    assert_eq!(cat["id"], 1);
    assert_eq!(cat["filename"], "1.png");
    assert_eq!(cat["title"], "My cat");
    assert_eq!(cat["tags"], json!(["pet", "orange"]));
    assert_eq!(cat["uploadedBy"], "friend1");
    assert_eq!(cat["fileSize"], 9);
    assert!(cat["temporalContext"]["dayOfWeek"].is_string());
    assert_eq!(body["uploaded"][1]["filename"], "2.bin");

    let payload = server
        .client
        .get(server.url("/media/1.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(payload.status(), StatusCode::OK);
    assert_eq!(payload.bytes().await.unwrap().as_ref(), b"cat-bytes");
}

#[tokio::test]
async fn test_failed_upload_reports_generic_error_and_leaves_no_entry() {
    let server = spawn().await;

    // A plain file where media/ should be makes payload placement fail
    let media_dir = server.dir.path().join("media");
    std::fs::remove_dir_all(&media_dir).unwrap();
    std::fs::write(&media_dir, b"not a directory").unwrap();
    let root = server.dir.path().to_string_lossy().to_string();

    let body = server.upload("a.png", "image/png", b"bytes").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["uploaded"], json!([]));
    assert_eq!(body["errors"][0]["filename"], "a.png");
    assert_eq!(body["errors"][0]["error"], "Failed to store file");
    let raw = body.to_string();
    assert!(!raw.contains(&root));

    let list: Value = server
        .client
        .get(server.url("/api/media"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);
    let missing = server
        .client
        .get(server.url("/api/media/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_files_is_bad_request() {
    let server = spawn().await;
    let form = Form::new().text("title_x", "nothing attached");
    let resp = server
        .client
        .post(server.url("/api/media/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_over_size_limit_is_rejected() {
    let server = spawn_with(|c| c.max_file_size = 8).await;
    let form = Form::new().part(
        "files",
        Part::bytes(vec![0u8; 64]).file_name("big.bin"),
    );
    let resp = server
        .client
        .post(server.url("/api/media/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let list: Value = server
        .client
        .get(server.url("/api/media"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_upload_acts_as_token_user() {
    let server = spawn().await;
    let login: Value = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "userId": "friend2", "password": "friend2password" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    let form = Form::new().part("files", Part::bytes(b"x".to_vec()).file_name("a.txt"));
    let body: Value = server
        .client
        .post(server.url("/api/media/upload"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["uploaded"][0]["uploadedBy"], "friend2");
}

#[tokio::test]
async fn test_get_and_patch_media() {
    let server = spawn().await;
    server.upload("a.jpg", "image/jpeg", b"a").await;

    let resp = server
        .client
        .get(server.url("/api/media/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .get(server.url("/api/media/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let patched: Value = server
        .client
        .patch(server.url("/api/media/1"))
        .json(&json!({ "description": "sunset", "tags": "sky, red" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(patched["item"]["description"], "sunset");
    assert_eq!(patched["item"]["tags"], json!(["sky", "red"]));
    assert_eq!(patched["item"]["filename"], "1.jpg");

    let fetched: Value = server
        .client
        .get(server.url("/api/media/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["item"], patched["item"]);
}

#[tokio::test]
async fn test_list_and_timeline() {
    let server = spawn().await;
    server.upload("a.png", "image/png", b"1").await;
    server.upload("b.mp4", "video/mp4", b"2").await;
    server.upload("c.png", "image/png", b"3").await;

    let list: Value = server
        .client
        .get(server.url("/api/media"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["count"], 3);
    assert_eq!(list["items"][0]["id"], 3);

    let timeline: Value = server
        .client
        .get(server.url("/api/media/timeline?mimeType=image/&limit=1&page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(timeline["items"].as_array().unwrap().len(), 1);
    assert_eq!(timeline["items"][0]["id"], 1);
    assert_eq!(timeline["pagination"]["total"], 2);
    assert_eq!(timeline["pagination"]["totalPages"], 2);
    assert_eq!(timeline["pagination"]["hasPrev"], true);
    assert_eq!(timeline["pagination"]["hasNext"], false);
    assert_eq!(timeline["groupedByDate"].as_object().unwrap().len(), 1);
}

// ============================================================================
// RELATIONSHIPS
// ============================================================================

#[tokio::test]
async fn test_relationship_validation() {
    let server = spawn().await;
    server.upload("a.png", "image/png", b"1").await;

    let resp = server.link(json!({ "itemA": 1 })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .link(json!({ "itemA": "1", "itemB": 2, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .link(json!({ "itemA": 1, "itemB": 1, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Cannot create relationship between the same item");

    let resp = server
        .link(json!({ "itemA": 1, "itemB": 9, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .link(json!({ "itemA": 0, "itemB": 1, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Missing required fields: itemA, itemB, relationshipType"
    );

    server.upload("b.png", "image/png", b"2").await;
    let resp = server
        .link(json!({ "itemA": 2.0, "itemB": 1.0, "relationshipType": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["relationship"]["itemA"], 2);
    assert_eq!(body["relationship"]["itemB"], 1);

    let resp = server
        .client
        .get(server.url("/api/relationships/x/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_relationship_walkthrough() {
    let server = spawn().await;
    server.upload("one.png", "image/png", b"1").await;
    server.upload("two.png", "image/png", b"2").await;

    let resp = server
        .link(json!({
            "itemA": 2,
            "itemB": 1,
            "relationshipType": " same trip ",
            "strength": 5,
            "tags": [" beach "]
        }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let rel = &created["relationship"];
    assert_eq!(rel["relationshipType"], "same trip");
    assert_eq!(rel["strength"], 1.0);
    assert_eq!(rel["bidirectional"], true);
    assert_eq!(rel["tags"], json!(["beach"]));
    assert_eq!(rel["createdBy"], "friend1");

    let resp = server
        .link(json!({ "itemA": 1, "itemB": 2, "relationshipType": "other" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let conflict: Value = resp.json().await.unwrap();
    assert_eq!(conflict["relationship"], *rel);

    let forward: Value = server
        .client
        .get(server.url("/api/relationships/1/2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let backward: Value = server
        .client
        .get(server.url("/api/relationships/2/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(forward["relationship"], backward["relationship"]);

    let updated: Value = server
        .client
        .put(server.url("/api/relationships/1/2"))
        .json(&json!({ "tags": ["x", "y"], "strength": "loud" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["relationship"]["tags"], json!(["x", "y"]));
    assert_eq!(updated["relationship"]["strength"], 1.0);
    assert_eq!(updated["relationship"]["itemA"], 2);
    assert_eq!(updated["relationship"]["createdAt"], rel["createdAt"]);

    let listed: Value = server
        .client
        .get(server.url("/api/relationships?itemId=2&relationshipType=TRIP"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);

    let graph: Value = server
        .client
        .get(server.url("/api/relationships/graph"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["graph"]["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(graph["graph"]["edges"].as_array().unwrap().len(), 1);

    let resp = server
        .client
        .delete(server.url("/api/relationships/2/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = server
        .client
        .delete(server.url("/api/relationships/2/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let graph: Value = server
        .client
        .get(server.url("/api/relationships/graph"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["graph"], json!({ "nodes": [], "edges": [] }));
}

#[tokio::test]
async fn test_update_missing_relationship_is_not_found() {
    let server = spawn().await;
    let resp = server
        .client
        .put(server.url("/api/relationships/1/2"))
        .json(&json!({ "tags": ["x"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Relationship not found");
}
