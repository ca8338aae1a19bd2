use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use service::storage::{
    google_drive::DriveStore,
    token::{AssertionClaims, ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource},
    EntryKind, FileStore, FOLDER_MIME,
};

const SERVICE_ACCOUNT: &str = include_str!("fixtures/test_service_account.json");
const PUBLIC_KEY: &str = include_str!("fixtures/test_public_key.pem");

#[derive(Debug, Clone)]
struct Seen {
    method: &'static str,
    path: String,
    query: HashMap<String, String>,
    auth: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

#[derive(Clone, Default)]
struct FakeDrive {
    seen: Arc<Mutex<Vec<Seen>>>,
    token_hits: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl FakeDrive {
    fn push(&self, method: &'static str, path: String, query: HashMap<String, String>, headers: &HeaderMap, body: &[u8]) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().unwrap().push(Seen {
            method,
            path,
            query,
            auth: header("authorization"),
            content_type: header("content-type"),
            body: body.to_vec(),
        });
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn list_files(
    State(fake): State<FakeDrive>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let second_page = q.get("pageToken").map(String::as_str) == Some("p2");
    fake.push("GET", "/drive/v3/files".into(), q, &headers, &[]);
    if second_page {
        Json(json!({"files": [{"id": "f2", "name": "Roosevelt", "mimeType": FOLDER_MIME}]}))
    } else {
        Json(json!({
            "nextPageToken": "p2",
            "files": [{"id": "f1", "name": "Lincoln High", "mimeType": FOLDER_MIME}]
        }))
    }
}

async fn create_folder(
    State(fake): State<FakeDrive>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    fake.push("POST", "/drive/v3/files".into(), q, &headers, &body);
    Json(json!({"id": "new-folder"}))
}

async fn upload(
    State(fake): State<FakeDrive>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    fake.push("POST", "/upload/drive/v3/files".into(), q, &headers, &body);
    Json(json!({"id": "new-file"}))
}

async fn read_file(
    State(fake): State<FakeDrive>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Bytes, StatusCode> {
    fake.push("GET", format!("/drive/v3/files/{id}"), q, &headers, &[]);
    match id.as_str() {
        "roster" => Ok(Bytes::from_static(br#"[{"id":1,"name":"Ann"}]"#)),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn delete_file(
    State(fake): State<FakeDrive>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> StatusCode {
    fake.push("DELETE", format!("/drive/v3/files/{id}"), q, &headers, &[]);
    StatusCode::NO_CONTENT
}

async fn token(State(fake): State<FakeDrive>, Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    fake.token_hits.lock().unwrap().push(form);
    Json(json!({"access_token": "ya29.fake", "expires_in": 3600, "token_type": "Bearer"}))
}

async fn start_fake() -> anyhow::Result<(FakeDrive, String)> {
    let fake = FakeDrive::default();
    let app = Router::new()
        .route("/drive/v3/files", get(list_files).post(create_folder))
        .route("/drive/v3/files/:id", get(read_file).delete(delete_file))
        .route("/upload/drive/v3/files", post(upload))
        .route("/token", post(token))
        .with_state(fake.clone());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("fake drive error: {}", e); }
    });
    Ok((fake, format!("http://{}", addr)))
}

fn drive(base: &str, shared_drive: Option<&str>) -> DriveStore {
    DriveStore::new(
        reqwest::Client::new(),
        Arc::new(StaticToken("test-token".into())),
        base,
        base,
        shared_drive.map(str::to_string),
    )
}

#[tokio::test]
async fn list_folders_follows_pages_and_scopes_to_shared_drive() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let store = drive(&base, Some("0ADrive"));

    let folders = store.list_folders("0ADrive").await?;
    let names: Vec<_> = folders.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Lincoln High", "Roosevelt"]);
    assert!(folders.iter().all(|e| e.kind == EntryKind::Folder));

    let seen = fake.seen();
    assert_eq!(seen.len(), 2);
    let first = &seen[0];
    assert_eq!(first.auth.as_deref(), Some("Bearer test-token"));
    assert_eq!(first.query["corpora"], "drive");
    assert_eq!(first.query["driveId"], "0ADrive");
    assert_eq!(first.query["supportsAllDrives"], "true");
    assert!(first.query["q"].contains("'0ADrive' in parents"));
    assert!(first.query["q"].contains("trashed = false"));
    assert_eq!(seen[1].query["pageToken"], "p2");
    Ok(())
}

#[tokio::test]
async fn create_folder_posts_metadata() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let store = drive(&base, None);

    assert_eq!(store.create_folder("root-1", "Lincoln High").await?, "new-folder");

    let seen = fake.seen();
    let body: Value = serde_json::from_slice(&seen[0].body)?;
    assert_eq!(body, json!({"name": "Lincoln High", "mimeType": FOLDER_MIME, "parents": ["root-1"]}));
    assert!(!seen[0].query.contains_key("driveId"));
    Ok(())
}

#[tokio::test]
async fn create_file_uploads_multipart_related() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let store = drive(&base, None);

    let id = store
        .create_file("folder-1", "students.json", "application/json", br#"[{"id":1}]"#.to_vec())
        .await?;
    assert_eq!(id, "new-file");

    let seen = fake.seen();
    let req = &seen[0];
    assert_eq!(req.path, "/upload/drive/v3/files");
    assert_eq!(req.query["uploadType"], "multipart");
    let content_type = req.content_type.clone().unwrap_or_default();
    assert!(content_type.starts_with("multipart/related; boundary="));
    let body = String::from_utf8(req.body.clone())?;
    assert!(body.contains(r#""parents":["folder-1"]"#));
    assert!(body.contains(r#"[{"id":1}]"#));
    Ok(())
}

#[tokio::test]
async fn read_and_delete_hit_file_resource() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let store = drive(&base, None);

    let bytes = store.read("roster").await?;
    let v: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(v, json!([{"id": 1, "name": "Ann"}]));
    store.delete("roster").await?;

    let seen = fake.seen();
    assert_eq!(seen[0].query["alt"], "media");
    assert_eq!(seen[1].method, "DELETE");
    assert_eq!(seen[1].path, "/drive/v3/files/roster");
    Ok(())
}

#[tokio::test]
async fn non_success_status_becomes_store_error() -> anyhow::Result<()> {
    let (_fake, base) = start_fake().await?;
    let store = drive(&base, None);

    let err = store.read("missing").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("read"), "{msg}");
    assert!(msg.contains("404"), "{msg}");
    Ok(())
}

#[tokio::test]
async fn service_account_exchange_is_cached() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let mut key = ServiceAccountKey::from_json(SERVICE_ACCOUNT)?;
    key.token_uri = format!("{base}/token");
    let source = ServiceAccountTokenSource::new(key.clone(), reqwest::Client::new())?;

    assert_eq!(source.access_token().await?, "ya29.fake");
    assert_eq!(source.access_token().await?, "ya29.fake");

    let hits = fake.token_hits.lock().unwrap().clone();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["grant_type"], "urn:ietf:params:oauth:grant-type:jwt-bearer");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[key.token_uri.as_str()]);
    let claims = decode::<AssertionClaims>(
        &hits[0]["assertion"],
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes())?,
        &validation,
    )?
    .claims;
    assert_eq!(claims.iss, key.client_email);
    assert_eq!(claims.scope, "https://www.googleapis.com/auth/drive");
    assert_eq!(claims.exp - claims.iat, 3600);
    Ok(())
}

#[tokio::test]
async fn find_queries_by_name_under_parent() -> anyhow::Result<()> {
    let (fake, base) = start_fake().await?;
    let store = drive(&base, None);

    store.find(Some("folder-1"), "students.json", EntryKind::File).await?;
    let q = fake.seen()[0].query["q"].clone();
    assert!(q.starts_with("name = 'students.json'"), "{q}");
    assert!(q.contains("'folder-1' in parents"), "{q}");
    Ok(())
}
