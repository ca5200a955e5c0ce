//! End-to-end flows over the in-memory store and a canned code host,
//! both at the service layer and over real HTTP.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use coderpg::app::marks::MarkService;
use coderpg::app::repo::RepoBrowser;
use coderpg::domain::errors::UpstreamError;
use coderpg::domain::model::{EntryKind, MarkKind, Range, RemoteEntry, RepoRef};
use coderpg::infra::github::CodeHost;
use coderpg::infra::http::{AppState, router};
use coderpg::infra::kv::MemoryStore;

struct CannedHost;

#[async_trait]
impl CodeHost for CannedHost {
    async fn list_files(&self, _repo: &RepoRef) -> Result<Vec<RemoteEntry>, UpstreamError> {
        let entry = |path: &str, kind| RemoteEntry {
            path: path.to_owned(),
            kind,
            url: format!("https://canned.test/{path}"),
        };
        Ok(vec![
            entry("README.md", EntryKind::Blob),
            entry("src", EntryKind::Tree),
            entry("src/lib.rs", EntryKind::Blob),
            entry("src/main.rs", EntryKind::Blob),
        ])
    }

    async fn read_blob(&self, url: &str) -> Result<String, UpstreamError> {
        Ok(format!("blob at {url}"))
    }
}

fn app_state() -> Arc<AppState> {
    Arc::new(AppState {
        marks: MarkService::new(Arc::new(MemoryStore::new())),
        repos: RepoBrowser::new(Arc::new(CannedHost)),
    })
}

fn repo() -> RepoRef {
    RepoRef::new("octo", "demo", "main")
}

#[tokio::test]
async fn mark_query_and_aggregate_round_trip() {
    let state = app_state();

    let updated = state
        .marks
        .mark_range(&repo(), "src/lib.rs", 5, 10, MarkKind::Got)
        .await
        .unwrap();
    assert_eq!(updated.ranges(), &[Range::new(5, 10)]);

    // Carve the middle out, then confirm the stored set reflects it.
    state
        .marks
        .mark_range(&repo(), "src/lib.rs", 7, 8, MarkKind::NotGot)
        .await
        .unwrap();
    let current = state.marks.get_marks(&repo(), "src/lib.rs").await.unwrap();
    assert_eq!(current.ranges(), &[Range::new(5, 6), Range::new(9, 10)]);

    let marked: HashSet<String> = state
        .marks
        .marked_files(&repo())
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(marked, HashSet::from(["src/lib.rs".to_owned()]));

    let tree = state.repos.tree(&repo(), &marked).await.unwrap();
    let src = tree
        .children
        .iter()
        .find(|c| c.name() == "src")
        .expect("src dir");
    assert!(src.has_marked_content());
    let readme = tree
        .children
        .iter()
        .find(|c| c.name() == "README.md")
        .expect("readme");
    assert!(!readme.has_marked_content());
}

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let state = app_state();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_api_round_trip() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/v1.file.mark"))
        .json(&serde_json::json!({
            "owner": "octo", "repo": "demo", "tag": "main",
            "path": "src/lib.rs", "start": 5, "end": 10, "type": "got"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], serde_json::json!([{"start": 5, "end": 10}]));
    assert!(body["errorMessage"].is_null());

    let res = client
        .post(format!("{base}/api/v1.file.getmarks"))
        .json(&serde_json::json!({
            "owner": "octo", "repo": "demo", "tag": "main", "path": "src/lib.rs"
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], serde_json::json!([{"start": 5, "end": 10}]));

    let res = client
        .post(format!("{base}/api/v1.repo.getmarkedfiles"))
        .json(&serde_json::json!({"owner": "octo", "repo": "demo", "tag": "main"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], serde_json::json!(["src/lib.rs"]));

    let res = client
        .post(format!("{base}/api/v1.repo.gettree"))
        .json(&serde_json::json!({"owner": "octo", "repo": "demo", "tag": "main"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let nodes = body["data"].as_array().expect("tree children");
    let src = nodes
        .iter()
        .find(|n| n["name"] == "src")
        .expect("src node");
    assert_eq!(src["type"], "directory");
    assert_eq!(src["hasMarkedContent"], true);
    let readme = nodes
        .iter()
        .find(|n| n["name"] == "README.md")
        .expect("readme node");
    assert_eq!(readme["type"], "file");
    assert_eq!(readme["hasMarkedContent"], false);
}

#[tokio::test]
async fn http_listing_and_blob_endpoints() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{base}/api/v1.repo.getfiles?owner=octo&repo=demo&tag=main"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    let files = body["data"].as_array().expect("listing");
    assert_eq!(files.len(), 4);
    assert_eq!(files[1]["type"], "tree");

    let res = client
        .get(format!(
            "{base}/api/v1.repo.readfile?url=https://canned.test/README.md"
        ))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], "blob at https://canned.test/README.md");
}

#[tokio::test]
async fn http_rejects_inverted_ranges_with_an_enveloped_400() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/v1.file.mark"))
        .json(&serde_json::json!({
            "owner": "octo", "repo": "demo", "tag": "main",
            "path": "src/lib.rs", "start": 10, "end": 5, "type": "got"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["data"].is_null());
    assert_eq!(body["errorCode"], "invalid_request");
    assert!(
        body["errorMessage"]
            .as_str()
            .expect("message")
            .contains("start")
    );

    // Nothing was persisted for the rejected event.
    let res = client
        .post(format!("{base}/api/v1.repo.getmarkedfiles"))
        .json(&serde_json::json!({"owner": "octo", "repo": "demo", "tag": "main"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], serde_json::json!([]));
}
