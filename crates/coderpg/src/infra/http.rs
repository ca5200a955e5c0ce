//! HTTP surface: axum router, request shapes, and the response envelope.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use crate::app::marks::MarkService;
use crate::app::repo::RepoBrowser;
use crate::domain::errors::MarkError;
use crate::domain::model::{FileTreeNode, MarkKind, RangeSet, RemoteEntry, RepoRef};

/// Shared state behind every handler.
pub struct AppState {
    pub marks: MarkService,
    pub repos: RepoBrowser,
}

/// Uniform response envelope: a success carries `data`, a failure carries
/// `errorCode` and `errorMessage`. Degraded-but-valid payloads (for
/// example an empty range set after a deserialization fallback) are
/// successes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

fn ok_response<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            data: Some(data),
            error_code: None,
            error_message: None,
        }),
    )
        .into_response()
}

fn error_response(err: &MarkError) -> Response {
    let (status, code) = match err {
        MarkError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        MarkError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
        MarkError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
    };
    (
        status,
        Json(Envelope::<()> {
            data: None,
            error_code: Some(code.to_owned()),
            error_message: Some(err.to_string()),
        }),
    )
        .into_response()
}

fn respond<T: Serialize>(result: Result<T, MarkError>) -> Response {
    match result {
        Ok(data) => ok_response(data),
        Err(err) => {
            tracing::debug!(error = %err, "request failed");
            error_response(&err)
        }
    }
}

/// Body of `v1.file.mark`. Line numbers arrive as wide integers so that
/// out-of-range values reach our validation instead of a bare 422.
#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    #[serde(flatten)]
    pub repo: RepoRef,
    pub path: String,
    pub start: i64,
    pub end: i64,
    #[serde(rename = "type")]
    pub kind: MarkKind,
}

/// Body of `v1.file.getmarks`.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(flatten)]
    pub repo: RepoRef,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    pub url: String,
}

fn line_number(value: i64, field: &str) -> Result<u32, MarkError> {
    u32::try_from(value)
        .map_err(|_| MarkError::InvalidRequest(format!("{field} {value} is not a valid line")))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1.repo.getfiles", get(get_files))
        .route("/api/v1.repo.readfile", get(read_file))
        .route("/api/v1.repo.gettree", post(get_tree))
        .route("/api/v1.repo.getmarkedfiles", post(get_marked_files))
        .route("/api/v1.file.mark", post(mark_file))
        .route("/api/v1.file.getmarks", post(get_marks))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "coderpg listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn get_files(
    State(state): State<Arc<AppState>>,
    Query(repo): Query<RepoRef>,
) -> Response {
    let result: Result<Vec<RemoteEntry>, MarkError> = state
        .repos
        .list_files(&repo)
        .await
        .map(|listing| listing.as_ref().clone());
    respond(result)
}

async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BlobQuery>,
) -> Response {
    respond(state.repos.read_blob(&query.url).await)
}

async fn get_tree(
    State(state): State<Arc<AppState>>,
    Json(repo): Json<RepoRef>,
) -> Response {
    let result: Result<Vec<FileTreeNode>, MarkError> = async {
        let marked: HashSet<String> = state
            .marks
            .marked_files(&repo)
            .await?
            .into_iter()
            .collect();
        let root = state.repos.tree(&repo, &marked).await?;
        Ok(root.children)
    }
    .await;
    respond(result)
}

async fn get_marked_files(
    State(state): State<Arc<AppState>>,
    Json(repo): Json<RepoRef>,
) -> Response {
    respond(state.marks.marked_files(&repo).await)
}

async fn mark_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MarkRequest>,
) -> Response {
    let result: Result<RangeSet, MarkError> = async {
        let start = line_number(request.start, "start")?;
        let end = line_number(request.end, "end")?;
        state
            .marks
            .mark_range(&request.repo, &request.path, start, end, request.kind)
            .await
    }
    .await;
    respond(result)
}

async fn get_marks(
    State(state): State<Arc<AppState>>,
    Json(query): Json<FileQuery>,
) -> Response {
    respond(state.marks.get_marks(&query.repo, &query.path).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{StoreError, UpstreamError};
    use crate::domain::model::Range;

    #[test]
    fn success_envelope_uses_camel_case_and_null_errors() {
        let envelope = Envelope {
            data: Some(RangeSet::from_ranges(vec![Range::new(1, 2)])),
            error_code: None,
            error_message: None,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"data":[{"start":1,"end":2}],"errorCode":null,"errorMessage":null}"#
        );
    }

    #[test]
    fn error_kinds_map_to_distinct_statuses() {
        let cases = [
            (
                MarkError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MarkError::Store(StoreError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                MarkError::Upstream(UpstreamError("403".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).status(), expected);
        }
    }

    #[test]
    fn mark_request_accepts_the_wire_shape() {
        let request: MarkRequest = serde_json::from_str(
            r#"{"owner":"octo","repo":"demo","tag":"main",
                "path":"src/lib.rs","start":5,"end":10,"type":"not-got"}"#,
        )
        .unwrap();
        assert_eq!(request.repo.owner, "octo");
        assert_eq!(request.kind, MarkKind::NotGot);
        assert_eq!(request.start, 5);
    }

    #[test]
    fn negative_lines_become_invalid_request() {
        let err = line_number(-3, "start").unwrap_err();
        assert!(matches!(err, MarkError::InvalidRequest(_)));
    }
}
