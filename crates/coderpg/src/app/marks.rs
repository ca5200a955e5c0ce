//! Mark orchestration: validate, load, mutate, persist, record.

use std::sync::Arc;

use crate::domain::errors::{MarkError, StoreError};
use crate::domain::model::{MarkKind, RangeSet, RepoRef};
use crate::domain::ranges;
use crate::infra::kv::{KeyValueStore, marked_paths_key, ranges_key};

/// Applies mark events against the store and answers mark queries.
///
/// Handlers are stateless; every operation is an independent
/// read-modify-write against the store. Two concurrent events on the same
/// file can race between load and save, and the later save wins — that is
/// the accepted consistency model, not a defect to paper over here.
pub struct MarkService {
    store: Arc<dyn KeyValueStore>,
}

impl MarkService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Apply one mark event and return the file's updated range set.
    ///
    /// The path is recorded in the marked-path set unconditionally, even
    /// when the event empties the range set: once marked, always marked.
    /// There is no transaction across the save and the record; a crash
    /// between the two leaves the path unrecorded until the next event on
    /// it repairs the set.
    pub async fn mark_range(
        &self,
        repo: &RepoRef,
        path: &str,
        start: u32,
        end: u32,
        kind: MarkKind,
    ) -> Result<RangeSet, MarkError> {
        validate_repo(repo)?;
        validate_path(path)?;
        if start < 1 {
            return Err(MarkError::InvalidRequest(
                "line numbers are 1-based".to_owned(),
            ));
        }
        if start > end {
            return Err(MarkError::InvalidRequest(format!(
                "range start {start} is past its end {end}"
            )));
        }

        let existing = self.load_ranges(repo, path).await?;
        let updated = ranges::apply(&existing, start, end, kind);

        let encoded = serde_json::to_string(&updated).map_err(StoreError::from)?;
        self.store.set(&ranges_key(repo, path), &encoded).await?;
        self.store
            .add_to_set(&marked_paths_key(repo), path)
            .await?;

        Ok(updated)
    }

    /// Current range set for one file; empty if the file was never marked.
    pub async fn get_marks(&self, repo: &RepoRef, path: &str) -> Result<RangeSet, MarkError> {
        validate_repo(repo)?;
        validate_path(path)?;
        self.load_ranges(repo, path).await
    }

    /// Every path of the snapshot that ever received a mark event,
    /// drained from the store's scan cursor until it signals completion.
    pub async fn marked_files(&self, repo: &RepoRef) -> Result<Vec<String>, MarkError> {
        validate_repo(repo)?;

        let key = marked_paths_key(repo);
        let mut paths = Vec::new();
        let mut cursor: Option<u64> = None;
        // An empty page with a non-zero cursor keeps the loop going; only
        // the zero sentinel ends the scan.
        while cursor != Some(0) {
            let page = self.store.scan_set(&key, cursor.unwrap_or(0)).await?;
            paths.extend(page.members);
            cursor = Some(page.next_cursor);
        }
        Ok(paths)
    }

    async fn load_ranges(&self, repo: &RepoRef, path: &str) -> Result<RangeSet, MarkError> {
        let key = ranges_key(repo, path);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(RangeSet::new());
        };
        match serde_json::from_str(&raw) {
            Ok(set) => Ok(set),
            Err(err) => {
                // Unreadable stored value degrades to "never marked"
                // rather than failing the request.
                tracing::warn!(%key, error = %err, "stored ranges unreadable, treating as empty");
                Ok(RangeSet::new())
            }
        }
    }
}

fn validate_repo(repo: &RepoRef) -> Result<(), MarkError> {
    for (field, value) in [
        ("owner", &repo.owner),
        ("repo", &repo.repo),
        ("tag", &repo.tag),
    ] {
        if value.trim().is_empty() {
            return Err(MarkError::InvalidRequest(format!("missing {field}")));
        }
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), MarkError> {
    if path.trim().is_empty() {
        return Err(MarkError::InvalidRequest("missing path".to_owned()));
    }
    Ok(())
}
