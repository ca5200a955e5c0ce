//! Remote repository browsing with a process-local listing cache.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::errors::MarkError;
use crate::domain::model::{DirectoryNode, RemoteEntry, RepoRef};
use crate::domain::tree;
use crate::infra::github::CodeHost;

/// Process-local cache of remote listings, keyed `owner/repo/tag`.
///
/// Lives for the process lifetime with no invalidation; separate
/// instances may serve trees staler than one another, which callers
/// accept for immutable-enough tags.
#[derive(Debug, Default)]
struct ListingCache {
    entries: DashMap<String, Arc<Vec<RemoteEntry>>>,
}

/// Read-side facade over the code host: listings, blobs, and the
/// mark-annotated tree.
pub struct RepoBrowser {
    host: Arc<dyn CodeHost>,
    cache: ListingCache,
}

impl RepoBrowser {
    pub fn new(host: Arc<dyn CodeHost>) -> Self {
        Self {
            host,
            cache: ListingCache::default(),
        }
    }

    /// Recursive listing of the snapshot, served from cache after the
    /// first fetch.
    pub async fn list_files(&self, repo: &RepoRef) -> Result<Arc<Vec<RemoteEntry>>, MarkError> {
        let key = repo.cache_key();
        if let Some(cached) = self.cache.entries.get(&key) {
            return Ok(cached.value().clone());
        }

        let listing = Arc::new(self.host.list_files(repo).await?);
        tracing::debug!(%key, entries = listing.len(), "cached remote listing");
        self.cache.entries.insert(key, listing.clone());
        Ok(listing)
    }

    /// Decoded content of one blob URL. Never cached; blobs are fetched
    /// on demand.
    pub async fn read_blob(&self, url: &str) -> Result<String, MarkError> {
        Ok(self.host.read_blob(url).await?)
    }

    /// The snapshot's file tree with `has_marked_content` filled in from
    /// the given marked paths.
    pub async fn tree(
        &self,
        repo: &RepoRef,
        marked: &HashSet<String>,
    ) -> Result<DirectoryNode, MarkError> {
        let listing = self.list_files(repo).await?;
        let mut root = tree::build_tree(&listing);
        tree::annotate(&mut root, marked);
        Ok(root)
    }
}
