//! Key-value store collaborator: the contract the mark engine needs,
//! plus the in-process implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::errors::StoreError;
use crate::domain::model::RepoRef;

/// Upper bound on members returned per scan page.
const SCAN_PAGE: usize = 64;

/// Key holding the serialized range set of one file.
pub fn ranges_key(repo: &RepoRef, path: &str) -> String {
    format!(
        "ranges:{}/{}/{}/{}",
        repo.owner, repo.repo, path, repo.tag
    )
}

/// Key holding the per-snapshot set of paths that ever received a mark.
pub fn marked_paths_key(repo: &RepoRef) -> String {
    format!("marked-paths:{}/{}/{}", repo.owner, repo.repo, repo.tag)
}

/// One page of a set scan.
///
/// `next_cursor == 0` signals completion; a non-zero cursor paired with an
/// empty `members` page is legal and means "keep scanning".
#[derive(Debug, Default)]
pub struct ScanPage {
    pub next_cursor: u64,
    pub members: Vec<String>,
}

/// Minimal string/set store contract (SSCAN-shaped cursors).
///
/// All writes are last-writer-wins; there is no optimistic concurrency
/// token anywhere in this contract.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Overwrites unconditionally.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Idempotent set-membership add.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError>;
    /// Scan one page of a set. Start with cursor `0`; feed each
    /// `next_cursor` back until it comes back as `0`.
    async fn scan_set(&self, key: &str, cursor: u64) -> Result<ScanPage, StoreError>;
}

/// In-process store for single-instance deployments and tests.
///
/// State lives for the process only; two instances never see each other's
/// writes. Scans walk the set in sorted order with the cursor as an
/// offset, so members added mid-scan may or may not be observed, the same
/// loose guarantee a networked SSCAN gives.
#[derive(Debug, Default)]
pub struct MemoryStore {
    strings: DashMap<String, String>,
    sets: DashMap<String, BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.strings.get(key).map(|value| value.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.strings.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }

    async fn scan_set(&self, key: &str, cursor: u64) -> Result<ScanPage, StoreError> {
        let Some(set) = self.sets.get(key) else {
            return Ok(ScanPage::default());
        };
        let offset = usize::try_from(cursor)
            .map_err(|_| StoreError::UnexpectedShape(format!("scan cursor {cursor}")))?;
        let members: Vec<String> = set.iter().skip(offset).take(SCAN_PAGE).cloned().collect();
        let consumed = offset + members.len();
        let next_cursor = if consumed >= set.len() {
            0
        } else {
            consumed as u64
        };
        Ok(ScanPage {
            next_cursor,
            members,
        })
    }
}
