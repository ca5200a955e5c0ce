//! Domain models for line-range marks and remote file trees.

use serde::{Deserialize, Serialize};

/// One inclusive run of 1-based line numbers, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Inclusive overlap: the two runs share at least one line. A run
    /// ending exactly one line before `start` does not overlap.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.end >= start && self.start <= end
    }
}

/// Ordered collection of pairwise-disjoint [`Range`]s for one file.
///
/// Sorted ascending by `start`, and consecutive ranges never touch
/// (`a.end < b.start`). Ranges that become adjacent through separate mark
/// events are deliberately left unfused: `[5,10]` and `[11,15]` stay two
/// entries. Serializes as a bare JSON array of `{start, end}` objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet(Vec<Range>);

impl RangeSet {
    /// The empty set: the state of any file before its first mark event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary ranges, restoring the sort order.
    ///
    /// Callers are responsible for disjointness; this only re-establishes
    /// the ordering invariant.
    pub fn from_ranges(mut ranges: Vec<Range>) -> Self {
        ranges.sort_by_key(|r| r.start);
        Self(ranges)
    }

    pub fn ranges(&self) -> &[Range] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the set honors its invariant: sorted ascending and strictly
    /// disjoint (no overlap, no touching) between consecutive ranges.
    pub fn is_disjoint_sorted(&self) -> bool {
        self.0.windows(2).all(|pair| pair[0].end < pair[1].start)
    }
}

/// What a mark event says about the selected lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    /// The reader understood these lines.
    Got,
    /// The reader no longer (or never) understood these lines.
    NotGot,
}

/// Identifies one snapshot of a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub tag: String,
}

impl RepoRef {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            tag: tag.into(),
        }
    }

    /// `owner/repo/tag`, the key used for process-local listing caches.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.owner, self.repo, self.tag)
    }
}

/// One row of a recursive remote tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub url: String,
}

/// Git object kind of a listing row. Submodule commits and anything else
/// unexpected land in `Other` and are ignored by the tree builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Tree,
    Blob,
    #[serde(other)]
    Other,
}

/// Node of the built file tree, annotated with mark status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FileTreeNode {
    Directory(DirectoryNode),
    File(FileNode),
}

impl FileTreeNode {
    pub fn name(&self) -> &str {
        match self {
            FileTreeNode::Directory(dir) => &dir.name,
            FileTreeNode::File(file) => &file.name,
        }
    }

    pub fn has_marked_content(&self) -> bool {
        match self {
            FileTreeNode::Directory(dir) => dir.has_marked_content,
            FileTreeNode::File(file) => file.has_marked_content,
        }
    }
}

/// Directory node owning its children in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
    pub children: Vec<FileTreeNode>,
    pub has_marked_content: bool,
}

/// File node carrying its origin path and blob URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub url: String,
    pub has_marked_content: bool,
}
