//! Building a file tree from a flat remote listing and rolling mark
//! status up its directories.

use std::collections::HashSet;

use crate::domain::model::{DirectoryNode, EntryKind, FileNode, FileTreeNode, RemoteEntry};

/// Build the tree for a recursive listing.
///
/// The directory skeleton is materialized first, so every path prefix
/// exists before any file is attached. Files are attached second; a file
/// whose parent directory is missing from the listing attaches to the
/// deepest ancestor that could be resolved instead of failing the build.
pub fn build_tree(entries: &[RemoteEntry]) -> DirectoryNode {
    let mut root = DirectoryNode::default();

    for entry in entries.iter().filter(|e| e.kind == EntryKind::Tree) {
        let mut cursor = &mut root;
        let mut prefix = String::new();
        for part in entry.path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            cursor = ensure_child_dir(cursor, part, &prefix);
        }
    }

    for entry in entries.iter().filter(|e| e.kind == EntryKind::Blob) {
        let mut parts: Vec<&str> = entry.path.split('/').collect();
        let Some(name) = parts.pop() else {
            continue;
        };
        let file = FileNode {
            name: name.to_owned(),
            path: entry.path.clone(),
            url: entry.url.clone(),
            has_marked_content: false,
        };
        attach_file(&mut root, &parts, file);
    }

    root
}

/// Descend along `parts` as far as the skeleton allows and attach the
/// file there. A missing intermediate directory stops the descent rather
/// than failing the build.
fn attach_file(dir: &mut DirectoryNode, parts: &[&str], file: FileNode) {
    if let Some((head, rest)) = parts.split_first()
        && let Some(idx) = child_dir_index(dir, head)
    {
        let FileTreeNode::Directory(child) = &mut dir.children[idx] else {
            unreachable!("child_dir_index only matches directories");
        };
        return attach_file(child, rest, file);
    }
    dir.children.push(FileTreeNode::File(file));
}

/// Set `has_marked_content` on every node under `root`.
///
/// Post-order: a file is marked iff its path is in `marked`; a directory
/// is marked iff any child is. Order of children is irrelevant to the
/// result. Returns whether any descendant of `root` is marked.
pub fn annotate(root: &mut DirectoryNode, marked: &HashSet<String>) -> bool {
    let mut any = false;
    for child in &mut root.children {
        let flag = annotate_node(child, marked);
        any = any || flag;
    }
    root.has_marked_content = any;
    any
}

fn annotate_node(node: &mut FileTreeNode, marked: &HashSet<String>) -> bool {
    match node {
        FileTreeNode::File(file) => {
            file.has_marked_content = marked.contains(&file.path);
            file.has_marked_content
        }
        FileTreeNode::Directory(dir) => annotate(dir, marked),
    }
}

fn ensure_child_dir<'a>(
    parent: &'a mut DirectoryNode,
    name: &str,
    path: &str,
) -> &'a mut DirectoryNode {
    let idx = match child_dir_index(parent, name) {
        Some(idx) => idx,
        None => {
            parent.children.push(FileTreeNode::Directory(DirectoryNode {
                name: name.to_owned(),
                path: path.to_owned(),
                children: Vec::new(),
                has_marked_content: false,
            }));
            parent.children.len() - 1
        }
    };
    let FileTreeNode::Directory(dir) = &mut parent.children[idx] else {
        unreachable!("child_dir_index only matches directories");
    };
    dir
}

fn child_dir_index(parent: &DirectoryNode, name: &str) -> Option<usize> {
    parent
        .children
        .iter()
        .position(|child| matches!(child, FileTreeNode::Directory(dir) if dir.name == name))
}
