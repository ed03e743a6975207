//! Tree operations over a project's file forest.
//!
//! The forest is an ordered sequence of [`FileNode`] trees. All mutation goes
//! through the functions here, which is what keeps the structural invariants
//! (files never carry children, folders always do, ids are unique) intact.
//! Mutation happens in place under exclusive ownership; traversal is pre-order
//! depth-first throughout, and the first id match wins.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{FileKind, FileNode};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("parent folder not found")]
    ParentNotFound,
    #[error("node not found")]
    NodeNotFound,
    #[error("a sibling with that name already exists")]
    NameTaken,
}

/// Whether sibling nodes may share a name.
///
/// Duplicate names are legal in the tree itself but make flattened paths
/// collide (last writer wins in [`flatten`]), so callers that feed a previewer
/// may prefer to reject them outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    #[default]
    AllowDuplicates,
    RejectDuplicates,
}

/// Appends `node` at the root when `parent_id` is `None`, otherwise into the
/// children of the matching folder. The forest is untouched when an error is
/// returned.
pub fn insert(
    forest: &mut Vec<FileNode>,
    parent_id: Option<&str>,
    node: FileNode,
    policy: NamePolicy,
) -> Result<(), TreeError> {
    let siblings = match parent_id {
        None => forest,
        Some(pid) => {
            let parent = find_mut(forest, pid).ok_or(TreeError::ParentNotFound)?;
            // A file has no children sequence, so a file parent is rejected here.
            parent.children.as_mut().ok_or(TreeError::ParentNotFound)?
        }
    };
    if policy == NamePolicy::RejectDuplicates && siblings.iter().any(|n| n.name == node.name) {
        return Err(TreeError::NameTaken);
    }
    siblings.push(node);
    Ok(())
}

/// Renames the node with the given id.
pub fn rename(
    forest: &mut [FileNode],
    id: &str,
    new_name: &str,
    policy: NamePolicy,
) -> Result<(), TreeError> {
    if policy == NamePolicy::RejectDuplicates {
        let taken = siblings_of(forest, id)
            .map(|siblings| siblings.iter().any(|n| n.id != id && n.name == new_name))
            .unwrap_or(false);
        if taken {
            return Err(TreeError::NameTaken);
        }
    }
    let node = find_mut(forest, id).ok_or(TreeError::NodeNotFound)?;
    node.name = new_name.to_string();
    Ok(())
}

/// Replaces the content of the matching file node. A folder or an unknown id
/// is silently ignored: content edits must never block the editing path.
pub fn update_content(forest: &mut [FileNode], id: &str, content: &str) {
    if let Some(node) = find_mut(forest, id) {
        if node.kind == FileKind::File {
            node.content = Some(content.to_string());
        }
    }
}

/// Removes the matching node together with its entire subtree. Removing an
/// absent id is a no-op, which makes the operation idempotent.
pub fn remove(forest: &mut Vec<FileNode>, id: &str) {
    forest.retain(|n| n.id != id);
    for node in forest.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            remove(children, id);
        }
    }
}

/// Pre-order depth-first lookup by id.
pub fn find<'a>(forest: &'a [FileNode], id: &str) -> Option<&'a FileNode> {
    for node in forest {
        if node.id == id {
            return Some(node);
        }
        if let Some(children) = &node.children {
            if let Some(found) = find(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_mut<'a>(forest: &'a mut [FileNode], id: &str) -> Option<&'a mut FileNode> {
    for node in forest.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The sequence the node with `id` lives in, root sequence included.
fn siblings_of<'a>(forest: &'a [FileNode], id: &str) -> Option<&'a [FileNode]> {
    if forest.iter().any(|n| n.id == id) {
        return Some(forest);
    }
    for node in forest {
        if let Some(children) = &node.children {
            if let Some(found) = siblings_of(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The file opened by default when a project is created or loaded: the first
/// file, depth-first, under the first top-level folder.
pub fn first_file(forest: &[FileNode]) -> Option<&FileNode> {
    let folder = forest.iter().find(|n| n.is_folder())?;
    first_file_in(folder.children.as_deref().unwrap_or(&[]))
}

fn first_file_in(nodes: &[FileNode]) -> Option<&FileNode> {
    for node in nodes {
        match node.kind {
            FileKind::File => return Some(node),
            FileKind::Folder => {
                if let Some(children) = &node.children {
                    if let Some(found) = first_file_in(children) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// Flattens the forest into a `path -> content` map for the previewer.
///
/// Child paths are `<parent>/<name>`; root nodes use their bare name. Only
/// files contribute entries; folders are recursed into. When duplicate names
/// produce the same path, the later-visited node wins.
pub fn flatten(forest: &[FileNode]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(forest, "", &mut out);
    out
}

fn flatten_into(nodes: &[FileNode], prefix: &str, out: &mut BTreeMap<String, String>) {
    for node in nodes {
        let path = if prefix.is_empty() {
            node.name.clone()
        } else {
            format!("{}/{}", prefix, node.name)
        };
        if node.kind == FileKind::File {
            out.insert(path.clone(), node.content.clone().unwrap_or_default());
        }
        if let Some(children) = &node.children {
            flatten_into(children, &path, out);
        }
    }
}
