//! Conversions between the flat (map + id references) and embedded forms of a
//! rule tree.

use std::collections::{BTreeMap, HashSet};

use super::error::StructuralError;
use super::node::{ChildEntry, RuleNode};
use super::spec::MAX_NESTING_DEPTH;

/// Flat node storage keyed by node id.
pub type NodeMap = BTreeMap<String, RuleNode>;

/// Materialize the subtree rooted at `root_id` into a single embedded tree.
///
/// Child ids are looked up in `nodes`; children that are already embedded are
/// kept and their own children resolved the same way. Every child gets its
/// `parent_id` set to the node that contains it.
///
/// # Errors
///
/// Returns [`StructuralError`] if the root or a referenced child is missing,
/// if the references form a cycle, or if the tree nests deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn build_complete_tree(root_id: &str, nodes: &NodeMap) -> Result<RuleNode, StructuralError> {
    let root = nodes
        .get(root_id)
        .ok_or_else(|| StructuralError::UnknownNode(root_id.to_owned()))?;
    let mut stack = Vec::new();
    materialize(root, nodes, &mut stack)
}

fn materialize(
    node: &RuleNode,
    nodes: &NodeMap,
    stack: &mut Vec<String>,
) -> Result<RuleNode, StructuralError> {
    if stack.iter().any(|id| *id == node.id) {
        let mut path = stack.clone();
        path.push(node.id.clone());
        return Err(StructuralError::Cycle { path });
    }
    if stack.len() >= MAX_NESTING_DEPTH {
        return Err(StructuralError::TooDeep {
            node: node.id.clone(),
            limit: MAX_NESTING_DEPTH,
        });
    }
    stack.push(node.id.clone());

    let mut out = RuleNode {
        children: Vec::with_capacity(node.children.len()),
        ..node.clone()
    };
    for entry in &node.children {
        let mut child = match entry {
            ChildEntry::Id(child_id) => {
                let child = nodes
                    .get(child_id)
                    .ok_or_else(|| StructuralError::DanglingChild {
                        parent: node.id.clone(),
                        child: child_id.clone(),
                    })?;
                materialize(child, nodes, stack)?
            }
            ChildEntry::Node(embedded) => materialize(embedded, nodes, stack)?,
        };
        child.parent_id = Some(node.id.clone());
        out.children.push(ChildEntry::Node(Box::new(child)));
    }

    stack.pop();
    Ok(out)
}

/// Flatten embedded trees into a node map plus the ordered root list.
///
/// Parent ids are assigned while descending and embedded children are
/// replaced by their ids. Children that were already plain ids are kept as
/// they are. If two nodes share an id the later one wins.
#[must_use]
pub fn flatten(roots: &[RuleNode]) -> (NodeMap, Vec<String>) {
    let mut map = NodeMap::new();
    let mut root_ids = Vec::with_capacity(roots.len());
    for root in roots {
        root_ids.push(root.id.clone());
        flatten_into(root, None, &mut map);
    }
    (map, root_ids)
}

/// Flatten one embedded tree into an existing map under `parent`.
pub(crate) fn flatten_into(node: &RuleNode, parent: Option<&str>, map: &mut NodeMap) {
    let mut flat = RuleNode {
        children: Vec::with_capacity(node.children.len()),
        parent_id: parent.map(str::to_owned),
        ..node.clone()
    };
    for entry in &node.children {
        match entry {
            ChildEntry::Id(id) => flat.children.push(ChildEntry::Id(id.clone())),
            ChildEntry::Node(child) => {
                flat.children.push(ChildEntry::Id(child.id.clone()));
                flatten_into(child, Some(&node.id), map);
            }
        }
    }
    map.insert(flat.id.clone(), flat);
}

/// Ids of `root` and every node below it in a flat map. Stops at ids that are
/// missing or already visited.
pub(crate) fn subtree_ids(root: &str, nodes: &NodeMap) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = nodes.get(id) {
            pending.extend(node.child_ids());
            out.push(id.to_owned());
        }
    }
    out
}
