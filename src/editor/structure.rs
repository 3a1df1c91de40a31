//! Structural checks over the editor's flat node map.

use std::collections::{BTreeMap, HashMap};

use crate::types::{NodeMap, StructuralError};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Every structural problem in `nodes` given the ordered `roots`: unknown
/// roots, roots that name a parent, dangling parent and child references,
/// parent links that do not match the child lists, duplicate references,
/// orphans and cycles.
#[must_use]
pub fn check_structure(nodes: &NodeMap, roots: &[String]) -> Vec<StructuralError> {
    let mut errors = Vec::new();

    let mut references: BTreeMap<&str, usize> = BTreeMap::new();
    for root in roots {
        match nodes.get(root) {
            None => errors.push(StructuralError::UnknownNode(root.clone())),
            Some(node) => {
                if let Some(parent) = &node.parent_id {
                    errors.push(StructuralError::RootWithParent {
                        node: root.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        *references.entry(root.as_str()).or_default() += 1;
    }

    for (id, node) in nodes {
        for child in node.child_ids() {
            *references.entry(child).or_default() += 1;
            match nodes.get(child) {
                None => errors.push(StructuralError::DanglingChild {
                    parent: id.clone(),
                    child: child.to_owned(),
                }),
                Some(listed) if listed.parent_id.as_deref() != Some(id.as_str()) => {
                    errors.push(StructuralError::UnclaimedChild {
                        parent: id.clone(),
                        child: child.to_owned(),
                    });
                }
                Some(_) => {}
            }
        }

        if let Some(parent_id) = &node.parent_id {
            match nodes.get(parent_id) {
                None => errors.push(StructuralError::DanglingParent {
                    node: id.clone(),
                    parent: parent_id.clone(),
                }),
                Some(parent) if !parent.child_ids().any(|c| c == id) => {
                    errors.push(StructuralError::ParentMismatch {
                        node: id.clone(),
                        parent: parent_id.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    for (id, count) in &references {
        if *count > 1 {
            errors.push(StructuralError::DuplicateReference((*id).to_owned()));
        }
    }
    for id in nodes.keys() {
        if !references.contains_key(id.as_str()) {
            errors.push(StructuralError::Orphan(id.clone()));
        }
    }

    let mut marks = HashMap::new();
    for id in nodes.keys() {
        if !marks.contains_key(id.as_str()) {
            find_cycles(id, nodes, &mut marks, &mut errors);
        }
    }

    errors
}

fn child_ids<'a>(nodes: &'a NodeMap, id: &str) -> std::vec::IntoIter<&'a str> {
    let ids: Vec<&'a str> = nodes
        .get(id)
        .map(|node| node.child_ids().collect())
        .unwrap_or_default();
    ids.into_iter()
}

/// Depth-first walk from `root` with an explicit stack, reporting each back
/// edge as a cycle.
fn find_cycles<'a>(
    root: &'a str,
    nodes: &'a NodeMap,
    marks: &mut HashMap<&'a str, Mark>,
    errors: &mut Vec<StructuralError>,
) {
    marks.insert(root, Mark::InProgress);
    let mut path = vec![root];
    let mut pending = vec![child_ids(nodes, root)];

    while let Some(children) = pending.last_mut() {
        let Some(child) = children.next() else {
            pending.pop();
            if let Some(done) = path.pop() {
                marks.insert(done, Mark::Done);
            }
            continue;
        };
        match marks.get(child) {
            Some(Mark::InProgress) => {
                let start = path.iter().position(|s| *s == child).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|s| (*s).to_owned()).collect();
                cycle.push(child.to_owned());
                errors.push(StructuralError::Cycle { path: cycle });
            }
            Some(Mark::Done) => {}
            None if nodes.contains_key(child) => {
                marks.insert(child, Mark::InProgress);
                path.push(child);
                pending.push(child_ids(nodes, child));
            }
            None => {}
        }
    }
}
