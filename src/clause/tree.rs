//! Assembles flat `(id, parent_id)` clause records into a nested tree.
//!
//! The tree is rebuilt from scratch on every read. Edits happen on the flat
//! records; nothing here mutates an assembled tree except the render-time
//! sibling sort.

use super::id::compare_clause_labels;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Cycle detected among clauses {ids:?}")]
    CycleDetected { ids: Vec<String> },
    #[error("Clause '{id}' appears more than once in the tree")]
    DuplicateId { id: String },
    #[error("Clause '{id}' references missing parent '{parent_id}'")]
    DanglingParent { id: String, parent_id: String },
}

/// A clause as stored: flat and order independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
}

impl ClauseRecord {
    pub fn new(id: &str, parent_id: Option<&str>, title: &str) -> Self {
        Self {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub children: Vec<ClauseNode>,
}

impl ClauseNode {
    fn from_record(record: &ClauseRecord, children: Vec<ClauseNode>) -> Self {
        Self {
            id: record.id.clone(),
            parent_id: record.parent_id.clone(),
            title: record.title.clone(),
            children,
        }
    }

    fn to_record(&self) -> ClauseRecord {
        ClauseRecord {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            title: self.title.clone(),
        }
    }
}

// Nested drops would recurse once per level.
impl Drop for ClauseNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// One open node on the explicit DFS stack.
struct Frame<'a> {
    record: &'a ClauseRecord,
    cursor: usize,
    children: Vec<ClauseNode>,
}

/// Builds the forest hanging under `root_parent` (`None` = document roots).
///
/// Traversal is iterative so deep chains cannot exhaust the call stack. An id
/// that reappears while one of its own descendants is being expanded is a
/// cycle. A full build (`root_parent == None`) must account for every record;
/// a subtree build ignores records outside the subtree unless they loop.
pub fn build_tree(
    records: &[ClauseRecord],
    root_parent: Option<&str>,
) -> Result<Vec<ClauseNode>, TreeError> {
    // 1. Group record indices by parent, preserving input order.
    let mut by_parent: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        by_parent.entry(record.parent_id.as_deref()).or_default().push(i);
    }

    let mut roots = Vec::new();
    let mut visited = vec![false; records.len()];
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::new();

    // 2. Depth-first assembly, one root at a time.
    let root_indices = by_parent.get(&root_parent).cloned().unwrap_or_default();
    for root_idx in root_indices {
        let mut stack: Vec<Frame> = Vec::new();
        enter(records, root_idx, &mut stack, &mut visited, &mut seen_ids, &mut on_path)?;

        while let Some(top) = stack.last_mut() {
            let child_idx = by_parent
                .get(&Some(top.record.id.as_str()))
                .and_then(|children| children.get(top.cursor))
                .copied();

            match child_idx {
                Some(idx) => {
                    top.cursor += 1;
                    enter(records, idx, &mut stack, &mut visited, &mut seen_ids, &mut on_path)?;
                }
                None => {
                    // All children are done: close this node and hand it upwards.
                    let Some(frame) = stack.pop() else { break };
                    on_path.remove(frame.record.id.as_str());
                    let node = ClauseNode::from_record(frame.record, frame.children);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => roots.push(node),
                    }
                }
            }
        }
    }

    // 3. Account for records the traversal never reached.
    check_unreached(records, &visited, root_parent.is_none())?;

    tracing::debug!(records = records.len(), roots = roots.len(), "clause tree assembled");
    Ok(roots)
}

fn enter<'a>(
    records: &'a [ClauseRecord],
    idx: usize,
    stack: &mut Vec<Frame<'a>>,
    visited: &mut [bool],
    seen_ids: &mut HashSet<&'a str>,
    on_path: &mut HashSet<&'a str>,
) -> Result<(), TreeError> {
    let record = &records[idx];
    let id = record.id.as_str();

    if on_path.contains(id) {
        let mut ids: Vec<String> = stack.iter().map(|f| f.record.id.clone()).collect();
        if let Some(start) = ids.iter().position(|x| x == id) {
            ids.drain(..start);
        }
        return Err(TreeError::CycleDetected { ids });
    }
    if !seen_ids.insert(id) {
        return Err(TreeError::DuplicateId { id: id.to_string() });
    }

    visited[idx] = true;
    on_path.insert(id);
    stack.push(Frame { record, cursor: 0, children: Vec::new() });
    Ok(())
}

/// Unreached records either sit on a parent loop that never touches the root
/// (e.g. a record that is its own parent) or hang off a missing parent.
fn check_unreached(
    records: &[ClauseRecord],
    visited: &[bool],
    require_all: bool,
) -> Result<(), TreeError> {
    let unreached: Vec<&ClauseRecord> = records
        .iter()
        .zip(visited)
        .filter(|(_, seen)| !**seen)
        .map(|(record, _)| record)
        .collect();
    if unreached.is_empty() {
        return Ok(());
    }

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for record in &unreached {
        graph.add_node(record.id.as_str());
        if let Some(parent) = record.parent_id.as_deref() {
            graph.add_edge(parent, record.id.as_str(), ());
        }
    }

    for component in tarjan_scc(&graph) {
        let is_loop = component.len() > 1
            || component.first().map_or(false, |&n| graph.contains_edge(n, n));
        if is_loop {
            let mut ids: Vec<String> = component.iter().map(|s| s.to_string()).collect();
            ids.sort();
            return Err(TreeError::CycleDetected { ids });
        }
    }

    if require_all {
        let known: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for record in &unreached {
            let parent_id = record.parent_id.clone().unwrap_or_default();
            if !known.contains(parent_id.as_str()) {
                return Err(TreeError::DanglingParent { id: record.id.clone(), parent_id });
            }
        }
        // Every unreached record descends from another unreached one; the
        // chain must end at a dangling record, reported above.
        let first = unreached[0];
        return Err(TreeError::DanglingParent {
            id: first.id.clone(),
            parent_id: first.parent_id.clone().unwrap_or_default(),
        });
    }

    Ok(())
}

/// Depth-first, pre-order flattening; the inverse of [`build_tree`].
pub fn flatten(tree: &[ClauseNode]) -> Vec<ClauseRecord> {
    let mut out = Vec::new();
    let mut stack: Vec<&ClauseNode> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.to_record());
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Finds a node anywhere in the forest.
pub fn find_node<'a>(tree: &'a [ClauseNode], id: &str) -> Option<&'a ClauseNode> {
    let mut stack: Vec<&ClauseNode> = tree.iter().collect();
    while let Some(node) = stack.pop() {
        if node.id == id {
            return Some(node);
        }
        stack.extend(node.children.iter());
    }
    None
}

/// Orders siblings at every level by clause number (render time only).
pub fn sort_siblings(tree: &mut [ClauseNode]) {
    let mut levels: Vec<&mut [ClauseNode]> = vec![tree];
    while let Some(level) = levels.pop() {
        level.sort_by(|a, b| compare_clause_labels(&a.id, &b.id));
        for node in level {
            levels.push(node.children.as_mut_slice());
        }
    }
}
