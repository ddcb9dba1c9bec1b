//! Process tree construction and manipulation.
//!
//! Builds a forest under a synthetic root from the parent PID relation.

use std::collections::{HashMap, HashSet};

use super::record::ProcessRecord;
use super::sort::SortKey;

/// A node in the process tree. Only the synthetic root has no process.
#[derive(Debug, Clone)]
pub struct ProcessTreeNode {
    pub process: Option<ProcessRecord>,
    pub children: Vec<ProcessTreeNode>,
    pub depth: usize,
    /// Sort weight: subtree sum for numeric keys
    pub weight: f64,
}

impl ProcessTreeNode {
    pub fn is_root(&self) -> bool {
        self.process.is_none()
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid)
    }

    /// Number of processes in this subtree
    pub fn len(&self) -> usize {
        usize::from(!self.is_root()) + self.children.iter().map(|c| c.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct TreeBuilder<'a> {
    processes: &'a [ProcessRecord],
    children: HashMap<u32, Vec<usize>>,
    visited: HashSet<usize>,
    key: SortKey,
}

impl TreeBuilder<'_> {
    /// Recursively build a tree node
    fn build_node(&mut self, index: usize, depth: usize) -> ProcessTreeNode {
        self.visited.insert(index);
        let processes = self.processes;
        let process = &processes[index];

        let mut children = Vec::new();
        let child_indexes = self.children.get(&process.pid).cloned().unwrap_or_default();
        for child in child_indexes {
            if !self.visited.contains(&child) {
                children.push(self.build_node(child, depth + 1));
            }
        }
        sort_children(&mut children, self.key);

        let own = self.key.number(process).unwrap_or(0.0);
        let weight = if self.key.is_textual() {
            own
        } else {
            own + children.iter().map(|c| c.weight).sum::<f64>()
        };

        ProcessTreeNode {
            process: Some(process.clone()),
            children,
            depth,
            weight,
        }
    }
}

fn sort_children(children: &mut [ProcessTreeNode], key: SortKey) {
    if key.is_textual() {
        children.sort_by(|a, b| {
            let left = a.process.as_ref().and_then(|p| key.text(p)).unwrap_or("~");
            let right = b.process.as_ref().and_then(|p| key.text(p)).unwrap_or("~");
            left.to_lowercase().cmp(&right.to_lowercase())
        });
    } else {
        children.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    }
}

/// Build the process forest under a synthetic root.
///
/// Processes whose parent is not in the list, or that are their own parent,
/// hang off the root. Members of a parent cycle are attached to the root at
/// the first member encountered.
pub fn build_process_tree(processes: &[ProcessRecord], key: SortKey) -> ProcessTreeNode {
    let index_by_pid: HashMap<u32, usize> = processes
        .iter()
        .enumerate()
        .map(|(i, p)| (p.pid, i))
        .collect();

    // Group processes by parent PID
    let mut children: HashMap<u32, Vec<usize>> = HashMap::new();
    let mut top_level = Vec::new();
    for (i, process) in processes.iter().enumerate() {
        match process.ppid {
            Some(ppid) if ppid != process.pid && index_by_pid.contains_key(&ppid) => {
                children.entry(ppid).or_default().push(i);
            }
            _ => top_level.push(i),
        }
    }

    let mut builder = TreeBuilder {
        processes,
        children,
        visited: HashSet::new(),
        key,
    };

    let mut roots = Vec::new();
    for index in top_level {
        roots.push(builder.build_node(index, 0));
    }
    for index in 0..processes.len() {
        if !builder.visited.contains(&index) {
            roots.push(builder.build_node(index, 0));
        }
    }
    sort_children(&mut roots, key);

    ProcessTreeNode {
        process: None,
        weight: roots.iter().map(|r| r.weight).sum(),
        children: roots,
        depth: 0,
    }
}

/// A flattened process with indentation information
#[derive(Debug, Clone)]
pub struct FlattenedProcess {
    pub process: ProcessRecord,
    /// PID of the tree parent, `None` for top-level processes
    pub parent: Option<u32>,
    pub depth: usize,
    pub is_last: bool,
    pub parent_chain: Vec<bool>, // For drawing tree lines
}

/// Flatten a process tree into display order, skipping the synthetic root
pub fn flatten_tree(root: &ProcessTreeNode) -> Vec<FlattenedProcess> {
    let mut result = Vec::new();
    let count = root.children.len();
    for (i, node) in root.children.iter().enumerate() {
        flatten_node(node, None, &mut result, i + 1 == count, Vec::new());
    }
    result
}

fn flatten_node(
    node: &ProcessTreeNode,
    parent: Option<u32>,
    result: &mut Vec<FlattenedProcess>,
    is_last: bool,
    mut parent_chain: Vec<bool>,
) {
    let Some(process) = &node.process else {
        return;
    };

    result.push(FlattenedProcess {
        process: process.clone(),
        parent,
        depth: node.depth,
        is_last,
        parent_chain: parent_chain.clone(),
    });

    if !node.children.is_empty() {
        if node.depth > 0 {
            parent_chain.push(is_last);
        }
        let num_children = node.children.len();

        for (i, child) in node.children.iter().enumerate() {
            let child_is_last = i == num_children - 1;
            flatten_node(
                child,
                Some(process.pid),
                result,
                child_is_last,
                parent_chain.clone(),
            );
        }
    }
}

/// Generate tree indentation string (like htop)
pub fn format_tree_indent(flattened: &FlattenedProcess) -> String {
    let mut indent = String::new();

    for &is_parent_last in &flattened.parent_chain {
        if is_parent_last {
            indent.push_str("  ");
        } else {
            indent.push_str("│ ");
        }
    }

    if flattened.depth > 0 {
        if flattened.is_last {
            indent.push_str("└─");
        } else {
            indent.push_str("├─");
        }
    }

    indent
}
