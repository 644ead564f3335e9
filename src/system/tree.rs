//! Gold-tree validation shared by the oracles and the dependency composer.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use super::state::UNSET;
use crate::error::{Error, Result};

/// Parent array turned inside out: one root, ordered child lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildLists {
    pub root: usize,
    /// Children of every node in ascending id order.
    pub children: Vec<Vec<usize>>,
}

impl ChildLists {
    /// Validate `parents` (`UNSET` marks the root) and index children.
    ///
    /// Fails on out-of-range parents, zero or several roots, and cycles.
    pub fn from_parents(parents: &[usize]) -> Result<Self> {
        let len = parents.len();
        let mut root = None;
        let mut children = vec![Vec::new(); len];
        for (node, &parent) in parents.iter().enumerate() {
            if parent == UNSET {
                if let Some(first) = root {
                    return Err(Error::MultipleRoots {
                        first,
                        second: node,
                    });
                }
                root = Some(node);
            } else if parent >= len {
                return Err(Error::ParentOutOfRange { node, parent, len });
            } else {
                children[parent].push(node);
            }
        }
        let root = root.ok_or(Error::MissingRoot)?;

        let graph: DiGraph<(), ()> = DiGraph::from_edges(
            parents
                .iter()
                .enumerate()
                .filter(|(_, &p)| p != UNSET)
                .map(|(node, &p)| (p as u32, node as u32)),
        );
        if is_cyclic_directed(&graph) {
            return Err(Error::CyclicTree);
        }

        Ok(Self { root, children })
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Distance from the root, per node.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.len()];
        let mut frontier = vec![self.root];
        while let Some(node) = frontier.pop() {
            for &child in &self.children[node] {
                depths[child] = depths[node] + 1;
                frontier.push(child);
            }
        }
        depths
    }
}
