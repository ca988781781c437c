//! Structural validation for trees that did not come from the pure
//! operations (typically a persisted layout).
//!
//! Ratios need no check here: [`PaneSplit`](crate::PaneSplit) clamps them on
//! construction and on deserialization.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::id::PaneId;
use crate::node::PaneNode;

/// A violated pane-tree invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneTreeError {
    /// Two nodes share an id.
    DuplicateNodeId { node_id: PaneId },
    /// An id is empty or lacks the `"<prefix>_<n>"` numeric suffix.
    MalformedNodeId { node_id: PaneId },
    /// An id's numeric suffix is `u64::MAX`, leaving no room to mint after it.
    ExhaustedNodeId { node_id: PaneId },
}

impl fmt::Display for PaneTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate pane node id {node_id}"),
            Self::MalformedNodeId { node_id } => write!(
                f,
                "pane node id '{node_id}' is not of the form <prefix>_<n>"
            ),
            Self::ExhaustedNodeId { node_id } => {
                write!(f, "pane node id {node_id} leaves no room for new ids")
            }
        }
    }
}

impl std::error::Error for PaneTreeError {}

/// Check every structural invariant of `tree`, reporting the first
/// violation in pre-order.
pub fn check_tree(tree: &PaneNode) -> Result<(), PaneTreeError> {
    let mut seen = FxHashSet::default();
    check_node(tree, &mut seen)
}

fn check_node<'a>(
    node: &'a PaneNode,
    seen: &mut FxHashSet<&'a PaneId>,
) -> Result<(), PaneTreeError> {
    let id = node.id();
    match id.split_suffix() {
        None => {
            return Err(PaneTreeError::MalformedNodeId {
                node_id: id.clone(),
            });
        }
        Some((_, u64::MAX)) => {
            return Err(PaneTreeError::ExhaustedNodeId {
                node_id: id.clone(),
            });
        }
        Some(_) => {}
    }
    if !seen.insert(id) {
        return Err(PaneTreeError::DuplicateNodeId {
            node_id: id.clone(),
        });
    }
    match node {
        PaneNode::Leaf(_) => Ok(()),
        PaneNode::Split(split) => {
            check_node(split.first(), seen)?;
            check_node(split.second(), seen)
        }
    }
}
