//! Pure pane-tree transformations.
//!
//! Every function here takes a tree handle and returns a tree handle. Nodes
//! are never mutated in place: the path from the root to a changed node is
//! rebuilt, and every other subtree is shared with the input by pointer.
//! When nothing changes, the input handle itself is returned, so callers can
//! detect a no-op with [`Arc::ptr_eq`].
//!
//! Unknown ids are not errors. UI gestures routinely race with structural
//! edits (a drop arriving after its source pane was closed), so a missing
//! target simply leaves the tree as it was.

use std::collections::HashSet;
use std::hash::BuildHasher;
use std::sync::Arc;

use tracing::warn;

use crate::id::{AgentId, PaneId, PaneIdGenerator, ProjectId};
use crate::node::{
    DEFAULT_SPLIT_RATIO, PaneLeaf, PaneNode, PaneSplit, SplitDirection, SplitPosition,
    clamp_ratio,
};

/// Mint a new leaf under `prefix`.
pub fn create_leaf(
    ids: &mut PaneIdGenerator,
    prefix: &str,
    agent_id: Option<AgentId>,
    project_id: Option<ProjectId>,
) -> Arc<PaneNode> {
    let leaf = PaneLeaf::new(ids.mint(prefix)).with_assignment(agent_id, project_id);
    Arc::new(PaneNode::Leaf(leaf))
}

/// Re-assemble `split` with new children, reusing `node` when both children
/// are the originals.
fn rebuild_split(
    node: &Arc<PaneNode>,
    split: &PaneSplit,
    first: Arc<PaneNode>,
    second: Arc<PaneNode>,
) -> Arc<PaneNode> {
    if Arc::ptr_eq(&first, split.first()) && Arc::ptr_eq(&second, split.second()) {
        return Arc::clone(node);
    }
    Arc::new(PaneNode::Split(split.with_children(first, second)))
}

/// Apply `f` to the node whose id is `id` and rebuild its ancestors.
///
/// Ids are unique, so once the first child reports a change the second child
/// is not searched.
fn update_node<F>(node: &Arc<PaneNode>, id: &str, f: &mut F) -> Arc<PaneNode>
where
    F: FnMut(&Arc<PaneNode>) -> Arc<PaneNode>,
{
    if node.id() == id {
        return f(node);
    }
    let PaneNode::Split(split) = node.as_ref() else {
        return Arc::clone(node);
    };
    let first = update_node(split.first(), id, f);
    if !Arc::ptr_eq(&first, split.first()) {
        return rebuild_split(node, split, first, Arc::clone(split.second()));
    }
    let second = update_node(split.second(), id, f);
    rebuild_split(node, split, first, second)
}

/// Apply `f` to every leaf. `f` returns `Some(replacement)` to change a leaf
/// or `None` to keep it; only branches containing a replaced leaf are
/// rebuilt.
pub fn map_leaves<F>(tree: &Arc<PaneNode>, f: &mut F) -> Arc<PaneNode>
where
    F: FnMut(&PaneLeaf) -> Option<PaneLeaf>,
{
    match tree.as_ref() {
        PaneNode::Leaf(leaf) => match f(leaf) {
            Some(next) => Arc::new(PaneNode::Leaf(next)),
            None => Arc::clone(tree),
        },
        PaneNode::Split(split) => {
            let first = map_leaves(split.first(), f);
            let second = map_leaves(split.second(), f);
            rebuild_split(tree, split, first, second)
        }
    }
}

/// Split the leaf `pane_id`, returning the new tree and the id of the leaf
/// that was added.
///
/// The new leaf is minted before the wrapping split, so a fresh generator
/// splitting `hub_1` yields leaf `hub_2` inside split `hub_3`. When
/// `pane_id` is not a leaf of `tree`, or the generator cannot mint two more
/// ids for `prefix`, nothing is minted and the input is returned with `None`.
pub fn split_pane_with_new_leaf(
    tree: &Arc<PaneNode>,
    pane_id: &str,
    direction: SplitDirection,
    ids: &mut PaneIdGenerator,
    prefix: &str,
    position: SplitPosition,
) -> (Arc<PaneNode>, Option<PaneId>) {
    if tree.find_leaf(pane_id).is_none() {
        return (Arc::clone(tree), None);
    }
    if !ids.can_mint(prefix, 2) {
        warn!(prefix, pane_id, "pane id counter exhausted; split refused");
        return (Arc::clone(tree), None);
    }
    let new_leaf = create_leaf(ids, prefix, None, None);
    let new_leaf_id = new_leaf.id().clone();
    let split_id = ids.mint(prefix);

    let mut wrap = |original: &Arc<PaneNode>| {
        let (first, second) = match position {
            SplitPosition::After => (Arc::clone(original), Arc::clone(&new_leaf)),
            SplitPosition::Before => (Arc::clone(&new_leaf), Arc::clone(original)),
        };
        Arc::new(PaneNode::Split(PaneSplit::new(
            split_id.clone(),
            direction,
            first,
            second,
            DEFAULT_SPLIT_RATIO,
        )))
    };
    (update_node(tree, pane_id, &mut wrap), Some(new_leaf_id))
}

/// Split the leaf `pane_id` in `direction`, placing a new unassigned leaf
/// `position` the original.
pub fn split_pane(
    tree: &Arc<PaneNode>,
    pane_id: &str,
    direction: SplitDirection,
    ids: &mut PaneIdGenerator,
    prefix: &str,
    position: SplitPosition,
) -> Arc<PaneNode> {
    split_pane_with_new_leaf(tree, pane_id, direction, ids, prefix, position).0
}

/// Remove the leaf `pane_id`.
///
/// The parent split of the removed leaf is replaced by the surviving
/// sibling (promotion). Returns `None` only when the tree was that single
/// leaf. Split ids are not closable and leave the tree unchanged.
#[must_use]
pub fn close_pane(tree: &Arc<PaneNode>, pane_id: &str) -> Option<Arc<PaneNode>> {
    match tree.as_ref() {
        PaneNode::Leaf(leaf) if leaf.id == pane_id => None,
        PaneNode::Leaf(_) => Some(Arc::clone(tree)),
        PaneNode::Split(split) => {
            let (first, second) = (split.first(), split.second());
            match close_pane(first, pane_id) {
                None => return Some(Arc::clone(second)),
                Some(next) if !Arc::ptr_eq(&next, first) => {
                    return Some(rebuild_split(tree, split, next, Arc::clone(second)));
                }
                Some(_) => {}
            }
            match close_pane(second, pane_id) {
                None => Some(Arc::clone(first)),
                Some(next) => Some(rebuild_split(tree, split, Arc::clone(first), next)),
            }
        }
    }
}

/// Set (or clear, with `None`) the agent shown in leaf `pane_id`.
pub fn assign_agent(
    tree: &Arc<PaneNode>,
    pane_id: &str,
    agent_id: Option<AgentId>,
    project_id: Option<ProjectId>,
) -> Arc<PaneNode> {
    let mut assign = |node: &Arc<PaneNode>| match node.as_ref() {
        PaneNode::Leaf(leaf)
            if leaf.agent_id != agent_id || leaf.project_id != project_id =>
        {
            let next = leaf
                .clone()
                .with_assignment(agent_id.clone(), project_id.clone());
            Arc::new(PaneNode::Leaf(next))
        }
        _ => Arc::clone(node),
    };
    update_node(tree, pane_id, &mut assign)
}

/// Exchange the `(agent_id, project_id)` pair of two leaves. Their positions
/// in the tree do not change.
pub fn swap_panes(tree: &Arc<PaneNode>, id1: &str, id2: &str) -> Arc<PaneNode> {
    if id1 == id2 {
        return Arc::clone(tree);
    }
    let (Some(a), Some(b)) = (tree.find_leaf(id1), tree.find_leaf(id2)) else {
        return Arc::clone(tree);
    };
    if a.same_content(b) {
        return Arc::clone(tree);
    }
    let (a, b) = (a.clone(), b.clone());
    map_leaves(tree, &mut |leaf| {
        let source = if leaf.id == id1 {
            &b
        } else if leaf.id == id2 {
            &a
        } else {
            return None;
        };
        Some(
            leaf.clone()
                .with_assignment(source.agent_id.clone(), source.project_id.clone()),
        )
    })
}

/// Clear every leaf that shows `agent_id`.
pub fn remove_panes_by_agent(tree: &Arc<PaneNode>, agent_id: &AgentId) -> Arc<PaneNode> {
    map_leaves(tree, &mut |leaf| {
        (leaf.agent_id.as_ref() == Some(agent_id)).then(|| leaf.cleared())
    })
}

/// Clear every leaf whose agent is not in `known_ids`. Unassigned leaves and
/// leaves with a known agent are kept as they are.
pub fn validate_agents<S: BuildHasher>(
    tree: &Arc<PaneNode>,
    known_ids: &HashSet<AgentId, S>,
) -> Arc<PaneNode> {
    map_leaves(tree, &mut |leaf| match &leaf.agent_id {
        Some(agent) if !known_ids.contains(agent) => Some(leaf.cleared()),
        _ => None,
    })
}

/// Set the ratio of split `split_id`, clamped to the allowed range.
///
/// NaN is ignored.
pub fn set_split_ratio(tree: &Arc<PaneNode>, split_id: &str, ratio: f64) -> Arc<PaneNode> {
    if ratio.is_nan() {
        return Arc::clone(tree);
    }
    let ratio = clamp_ratio(ratio);
    let mut resize = |node: &Arc<PaneNode>| match node.as_ref() {
        PaneNode::Split(split) if split.ratio() != ratio => {
            Arc::new(PaneNode::Split(split.with_ratio(ratio)))
        }
        _ => Arc::clone(node),
    };
    update_node(tree, split_id, &mut resize)
}
