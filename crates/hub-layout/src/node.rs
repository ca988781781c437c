//! Binary split-tree node model.
//!
//! A pane tree is either a single [`PaneLeaf`] or a [`PaneSplit`] dividing
//! its region between exactly two children:
//!
//! ```text
//! Split hub_3 (horizontal, ratio=0.5)
//! ├── Leaf hub_1 (agent a1)
//! └── Split hub_5 (vertical, ratio=0.3)
//!     ├── Leaf hub_2 (unassigned)
//!     └── Leaf hub_4 (agent a7)
//! ```
//!
//! Children are held behind [`Arc`] so that operations can hand back the
//! very same allocation for every subtree they did not touch. Hosts compare
//! subtrees with [`Arc::ptr_eq`] to skip re-layout of unchanged regions.
//!
//! The serde representation is the persisted layout format:
//!
//! ```json
//! {"type":"split","id":"hub_3","direction":"horizontal","ratio":0.5,
//!  "children":[{"type":"leaf","id":"hub_1","agentId":"a1"},
//!              {"type":"leaf","id":"hub_2"}]}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::id::{AgentId, PaneId, ProjectId};

/// Smallest share a split may give its first child.
pub const MIN_SPLIT_RATIO: f64 = 0.15;
/// Largest share a split may give its first child.
pub const MAX_SPLIT_RATIO: f64 = 0.85;
/// Ratio used for freshly created splits.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.5;

/// Clamp a ratio into `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`.
///
/// NaN maps to [`DEFAULT_SPLIT_RATIO`].
#[must_use]
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return DEFAULT_SPLIT_RATIO;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

fn default_ratio() -> f64 {
    DEFAULT_SPLIT_RATIO
}

fn deserialize_ratio<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_ratio(raw))
}

/// Orientation of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children side by side (first = left, second = right).
    Horizontal,
    /// Children stacked (first = top, second = bottom).
    Vertical,
}

/// Where a newly split-off leaf goes relative to the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitPosition {
    /// New leaf becomes the first child.
    Before,
    /// New leaf becomes the second child.
    #[default]
    After,
}

/// A single viewport, optionally showing an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneLeaf {
    pub id: PaneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl PaneLeaf {
    /// An unassigned leaf.
    #[must_use]
    pub fn new(id: PaneId) -> Self {
        Self {
            id,
            agent_id: None,
            project_id: None,
        }
    }

    #[must_use]
    pub fn with_assignment(
        mut self,
        agent_id: Option<AgentId>,
        project_id: Option<ProjectId>,
    ) -> Self {
        self.agent_id = agent_id;
        self.project_id = project_id;
        self
    }

    /// True when the leaf shows an agent rather than a picker.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.agent_id.is_some()
    }

    /// Compare the `(agent_id, project_id)` pair, ignoring the id.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id && self.project_id == other.project_id
    }

    /// Copy of this leaf with the assignment removed.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self::new(self.id.clone())
    }
}

/// A region divided between two children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSplit {
    id: PaneId,
    direction: SplitDirection,
    children: [Arc<PaneNode>; 2],
    #[serde(default = "default_ratio", deserialize_with = "deserialize_ratio")]
    ratio: f64,
}

impl PaneSplit {
    /// Build a split; `ratio` is clamped.
    #[must_use]
    pub fn new(
        id: PaneId,
        direction: SplitDirection,
        first: Arc<PaneNode>,
        second: Arc<PaneNode>,
        ratio: f64,
    ) -> Self {
        Self {
            id,
            direction,
            children: [first, second],
            ratio: clamp_ratio(ratio),
        }
    }

    #[must_use]
    pub fn id(&self) -> &PaneId {
        &self.id
    }

    #[must_use]
    pub fn direction(&self) -> SplitDirection {
        self.direction
    }

    /// Share of the split axis given to the first child.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<PaneNode>; 2] {
        &self.children
    }

    /// Left (horizontal) or top (vertical) child.
    #[must_use]
    pub fn first(&self) -> &Arc<PaneNode> {
        &self.children[0]
    }

    /// Right (horizontal) or bottom (vertical) child.
    #[must_use]
    pub fn second(&self) -> &Arc<PaneNode> {
        &self.children[1]
    }

    pub(crate) fn with_children(&self, first: Arc<PaneNode>, second: Arc<PaneNode>) -> Self {
        Self {
            id: self.id.clone(),
            direction: self.direction,
            children: [first, second],
            ratio: self.ratio,
        }
    }

    pub(crate) fn with_ratio(&self, ratio: f64) -> Self {
        Self {
            id: self.id.clone(),
            direction: self.direction,
            children: self.children.clone(),
            ratio: clamp_ratio(ratio),
        }
    }
}

/// A node in the pane layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaneNode {
    Leaf(PaneLeaf),
    Split(PaneSplit),
}

impl PaneNode {
    /// A fresh unassigned leaf node.
    #[must_use]
    pub fn leaf(id: PaneId) -> Self {
        Self::Leaf(PaneLeaf::new(id))
    }

    #[must_use]
    pub fn id(&self) -> &PaneId {
        match self {
            Self::Leaf(leaf) => &leaf.id,
            Self::Split(split) => &split.id,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&PaneLeaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Split(_) => None,
        }
    }

    #[must_use]
    pub fn as_split(&self) -> Option<&PaneSplit> {
        match self {
            Self::Leaf(_) => None,
            Self::Split(split) => Some(split),
        }
    }

    /// Find a leaf by id. Split ids never match.
    #[must_use]
    pub fn find_leaf(&self, id: &str) -> Option<&PaneLeaf> {
        match self {
            Self::Leaf(leaf) => (leaf.id == id).then_some(leaf),
            Self::Split(split) => split
                .first()
                .find_leaf(id)
                .or_else(|| split.second().find_leaf(id)),
        }
    }

    /// Find a split by id. Leaf ids never match.
    #[must_use]
    pub fn find_split(&self, id: &str) -> Option<&PaneSplit> {
        match self {
            Self::Leaf(_) => None,
            Self::Split(split) if split.id == id => Some(split),
            Self::Split(split) => split
                .first()
                .find_split(id)
                .or_else(|| split.second().find_split(id)),
        }
    }

    /// True if any node (leaf or split) in this subtree has `id`.
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.id == id,
            Self::Split(split) => {
                split.id == id
                    || split.first().contains_node(id)
                    || split.second().contains_node(id)
            }
        }
    }

    /// Id of the leftmost (depth-first) leaf.
    #[must_use]
    pub fn first_leaf_id(&self) -> &PaneId {
        match self {
            Self::Leaf(leaf) => &leaf.id,
            Self::Split(split) => split.first().first_leaf_id(),
        }
    }

    /// All leaves in depth-first, first-child-first order.
    #[must_use]
    pub fn collect_leaves(&self) -> Vec<&PaneLeaf> {
        let mut out = Vec::new();
        self.collect_leaves_into(&mut out);
        out
    }

    fn collect_leaves_into<'a>(&'a self, out: &mut Vec<&'a PaneLeaf>) {
        match self {
            Self::Leaf(leaf) => out.push(leaf),
            Self::Split(split) => {
                split.first().collect_leaves_into(out);
                split.second().collect_leaves_into(out);
            }
        }
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Split(split) => split.first().leaf_count() + split.second().leaf_count(),
        }
    }

    /// Every node id in pre-order (split before its children).
    #[must_use]
    pub fn node_ids(&self) -> Vec<&PaneId> {
        let mut out = Vec::new();
        self.node_ids_into(&mut out);
        out
    }

    fn node_ids_into<'a>(&'a self, out: &mut Vec<&'a PaneId>) {
        match self {
            Self::Leaf(leaf) => out.push(&leaf.id),
            Self::Split(split) => {
                out.push(&split.id);
                split.first().node_ids_into(out);
                split.second().node_ids_into(out);
            }
        }
    }
}

/// Find the shared handle of the node with `id` (leaf or split).
///
/// Unlike [`PaneNode::find_leaf`] this hands back the `Arc`, which lets a
/// host render a subtree (for example a zoomed leaf) as its own root.
#[must_use]
pub fn find_node<'a>(tree: &'a Arc<PaneNode>, id: &str) -> Option<&'a Arc<PaneNode>> {
    if tree.id() == id {
        return Some(tree);
    }
    match tree.as_ref() {
        PaneNode::Leaf(_) => None,
        PaneNode::Split(split) => {
            find_node(split.first(), id).or_else(|| find_node(split.second(), id))
        }
    }
}
