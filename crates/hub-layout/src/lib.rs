#![forbid(unsafe_code)]

//! Pane-tree layout model for the agent hub.
//!
//! The hub shows many agent terminals at once in a tiling layout. This crate
//! holds the layout itself: an immutable binary split tree ([`PaneNode`])
//! and the pure functions that transform it.
//!
//! # Key pieces
//!
//! - [`PaneNode`] / [`PaneLeaf`] / [`PaneSplit`]: the tree, serialized as the
//!   persisted layout format.
//! - [`PaneIdGenerator`]: per-prefix `"<prefix>_<n>"` identifier minting.
//! - Operations ([`split_pane`], [`close_pane`], [`assign_agent`],
//!   [`swap_panes`], [`remove_panes_by_agent`], [`validate_agents`],
//!   [`set_split_ratio`], [`map_leaves`]) that return the input handle when
//!   nothing changed and share every untouched subtree.
//! - [`solve_layout`] and [`DividerDrag`] for hosts that render the tree.
//!
//! ```
//! use std::sync::Arc;
//! use hub_layout::{PaneIdGenerator, SplitDirection, SplitPosition, create_leaf, split_pane};
//!
//! let mut ids = PaneIdGenerator::new();
//! let root = create_leaf(&mut ids, "hub", None, None);
//! let tree = split_pane(&root, "hub_1", SplitDirection::Horizontal, &mut ids, "hub", SplitPosition::After);
//! assert_eq!(tree.id(), "hub_3");
//! assert_eq!(tree.leaf_count(), 2);
//!
//! let same = split_pane(&tree, "missing", SplitDirection::Vertical, &mut ids, "hub", SplitPosition::After);
//! assert!(Arc::ptr_eq(&same, &tree));
//! ```

pub mod check;
pub mod geometry;
pub mod id;
pub mod node;
pub mod ops;

pub use check::{PaneTreeError, check_tree};
pub use geometry::{DividerDrag, PaneLayout, PaneLayoutEntry, PaneRect, solve_layout, solve_zoomed};
pub use id::{AgentId, PaneId, PaneIdGenerator, ProjectId};
pub use node::{
    DEFAULT_SPLIT_RATIO, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, PaneLeaf, PaneNode, PaneSplit,
    SplitDirection, SplitPosition, clamp_ratio, find_node,
};
pub use ops::{
    assign_agent, close_pane, create_leaf, map_leaves, remove_panes_by_agent, set_split_ratio,
    split_pane, split_pane_with_new_leaf, swap_panes, validate_agents,
};
