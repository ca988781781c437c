//! Rectangles for rendering a pane tree, and divider-drag arithmetic.
//!
//! The engine does no drawing. [`solve_layout`] turns a tree plus an outer
//! area into one rectangle per node so a host can position its own views, and
//! [`DividerDrag`] converts pointer motion on a divider into the ratio to
//! pass to [`set_split_ratio`](crate::set_split_ratio).

use crate::id::PaneId;
use crate::node::{PaneNode, PaneSplit, SplitDirection, clamp_ratio};

/// Axis-aligned rectangle in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaneRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PaneRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment test.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Length along the axis a split of `direction` divides.
    #[must_use]
    pub fn extent(&self, direction: SplitDirection) -> f64 {
        match direction {
            SplitDirection::Horizontal => self.width,
            SplitDirection::Vertical => self.height,
        }
    }

    /// Divide along `direction`, giving `ratio` of the extent to the first
    /// half.
    #[must_use]
    pub fn split(&self, direction: SplitDirection, ratio: f64) -> (Self, Self) {
        match direction {
            SplitDirection::Horizontal => {
                let first = self.width * ratio;
                (
                    Self::new(self.x, self.y, first, self.height),
                    Self::new(self.x + first, self.y, self.width - first, self.height),
                )
            }
            SplitDirection::Vertical => {
                let first = self.height * ratio;
                (
                    Self::new(self.x, self.y, self.width, first),
                    Self::new(self.x, self.y + first, self.width, self.height - first),
                )
            }
        }
    }
}

/// One solved node.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayoutEntry {
    pub id: PaneId,
    pub rect: PaneRect,
    pub is_leaf: bool,
}

/// Solved rectangles for every visible node, in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayout {
    pub area: PaneRect,
    entries: Vec<PaneLayoutEntry>,
}

impl PaneLayout {
    #[must_use]
    pub fn rect(&self, id: &str) -> Option<PaneRect> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.rect)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaneLayoutEntry> + '_ {
        self.entries.iter()
    }

    /// Leaf under a pointer, for drop targeting.
    #[must_use]
    pub fn leaf_at(&self, x: f64, y: f64) -> Option<&PaneId> {
        self.entries
            .iter()
            .find(|entry| entry.is_leaf && entry.rect.contains(x, y))
            .map(|entry| &entry.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lay the whole tree out inside `area`.
#[must_use]
pub fn solve_layout(tree: &PaneNode, area: PaneRect) -> PaneLayout {
    let mut entries = Vec::new();
    solve_node(tree, area, &mut entries);
    PaneLayout { area, entries }
}

fn solve_node(node: &PaneNode, area: PaneRect, entries: &mut Vec<PaneLayoutEntry>) {
    entries.push(PaneLayoutEntry {
        id: node.id().clone(),
        rect: area,
        is_leaf: node.as_leaf().is_some(),
    });
    if let PaneNode::Split(split) = node {
        let (first, second) = area.split(split.direction(), split.ratio());
        solve_node(split.first(), first, entries);
        solve_node(split.second(), second, entries);
    }
}

/// Lay out for zoom mode: a zoomed leaf that exists fills `area` on its own;
/// otherwise the whole tree is solved.
#[must_use]
pub fn solve_zoomed(tree: &PaneNode, zoomed: Option<&str>, area: PaneRect) -> PaneLayout {
    match zoomed.and_then(|id| tree.find_leaf(id)) {
        Some(leaf) => PaneLayout {
            area,
            entries: vec![PaneLayoutEntry {
                id: leaf.id.clone(),
                rect: area,
                is_leaf: true,
            }],
        },
        None => solve_layout(tree, area),
    }
}

/// An in-progress drag of the divider between a split's two children.
///
/// The drag remembers the ratio at grab time, so every update is computed
/// from the total pointer offset rather than accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct DividerDrag {
    split_id: PaneId,
    direction: SplitDirection,
    extent: f64,
    start_ratio: f64,
    ratio: f64,
}

impl DividerDrag {
    #[must_use]
    pub fn new(split_id: PaneId, direction: SplitDirection, extent: f64, start_ratio: f64) -> Self {
        let start_ratio = clamp_ratio(start_ratio);
        Self {
            split_id,
            direction,
            extent,
            start_ratio,
            ratio: start_ratio,
        }
    }

    /// Grab the divider of `split` as laid out in `layout`.
    ///
    /// Returns `None` if the split is not part of the layout (for example
    /// while zoomed).
    #[must_use]
    pub fn begin(layout: &PaneLayout, split: &PaneSplit) -> Option<Self> {
        let rect = layout.rect(split.id().as_str())?;
        Some(Self::new(
            split.id().clone(),
            split.direction(),
            rect.extent(split.direction()),
            split.ratio(),
        ))
    }

    #[must_use]
    pub fn split_id(&self) -> &PaneId {
        &self.split_id
    }

    /// Ratio produced by the latest update.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Feed the pointer offset since the grab and get the clamped ratio.
    ///
    /// Only the component along the split axis matters. A degenerate extent
    /// keeps the starting ratio.
    pub fn update(&mut self, delta_x: f64, delta_y: f64) -> f64 {
        let delta = match self.direction {
            SplitDirection::Horizontal => delta_x,
            SplitDirection::Vertical => delta_y,
        };
        self.ratio = if self.extent > 0.0 && self.extent.is_finite() {
            clamp_ratio(self.start_ratio + delta / self.extent)
        } else {
            self.start_ratio
        };
        self.ratio
    }

    /// End the drag, yielding the split id and final ratio.
    #[must_use]
    pub fn finish(self) -> (PaneId, f64) {
        (self.split_id, self.ratio)
    }
}
