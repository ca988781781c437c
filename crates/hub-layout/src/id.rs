//! Node identifiers and the per-prefix identifier generator.
//!
//! Every node in a pane tree carries an identifier of the form
//! `"<prefix>_<n>"`, where `n` comes from a counter that only ever moves
//! forward. The counters live in a [`PaneIdGenerator`] owned by whoever owns
//! the tree (normally a store), so independent trees never share counters.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::node::PaneNode;

/// Identifier of a node (leaf or split) in a pane tree.
///
/// Cloning is cheap: the string is shared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneId(Arc<str>);

impl PaneId {
    /// Build the canonical `"<prefix>_<n>"` identifier.
    #[must_use]
    pub fn from_parts(prefix: &str, n: u64) -> Self {
        Self(Arc::from(format!("{prefix}_{n}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the identifier at its last underscore into prefix and numeric
    /// suffix.
    ///
    /// Returns `None` when there is no underscore or the suffix is not a
    /// decimal number.
    #[must_use]
    pub fn split_suffix(&self) -> Option<(&str, u64)> {
        let (prefix, suffix) = self.0.rsplit_once('_')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n = suffix.parse().ok()?;
        Some((prefix, n))
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PaneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PaneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PaneId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for PaneId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for PaneId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for PaneId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Opaque identifier of an agent session living outside the layout engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(Arc<str>);

impl AgentId {
    #[must_use]
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

/// Opaque identifier of the project an agent belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Arc<str>);

impl ProjectId {
    #[must_use]
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

/// Monotonic identifier generator with one counter per prefix.
///
/// # Invariants
///
/// 1. Counters never decrease (short of [`reset`](Self::reset)).
/// 2. [`mint`](Self::mint) returns `"<prefix>_<n>"` with `n` strictly greater
///    than every `n` previously minted or synced for that prefix, as long as
///    [`can_mint`](Self::can_mint) holds. A counter at `u64::MAX` saturates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneIdGenerator {
    counters: FxHashMap<String, u64>,
}

impl PaneIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `prefix` and return the new identifier.
    pub fn mint(&mut self, prefix: &str) -> PaneId {
        if let Some(counter) = self.counters.get_mut(prefix) {
            *counter = counter.saturating_add(1);
            return PaneId::from_parts(prefix, *counter);
        }
        self.counters.insert(prefix.to_owned(), 1);
        PaneId::from_parts(prefix, 1)
    }

    /// Whether `count` more ids can be minted for `prefix` without the
    /// counter saturating.
    #[must_use]
    pub fn can_mint(&self, prefix: &str, count: u64) -> bool {
        self.peek(prefix).checked_add(count).is_some()
    }

    /// Last value handed out (or synced) for `prefix`; 0 if untouched.
    #[must_use]
    pub fn peek(&self, prefix: &str) -> u64 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }

    /// Raise the counter for `prefix` to at least `floor`. Never lowers it.
    pub fn raise_to(&mut self, prefix: &str, floor: u64) {
        match self.counters.get_mut(prefix) {
            Some(counter) if *counter >= floor => {}
            Some(counter) => {
                trace!(prefix, from = *counter, to = floor, "raising pane id counter");
                *counter = floor;
            }
            None => {
                trace!(prefix, to = floor, "seeding pane id counter");
                self.counters.insert(prefix.to_owned(), floor);
            }
        }
    }

    /// Raise every per-prefix counter to the largest numeric suffix found in
    /// `tree`, so that identifiers minted afterwards cannot collide with
    /// identifiers restored from persistence.
    ///
    /// Identifiers without a numeric suffix are ignored.
    pub fn sync_counter_to_tree(&mut self, tree: &PaneNode) {
        for id in tree.node_ids() {
            if let Some((prefix, n)) = id.split_suffix() {
                self.raise_to(prefix, n);
            }
        }
    }

    /// Forget every counter. Only meant for tests and fresh sessions.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
