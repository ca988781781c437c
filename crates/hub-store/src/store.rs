//! The pane store: the single owner of the current layout tree.
//!
//! Every mutation goes through a pure function from `hub_layout` and the
//! result is published. A result that is pointer-equal to the current tree
//! is a no-op and publishes nothing, so subscribers only hear about real
//! changes and [`PaneStore::revision`] only moves when the tree does.
//!
//! Besides the tree the store tracks UI state that is tied to pane ids:
//! which pane is focused, which one (if any) is zoomed, and the source and
//! hover target of an in-progress drag. Persistence is explicit
//! ([`PaneStore::load`] / [`PaneStore::save`]) with an opt-in debounced
//! autosave driven by [`PaneStore::poll_autosave`].

use std::collections::HashSet;
use std::fmt;
use std::hash::BuildHasher;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use hub_layout::{
    AgentId, PaneId, PaneIdGenerator, PaneLayout, PaneNode, PaneRect, PaneTreeError, ProjectId,
    SplitDirection, SplitPosition, check_tree, find_node, solve_zoomed,
};
use serde_json::Value;
use tracing::{debug, info, info_span, trace, warn};
use web_time::Instant;

use crate::config::{ConfigError, StoreConfig};
use crate::debounce::SaveDebouncer;
use crate::storage::{StorageBackend, StorageError, StorageResult};

type ListenerRc = Rc<dyn Fn(&Arc<PaneNode>)>;
type ListenerWeak = Weak<dyn Fn(&Arc<PaneNode>)>;

/// Why a persisted tree was not used.
#[derive(Debug)]
enum LoadFallback {
    Missing,
    Read(StorageError),
    UnknownRoot,
    Decode(serde_json::Error),
    Invalid(PaneTreeError),
}

impl fmt::Display for LoadFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("no persisted tree"),
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::UnknownRoot => f.write_str("root is not a leaf or split node"),
            Self::Decode(e) => write!(f, "undecodable tree: {e}"),
            Self::Invalid(e) => write!(f, "invalid tree: {e}"),
        }
    }
}

/// Owns the layout tree and the pane-scoped UI state around it.
///
/// The store is single-threaded: subscribers are `Rc` callbacks, so it is
/// neither `Send` nor `Sync`.
pub struct PaneStore {
    config: StoreConfig,
    ids: PaneIdGenerator,
    tree: Arc<PaneNode>,
    focused: PaneId,
    zoomed: Option<PaneId>,
    drag_source: Option<PaneId>,
    drag_over: Option<PaneId>,
    loaded: bool,
    revision: u64,
    subscribers: Vec<ListenerWeak>,
    autosave: Option<SaveDebouncer>,
}

impl fmt::Debug for PaneStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaneStore")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .field("focused", &self.focused)
            .field("zoomed", &self.zoomed)
            .field("loaded", &self.loaded)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl Default for PaneStore {
    fn default() -> Self {
        Self::from_valid_config(StoreConfig::default())
    }
}

impl PaneStore {
    /// A store holding a single fresh leaf. Nothing is read until
    /// [`load`](Self::load).
    pub fn new(config: StoreConfig) -> Result<Self, ConfigError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: StoreConfig) -> Self {
        let mut ids = PaneIdGenerator::new();
        let tree = hub_layout::create_leaf(&mut ids, &config.id_prefix, None, None);
        let autosave = config.autosave_debounce().map(SaveDebouncer::new);
        Self {
            focused: tree.id().clone(),
            config,
            ids,
            tree,
            zoomed: None,
            drag_source: None,
            drag_over: None,
            loaded: false,
            revision: 0,
            subscribers: Vec::new(),
            autosave,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn tree(&self) -> &Arc<PaneNode> {
        &self.tree
    }

    #[must_use]
    pub fn focused_pane(&self) -> &PaneId {
        &self.focused
    }

    #[must_use]
    pub fn zoomed_pane(&self) -> Option<&PaneId> {
        self.zoomed.as_ref()
    }

    #[must_use]
    pub fn drag_source(&self) -> Option<&PaneId> {
        self.drag_source.as_ref()
    }

    #[must_use]
    pub fn drag_over(&self) -> Option<&PaneId> {
        self.drag_over.as_ref()
    }

    /// The subtree to render: the zoomed leaf while zoomed, else the whole
    /// tree.
    #[must_use]
    pub fn visible_root(&self) -> &Arc<PaneNode> {
        self.zoomed
            .as_ref()
            .and_then(|id| find_node(&self.tree, id.as_str()))
            .unwrap_or(&self.tree)
    }

    /// Rectangles for the visible panes inside `area`.
    #[must_use]
    pub fn layout(&self, area: PaneRect) -> PaneLayout {
        solve_zoomed(&self.tree, self.zoomed.as_ref().map(PaneId::as_str), area)
    }

    /// Whether [`load`](Self::load) has run.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of tree changes published so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn ids(&self) -> &PaneIdGenerator {
        &self.ids
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Call `callback` with the new tree after every published change.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(&mut self, callback: impl Fn(&Arc<PaneNode>) + 'static) -> Subscription {
        let strong: ListenerRc = Rc::new(callback);
        self.subscribers.push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self) {
        self.subscribers.retain(|w| w.strong_count() > 0);
        let listeners: Vec<ListenerRc> = self.subscribers.iter().filter_map(Weak::upgrade).collect();
        for listener in &listeners {
            listener(&self.tree);
        }
    }

    /// Install `next` as the current tree unless it is the current tree.
    fn publish(&mut self, op: &'static str, next: Arc<PaneNode>) -> bool {
        if Arc::ptr_eq(&next, &self.tree) {
            trace!(op, "pane operation was a no-op");
            return false;
        }
        self.tree = next;
        self.revision += 1;
        debug!(
            op,
            revision = self.revision,
            leaves = self.tree.leaf_count(),
            "pane tree published"
        );
        if let Some(autosave) = &mut self.autosave {
            autosave.schedule(Arc::clone(&self.tree), Instant::now());
        }
        self.notify();
        true
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Replace the tree with the one persisted in `storage`.
    ///
    /// Absent, unreadable, or structurally invalid data is replaced by a
    /// fresh single leaf; the failure is logged and never returned. Focus
    /// moves to the first leaf, zoom and drag state are cleared, and the
    /// store is marked loaded either way.
    pub fn load(&mut self, storage: &dyn StorageBackend) {
        let _span = info_span!(
            "pane_store.load",
            backend = storage.name(),
            key = %self.config.storage_key
        )
        .entered();

        match self.read_persisted(storage) {
            Ok(tree) => {
                self.ids.sync_counter_to_tree(&tree);
                self.focused = tree.first_leaf_id().clone();
                let leaves = tree.leaf_count();
                self.publish("load", tree);
                // Storage already holds exactly this tree.
                self.cancel_autosave();
                info!(source = "storage", leaves, "pane tree loaded");
            }
            Err(reason) => {
                if matches!(reason, LoadFallback::Missing) {
                    debug!(%reason, "starting with a fresh pane tree");
                } else {
                    warn!(%reason, "discarding persisted pane tree");
                }
                let fresh = hub_layout::create_leaf(&mut self.ids, &self.config.id_prefix, None, None);
                self.focused = fresh.id().clone();
                self.publish("load", fresh);
                info!(source = "fresh", leaves = 1, "pane tree loaded");
            }
        }

        self.zoomed = None;
        self.drag_source = None;
        self.drag_over = None;
        self.loaded = true;
    }

    fn read_persisted(&self, storage: &dyn StorageBackend) -> Result<Arc<PaneNode>, LoadFallback> {
        let value = storage
            .read(&self.config.storage_key)
            .map_err(LoadFallback::Read)?
            .ok_or(LoadFallback::Missing)?;
        match value.get("type").and_then(Value::as_str) {
            Some("leaf" | "split") => {}
            _ => return Err(LoadFallback::UnknownRoot),
        }
        let tree: PaneNode = serde_json::from_value(value).map_err(LoadFallback::Decode)?;
        check_tree(&tree).map_err(LoadFallback::Invalid)?;
        Ok(Arc::new(tree))
    }

    /// Write the current tree to `storage`.
    ///
    /// Failures are logged and returned; the in-memory tree is unaffected.
    pub fn save(&self, storage: &dyn StorageBackend) -> StorageResult<()> {
        self.write_tree(storage, &self.tree)
    }

    fn write_tree(&self, storage: &dyn StorageBackend, tree: &PaneNode) -> StorageResult<()> {
        let result = serde_json::to_value(tree)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(|value| storage.write(&self.config.storage_key, &value));
        if let Err(err) = &result {
            warn!(
                backend = storage.name(),
                key = %self.config.storage_key,
                error = %err,
                "failed to save pane tree"
            );
        }
        result
    }

    /// Run a pending autosave whose quiet period is over at `now`.
    ///
    /// Returns `Ok(true)` if a tree was written. The tree written is the one
    /// captured when the save was scheduled. A failed write re-arms that tree
    /// for another quiet period.
    pub fn poll_autosave(&mut self, storage: &dyn StorageBackend, now: Instant) -> StorageResult<bool> {
        let Some(tree) = self.autosave.as_mut().and_then(|a| a.take_ready(now)) else {
            return Ok(false);
        };
        if let Err(err) = self.write_tree(storage, &tree) {
            if let Some(autosave) = &mut self.autosave {
                autosave.retry(tree, now);
            }
            return Err(err);
        }
        debug!(backend = storage.name(), leaves = tree.leaf_count(), "autosaved pane tree");
        Ok(true)
    }

    /// Discard any pending autosave. Returns whether one was pending.
    pub fn cancel_autosave(&mut self) -> bool {
        self.autosave.as_mut().is_some_and(SaveDebouncer::cancel)
    }

    #[must_use]
    pub fn autosave_pending(&self) -> bool {
        self.autosave.as_ref().is_some_and(SaveDebouncer::is_pending)
    }

    // -----------------------------------------------------------------------
    // Tree mutations
    // -----------------------------------------------------------------------

    /// Split leaf `pane_id`, returning the id of the new leaf, or `None` if
    /// `pane_id` is not a leaf.
    pub fn split_pane(
        &mut self,
        pane_id: &str,
        direction: SplitDirection,
        position: SplitPosition,
    ) -> Option<PaneId> {
        let (next, new_leaf) = hub_layout::split_pane_with_new_leaf(
            &self.tree,
            pane_id,
            direction,
            &mut self.ids,
            &self.config.id_prefix,
            position,
        );
        self.publish("split_pane", next);
        new_leaf
    }

    /// Close leaf `pane_id`.
    ///
    /// Closing the last leaf leaves a fresh unassigned leaf in its place.
    /// Focus falls back to the first leaf if the focused pane went away, and
    /// zoom is cleared if the zoomed pane went away.
    pub fn close_pane(&mut self, pane_id: &str) -> bool {
        match hub_layout::close_pane(&self.tree, pane_id) {
            None => {
                let fresh = hub_layout::create_leaf(&mut self.ids, &self.config.id_prefix, None, None);
                self.focused = fresh.id().clone();
                self.zoomed = None;
                self.publish("close_pane", fresh)
            }
            Some(next) => {
                if !Arc::ptr_eq(&next, &self.tree) {
                    if next.find_leaf(self.focused.as_str()).is_none() {
                        self.focused = next.first_leaf_id().clone();
                    }
                    if self
                        .zoomed
                        .as_ref()
                        .is_some_and(|id| !next.contains_node(id.as_str()))
                    {
                        self.zoomed = None;
                    }
                }
                self.publish("close_pane", next)
            }
        }
    }

    pub fn assign_agent(
        &mut self,
        pane_id: &str,
        agent_id: Option<AgentId>,
        project_id: Option<ProjectId>,
    ) -> bool {
        let next = hub_layout::assign_agent(&self.tree, pane_id, agent_id, project_id);
        self.publish("assign_agent", next)
    }

    pub fn swap_panes(&mut self, id1: &str, id2: &str) -> bool {
        let next = hub_layout::swap_panes(&self.tree, id1, id2);
        self.publish("swap_panes", next)
    }

    pub fn remove_panes_by_agent(&mut self, agent_id: &AgentId) -> bool {
        let next = hub_layout::remove_panes_by_agent(&self.tree, agent_id);
        self.publish("remove_panes_by_agent", next)
    }

    /// Clear every pane showing an agent that is not in `known_ids`.
    pub fn validate_agents<S: BuildHasher>(&mut self, known_ids: &HashSet<AgentId, S>) -> bool {
        let next = hub_layout::validate_agents(&self.tree, known_ids);
        self.publish("validate_agents", next)
    }

    pub fn set_split_ratio(&mut self, split_id: &str, ratio: f64) -> bool {
        let next = hub_layout::set_split_ratio(&self.tree, split_id, ratio);
        self.publish("set_split_ratio", next)
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    /// Zoom leaf `pane_id`, or unzoom if it is already the zoomed pane.
    ///
    /// Ids that are not leaves of the tree are ignored. Returns whether the
    /// zoom state changed.
    pub fn toggle_zoom(&mut self, pane_id: &str) -> bool {
        if self.zoomed.as_ref().is_some_and(|id| id == pane_id) {
            self.zoomed = None;
            return true;
        }
        match self.tree.find_leaf(pane_id) {
            Some(leaf) => {
                self.zoomed = Some(leaf.id.clone());
                true
            }
            None => {
                trace!(pane_id, "zoom target is not a leaf");
                false
            }
        }
    }

    pub fn set_focused_pane(&mut self, pane_id: impl Into<PaneId>) {
        self.focused = pane_id.into();
    }

    pub fn set_drag_source(&mut self, pane_id: Option<PaneId>) {
        self.drag_source = pane_id;
    }

    pub fn set_drag_over(&mut self, pane_id: Option<PaneId>) {
        self.drag_over = pane_id;
    }

    /// Finish a drag gesture over `target`: the drag source and `target`
    /// exchange agents, and both drag ids are cleared.
    ///
    /// Returns whether the tree changed.
    pub fn drop_on(&mut self, target: &str) -> bool {
        self.drag_over = None;
        let Some(source) = self.drag_source.take() else {
            trace!(target, "drop without a drag source");
            return false;
        };
        self.swap_panes(source.as_str(), target)
    }
}

impl Drop for PaneStore {
    fn drop(&mut self) {
        if self.cancel_autosave() {
            debug!("pending pane tree autosave discarded");
        }
    }
}

/// RAII guard for a store subscriber.
///
/// Dropping it makes the callback unreachable; the store prunes the dead
/// entry on its next publish.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn agent(raw: &str) -> Option<AgentId> {
        Some(AgentId::from(raw))
    }

    fn project(raw: &str) -> Option<ProjectId> {
        Some(ProjectId::from(raw))
    }

    /// hub_3(h)[hub_1 -> a1, hub_2 -> a2]
    fn two_pane_store() -> PaneStore {
        let mut store = PaneStore::default();
        let new_leaf = store.split_pane("hub_1", SplitDirection::Horizontal, SplitPosition::After);
        assert_eq!(new_leaf.as_ref().map(PaneId::as_str), Some("hub_2"));
        store.assign_agent("hub_1", agent("a1"), project("p1"));
        store.assign_agent("hub_2", agent("a2"), project("p2"));
        store
    }

    #[test]
    fn new_store_has_one_focused_leaf() {
        let store = PaneStore::default();
        assert_eq!(store.tree().id(), "hub_1");
        assert_eq!(store.focused_pane(), "hub_1");
        assert_eq!(store.zoomed_pane(), None);
        assert!(!store.is_loaded());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StoreConfig {
            id_prefix: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            PaneStore::new(config),
            Err(ConfigError::Validation(errors)) if errors.len() == 1
        ));
    }

    #[test]
    fn custom_prefix_is_used_for_minted_ids() {
        let config = StoreConfig {
            id_prefix: "side".into(),
            ..StoreConfig::default()
        };
        let mut store = PaneStore::new(config).expect("valid config");
        assert_eq!(store.tree().id(), "side_1");
        let new_leaf = store.split_pane("side_1", SplitDirection::Vertical, SplitPosition::Before);
        assert_eq!(new_leaf.as_ref().map(PaneId::as_str), Some("side_2"));
        assert_eq!(store.tree().id(), "side_3");
    }

    #[test]
    fn noop_mutations_do_not_publish() {
        let mut store = two_pane_store();
        let revision = store.revision();
        let before = Arc::clone(store.tree());

        assert_eq!(store.split_pane("nope", SplitDirection::Vertical, SplitPosition::After), None);
        assert!(!store.close_pane("nope"));
        assert!(!store.close_pane("hub_3"));
        assert!(!store.assign_agent("hub_1", agent("a1"), project("p1")));
        assert!(!store.swap_panes("hub_1", "hub_1"));
        assert!(!store.remove_panes_by_agent(&AgentId::from("ghost")));
        assert!(!store.set_split_ratio("hub_3", 0.5));

        assert_eq!(store.revision(), revision);
        assert!(Arc::ptr_eq(store.tree(), &before));
    }

    #[test]
    fn subscribers_hear_changes_until_dropped() {
        let mut store = PaneStore::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = store.subscribe(move |tree| sink.borrow_mut().push(tree.leaf_count()));

        store.split_pane("hub_1", SplitDirection::Horizontal, SplitPosition::After);
        store.set_split_ratio("nope", 0.3);
        assert_eq!(*seen.borrow(), vec![2]);

        drop(subscription);
        store.split_pane("hub_2", SplitDirection::Vertical, SplitPosition::After);
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn close_focused_pane_moves_focus_to_first_leaf() {
        let mut store = two_pane_store();
        store.set_focused_pane("hub_1");
        assert!(store.close_pane("hub_1"));
        assert_eq!(store.tree().id(), "hub_2");
        assert_eq!(store.focused_pane(), "hub_2");
    }

    #[test]
    fn close_other_pane_keeps_focus() {
        let mut store = two_pane_store();
        store.split_pane("hub_2", SplitDirection::Vertical, SplitPosition::After);
        store.set_focused_pane("hub_2");
        assert!(store.close_pane("hub_1"));
        assert_eq!(store.focused_pane(), "hub_2");
    }

    #[test]
    fn close_last_pane_synthesizes_fresh_leaf() {
        let mut store = PaneStore::default();
        assert!(store.toggle_zoom("hub_1"));
        assert!(store.close_pane("hub_1"));
        assert_eq!(store.tree().id(), "hub_2");
        assert!(store.tree().as_leaf().is_some());
        assert_eq!(store.focused_pane(), "hub_2");
        assert_eq!(store.zoomed_pane(), None);
    }

    #[test]
    fn close_zoomed_pane_clears_zoom() {
        let mut store = two_pane_store();
        assert!(store.toggle_zoom("hub_2"));
        store.close_pane("hub_2");
        assert_eq!(store.zoomed_pane(), None);
    }

    #[test]
    fn close_other_pane_keeps_zoom() {
        let mut store = two_pane_store();
        store.split_pane("hub_2", SplitDirection::Vertical, SplitPosition::After);
        assert!(store.toggle_zoom("hub_2"));
        store.close_pane("hub_1");
        assert_eq!(store.zoomed_pane().map(PaneId::as_str), Some("hub_2"));
    }

    #[test]
    fn toggle_zoom_flips_and_ignores_non_leaves() {
        let mut store = two_pane_store();
        assert!(!store.toggle_zoom("hub_3"));
        assert!(!store.toggle_zoom("nope"));

        assert!(store.toggle_zoom("hub_1"));
        assert_eq!(store.visible_root().id(), "hub_1");
        assert!(store.toggle_zoom("hub_2"));
        assert_eq!(store.zoomed_pane().map(PaneId::as_str), Some("hub_2"));
        assert!(store.toggle_zoom("hub_2"));
        assert_eq!(store.zoomed_pane(), None);
        assert!(Arc::ptr_eq(store.visible_root(), store.tree()));
    }

    #[test]
    fn layout_follows_zoom() {
        let mut store = two_pane_store();
        let area = PaneRect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(store.layout(area).len(), 3);
        store.toggle_zoom("hub_2");
        let layout = store.layout(area);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.rect("hub_2"), Some(area));
    }

    #[test]
    fn drop_on_swaps_and_clears_drag_state() {
        let mut store = two_pane_store();
        store.set_drag_source(Some(PaneId::from("hub_1")));
        store.set_drag_over(Some(PaneId::from("hub_2")));
        assert!(store.drop_on("hub_2"));

        let left = store.tree().find_leaf("hub_1").expect("leaf");
        assert_eq!(left.agent_id, agent("a2"));
        assert_eq!(left.project_id, project("p2"));
        assert_eq!(store.drag_source(), None);
        assert_eq!(store.drag_over(), None);
    }

    #[test]
    fn drop_without_source_or_onto_self_is_noop() {
        let mut store = two_pane_store();
        let revision = store.revision();
        store.set_drag_over(Some(PaneId::from("hub_2")));
        assert!(!store.drop_on("hub_2"));
        assert_eq!(store.drag_over(), None);

        store.set_drag_source(Some(PaneId::from("hub_2")));
        assert!(!store.drop_on("hub_2"));
        assert_eq!(store.drag_source(), None);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn validate_and_remove_agents_through_store() {
        let mut store = two_pane_store();
        let known: HashSet<AgentId> = [AgentId::from("a1")].into_iter().collect();
        assert!(store.validate_agents(&known));
        assert!(!store.validate_agents(&known));
        assert!(store.tree().find_leaf("hub_2").expect("leaf").agent_id.is_none());

        assert!(store.remove_panes_by_agent(&AgentId::from("a1")));
        assert!(store.tree().collect_leaves().iter().all(|leaf| !leaf.is_assigned()));
    }

    #[test]
    fn save_then_load_round_trips() {
        let storage = MemoryStorage::new();
        let store = two_pane_store();
        store.save(&storage).expect("save");

        let mut restored = PaneStore::default();
        restored.load(&storage);
        assert!(restored.is_loaded());
        assert_eq!(restored.tree(), store.tree());
        assert_eq!(restored.focused_pane(), "hub_1");

        let new_leaf = restored.split_pane("hub_2", SplitDirection::Vertical, SplitPosition::After);
        assert_eq!(new_leaf.as_ref().map(PaneId::as_str), Some("hub_4"));
    }

    #[test]
    fn load_falls_back_on_bad_data() {
        let cases = [
            json!({"type": "grid", "id": "hub_1"}),
            json!("not an object"),
            json!({"type": "split", "id": "hub_3", "direction": "horizontal", "children": []}),
            json!({"type": "split", "id": "hub_3", "direction": "horizontal",
                   "children": [{"type": "leaf", "id": "hub_1"}, {"type": "leaf", "id": "hub_1"}]}),
        ];
        for value in cases {
            let storage = MemoryStorage::new();
            storage.write("hub-pane-tree", &value).expect("seed");
            let mut store = PaneStore::default();
            store.toggle_zoom("hub_1");
            store.load(&storage);
            assert!(store.is_loaded());
            let leaf = store.tree().as_leaf().expect("fresh single leaf");
            assert!(!leaf.is_assigned());
            assert_eq!(store.focused_pane(), &leaf.id);
            assert_eq!(store.zoomed_pane(), None);
        }
    }

    #[test]
    fn load_from_empty_storage_marks_loaded() {
        let storage = MemoryStorage::new();
        let mut store = PaneStore::default();
        store.load(&storage);
        assert!(store.is_loaded());
        assert_eq!(store.tree().leaf_count(), 1);
    }

    #[test]
    fn load_clamps_persisted_ratios() {
        let storage = MemoryStorage::new();
        storage
            .write(
                "hub-pane-tree",
                &json!({"type": "split", "id": "hub_3", "direction": "vertical", "ratio": 0.99,
                        "children": [{"type": "leaf", "id": "hub_1"}, {"type": "leaf", "id": "hub_2"}]}),
            )
            .expect("seed");
        let mut store = PaneStore::default();
        store.load(&storage);
        let split = store.tree().as_split().expect("split");
        assert_eq!(split.ratio(), hub_layout::MAX_SPLIT_RATIO);
    }

    #[test]
    fn autosave_writes_after_quiet_period() {
        let config = StoreConfig {
            autosave_debounce_ms: Some(200),
            ..StoreConfig::default()
        };
        let storage = MemoryStorage::new();
        let mut store = PaneStore::new(config).expect("valid config");
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let _subscription = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.split_pane("hub_1", SplitDirection::Horizontal, SplitPosition::After);
        store.assign_agent("hub_2", agent("a1"), None);
        assert_eq!(calls.get(), 2);
        assert!(store.autosave_pending());
        assert!(!store.poll_autosave(&storage, Instant::now()).expect("poll"));

        let later = Instant::now() + Duration::from_millis(250);
        assert!(store.poll_autosave(&storage, later).expect("poll"));
        assert!(!store.autosave_pending());
        let saved: PaneNode =
            serde_json::from_value(storage.read("hub-pane-tree").expect("read").expect("present"))
                .expect("decode");
        assert_eq!(&saved, store.tree().as_ref());
    }

    /// Fails the first `failures` writes, then behaves like [`MemoryStorage`].
    struct FlakyStorage {
        failures: Cell<u32>,
        inner: MemoryStorage,
    }

    impl StorageBackend for FlakyStorage {
        fn name(&self) -> &str {
            "flaky"
        }

        fn read(&self, key: &str) -> StorageResult<Option<Value>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &Value) -> StorageResult<()> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(StorageError::Backend("disk full".into()));
            }
            self.inner.write(key, value)
        }

        fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key)
        }

        fn list(&self) -> StorageResult<Vec<String>> {
            self.inner.list()
        }
    }

    #[test]
    fn failed_autosave_is_retried_on_next_poll() {
        let config = StoreConfig {
            autosave_debounce_ms: Some(0),
            ..StoreConfig::default()
        };
        let storage = FlakyStorage {
            failures: Cell::new(1),
            inner: MemoryStorage::new(),
        };
        let mut store = PaneStore::new(config).expect("valid config");
        store.split_pane("hub_1", SplitDirection::Horizontal, SplitPosition::After);

        let now = Instant::now();
        assert!(matches!(
            store.poll_autosave(&storage, now),
            Err(StorageError::Backend(_))
        ));
        assert!(store.autosave_pending());

        assert!(store.poll_autosave(&storage, now).expect("retry"));
        assert!(!store.autosave_pending());
        let saved: PaneNode =
            serde_json::from_value(storage.read("hub-pane-tree").expect("read").expect("present"))
                .expect("decode");
        assert_eq!(&saved, store.tree().as_ref());
    }

    #[test]
    fn cancel_autosave_discards_pending_write() {
        let config = StoreConfig {
            autosave_debounce_ms: Some(0),
            ..StoreConfig::default()
        };
        let storage = MemoryStorage::new();
        let mut store = PaneStore::new(config).expect("valid config");
        store.split_pane("hub_1", SplitDirection::Horizontal, SplitPosition::After);
        assert!(store.cancel_autosave());
        assert!(!store.poll_autosave(&storage, Instant::now()).expect("poll"));
        assert_eq!(storage.read("hub-pane-tree").expect("read"), None);
    }

    #[test]
    fn load_does_not_schedule_autosave_of_stored_tree() {
        let storage = MemoryStorage::new();
        two_pane_store().save(&storage).expect("save");
        let config = StoreConfig {
            autosave_debounce_ms: Some(0),
            ..StoreConfig::default()
        };
        let mut store = PaneStore::new(config).expect("valid config");
        store.load(&storage);
        assert!(!store.autosave_pending());
    }
}
