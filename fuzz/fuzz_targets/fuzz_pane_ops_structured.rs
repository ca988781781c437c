#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use hub_layout::{AgentId, ProjectId, SplitDirection, SplitPosition, check_tree};
use hub_store::PaneStore;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Split { pane: u8, vertical: bool, before: bool },
    Close { pane: u8 },
    Assign { pane: u8, agent: Option<u8> },
    Swap { a: u8, b: u8 },
    RemoveAgent { agent: u8 },
    Validate { known: Vec<u8> },
    SetRatio { split: u8, ratio: f64 },
    ToggleZoom { pane: u8 },
    Focus { pane: u8 },
    DragDrop { source: u8, target: u8 },
}

/// Node ids are addressed by index so most ops hit real panes; indexes past
/// the end produce ids that do not exist.
fn node_id(store: &PaneStore, index: u8) -> String {
    let ids = store.tree().node_ids();
    match ids.get(usize::from(index)) {
        Some(id) => id.to_string(),
        None => format!("hub_{}", u64::from(index) + 10_000),
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut store = PaneStore::default();

    for op in ops.into_iter().take(256) {
        match op {
            Op::Split { pane, vertical, before } => {
                let id = node_id(&store, pane);
                let direction = if vertical {
                    SplitDirection::Vertical
                } else {
                    SplitDirection::Horizontal
                };
                let position = if before {
                    SplitPosition::Before
                } else {
                    SplitPosition::After
                };
                let leaves = store.tree().leaf_count();
                let added = store.split_pane(&id, direction, position);
                let expected = if added.is_some() { leaves + 1 } else { leaves };
                assert_eq!(store.tree().leaf_count(), expected);
            }
            Op::Close { pane } => {
                let id = node_id(&store, pane);
                store.close_pane(&id);
            }
            Op::Assign { pane, agent } => {
                let id = node_id(&store, pane);
                let agent = agent.map(|a| AgentId::new(format!("agent-{}", a % 8)));
                let project = agent.as_ref().map(|_| ProjectId::from("fuzz"));
                store.assign_agent(&id, agent, project);
            }
            Op::Swap { a, b } => {
                let (a, b) = (node_id(&store, a), node_id(&store, b));
                store.swap_panes(&a, &b);
            }
            Op::RemoveAgent { agent } => {
                store.remove_panes_by_agent(&AgentId::new(format!("agent-{}", agent % 8)));
            }
            Op::Validate { known } => {
                let known: HashSet<AgentId> = known
                    .into_iter()
                    .map(|a| AgentId::new(format!("agent-{}", a % 8)))
                    .collect();
                store.validate_agents(&known);
                assert!(!store.validate_agents(&known), "validation is idempotent");
            }
            Op::SetRatio { split, ratio } => {
                let id = node_id(&store, split);
                store.set_split_ratio(&id, ratio);
            }
            Op::ToggleZoom { pane } => {
                let id = node_id(&store, pane);
                store.toggle_zoom(&id);
            }
            Op::Focus { pane } => {
                let id = node_id(&store, pane);
                if store.tree().find_leaf(&id).is_some() {
                    store.set_focused_pane(id.as_str());
                }
            }
            Op::DragDrop { source, target } => {
                let source = node_id(&store, source);
                let target = node_id(&store, target);
                store.set_drag_source(Some(source.as_str().into()));
                store.drop_on(&target);
                assert!(store.drag_source().is_none());
            }
        }

        // Post-conditions that must always hold:
        assert!(check_tree(store.tree()).is_ok(), "tree invariants broken");
        assert!(
            store.tree().find_leaf(store.focused_pane().as_str()).is_some(),
            "focus on a missing leaf"
        );
        if let Some(zoomed) = store.zoomed_pane() {
            assert!(
                store.tree().find_leaf(zoomed.as_str()).is_some(),
                "zoom on a missing leaf"
            );
        }
        assert!(store.ids().peek("hub") >= store.tree().node_ids().len() as u64);
    }
});
