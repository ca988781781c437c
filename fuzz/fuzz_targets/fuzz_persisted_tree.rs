#![no_main]

use hub_layout::{MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, PaneNode, check_tree};
use hub_store::{MemoryStorage, PaneStore, StorageBackend};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes as a persisted layout.
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(tree) = serde_json::from_value::<PaneNode>(value.clone()) {
        for id in tree.node_ids() {
            if let Some(split) = tree.find_split(id.as_str()) {
                assert!((MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&split.ratio()));
            }
        }
        let encoded = serde_json::to_value(&tree).expect("decoded tree re-encodes");
        let decoded: PaneNode = serde_json::from_value(encoded).expect("re-encoded tree decodes");
        assert_eq!(decoded, tree);
    }

    // Loading must never fail, whatever the storage holds.
    let storage = MemoryStorage::new();
    storage
        .write("hub-pane-tree", &value)
        .expect("memory storage accepts any value");
    let mut store = PaneStore::default();
    store.load(&storage);
    assert!(store.is_loaded());
    assert!(check_tree(store.tree()).is_ok());
    assert!(store.tree().find_leaf(store.focused_pane().as_str()).is_some());
    assert!(store.zoomed_pane().is_none());
});
