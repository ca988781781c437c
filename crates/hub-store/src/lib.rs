#![forbid(unsafe_code)]

//! Stateful owner of the agent hub's pane layout.
//!
//! [`PaneStore`] holds the current [`hub_layout::PaneNode`] tree together with
//! focus, zoom and drag state, funnels every change through the pure
//! operations in `hub_layout`, and persists the tree through a
//! [`StorageBackend`].
//!
//! ```
//! use hub_layout::{SplitDirection, SplitPosition};
//! use hub_store::{MemoryStorage, PaneStore};
//!
//! let storage = MemoryStorage::new();
//! let mut store = PaneStore::default();
//! store.load(&storage);
//!
//! let pane = store.focused_pane().clone();
//! let new_leaf = store.split_pane(pane.as_str(), SplitDirection::Horizontal, SplitPosition::After);
//! assert!(new_leaf.is_some());
//! store.save(&storage).expect("memory storage does not fail");
//! ```

pub mod config;
pub mod debounce;
pub mod storage;
pub mod store;

pub use config::{ConfigError, DEFAULT_ID_PREFIX, DEFAULT_STORAGE_KEY, StoreConfig};
pub use debounce::SaveDebouncer;
pub use storage::{
    FileStorage, MemoryStorage, StorageBackend, StorageError, StorageResult, StorageScope,
};
pub use store::{PaneStore, Subscription};
