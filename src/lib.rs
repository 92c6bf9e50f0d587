//! Viewgraph - lazily expandable view models for runtime values.
//!
//! This crate turns values into renderable view models and serves them in slices:
//! - `Heap` / `Value` - the runtime values being shown, addressed by `ObjRef`
//! - `Dispatcher` - default view synthesis by value shape, with `Visualize` for custom views
//! - `assemble` - sequence, key-values, grid, flow, switch and DAG composites
//! - `CacheEngine` - per-snapshot cache of views keyed by `ViewId`
//!
//! # Architecture
//!
//! Every cached view refers to its children by id, never by value:
//!
//! ```text
//! CacheEngine
//! └── snapshots: { SnapshotId -> Snapshot }
//!     ├── info (location, root, created_at)
//!     └── entries: { ViewId -> CacheEntry }
//!         ├── full: View<ViewId>
//!         ├── compact: Summary
//!         └── refs: [ViewId]
//! ```
//!
//! A slice is one full view plus the summaries of the ids it references, so a
//! client can expand the graph one hop at a time, cycles included.
//!
//! # Example
//!
//! ```
//! use viewgraph::{CacheEngine, Heap, Location, SliceEntry};
//!
//! let mut heap = Heap::new();
//! let one = heap.int(1);
//! let list = heap.list([one]);
//! heap.push(list, list);
//!
//! let mut engine = CacheEngine::default();
//! let root = engine.capture(&heap, list, Location::new("main.py", 3)).unwrap();
//! let slice = engine.expand(&root).unwrap();
//!
//! assert!(matches!(slice.entries[&root], SliceEntry::Full { .. }));
//! let modes = slice.full_view().unwrap().as_switch().unwrap().mode_names();
//! assert_eq!(modes, vec!["full", "summary"]);
//! ```

pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod engine;
mod error;
mod model;
mod value;
mod view_id;

// Re-exports
pub use config::{DispatchOptions, EngineConfig};
pub use dispatch::{CollectionSpec, Dispatcher, Mode, Synthesized, ViewContext, Visualize};
pub use engine::{
    CacheEngine, CacheEntry, EnginePhase, Location, SharedEngine, Slice, SliceEntry, SnapshotInfo,
};
pub use error::{AssembleError, DispatchError, EngineError, IntrospectionError};
pub use model::{
    Child, DagContents, DagEdge, DagNode, Direction, FlowContents, GridCell, GridContents,
    ImageContents, Meta, Port, Summary, SwitchContents, SwitchMode, TextContents, TextVariant,
    View, ViewKind, ViewKindTag, ViewModel,
};
pub use value::{Attr, Heap, ObjRef, Param, Value, MAX_COMPARE_DEPTH};
pub use view_id::{SnapshotId, ViewId, ViewIdError};
