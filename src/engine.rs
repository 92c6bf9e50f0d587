//! Snapshot cache engine.
//!
//! `capture` walks every value reachable from a root, caches one entry per view
//! under a snapshot-scoped `ViewId`, and returns the root's id. `expand` answers
//! with a slice: the full view of one id plus the compact form of each id it
//! references directly. `expand_with` lets the caller pick the mode a switch
//! opens in, or ask for the summary alone.
//!
//! ```text
//! capture(root) ──► worklist of values ──► Dispatcher::synthesize
//!                                              │
//!                        inline views split off under parent.child(slot)
//!                                              │
//!                                              ▼
//!                              staged table ──► commit (on success only)
//! ```
//!
//! Entries refer to each other only by id, so cyclic value graphs cache as
//! cyclic id graphs with no ownership cycle.

use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, Mode, Synthesized};
use crate::error::{DispatchError, EngineError};
use crate::model::{Child, Summary, View, ViewKind, ViewModel};
use crate::value::{Heap, ObjRef};
use crate::view_id::{SnapshotId, ViewId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Source position a snapshot was taken at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One cached view. Immutable once committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub full: ViewModel,
    pub compact: Summary,
    /// Ids referenced by `full`, in slot order.
    pub refs: Vec<ViewId>,
}

/// Slice entry: the requested view in full, or a fringe placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum SliceEntry {
    Full {
        view: ViewModel,
        summary: Summary,
        location: Location,
    },
    Compact(Summary),
}

/// Answer to `expand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub root: ViewId,
    pub entries: BTreeMap<ViewId, SliceEntry>,
}

impl Slice {
    pub fn full_view(&self) -> Option<&ViewModel> {
        match self.entries.get(&self.root) {
            Some(SliceEntry::Full { view, .. }) => Some(view),
            _ => None,
        }
    }

    /// Ids served in compact form.
    pub fn fringe(&self) -> impl Iterator<Item = &ViewId> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, SliceEntry::Compact(_)))
            .map(|(id, _)| id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub location: Location,
    pub root: ViewId,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnginePhase {
    #[default]
    Idle,
    Walking(SnapshotId),
}

#[derive(Debug)]
struct Snapshot {
    info: SnapshotInfo,
    entries: HashMap<ViewId, CacheEntry>,
}

/// Single-threaded cache engine. Wrap in `SharedEngine` to share it.
#[derive(Debug)]
pub struct CacheEngine {
    config: EngineConfig,
    dispatcher: Dispatcher,
    counter: SnapshotId,
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    phase: EnginePhase,
}

impl Default for CacheEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CacheEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config.dispatch.clone()),
            config,
            counter: SnapshotId(0),
            snapshots: BTreeMap::new(),
            phase: EnginePhase::Idle,
        }
    }

    /// Engine configured from the file named by `VIEWGRAPH_CONFIG`, or defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(EngineConfig::from_env()?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Id the most recent capture used, committed or not.
    pub fn last_snapshot(&self) -> SnapshotId {
        self.counter
    }

    /// Retained snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshot_info(&self, id: SnapshotId) -> Option<&SnapshotInfo> {
        self.snapshots.get(&id).map(|snapshot| &snapshot.info)
    }

    /// Retained snapshots, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &SnapshotInfo> {
        self.snapshots.values().map(|snapshot| &snapshot.info)
    }

    pub fn entry(&self, id: &ViewId) -> Option<&CacheEntry> {
        self.snapshots.get(&id.snapshot())?.entries.get(id)
    }

    // =========================================================================
    // CAPTURE
    // =========================================================================

    /// Cache the view graph reachable from `root` under a new snapshot.
    ///
    /// The snapshot counter advances even if the walk fails; nothing else changes.
    pub fn capture(
        &mut self,
        heap: &Heap,
        root: ObjRef,
        location: Location,
    ) -> Result<ViewId, EngineError> {
        let snapshot = self.counter.next();
        self.counter = snapshot;
        self.phase = EnginePhase::Walking(snapshot);
        let walked = self.walk(heap, root, snapshot);
        self.phase = EnginePhase::Idle;

        let entries = match walked {
            Ok(entries) => entries,
            Err(err) => {
                warn!(snapshot = %snapshot, root = %root, error = %err, "capture abandoned");
                return Err(err);
            }
        };

        let root_id = ViewId::for_value(root, snapshot);
        let info = SnapshotInfo {
            id: snapshot,
            created_at: Utc::now(),
            location,
            root: root_id.clone(),
            entry_count: entries.len(),
        };
        info!(
            snapshot = %snapshot,
            root = %root_id,
            entries = info.entry_count,
            location = %info.location,
            "captured snapshot"
        );
        self.snapshots.insert(snapshot, Snapshot { info, entries });
        self.evict();
        Ok(root_id)
    }

    fn walk(
        &mut self,
        heap: &Heap,
        root: ObjRef,
        snapshot: SnapshotId,
    ) -> Result<HashMap<ViewId, CacheEntry>, EngineError> {
        let mut entries = HashMap::new();
        let mut visited = HashSet::from([root]);
        let mut worklist = VecDeque::from([root]);

        while let Some(obj) = worklist.pop_front() {
            let Synthesized { view, refs } =
                self.dispatcher
                    .synthesize(heap, obj)
                    .map_err(|err| match err {
                        DispatchError::UnknownValue(missing) => EngineError::UnknownValue(missing),
                        DispatchError::Assemble(source) => EngineError::Assembly {
                            value: obj,
                            snapshot,
                            source,
                        },
                    })?;
            for child in refs {
                if visited.insert(child) {
                    worklist.push_back(child);
                }
            }
            split_inline(ViewId::for_value(obj, snapshot), view, &mut entries);
        }
        Ok(entries)
    }

    fn evict(&mut self) {
        let Some(limit) = self.config.retain_snapshots else {
            return;
        };
        while self.snapshots.len() > limit {
            if let Some((id, snapshot)) = self.snapshots.pop_first() {
                debug!(snapshot = %id, entries = snapshot.entries.len(), "evicted snapshot");
            }
        }
    }

    // =========================================================================
    // EXPAND
    // =========================================================================

    fn lookup(&self, id: &ViewId) -> Result<(&Snapshot, &CacheEntry), EngineError> {
        let not_found = || EngineError::NotFound(id.to_string());
        let snapshot = self.snapshots.get(&id.snapshot()).ok_or_else(not_found)?;
        let entry = snapshot.entries.get(id).ok_or_else(not_found)?;
        Ok((snapshot, entry))
    }

    /// Full view of `id` plus the compact form of everything it references.
    pub fn expand(&self, id: &ViewId) -> Result<Slice, EngineError> {
        let (snapshot, entry) = self.lookup(id)?;

        let mut entries = BTreeMap::new();
        entries.insert(
            id.clone(),
            SliceEntry::Full {
                view: entry.full.clone(),
                summary: entry.compact.clone(),
                location: snapshot.info.location.clone(),
            },
        );
        for child in &entry.refs {
            if entries.contains_key(child) {
                continue;
            }
            let cached = snapshot
                .entries
                .get(child)
                .ok_or_else(|| EngineError::NotFound(child.to_string()))?;
            entries.insert(child.clone(), SliceEntry::Compact(cached.compact.clone()));
        }

        debug!(id = %id, entries = entries.len(), "expanded view");
        Ok(Slice {
            root: id.clone(),
            entries,
        })
    }

    /// `expand`, served in a requested mode.
    ///
    /// - `None` is plain `expand`.
    /// - `Summary` serves `id` in compact form only.
    /// - `Full` or `Compact` on a switch that declares that mode serves the switch
    ///   with the mode moved to the front, and the mode's view in full alongside.
    ///   Any other view is served as by `expand`.
    pub fn expand_with(&self, id: &ViewId, mode: Option<Mode>) -> Result<Slice, EngineError> {
        let Some(mode) = mode else {
            return self.expand(id);
        };
        let (_, entry) = self.lookup(id)?;
        if mode == Mode::Summary {
            debug!(id = %id, mode = %mode, "expanded view");
            let compact = SliceEntry::Compact(entry.compact.clone());
            return Ok(Slice {
                root: id.clone(),
                entries: BTreeMap::from([(id.clone(), compact)]),
            });
        }

        let mut slice = self.expand(id)?;
        let Some(target) = entry
            .full
            .as_switch()
            .and_then(|switch| switch.mode(mode.as_str()))
        else {
            return Ok(slice);
        };
        if let Some(SliceEntry::Full { view, .. }) = slice.entries.get_mut(id) {
            if let ViewKind::Switch(switch) = &mut view.kind {
                switch.promote(mode.as_str());
            }
        }
        for (child, served) in self.expand(target)?.entries {
            match served {
                SliceEntry::Full { .. } => {
                    slice.entries.insert(child, served);
                }
                SliceEntry::Compact(_) => {
                    slice.entries.entry(child).or_insert(served);
                }
            }
        }
        debug!(id = %id, mode = %mode, entries = slice.entries.len(), "expanded view");
        Ok(slice)
    }

    /// `expand` for an id in wire form.
    pub fn expand_str(&self, id: &str) -> Result<Slice, EngineError> {
        let id: ViewId = id
            .parse()
            .map_err(|_| EngineError::InvalidId(id.to_string()))?;
        self.expand(&id)
    }
}

/// Cache `view` under `id`, giving every inline child view its own entry under
/// `id.child(slot)`. Iterative so deep nesting cannot exhaust the stack.
fn split_inline(id: ViewId, view: View<Child>, entries: &mut HashMap<ViewId, CacheEntry>) {
    let mut stack = vec![(id, view)];
    while let Some((id, view)) = stack.pop() {
        let compact = view.summary();
        let mut refs = Vec::new();
        let full = view
            .try_map_children(|slot, child| {
                let child_id = match child {
                    Child::Value(obj) => ViewId::for_value(obj, id.snapshot()),
                    Child::View(inline) => {
                        let child_id = id.child(slot);
                        stack.push((child_id.clone(), *inline));
                        child_id
                    }
                };
                refs.push(child_id.clone());
                Ok::<_, std::convert::Infallible>(child_id)
            })
            .unwrap_or_else(|never| match never {});
        entries.insert(id, CacheEntry { full, compact, refs });
    }
}

// =============================================================================
// SHARED ENGINE
// =============================================================================

/// Cloneable handle; one mutex guards the entry table and the snapshot counter.
#[derive(Debug, Clone, Default)]
pub struct SharedEngine(Arc<Mutex<CacheEngine>>);

impl SharedEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self(Arc::new(Mutex::new(CacheEngine::new(config))))
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheEngine>, EngineError> {
        self.0.lock().map_err(|_| EngineError::Poisoned)
    }

    pub fn capture(
        &self,
        heap: &Heap,
        root: ObjRef,
        location: Location,
    ) -> Result<ViewId, EngineError> {
        self.lock()?.capture(heap, root, location)
    }

    pub fn expand(&self, id: &ViewId) -> Result<Slice, EngineError> {
        self.lock()?.expand(id)
    }

    pub fn expand_with(&self, id: &ViewId, mode: Option<Mode>) -> Result<Slice, EngineError> {
        self.lock()?.expand_with(id, mode)
    }

    pub fn expand_str(&self, id: &str) -> Result<Slice, EngineError> {
        self.lock()?.expand_str(id)
    }

    pub fn snapshot_info(&self, id: SnapshotId) -> Result<Option<SnapshotInfo>, EngineError> {
        Ok(self.lock()?.snapshot_info(id).cloned())
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut CacheEngine) -> R) -> Result<R, EngineError> {
        Ok(f(&mut *self.lock()?))
    }
}
