//! Error types.
//!
//! Four families, matching how callers are expected to react:
//! - `IntrospectionError` - a single attribute could not be read or compared,
//!   or the heap could not take another value. The dispatcher drops an
//!   unreadable field and keeps going.
//! - `AssembleError` - a composite violated one of its structural invariants;
//!   the whole composite is unusable.
//! - `DispatchError` - a value's view could not be synthesized.
//! - `EngineError` - capture/expand failures reported to the orchestration layer.

use crate::value::ObjRef;
use crate::view_id::SnapshotId;
use thiserror::Error;

/// Failure while reading or comparing a value's attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    /// Attribute lookup raised.
    #[error("attribute '{name}' raised: {reason}")]
    AttributeRaised {
        /// Attribute name.
        name: String,
        /// Message carried by the failure.
        reason: String,
    },

    /// Values cannot be compared (custom values define no equality).
    #[error("cannot compare {left} with {right}")]
    Incomparable {
        /// Left operand type name.
        left: String,
        /// Right operand type name.
        right: String,
    },

    /// Comparison descended past the nesting bound (usually a cyclic container).
    #[error("comparison exceeded nesting depth {depth}")]
    DepthExceeded {
        /// Bound that was hit.
        depth: usize,
    },

    /// A reference points outside the heap.
    #[error("dangling value reference {0}")]
    Dangling(ObjRef),

    /// Every 32-bit identity is in use.
    #[error("heap is full: {len} values already allocated")]
    HeapFull {
        /// Values in the heap.
        len: usize,
    },
}

/// Structural invariant violated while assembling a composite view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// Grid spec lines differ in length.
    #[error("Malformed grid spec: line {line} has length {actual}, expected {expected}")]
    MalformedGridSpec {
        /// Zero-based line index.
        line: usize,
        /// Length of the first line.
        expected: usize,
        /// Length of the offending line.
        actual: usize,
    },

    /// A declared grid cell has no item.
    #[error("No item was provided for cell '{cell}'")]
    MissingCellItem {
        /// Cell name.
        cell: String,
    },

    /// Two grid cells cover a common position.
    #[error("Cells '{first}' and '{second}' overlap")]
    OverlappingCells {
        /// Cell declared first.
        first: String,
        /// Cell declared second.
        second: String,
    },

    /// A grid cell has zero width or height.
    #[error("Cell '{cell}' is empty ({width}x{height})")]
    EmptyCell {
        /// Cell name.
        cell: String,
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },

    /// A declared switch mode has no item.
    #[error("No item was provided for mode '{mode}'")]
    MissingModeItem {
        /// Mode name.
        mode: String,
    },

    /// A switch mode name was declared twice.
    #[error("Mode '{mode}' is declared more than once")]
    DuplicateMode {
        /// Mode name.
        mode: String,
    },

    /// A DAG node has no item.
    #[error("No item was provided for node '{node}'")]
    MissingNodeItem {
        /// Node id.
        node: String,
    },

    /// A DAG node's parent is not a registered node.
    #[error("Parent node '{parent}' not found for child '{node}'")]
    UnknownParent {
        /// Child node id.
        node: String,
        /// Missing parent id.
        parent: String,
    },

    /// A DAG edge endpoint is not a registered node.
    #[error("Edge {edge} {end} at non-existent node '{node}'")]
    UnknownEdgeNode {
        /// Edge index.
        edge: usize,
        /// "starts" or "ends".
        end: &'static str,
        /// Missing node id.
        node: String,
    },

    /// A DAG edge names a port the endpoint node never registered.
    #[error("Edge {edge} {end} at non-existent port '{port}' on node '{node}'")]
    UnknownPort {
        /// Edge index.
        edge: usize,
        /// "starts" or "ends".
        end: &'static str,
        /// Endpoint node id.
        node: String,
        /// Missing port name.
        port: String,
    },
}

impl AssembleError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedGridSpec { .. } => "MALFORMED_GRID_SPEC",
            Self::MissingCellItem { .. } => "MISSING_CELL_ITEM",
            Self::OverlappingCells { .. } => "OVERLAPPING_CELLS",
            Self::EmptyCell { .. } => "EMPTY_CELL",
            Self::MissingModeItem { .. } => "MISSING_MODE_ITEM",
            Self::DuplicateMode { .. } => "DUPLICATE_MODE",
            Self::MissingNodeItem { .. } => "MISSING_NODE_ITEM",
            Self::UnknownParent { .. } => "UNKNOWN_PARENT",
            Self::UnknownEdgeNode { .. } => "UNKNOWN_EDGE_NODE",
            Self::UnknownPort { .. } => "UNKNOWN_PORT",
        }
    }
}

/// Failure while synthesizing a value's view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A value reference points outside the heap.
    #[error("Value {0} does not exist in the heap")]
    UnknownValue(ObjRef),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Errors surfaced by the snapshot cache engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The id was never captured, or its snapshot has been evicted.
    #[error("View '{0}' not found (never captured or evicted)")]
    NotFound(String),

    /// A request string is not a well-formed view id.
    #[error("Invalid view id '{0}'")]
    InvalidId(String),

    /// A value reference points outside the heap.
    #[error("Value {0} does not exist in the heap")]
    UnknownValue(ObjRef),

    /// A view could not be assembled while walking a snapshot.
    #[error("Failed to assemble view for value {value} in snapshot {snapshot}: {source}")]
    Assembly {
        /// Value whose view failed.
        value: ObjRef,
        /// Snapshot being captured.
        snapshot: SnapshotId,
        /// Underlying assembly failure.
        #[source]
        source: AssembleError,
    },

    /// The shared engine's lock was poisoned by a panicking caller.
    #[error("Engine lock poisoned")]
    Poisoned,
}

impl EngineError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidId(_) => "INVALID_ID",
            Self::UnknownValue(_) => "UNKNOWN_VALUE",
            Self::Assembly { .. } => "ASSEMBLY_FAILED",
            Self::Poisoned => "POISONED",
        }
    }

    /// Check if the engine stays usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Poisoned)
    }
}
