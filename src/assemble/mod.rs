//! Composite assemblers.
//!
//! Each builder collects children with chained calls and validates everything in
//! a single terminal `assemble()`, which yields an immutable `View<Child>`.
//!
//! ```text
//! SequenceBuilder ──┐
//! KeyValuesBuilder ─┴──► GridBuilder ──► View { Sequence | KeyValues | Grid }
//! FlowBuilder ──────────────────────────► View { Flow }
//! SwitchBuilder ────────────────────────► View { Switch }
//! DagBuilder ───────────────────────────► View { Dag }
//! ```

pub mod dag;
pub mod flow;
pub mod grid;
pub mod key_values;
pub mod sequence;
pub mod switch;

pub use dag::{DagBuilder, NodeOptions};
pub use flow::FlowBuilder;
pub use grid::{parse_grid_spec, CellRect, GridBuilder};
pub use key_values::{KeyValuesBuilder, DEFAULT_SEPARATOR};
pub use sequence::{Orientation, SequenceBuilder};
pub use switch::SwitchBuilder;
