//! Collection size policy.
//!
//! A collection is shown through a switch with up to three modes:
//! - `full` - every element
//! - `compact` - the first `compact_len` elements and an ellipsis marker
//! - `summary` - a one-line description such as `List[5]`
//!
//! The compact mode is left out when the collection has `compact_len` elements or fewer.

use crate::assemble::{KeyValuesBuilder, Orientation, SequenceBuilder, SwitchBuilder};
use crate::config::DispatchOptions;
use crate::error::AssembleError;
use crate::model::{Child, View};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display mode of a collection switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Full,
    Compact,
    Summary,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Full => "full",
            Mode::Compact => "compact",
            Mode::Summary => "summary",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoration and defaults for one collection switch.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub start_motif: String,
    pub end_motif: String,
    pub summary: String,
    pub orientation: Orientation,
    /// Key/value separator; ignored for sequences.
    pub separator: String,
    /// Mode moved to the front, if any.
    pub initial_mode: Option<Mode>,
}

impl CollectionSpec {
    pub fn new(
        start_motif: impl Into<String>,
        end_motif: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            start_motif: start_motif.into(),
            end_motif: end_motif.into(),
            summary: summary.into(),
            orientation: Orientation::Horizontal,
            separator: crate::assemble::DEFAULT_SEPARATOR.to_string(),
            initial_mode: None,
        }
    }

    pub fn vertical(mut self) -> Self {
        self.orientation = Orientation::Vertical;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = Some(mode);
        self
    }
}

/// Switch over a sequence of elements.
pub fn switch_sequence(
    options: &DispatchOptions,
    elements: Vec<Child>,
    spec: &CollectionSpec,
) -> Result<View<Child>, AssembleError> {
    let sequence = || {
        SequenceBuilder::new()
            .start_motif(spec.start_motif.clone())
            .end_motif(spec.end_motif.clone())
            .orientation(spec.orientation)
    };

    let compact = if elements.len() > options.compact_len {
        let mut builder = sequence();
        for element in elements.iter().take(options.compact_len) {
            builder = builder.item(element.clone());
        }
        Some(builder.item(options.ellipsis.clone()).assemble()?)
    } else {
        None
    };

    let mut full = sequence();
    for element in elements {
        full = full.item(element);
    }

    modes_switch(full.assemble()?, compact, spec)
}

/// Switch over key/value pairs. The compact form ends with the ellipsis instead of the end motif.
pub fn switch_key_values(
    options: &DispatchOptions,
    pairs: Vec<(Child, Child)>,
    spec: &CollectionSpec,
) -> Result<View<Child>, AssembleError> {
    let key_values = || {
        KeyValuesBuilder::new()
            .separator(spec.separator.clone())
            .start_motif(spec.start_motif.clone())
    };

    let compact = if pairs.len() > options.compact_len {
        let mut builder = key_values().end_motif(options.ellipsis.clone());
        for (key, value) in pairs.iter().take(options.compact_len) {
            builder = builder.item(key.clone(), value.clone());
        }
        Some(builder.assemble()?)
    } else {
        None
    };

    let mut full = key_values().end_motif(spec.end_motif.clone());
    for (key, value) in pairs {
        full = full.item(key, value);
    }

    modes_switch(full.assemble()?, compact, spec)
}

fn modes_switch(
    full: View<Child>,
    compact: Option<View<Child>>,
    spec: &CollectionSpec,
) -> Result<View<Child>, AssembleError> {
    let mut switch = SwitchBuilder::new()
        .mode(Mode::Full.as_str())
        .item(Mode::Full.as_str(), full);
    if let Some(compact) = compact {
        switch = switch
            .mode(Mode::Compact.as_str())
            .item(Mode::Compact.as_str(), compact);
    }
    switch = switch
        .mode(Mode::Summary.as_str())
        .item(Mode::Summary.as_str(), View::text(spec.summary.clone()));
    if let Some(mode) = spec.initial_mode {
        switch = switch.promote(mode.as_str());
    }
    switch.assemble()
}
