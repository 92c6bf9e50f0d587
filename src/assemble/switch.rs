//! Switch - named display modes over alternative child views.

use crate::error::AssembleError;
use crate::model::{Child, SwitchContents, SwitchMode, View, ViewKind};
use std::collections::{HashMap, HashSet};

/// Builder for a switch view. The first mode is the one shown initially.
#[derive(Debug, Clone, Default)]
pub struct SwitchBuilder {
    modes: Vec<String>,
    items: HashMap<String, Child>,
}

impl SwitchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modes<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modes: modes.into_iter().map(Into::into).collect(),
            items: HashMap::new(),
        }
    }

    /// Append a mode.
    pub fn mode(mut self, name: impl Into<String>) -> Self {
        self.modes.push(name.into());
        self
    }

    /// Insert a mode at `index`; an index past the end appends.
    pub fn mode_at(mut self, name: impl Into<String>, index: usize) -> Self {
        let index = index.min(self.modes.len());
        self.modes.insert(index, name.into());
        self
    }

    /// Bind the view for a mode. Plain strings become text leaves.
    pub fn item(mut self, mode: impl Into<String>, child: impl Into<Child>) -> Self {
        self.items.insert(mode.into(), child.into());
        self
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    /// Move `mode` to the front, keeping the relative order of the rest.
    /// No effect if the mode is not declared.
    pub fn promote(mut self, mode: &str) -> Self {
        if let Some(pos) = self.modes.iter().position(|m| m == mode) {
            let name = self.modes.remove(pos);
            self.modes.insert(0, name);
        }
        self
    }

    /// # Errors
    /// - `DuplicateMode` if a mode name is declared twice
    /// - `MissingModeItem` if a declared mode has no item
    pub fn assemble(mut self) -> Result<View<Child>, AssembleError> {
        let mut seen = HashSet::new();
        for mode in &self.modes {
            if !seen.insert(mode.as_str()) {
                return Err(AssembleError::DuplicateMode { mode: mode.clone() });
            }
            if !self.items.contains_key(mode) {
                return Err(AssembleError::MissingModeItem { mode: mode.clone() });
            }
        }

        let mut modes = Vec::with_capacity(self.modes.len());
        for name in self.modes {
            let view = self
                .items
                .remove(&name)
                .ok_or_else(|| AssembleError::MissingModeItem { mode: name.clone() })?;
            modes.push(SwitchMode { name, view });
        }
        Ok(View::new(ViewKind::Switch(SwitchContents { modes })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_modes_in_declared_order() {
        let view = SwitchBuilder::with_modes(["full", "summary"])
            .item("summary", "List[2]")
            .item("full", "[1, 2]")
            .assemble()
            .unwrap();
        assert_eq!(view.as_switch().unwrap().mode_names(), vec!["full", "summary"]);
    }

    #[test]
    fn test_missing_mode_item() {
        let err = SwitchBuilder::with_modes(["full", "summary"])
            .item("full", "x")
            .assemble()
            .unwrap_err();
        assert_eq!(
            err,
            AssembleError::MissingModeItem {
                mode: "summary".into()
            }
        );
    }

    #[test]
    fn test_duplicate_mode() {
        let err = SwitchBuilder::new()
            .mode("full")
            .mode("full")
            .item("full", "x")
            .assemble()
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_MODE");
    }

    #[test]
    fn test_insert_and_promote() {
        let builder = SwitchBuilder::with_modes(["full", "summary"])
            .mode_at("compact", 1)
            .mode_at("raw", 99);
        assert_eq!(builder.modes(), &["full", "compact", "summary", "raw"]);

        let builder = builder.promote("summary");
        assert_eq!(builder.modes(), &["summary", "full", "compact", "raw"]);
    }
}
