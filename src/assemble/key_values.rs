//! KeyValues - rows of `key  separator  value`.

use super::grid::GridBuilder;
use crate::error::AssembleError;
use crate::model::{Child, View, ViewKind};

/// Default text between a key and its value.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Builder for a key-values view. Three grid columns per row; motifs span all three.
#[derive(Debug, Clone)]
pub struct KeyValuesBuilder {
    pairs: Vec<(Child, Child)>,
    separator: String,
    start_motif: Option<String>,
    end_motif: Option<String>,
}

impl Default for KeyValuesBuilder {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            start_motif: None,
            end_motif: None,
        }
    }
}

impl KeyValuesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Child>,
        V: Into<Child>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn item(mut self, key: impl Into<Child>, value: impl Into<Child>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn start_motif(mut self, motif: impl Into<String>) -> Self {
        self.start_motif = Some(motif.into());
        self
    }

    pub fn end_motif(mut self, motif: impl Into<String>) -> Self {
        self.end_motif = Some(motif.into());
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn assemble(self) -> Result<View<Child>, AssembleError> {
        let mut grid = GridBuilder::new();
        let mut row = 0u32;

        if let Some(motif) = self.start_motif {
            grid = grid
                .cell("start_motif", 0, row, 3, 1)
                .item("start_motif", View::text(motif));
            row += 1;
        }
        for (i, (key, value)) in self.pairs.into_iter().enumerate() {
            let (k, sep, v) = (format!("k{i}"), format!("sep{i}"), format!("v{i}"));
            grid = grid
                .cell(k.clone(), 0, row, 1, 1)
                .item(k, key)
                .cell(sep.clone(), 1, row, 1, 1)
                .item(sep, View::text(self.separator.clone()))
                .cell(v.clone(), 2, row, 1, 1)
                .item(v, value);
            row += 1;
        }
        if let Some(motif) = self.end_motif {
            grid = grid
                .cell("end_motif", 0, row, 3, 1)
                .item("end_motif", View::text(motif));
        }

        Ok(View::new(ViewKind::KeyValues(grid.into_contents()?)))
    }
}
