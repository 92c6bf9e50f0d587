//! Sequence - children laid out along one axis.

use super::grid::GridBuilder;
use crate::error::AssembleError;
use crate::model::{Child, View, ViewKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Builder for a sequence view.
///
/// Positions are delegated to a grid: the start motif (if any) takes the first
/// position, each element the next one along the axis, the end motif the last.
#[derive(Debug, Clone, Default)]
pub struct SequenceBuilder {
    elements: Vec<Child>,
    start_motif: Option<String>,
    end_motif: Option<String>,
    orientation: Orientation,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements<I, T>(elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Child>,
    {
        Self {
            elements: elements.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn item(mut self, child: impl Into<Child>) -> Self {
        self.elements.push(child.into());
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

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn assemble(self) -> Result<View<Child>, AssembleError> {
        let mut grid = GridBuilder::new();
        let mut position = 0u32;
        let orientation = self.orientation;
        let at = |position: u32| match orientation {
            Orientation::Horizontal => (position, 0),
            Orientation::Vertical => (0, position),
        };

        if let Some(motif) = self.start_motif {
            let (col, row) = at(position);
            grid = grid
                .cell("start_motif", col, row, 1, 1)
                .item("start_motif", View::text(motif));
            position += 1;
        }
        for (i, element) in self.elements.into_iter().enumerate() {
            let (col, row) = at(position);
            let name = i.to_string();
            grid = grid.cell(name.clone(), col, row, 1, 1).item(name, element);
            position += 1;
        }
        if let Some(motif) = self.end_motif {
            let (col, row) = at(position);
            grid = grid
                .cell("end_motif", col, row, 1, 1)
                .item("end_motif", View::text(motif));
        }

        Ok(View::new(ViewKind::Sequence(grid.into_contents()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewKindTag;
    use pretty_assertions::assert_eq;

    fn positions(view: &View<Child>) -> Vec<(String, u32, u32)> {
        view.cells()
            .unwrap()
            .iter()
            .map(|cell| (cell.name.clone(), cell.col, cell.row))
            .collect()
    }

    #[test]
    fn test_horizontal_with_motifs() {
        let view = SequenceBuilder::with_elements(["a", "b"])
            .start_motif("[")
            .end_motif("]")
            .assemble()
            .unwrap();
        assert_eq!(view.kind_tag(), ViewKindTag::Sequence);
        assert_eq!(
            positions(&view),
            vec![
                ("start_motif".to_string(), 0, 0),
                ("0".to_string(), 1, 0),
                ("1".to_string(), 2, 0),
                ("end_motif".to_string(), 3, 0),
            ]
        );
    }

    #[test]
    fn test_vertical_without_motifs() {
        let view = SequenceBuilder::new()
            .item("x")
            .item("y")
            .orientation(Orientation::Vertical)
            .assemble()
            .unwrap();
        assert_eq!(
            positions(&view),
            vec![("0".to_string(), 0, 0), ("1".to_string(), 0, 1)]
        );
    }

    #[test]
    fn test_empty_sequence() {
        let view = SequenceBuilder::new().assemble().unwrap();
        assert!(view.cells().unwrap().is_empty());
    }
}
