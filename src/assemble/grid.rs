//! Grid - the general composite every other layout is positioned by.
//!
//! A cell is a named rectangle `(col, row, width, height)`. Cells can be declared
//! one at a time or inferred from a textual spec where each distinct non-blank
//! character is one cell:
//!
//! ```text
//! AAB      A: col 0, row 0, 2x2
//! AAB      B: col 2, row 0, 1x3
//! CCB      C: col 0, row 2, 2x1
//! ```

use crate::error::AssembleError;
use crate::model::{Child, GridCell, GridContents, View, ViewKind};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Rectangle covered by a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn new(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    fn col_end(&self) -> u32 {
        self.col.saturating_add(self.width)
    }

    fn row_end(&self) -> u32 {
        self.row.saturating_add(self.height)
    }
}

/// Infer cell rectangles from a textual spec.
///
/// Every line must have the same length. Blank characters belong to no cell.
/// Cells come back in order of first appearance (row-major).
pub fn parse_grid_spec(spec: &str) -> Result<Vec<(char, CellRect)>, AssembleError> {
    // Per character: (min col, min row, max col exclusive, max row exclusive).
    let mut bounds: Vec<(char, [u32; 4])> = Vec::new();
    let mut index: HashMap<char, usize> = HashMap::new();
    let mut expected_len: Option<usize> = None;

    for (y, line) in spec.lines().enumerate() {
        let len = line.chars().count();
        match expected_len {
            None => expected_len = Some(len),
            Some(expected) if expected != len => {
                return Err(AssembleError::MalformedGridSpec {
                    line: y,
                    expected,
                    actual: len,
                });
            }
            Some(_) => {}
        }

        let y = y as u32;
        for (x, c) in line.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x = x as u32;
            match index.get(&c) {
                Some(&i) => {
                    let b = &mut bounds[i].1;
                    b[0] = b[0].min(x);
                    b[2] = b[2].max(x + 1);
                    b[3] = y + 1;
                }
                None => {
                    index.insert(c, bounds.len());
                    bounds.push((c, [x, y, x + 1, y + 1]));
                }
            }
        }
    }

    Ok(bounds
        .into_iter()
        .map(|(c, [x0, y0, x1, y1])| (c, CellRect::new(x0, y0, x1 - x0, y1 - y0)))
        .collect())
}

/// Builder for a grid view.
#[derive(Debug, Default)]
pub struct GridBuilder {
    cells: Vec<(String, CellRect)>,
    items: HashMap<String, Child>,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a textual spec; each character becomes a cell named by that character.
    ///
    /// # Errors
    /// `MalformedGridSpec` if the lines differ in length. No cell is registered in that case.
    pub fn from_spec(spec: &str) -> Result<Self, AssembleError> {
        let mut builder = Self::new();
        for (c, rect) in parse_grid_spec(spec)? {
            builder.cells.push((c.to_string(), rect));
        }
        Ok(builder)
    }

    /// Declare a cell. Re-declaring a name replaces its rectangle.
    pub fn cell(
        mut self,
        name: impl Into<String>,
        col: u32,
        row: u32,
        width: u32,
        height: u32,
    ) -> Self {
        let name = name.into();
        let rect = CellRect::new(col, row, width, height);
        match self.cells.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = rect,
            None => self.cells.push((name, rect)),
        }
        self
    }

    /// Place a child in a cell.
    pub fn item(mut self, cell: impl Into<String>, child: impl Into<Child>) -> Self {
        self.items.insert(cell.into(), child.into());
        self
    }

    pub fn cell_rect(&self, name: &str) -> Option<CellRect> {
        self.cells
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rect)| *rect)
    }

    pub fn cell_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Validate and build the grid view.
    ///
    /// # Errors
    /// - `EmptyCell` for a zero-sized cell
    /// - `MissingCellItem` for a declared cell with no item
    /// - `OverlappingCells` if two cells share a position
    pub fn assemble(self) -> Result<View<Child>, AssembleError> {
        Ok(View::new(ViewKind::Grid(self.into_contents()?)))
    }

    pub(crate) fn into_contents(mut self) -> Result<GridContents<Child>, AssembleError> {
        for (name, rect) in &self.cells {
            if rect.width == 0 || rect.height == 0 {
                return Err(AssembleError::EmptyCell {
                    cell: name.clone(),
                    width: rect.width,
                    height: rect.height,
                });
            }
            if !self.items.contains_key(name) {
                return Err(AssembleError::MissingCellItem { cell: name.clone() });
            }
        }
        if let Some((a, b)) = find_overlap(&self.cells) {
            let (first, second) = (a.min(b), a.max(b));
            return Err(AssembleError::OverlappingCells {
                first: self.cells[first].0.clone(),
                second: self.cells[second].0.clone(),
            });
        }

        let mut cells = Vec::with_capacity(self.cells.len());
        for (name, rect) in self.cells {
            let view = self
                .items
                .remove(&name)
                .ok_or_else(|| AssembleError::MissingCellItem { cell: name.clone() })?;
            cells.push(GridCell {
                name,
                col: rect.col,
                row: rect.row,
                width: rect.width,
                height: rect.height,
                view,
            });
        }
        Ok(GridContents { cells })
    }
}

/// Sweep across columns keeping the row intervals of cells that are still open.
/// Open intervals are pairwise disjoint (or we would already have returned), so
/// the one starting closest below a cell's bottom edge is the only candidate.
fn find_overlap(cells: &[(String, CellRect)]) -> Option<(usize, usize)> {
    let mut order: Vec<usize> = (0..cells.len()).collect();
    order.sort_by_key(|&i| (cells[i].1.col, cells[i].1.row));

    let mut open: BTreeMap<u32, usize> = BTreeMap::new();
    let mut closing: BinaryHeap<Reverse<(u32, u32)>> = BinaryHeap::new();

    for i in order {
        let rect = cells[i].1;
        while let Some(&Reverse((col_end, row))) = closing.peek() {
            if col_end > rect.col {
                break;
            }
            closing.pop();
            open.remove(&row);
        }
        if let Some((_, &j)) = open.range(..rect.row_end()).next_back() {
            if cells[j].1.row_end() > rect.row {
                return Some((j, i));
            }
        }
        open.insert(rect.row, i);
        closing.push(Reverse((rect.col_end(), rect.row)));
    }
    None
}
