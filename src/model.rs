//! View model types.
//!
//! A view is `{ kind, contents, meta }`. It is generic over how it refers to its
//! children:
//!
//! - `View<Child>` - freshly assembled; children are runtime values or inline views.
//! - `View<ViewId>` (`ViewModel`) - cached; every child is an id, never an embedded view.
//!
//! The id indirection is what lets the cache hold cyclic view graphs.

use crate::value::ObjRef;
use crate::view_id::ViewId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Open, caller-defined metadata carried through unmodified.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// A view whose children are all resolved to ids.
pub type ViewModel = View<ViewId>;

/// A child slot of a view that has not been cached yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Another runtime value; its view is cached under its own id.
    Value(ObjRef),
    /// A view built inline by an assembler.
    View(Box<View<Child>>),
}

impl From<ObjRef> for Child {
    fn from(obj: ObjRef) -> Self {
        Child::Value(obj)
    }
}

impl From<View<Child>> for Child {
    fn from(view: View<Child>) -> Self {
        Child::View(Box::new(view))
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::from(View::text(text))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::from(View::text(text))
    }
}

/// Renderable description of something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View<C> {
    #[serde(flatten)]
    pub kind: ViewKind<C>,
    #[serde(default)]
    pub meta: Meta,
}

/// Kind tag plus kind-specific contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "contents", rename_all = "snake_case")]
pub enum ViewKind<C> {
    Text(TextContents),
    Image(ImageContents),
    /// Elements along one axis, positioned as grid cells.
    Sequence(GridContents<C>),
    /// Key / separator / value rows, positioned as grid cells.
    KeyValues(GridContents<C>),
    Grid(GridContents<C>),
    /// Children laid out inline, wrapping like words in a paragraph.
    Flow(FlowContents<C>),
    Switch(SwitchContents<C>),
    Dag(DagContents<C>),
}

/// Kind discriminant without contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKindTag {
    Text,
    Image,
    Sequence,
    KeyValues,
    Grid,
    Flow,
    Switch,
    Dag,
}

impl fmt::Display for ViewKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Sequence => "Sequence",
            Self::KeyValues => "KeyValues",
            Self::Grid => "Grid",
            Self::Flow => "Flow",
            Self::Switch => "Switch",
            Self::Dag => "Dag",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextVariant {
    #[default]
    Plain,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContents {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub variant: TextVariant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContents {
    pub file_path: String,
}

/// A named rectangle of a grid and the view placed in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell<C> {
    pub name: String,
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
    pub view: C,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridContents<C> {
    pub cells: Vec<GridCell<C>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowContents<C> {
    pub elements: Vec<C>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchMode<C> {
    pub name: String,
    pub view: C,
}

/// Ordered display modes; the first is shown initially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchContents<C> {
    pub modes: Vec<SwitchMode<C>>,
}

impl<C> SwitchContents<C> {
    pub fn mode_names(&self) -> Vec<&str> {
        self.modes.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn mode(&self, name: &str) -> Option<&C> {
        self.modes.iter().find(|m| m.name == name).map(|m| &m.view)
    }

    /// Move `name` to the front, keeping the order of the rest. No effect if absent.
    pub fn promote(&mut self, name: &str) {
        if let Some(pos) = self.modes.iter().position(|m| m.name == name) {
            let mode = self.modes.remove(pos);
            self.modes.insert(0, mode);
        }
    }
}

/// Compass direction, used for DAG flow and port sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub side: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagNode<C> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_children: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_interactive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<String, Port>,
    /// Derived at assembly: nodes whose parent is this node, in registration order.
    pub children: Vec<String>,
    pub view: C,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagEdge {
    pub start_id: String,
    pub end_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagContents<C> {
    pub nodes: BTreeMap<String, DagNode<C>>,
    /// Keyed by registration index.
    pub edges: BTreeMap<u32, DagEdge>,
    pub alignments: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_children: Option<bool>,
}

/// Compact form of a view: kind plus a one-line description, no children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub kind: ViewKindTag,
    pub text: String,
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl<C> View<C> {
    pub fn new(kind: ViewKind<C>) -> Self {
        Self {
            kind,
            meta: Meta::new(),
        }
    }

    /// Plain text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ViewKind::Text(TextContents {
            text: text.into(),
            color: None,
            variant: TextVariant::Plain,
        }))
    }

    /// Text rendered as a value token.
    pub fn token(text: impl Into<String>) -> Self {
        Self::new(ViewKind::Text(TextContents {
            text: text.into(),
            color: None,
            variant: TextVariant::Token,
        }))
    }

    /// Image read from a file. Relative paths are made absolute when possible.
    pub fn image(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self::new(ViewKind::Image(ImageContents {
            file_path: absolute.to_string_lossy().into_owned(),
        }))
    }

    /// Set the color of a text view. No effect on other kinds.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        if let ViewKind::Text(text) = &mut self.kind {
            text.color = Some(color.into());
        }
        self
    }

    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn kind_tag(&self) -> ViewKindTag {
        match &self.kind {
            ViewKind::Text(_) => ViewKindTag::Text,
            ViewKind::Image(_) => ViewKindTag::Image,
            ViewKind::Sequence(_) => ViewKindTag::Sequence,
            ViewKind::KeyValues(_) => ViewKindTag::KeyValues,
            ViewKind::Grid(_) => ViewKindTag::Grid,
            ViewKind::Flow(_) => ViewKindTag::Flow,
            ViewKind::Switch(_) => ViewKindTag::Switch,
            ViewKind::Dag(_) => ViewKindTag::Dag,
        }
    }

    /// Text of a text view.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            ViewKind::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Cells of a sequence, key-values or grid view.
    pub fn cells(&self) -> Option<&[GridCell<C>]> {
        match &self.kind {
            ViewKind::Sequence(grid) | ViewKind::KeyValues(grid) | ViewKind::Grid(grid) => {
                Some(&grid.cells)
            }
            _ => None,
        }
    }

    /// Elements of a flow view.
    pub fn elements(&self) -> Option<&[C]> {
        match &self.kind {
            ViewKind::Flow(flow) => Some(&flow.elements),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&SwitchContents<C>> {
        match &self.kind {
            ViewKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }

    pub fn as_dag(&self) -> Option<&DagContents<C>> {
        match &self.kind {
            ViewKind::Dag(dag) => Some(dag),
            _ => None,
        }
    }

    // =========================================================================
    // CHILD TRAVERSAL
    // =========================================================================

    /// Direct children in slot order.
    pub fn children(&self) -> Vec<&C> {
        match &self.kind {
            ViewKind::Text(_) | ViewKind::Image(_) => Vec::new(),
            ViewKind::Sequence(grid) | ViewKind::KeyValues(grid) | ViewKind::Grid(grid) => {
                grid.cells.iter().map(|cell| &cell.view).collect()
            }
            ViewKind::Flow(flow) => flow.elements.iter().collect(),
            ViewKind::Switch(switch) => switch.modes.iter().map(|mode| &mode.view).collect(),
            ViewKind::Dag(dag) => dag.nodes.values().map(|node| &node.view).collect(),
        }
    }

    /// Replace every direct child, in slot order. `f` receives the slot index.
    pub fn try_map_children<D, E>(
        self,
        mut f: impl FnMut(u32, C) -> Result<D, E>,
    ) -> Result<View<D>, E> {
        let mut slot = 0u32;
        let mut next = |child: C| {
            let current = slot;
            slot += 1;
            f(current, child)
        };

        let kind = match self.kind {
            ViewKind::Text(text) => ViewKind::Text(text),
            ViewKind::Image(image) => ViewKind::Image(image),
            ViewKind::Sequence(grid) => ViewKind::Sequence(grid.try_map(&mut next)?),
            ViewKind::KeyValues(grid) => ViewKind::KeyValues(grid.try_map(&mut next)?),
            ViewKind::Grid(grid) => ViewKind::Grid(grid.try_map(&mut next)?),
            ViewKind::Flow(flow) => {
                let elements = flow
                    .elements
                    .into_iter()
                    .map(&mut next)
                    .collect::<Result<Vec<_>, _>>()?;
                ViewKind::Flow(FlowContents { elements })
            }
            ViewKind::Switch(switch) => {
                let mut modes = Vec::with_capacity(switch.modes.len());
                for mode in switch.modes {
                    modes.push(SwitchMode {
                        name: mode.name,
                        view: next(mode.view)?,
                    });
                }
                ViewKind::Switch(SwitchContents { modes })
            }
            ViewKind::Dag(dag) => {
                let mut nodes = BTreeMap::new();
                for (id, node) in dag.nodes {
                    let mapped = DagNode {
                        flow_direction: node.flow_direction,
                        align_children: node.align_children,
                        is_expanded: node.is_expanded,
                        is_interactive: node.is_interactive,
                        is_visible: node.is_visible,
                        ports: node.ports,
                        children: node.children,
                        view: next(node.view)?,
                    };
                    nodes.insert(id, mapped);
                }
                ViewKind::Dag(DagContents {
                    nodes,
                    edges: dag.edges,
                    alignments: dag.alignments,
                    flow_direction: dag.flow_direction,
                    align_children: dag.align_children,
                })
            }
        };

        Ok(View {
            kind,
            meta: self.meta,
        })
    }
}

impl<C> GridContents<C> {
    fn try_map<D, E>(self, f: &mut impl FnMut(C) -> Result<D, E>) -> Result<GridContents<D>, E> {
        let mut cells = Vec::with_capacity(self.cells.len());
        for cell in self.cells {
            cells.push(GridCell {
                name: cell.name,
                col: cell.col,
                row: cell.row,
                width: cell.width,
                height: cell.height,
                view: f(cell.view)?,
            });
        }
        Ok(GridContents { cells })
    }
}

impl View<Child> {
    /// Compact form used on the fringe of a slice.
    pub fn summary(&self) -> Summary {
        let kind = self.kind_tag();
        let text = match &self.kind {
            ViewKind::Text(text) => text.text.clone(),
            ViewKind::Image(image) => Path::new(&image.file_path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.file_path.clone()),
            ViewKind::Sequence(grid) | ViewKind::KeyValues(grid) | ViewKind::Grid(grid) => {
                format!("{}[{}]", kind, grid.cells.len())
            }
            ViewKind::Flow(flow) => format!("Flow[{}]", flow.elements.len()),
            ViewKind::Switch(switch) => switch_summary_text(switch),
            ViewKind::Dag(dag) => format!("Dag[{}]", dag.nodes.len()),
        };
        Summary { kind, text }
    }
}

fn switch_summary_text(switch: &SwitchContents<Child>) -> String {
    let inline_text = |child: &Child| match child {
        Child::View(view) => view.as_text().map(str::to_string),
        Child::Value(_) => None,
    };
    switch
        .mode("summary")
        .and_then(inline_text)
        .or_else(|| switch.modes.iter().find_map(|mode| inline_text(&mode.view)))
        .unwrap_or_else(|| format!("Switch[{}]", switch.modes.len()))
}
