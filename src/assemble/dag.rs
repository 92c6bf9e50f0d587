//! Dag - hierarchical node/edge graph.
//!
//! Nodes may be registered several times; each registration only overwrites the
//! fields it supplies, so a node can be configured incrementally. A node's
//! children are not stored: they are derived at assembly as every node whose
//! parent is that node.

use crate::error::AssembleError;
use crate::model::{Child, DagContents, DagEdge, DagNode, Direction, Port, View, ViewKind};
use std::collections::{BTreeMap, HashMap};

/// Fields supplied by one node registration. `None` leaves the current value alone.
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    pub flow_direction: Option<Direction>,
    pub align_children: Option<bool>,
    pub is_expanded: Option<bool>,
    pub is_interactive: Option<bool>,
    pub is_visible: Option<bool>,
    pub parent: Option<String>,
    /// Peers this node is aligned with; adds one alignment group.
    pub align_with: Option<Vec<String>>,
    pub item: Option<Child>,
    /// `(port name, side, order)`
    pub ports: Vec<(String, Direction, Option<i32>)>,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow_direction(mut self, direction: Direction) -> Self {
        self.flow_direction = Some(direction);
        self
    }

    pub fn align_children(mut self, align: bool) -> Self {
        self.align_children = Some(align);
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.is_expanded = Some(expanded);
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.is_interactive = Some(interactive);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.is_visible = Some(visible);
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn align_with<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.align_with = Some(peers.into_iter().map(Into::into).collect());
        self
    }

    pub fn item(mut self, child: impl Into<Child>) -> Self {
        self.item = Some(child.into());
        self
    }

    pub fn port(mut self, name: impl Into<String>, side: Direction, order: Option<i32>) -> Self {
        self.ports.push((name.into(), side, order));
        self
    }
}

#[derive(Debug, Clone, Default)]
struct NodeState {
    flow_direction: Option<Direction>,
    align_children: Option<bool>,
    is_expanded: Option<bool>,
    is_interactive: Option<bool>,
    is_visible: Option<bool>,
    parent: Option<String>,
    ports: BTreeMap<String, Port>,
}

/// Builder for a DAG view.
#[derive(Debug, Clone, Default)]
pub struct DagBuilder {
    flow_direction: Option<Direction>,
    align_children: Option<bool>,
    /// Registration order; drives the order of derived children lists.
    order: Vec<String>,
    nodes: HashMap<String, NodeState>,
    items: HashMap<String, Child>,
    edges: Vec<DagEdge>,
    alignments: Vec<Vec<String>>,
}

impl DagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// DAG-level defaults for nodes that do not set their own.
    pub fn with_defaults(flow_direction: Option<Direction>, align_children: Option<bool>) -> Self {
        Self {
            flow_direction,
            align_children,
            ..Self::default()
        }
    }

    fn entry(&mut self, id: &str) -> &mut NodeState {
        if !self.nodes.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.nodes.entry(id.to_string()).or_default()
    }

    /// Register or reconfigure a node.
    pub fn node(mut self, id: impl Into<String>, options: NodeOptions) -> Self {
        let id = id.into();
        let state = self.entry(&id);
        if options.flow_direction.is_some() {
            state.flow_direction = options.flow_direction;
        }
        if options.align_children.is_some() {
            state.align_children = options.align_children;
        }
        if options.is_expanded.is_some() {
            state.is_expanded = options.is_expanded;
        }
        if options.is_interactive.is_some() {
            state.is_interactive = options.is_interactive;
        }
        if options.is_visible.is_some() {
            state.is_visible = options.is_visible;
        }
        if options.parent.is_some() {
            state.parent = options.parent;
        }

        if let Some(peers) = options.align_with {
            let mut group = Vec::with_capacity(peers.len() + 1);
            group.push(id.clone());
            group.extend(peers);
            self.alignments.push(group);
        }
        let mut builder = self;
        for (name, side, order) in options.ports {
            builder = builder.port(id.clone(), name, side, order);
        }
        if let Some(item) = options.item {
            builder = builder.item(id, item);
        }
        builder
    }

    /// Attach a named connection point to a node. Re-registering a port replaces it.
    pub fn port(
        mut self,
        node: impl Into<String>,
        name: impl Into<String>,
        side: Direction,
        order: Option<i32>,
    ) -> Self {
        let node = node.into();
        self.entry(&node).ports.insert(name.into(), Port { side, order });
        self
    }

    pub fn edge(self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.edge_with_ports(start, None, end, None)
    }

    /// Add an edge, optionally anchored at named ports of its endpoints.
    pub fn edge_with_ports(
        mut self,
        start: impl Into<String>,
        start_port: Option<&str>,
        end: impl Into<String>,
        end_port: Option<&str>,
    ) -> Self {
        self.edges.push(DagEdge {
            start_id: start.into(),
            end_id: end.into(),
            start_port: start_port.map(str::to_string),
            end_port: end_port.map(str::to_string),
        });
        self
    }

    /// Bind the view shown for a node.
    pub fn item(mut self, node: impl Into<String>, child: impl Into<Child>) -> Self {
        self.items.insert(node.into(), child.into());
        self
    }

    /// Validate every reference and build the DAG view.
    ///
    /// # Errors
    /// - `MissingNodeItem` - a registered node has no item
    /// - `UnknownParent` - a parent is not a registered node
    /// - `UnknownEdgeNode` - an edge endpoint is not a registered node
    /// - `UnknownPort` - an edge port is not registered on its endpoint
    pub fn assemble(mut self) -> Result<View<Child>, AssembleError> {
        for id in &self.order {
            if !self.items.contains_key(id) {
                return Err(AssembleError::MissingNodeItem { node: id.clone() });
            }
            if let Some(parent) = &self.nodes[id].parent {
                if !self.nodes.contains_key(parent) {
                    return Err(AssembleError::UnknownParent {
                        node: id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for (index, edge) in self.edges.iter().enumerate() {
            self.check_endpoint(index, "starts", &edge.start_id, edge.start_port.as_deref())?;
            self.check_endpoint(index, "ends", &edge.end_id, edge.end_port.as_deref())?;
        }

        let mut children: HashMap<&str, Vec<String>> = HashMap::new();
        for id in &self.order {
            if let Some(parent) = &self.nodes[id].parent {
                children.entry(parent.as_str()).or_default().push(id.clone());
            }
        }

        let mut nodes = BTreeMap::new();
        for id in &self.order {
            let state = &self.nodes[id];
            let view = self
                .items
                .remove(id)
                .ok_or_else(|| AssembleError::MissingNodeItem { node: id.clone() })?;
            nodes.insert(
                id.clone(),
                DagNode {
                    flow_direction: state.flow_direction,
                    align_children: state.align_children,
                    is_expanded: state.is_expanded,
                    is_interactive: state.is_interactive,
                    is_visible: state.is_visible,
                    ports: state.ports.clone(),
                    children: children.remove(id.as_str()).unwrap_or_default(),
                    view,
                },
            );
        }

        let edges = self
            .edges
            .into_iter()
            .enumerate()
            .map(|(index, edge)| (index as u32, edge))
            .collect();

        Ok(View::new(ViewKind::Dag(DagContents {
            nodes,
            edges,
            alignments: self.alignments,
            flow_direction: self.flow_direction,
            align_children: self.align_children,
        })))
    }

    fn check_endpoint(
        &self,
        edge: usize,
        end: &'static str,
        node: &str,
        port: Option<&str>,
    ) -> Result<(), AssembleError> {
        let state = self
            .nodes
            .get(node)
            .ok_or_else(|| AssembleError::UnknownEdgeNode {
                edge,
                end,
                node: node.to_string(),
            })?;
        if let Some(port) = port {
            if !state.ports.contains_key(port) {
                return Err(AssembleError::UnknownPort {
                    edge,
                    end,
                    node: node.to_string(),
                    port: port.to_string(),
                });
            }
        }
        Ok(())
    }
}
