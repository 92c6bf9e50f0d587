//! Flow - children laid out inline, one after another, wrapping as needed.

use crate::model::{Child, FlowContents, View, ViewKind};

/// Builder for a flow view. A flow has no structural invariants, so `assemble`
/// cannot fail.
#[derive(Debug, Clone, Default)]
pub struct FlowBuilder {
    elements: Vec<Child>,
}

impl FlowBuilder {
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
        }
    }

    /// Append an element. Plain strings become text leaves.
    pub fn item(mut self, child: impl Into<Child>) -> Self {
        self.elements.push(child.into());
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn assemble(self) -> View<Child> {
        View::new(ViewKind::Flow(FlowContents {
            elements: self.elements,
        }))
    }
}
