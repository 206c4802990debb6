//! Weft DOM - Document Object Model
//!
//! Arena-allocated DOM tree with shadow roots, form-control state, CSS
//! selector matching and a synthetic event log. Nodes are addressed by
//! [`NodeId`], which never owns the node it points at.

mod node;
mod tree;
mod document;
mod shadow;
mod forms;
mod events;
mod selector;

pub use node::{Node, NodeData, ElementData, TextData, Attribute, ControlState};
pub use tree::{DomTree, Children};
pub use document::Document;
pub use shadow::{ShadowRootData, ShadowRootMode};
pub use forms::{ControlKind, InputType};
pub use selector::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, NthExpression, PseudoClass,
    SelectorComponent, SelectorError, SelectorList,
};
pub use events::{
    Dispatcher, DispatchedEvent, EventInit, EventInterface, EventLog, SyntheticEvent,
};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID (the document node)
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert to `Option`, mapping the sentinel to `None`
    #[inline]
    pub fn to_option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

/// DOM mutation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0:?} does not exist")]
    InvalidNode(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Element {0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),

    #[error("Cannot insert {child:?} into its own subtree")]
    HierarchyRequest { child: NodeId },
}
