//! Weft Locate - re-finding elements from serialized descriptors
//!
//! A descriptor records how an element was found: a container path and
//! index (itself nested under a parent container), then an element path and
//! index inside that container. [`ContainerCache`] and [`ElementResolver`]
//! replay those lookups against the current DOM, returning fresh
//! descriptors pinned to the live nodes. Input descriptors are never
//! mutated and the DOM is never touched.

mod container;
mod descriptor;
mod element;
mod hash;

use weft_dom::{DomTree, NodeId};

pub use container::ContainerCache;
pub use descriptor::{
    ContainerDescriptor, ContainerQuery, ElementDescriptor, ElementQuery, FoundContainer,
    FoundElement, PathSpec, ROOT_CONTAINER_PATH,
};
pub use element::{ElementResolver, ResolvedElement};
pub use hash::ContentHash;

/// Why a descriptor could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailReason {
    #[error("Parent container could not be resolved")]
    ParentUnresolved,

    #[error("No element at index {index} ({found} matches)")]
    NoMatch { index: usize, found: usize },

    #[error("Matched node was rejected by the predicate")]
    PredicateRejected,

    #[error("Matched node is not the pinned node")]
    IdentityMismatch,

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("No alternate matched")]
    NothingFound,
}

/// Outcome of resolving a descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// The input descriptor is still valid and is returned unchanged
    FastPath(T),
    /// A fresh descriptor pinned to the live node
    Resolved(T),
    Failed(FailReason),
}

impl<T> Resolution<T> {
    /// The resolved descriptor, dropping the failure reason
    pub fn ok(self) -> Option<T> {
        match self {
            Resolution::FastPath(value) | Resolution::Resolved(value) => Some(value),
            Resolution::Failed(_) => None,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Resolution::FastPath(value) | Resolution::Resolved(value) => Some(value),
            Resolution::Failed(_) => None,
        }
    }

    pub fn is_fast_path(&self) -> bool {
        matches!(self, Resolution::FastPath(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }

    pub fn fail_reason(&self) -> Option<&FailReason> {
        match self {
            Resolution::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Extra acceptance test applied to candidate elements
pub type Predicate<'a> = &'a dyn Fn(&DomTree, NodeId) -> bool;

/// Predicate accepting every element
pub fn accept_all(_: &DomTree, _: NodeId) -> bool {
    true
}

/// The document element (first element child of the document node)
pub(crate) fn document_element(tree: &DomTree) -> Option<NodeId> {
    tree.children(tree.root())
        .find(|(_, node)| node.is_element())
        .map(|(id, _)| id)
}
