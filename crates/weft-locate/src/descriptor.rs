//! Element-location descriptors
//!
//! A descriptor is either *found* (a path, an index into its matches and a
//! content hash, optionally pinned to the live node it last resolved to) or
//! a *search* (path alternates to try). On the wire the two are told apart
//! by the presence of `hash`.

use serde::{Deserialize, Serialize};
use weft_dom::NodeId;

use crate::ContentHash;

/// Path of the sentinel root container
pub const ROOT_CONTAINER_PATH: &str = "//html";

/// One path expression or an ordered list of alternates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    One(String),
    Alternates(Vec<String>),
}

impl PathSpec {
    /// Alternates in the order they should be tried
    pub fn alternates(&self) -> &[String] {
        match self {
            PathSpec::One(path) => std::slice::from_ref(path),
            PathSpec::Alternates(paths) => paths,
        }
    }

    fn is_root(&self) -> bool {
        matches!(self, PathSpec::One(path) if path == ROOT_CONTAINER_PATH)
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        PathSpec::One(path.to_string())
    }
}

/// Where to look for a container element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerDescriptor {
    Found(FoundContainer),
    Search(ContainerQuery),
}

impl ContainerDescriptor {
    /// Whether this names the sentinel root container
    pub fn is_root(&self) -> bool {
        match self {
            ContainerDescriptor::Found(found) => found.container_path == ROOT_CONTAINER_PATH,
            ContainerDescriptor::Search(query) => {
                query.container_path.as_ref().is_some_and(PathSpec::is_root)
            }
        }
    }

    /// Pinned container node, if found and pinned
    pub fn pinned(&self) -> Option<NodeId> {
        match self {
            ContainerDescriptor::Found(found) => found.container,
            ContainerDescriptor::Search(_) => None,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            ContainerDescriptor::Found(found) => found.container_required,
            ContainerDescriptor::Search(query) => query.container_required,
        }
    }
}

impl From<FoundContainer> for ContainerDescriptor {
    fn from(found: FoundContainer) -> Self {
        ContainerDescriptor::Found(found)
    }
}

impl From<ContainerQuery> for ContainerDescriptor {
    fn from(query: ContainerQuery) -> Self {
        ContainerDescriptor::Search(query)
    }
}

/// A container located by an earlier resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundContainer {
    #[serde(rename = "parentFoundContainer", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ContainerDescriptor>>,
    pub container_path: String,
    pub container_index: usize,
    #[serde(default)]
    pub container_required: bool,
    pub hash: ContentHash,
    /// Live node this descriptor resolved to
    #[serde(skip)]
    pub container: Option<NodeId>,
}

impl FoundContainer {
    /// The sentinel root: the document element, always present
    pub fn root(document_element: Option<NodeId>) -> Self {
        Self {
            parent: None,
            container_path: ROOT_CONTAINER_PATH.to_string(),
            container_index: 0,
            container_required: false,
            hash: ContentHash::container(ROOT_CONTAINER_PATH, 0),
            container: document_element,
        }
    }

    /// Unpinned descriptor for `path[index]` below `parent`
    pub fn new(parent: Option<ContainerDescriptor>, path: &str, index: usize) -> Self {
        Self {
            parent: parent.map(Box::new),
            container_path: path.to_string(),
            container_index: index,
            container_required: false,
            hash: ContentHash::container(path, index),
            container: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.container_path == ROOT_CONTAINER_PATH
    }

    /// Pinned node of the parent descriptor
    pub fn parent_pin(&self) -> Option<NodeId> {
        self.parent.as_deref().and_then(ContainerDescriptor::pinned)
    }
}

/// Container lookup by path alternates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerQuery {
    #[serde(rename = "parentFoundContainer", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ContainerDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_path: Option<PathSpec>,
    /// When set, failing to find the container fails the lookup instead of
    /// falling back to the root
    #[serde(default)]
    pub container_required: bool,
}

/// Where to look for an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementDescriptor {
    Found(FoundElement),
    Search(ElementQuery),
}

impl ElementDescriptor {
    /// Pinned element node, if found and pinned
    pub fn pinned(&self) -> Option<NodeId> {
        match self {
            ElementDescriptor::Found(found) => found.element,
            ElementDescriptor::Search(_) => None,
        }
    }
}

impl From<FoundElement> for ElementDescriptor {
    fn from(found: FoundElement) -> Self {
        ElementDescriptor::Found(found)
    }
}

impl From<ElementQuery> for ElementDescriptor {
    fn from(query: ElementQuery) -> Self {
        ElementDescriptor::Search(query)
    }
}

/// An element located by an earlier resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundElement {
    #[serde(rename = "foundContainer", default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerDescriptor>,
    pub element_path: String,
    pub element_index: usize,
    pub hash: ContentHash,
    /// Live node this descriptor resolved to
    #[serde(skip)]
    pub element: Option<NodeId>,
}

impl FoundElement {
    /// Unpinned descriptor for `path[index]` inside `container`
    pub fn new(container: FoundContainer, path: &str, index: usize) -> Self {
        let hash = ContentHash::element(&container.hash, path, index);
        Self {
            container: Some(ContainerDescriptor::Found(container)),
            element_path: path.to_string(),
            element_index: index,
            hash,
            element: None,
        }
    }

    /// Pinned node of the container descriptor
    pub fn container_pin(&self) -> Option<NodeId> {
        self.container.as_ref().and_then(ContainerDescriptor::pinned)
    }
}

/// Element lookup by path alternates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementQuery {
    #[serde(rename = "foundContainer", default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_path: Option<PathSpec>,
}
