//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a new document with an empty html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under a valid root cannot fail to link
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate html, head and body after the tree was built externally
    pub fn finalize(&mut self) {
        self.html_element = self
            .tree
            .children(self.tree.root())
            .find(|(_, n)| n.as_element().is_some_and(|e| e.name == "html"))
            .map_or(NodeId::NONE, |(id, _)| id);

        self.head_element = self.child_named(self.html_element, "head");
        self.body_element = self.child_named(self.html_element, "body");
    }

    fn child_named(&self, parent: NodeId, name: &str) -> NodeId {
        if !parent.is_valid() {
            return NodeId::NONE;
        }
        self.tree
            .children(parent)
            .find(|(_, n)| n.as_element().is_some_and(|e| e.name == name))
            .map_or(NodeId::NONE, |(id, _)| id)
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get document title
    pub fn title(&self) -> String {
        let title = self.child_named(self.head_element, "title");
        if title.is_valid() {
            self.tree.text_content(title).trim().to_string()
        } else {
            String::new()
        }
    }

    /// Get <html> element
    pub fn document_element(&self) -> Option<NodeId> {
        self.html_element.to_option()
    }

    /// Get <head> element
    pub fn head(&self) -> Option<NodeId> {
        self.head_element.to_option()
    }

    /// Get <body> element
    pub fn body(&self) -> Option<NodeId> {
        self.body_element.to_option()
    }

    /// Get element by ID (light tree only, first in tree order)
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|&node| self.tree.get_attribute(node, "id") == Some(id))
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
