//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: detaching a node only unlinks it, so a stale
//! [`NodeId`] still points at the (now disconnected) node it named.

use crate::{DomError, EventLog, Node, NodeData, NodeId, SyntheticEvent};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) focused: NodeId,
    pub(crate) events: EventLog,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            focused: NodeId::NONE,
            events: EventLog::default(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every arena node, linked or not, in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Push a node into the arena without linking it
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node::doctype(name))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.get(parent).is_none() {
            return Err(DomError::InvalidNode(parent));
        }
        if self.get(child).is_none() {
            return Err(DomError::InvalidNode(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { child });
        }

        self.detach(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
        Ok(())
    }

    /// Unlink a node from its parent. No-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = self.parent(current);
        }
        false
    }

    /// Parent node (NONE for roots and detached nodes)
    pub fn parent(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.parent)
    }

    /// Parent if it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id).to_option()?;
        self.is_element(parent).then_some(parent)
    }

    /// The node itself if it is an element, else its parent element
    pub fn nearest_element(&self, id: NodeId) -> Option<NodeId> {
        if self.is_element(id) {
            Some(id)
        } else {
            self.parent_element(id)
        }
    }

    /// First child
    pub fn first_child(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.first_child)
    }

    /// Last child
    pub fn last_child(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.last_child)
    }

    /// Next sibling
    pub fn next_sibling(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.next_sibling)
    }

    /// Previous sibling
    pub fn prev_sibling(&self, id: NodeId) -> NodeId {
        self.get(id).map_or(NodeId::NONE, |n| n.prev_sibling)
    }

    /// Iterate over children as `(id, node)` pairs
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children { tree: self, next: self.first_child(id) }
    }

    /// Child ids collected into a vector
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    /// Descendants in tree order, excluding `id`. Does not enter shadow trees.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_ids(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut child = self.last_child(current);
            while child.is_valid() {
                stack.push(child);
                child = self.prev_sibling(child);
            }
        }
        out
    }

    /// Ancestors from parent to root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while current.is_valid() {
            out.push(current);
            current = self.parent(current);
        }
        out
    }

    /// Root of the tree containing `id`: the document node, a shadow root,
    /// or the top of a detached subtree.
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let parent = self.parent(current);
            if !parent.is_valid() {
                return current;
            }
            current = parent;
        }
    }

    /// Whether the node is reachable from the document, through shadow
    /// hosts where needed
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut root = self.tree_root(id);
        loop {
            if root == NodeId::ROOT {
                return true;
            }
            match self.shadow_host(root) {
                Some(host) => root = self.tree_root(host),
                None => return false,
            }
        }
    }

    /// All tree roots: the document first, then shadow roots in creation order
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = vec![NodeId::ROOT];
        roots.extend(
            self.nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.is_shadow_root())
                .map(|(i, _)| NodeId(i as u32)),
        );
        roots
    }

    /// Check if a node is an element
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.name.as_str())
    }

    /// Attribute value of an element
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let elem = self.element_mut(id)?;
        elem.set_attr(name, value);
        Ok(())
    }

    /// Remove an attribute from an element
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.element_mut(id)?.remove_attr(name))
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut crate::ElementData, DomError> {
        self.get_mut(id)
            .ok_or(DomError::InvalidNode(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    /// Set an own script property on an element (e.g. a framework's props
    /// object), recording which callable members it exposes.
    pub fn set_expando<I, S>(&mut self, id: NodeId, key: &str, members: I) -> Result<(), DomError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elem = self.element_mut(id)?;
        elem.expandos.insert(key.to_string(), members.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Own script property names of an element
    pub fn expando_keys(&self, id: NodeId) -> Vec<&str> {
        self.get(id)
            .and_then(Node::as_element)
            .map(|e| e.expandos.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether the expando `key` exposes a callable `member`
    pub fn expando_has_member(&self, id: NodeId, key: &str, member: &str) -> bool {
        self.get(id)
            .and_then(Node::as_element)
            .and_then(|e| e.expandos.get(key))
            .is_some_and(|members| members.contains(member))
    }

    /// Concatenated text of all descendant text nodes (light tree only)
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        let mut out = String::new();
        for desc in self.descendants(id) {
            if let Some(text) = self.get(desc).and_then(Node::as_text) {
                out.push_str(text);
            }
        }
        out
    }

    /// Currently focused element
    pub fn focused(&self) -> Option<NodeId> {
        self.focused.to_option()
    }

    /// Move focus to `id`
    pub fn focus(&mut self, id: NodeId) {
        self.focused = id;
    }

    /// Drop focus if `id` holds it
    pub fn blur(&mut self, id: NodeId) {
        if self.focused == id {
            self.focused = NodeId::NONE;
        }
    }

    /// Record a synthetic event
    pub fn dispatch(&mut self, event: SyntheticEvent) {
        tracing::trace!(event = %event.event_type, target = ?event.target, "dispatch");
        self.events.record(event);
    }

    /// Dispatched events, oldest first
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take and clear the event log
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    /// Whether the node is a comment
    pub fn is_comment(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| matches!(n.data, NodeData::Comment(_)))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over child nodes
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.to_option()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.append_child(tree.root(), html).unwrap();
        tree.append_child(html, a).unwrap();
        tree.append_child(html, b).unwrap();
        (tree, html, a, b)
    }

    #[test]
    fn test_append_and_children() {
        let (tree, html, a, b) = sample();
        assert_eq!(tree.child_ids(html), vec![a, b]);
        assert_eq!(tree.parent(a), html);
        assert_eq!(tree.next_sibling(a), b);
        assert_eq!(tree.prev_sibling(b), a);
    }

    #[test]
    fn test_reappend_moves_node() {
        let (mut tree, html, a, b) = sample();
        tree.append_child(b, a).unwrap();
        assert_eq!(tree.child_ids(html), vec![b]);
        assert_eq!(tree.child_ids(b), vec![a]);
        assert_eq!(tree.descendants(html), vec![b, a]);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, html, a, _) = sample();
        assert_eq!(
            tree.append_child(a, html),
            Err(DomError::HierarchyRequest { child: html })
        );
    }

    #[test]
    fn test_detach_disconnects() {
        let (mut tree, html, a, b) = sample();
        tree.detach(a);
        assert_eq!(tree.child_ids(html), vec![b]);
        assert!(!tree.is_connected(a));
        assert!(tree.is_connected(b));
        assert_eq!(tree.tree_root(a), a);
    }

    #[test]
    fn test_text_content() {
        let (mut tree, html, a, _) = sample();
        let t1 = tree.create_text("Hello ");
        let t2 = tree.create_text("World");
        tree.append_child(a, t1).unwrap();
        tree.append_child(html, t2).unwrap();
        assert_eq!(tree.text_content(html), "Hello World");
        assert_eq!(tree.nearest_element(t1), Some(a));
    }
}
