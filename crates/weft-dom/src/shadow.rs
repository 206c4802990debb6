//! Shadow DOM
//!
//! A shadow root is an arena node of its own. It is referenced from the
//! host element but is not one of the host's children, so light-tree
//! traversal never enters it.

use crate::{DomError, DomTree, Node, NodeId};

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

impl ShadowRootMode {
    /// Parse the `shadowrootmode` attribute value
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Shadow root
#[derive(Debug, Clone)]
pub struct ShadowRootData {
    pub host: NodeId,
    pub mode: ShadowRootMode,
    pub delegates_focus: bool,
}

impl DomTree {
    /// Attach a shadow root to an element
    pub fn attach_shadow(
        &mut self,
        host: NodeId,
        mode: ShadowRootMode,
    ) -> Result<NodeId, DomError> {
        let elem = self.element_mut(host)?;
        if elem.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }

        let root = self.push(Node::shadow_root(ShadowRootData {
            host,
            mode,
            delegates_focus: false,
        }));
        self.element_mut(host)?.shadow_root = Some(root);
        tracing::debug!(?host, ?root, ?mode, "attached shadow root");
        Ok(root)
    }

    /// Shadow root hosted by an element.
    ///
    /// Closed roots are returned too: automation runs with the privileges
    /// of the page that attached them.
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.get(host)?.as_element()?.shadow_root
    }

    /// Host element of a shadow root
    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.get(root)?.as_shadow_root().map(|s| s.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_shadow() {
        let mut tree = DomTree::new();
        let host = tree.create_element("x-widget");
        tree.append_child(tree.root(), host).unwrap();

        let root = tree.attach_shadow(host, ShadowRootMode::Open).unwrap();
        let inner = tree.create_element("input");
        tree.append_child(root, inner).unwrap();

        assert_eq!(tree.shadow_root(host), Some(root));
        assert_eq!(tree.shadow_host(root), Some(host));
        assert!(tree.child_ids(host).is_empty());
        assert!(tree.is_connected(inner));
        assert_eq!(tree.tree_root(inner), root);
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut tree = DomTree::new();
        let host = tree.create_element("div");
        tree.attach_shadow(host, ShadowRootMode::Closed).unwrap();
        assert_eq!(
            tree.attach_shadow(host, ShadowRootMode::Open),
            Err(DomError::ShadowRootExists(host))
        );
    }

    #[test]
    fn test_text_cannot_host() {
        let mut tree = DomTree::new();
        let text = tree.create_text("x");
        assert_eq!(
            tree.attach_shadow(text, ShadowRootMode::Open),
            Err(DomError::NotAnElement(text))
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(ShadowRootMode::parse(" Open "), Some(ShadowRootMode::Open));
        assert_eq!(ShadowRootMode::parse("closed"), Some(ShadowRootMode::Closed));
        assert_eq!(ShadowRootMode::parse("none"), None);
    }
}
