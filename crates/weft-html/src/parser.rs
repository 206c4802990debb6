//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into the arena DOM.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use weft_dom::{Document, DomTree, NodeId, ShadowRootMode};

use crate::HtmlError;

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, HtmlError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, HtmlError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut document = Document::empty(url);
        let root = document.tree().root();
        self.convert_node(&dom.document, document.tree_mut(), root)?;
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Convert an RcDom node (and its subtree) under `parent`
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> Result<(), HtmlError> {
        match &handle.data {
            RcNodeData::Document => {
                self.convert_children(handle, tree, parent)?;
            }
            RcNodeData::Doctype { name, .. } => {
                let id = tree.create_doctype(name);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                if !text.trim().is_empty() {
                    let id = tree.create_text(&text);
                    tree.append_child(parent, id)?;
                }
            }
            RcNodeData::Comment { contents } => {
                let id = tree.create_comment(contents);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Element { name, attrs, template_contents, .. } => {
                let attrs = attrs.borrow();

                if &*name.local == "template" {
                    let mode = attrs
                        .iter()
                        .find(|a| &*a.name.local == "shadowrootmode")
                        .and_then(|a| ShadowRootMode::parse(&a.value));
                    let host_free = tree.is_element(parent) && tree.shadow_root(parent).is_none();

                    if let (Some(mode), true) = (mode, host_free) {
                        let shadow = tree.attach_shadow(parent, mode)?;
                        if let Some(contents) = template_contents.borrow().as_ref() {
                            self.convert_children(contents, tree, shadow)?;
                        }
                        return Ok(());
                    }
                }

                let id = tree.create_element(&name.local);
                for attr in attrs.iter() {
                    tree.set_attribute(id, &attr.name.local, &attr.value)?;
                }
                tree.append_child(parent, id)?;

                // Inert template contents stay with the template element
                if let Some(contents) = template_contents.borrow().as_ref() {
                    self.convert_children(contents, tree, id)?;
                }
                self.convert_children(handle, tree, id)?;
            }
            RcNodeData::ProcessingInstruction { .. } => {
                // Not part of HTML documents
            }
        }
        Ok(())
    }

    fn convert_children(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> Result<(), HtmlError> {
        for child in handle.children.borrow().iter() {
            self.convert_node(child, tree, parent)?;
        }
        Ok(())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}
