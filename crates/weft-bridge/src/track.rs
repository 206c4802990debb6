//! Input tracking
//!
//! A tracker is a `change` listener bound to one input. Each time the input
//! changes, the bridge posts the input's displayed value back to the window.

use serde_json::Value;
use weft_dom::{ControlKind, DomTree, NodeId, SelectorList};
use weft_locate::{accept_all, ElementResolver, FoundContainer, FoundElement};

use crate::fill::FillError;
use crate::message::{FoundTrackedInput, TrackUpdate};
use crate::page::Page;
use crate::BridgeConfig;

/// Supported tracking methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMethod {
    JQuery,
}

impl TrackMethod {
    pub fn parse(name: Option<&str>) -> Option<Self> {
        match name? {
            "jQuery" => Some(Self::JQuery),
            _ => None,
        }
    }
}

/// How the tracked value is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedKind {
    Select,
    Checkable,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracker {
    pub input: NodeId,
    pub field: NodeId,
    pub kind: TrackedKind,
    /// Elements whose text is reported instead of the input's value
    pub text_selector: Option<SelectorList>,
    pub label_text: String,
    /// Listener namespace, e.g. `change.__weft__trackInput`
    pub namespace: String,
    /// Action of the update messages
    pub action: String,
}

impl Tracker {
    /// Current value of the tracked input
    pub fn update(&self, tree: &DomTree) -> TrackUpdate {
        let (input_value, options) = match self.kind {
            TrackedKind::Select => {
                let selected = match &self.text_selector {
                    Some(selector) => tree.select(self.input, selector),
                    None => tree.selected_options(self.input),
                };
                (Value::String(text_or_value(tree, &selected, self.input)), None)
            }
            TrackedKind::Checkable => {
                let (checked, all) = match &self.text_selector {
                    Some(selector) => {
                        let nodes = tree.select(self.field, selector);
                        (nodes.clone(), nodes)
                    }
                    None => {
                        let all: Vec<NodeId> = tree
                            .descendants(self.field)
                            .into_iter()
                            .filter(|&n| tree.is_checkable(n))
                            .collect();
                        let checked = all.iter().copied().filter(|&n| tree.checked(n)).collect();
                        (checked, all)
                    }
                };
                let checked: Vec<Value> =
                    checked.iter().map(|&n| Value::String(value_or_text(tree, n))).collect();
                let all: Vec<String> = all.iter().map(|&n| value_or_text(tree, n)).collect();
                (Value::Array(checked), Some(all))
            }
            TrackedKind::Text => {
                let shown = match &self.text_selector {
                    Some(selector) => tree.select(self.field, selector),
                    None => Vec::new(),
                };
                (Value::String(text_or_value(tree, &shown, self.input)), None)
            }
        };
        TrackUpdate { label_text: self.label_text.clone(), input_value, options }
    }
}

/// Trimmed text of `nodes`, or the input's value when there is none
fn text_or_value(tree: &DomTree, nodes: &[NodeId], input: NodeId) -> String {
    let text: String = nodes.iter().map(|&n| tree.text_content(n)).collect();
    match text.trim() {
        "" => tree.value(input).unwrap_or_default(),
        text => text.to_string(),
    }
}

fn value_or_text(tree: &DomTree, node: NodeId) -> String {
    tree.value(node)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| tree.text_content(node))
}

/// Bind a change tracker for the found input on the page
pub fn track(
    page: &mut Page,
    resolver: &ElementResolver,
    config: &BridgeConfig,
    found: &FoundTrackedInput,
    label_text: &str,
) -> Result<(), FillError> {
    if !page.has_global("jQuery") {
        return Err(FillError::MissingGlobal("jQuery".to_string()));
    }
    let tree = page.tree();
    let field = resolver
        .locate(tree, &found.found_field_element, &accept_all)
        .ok_or(FillError::FieldNotFound)?;

    let location = found.found_input_element.as_ref().ok_or(FillError::InputNotFound)?;
    let container = FoundContainer {
        parent: field.descriptor.container.clone().map(Box::new),
        container_path: field.descriptor.element_path.clone(),
        container_index: field.descriptor.element_index,
        container_required: true,
        hash: field.descriptor.hash.clone(),
        container: Some(field.node),
    };
    let input_descriptor =
        FoundElement::new(container, &location.element_path, location.element_index);
    let input = resolver
        .locate(tree, &input_descriptor.into(), &accept_all)
        .ok_or(FillError::InputNotFound)?
        .node;

    let text_selector = found
        .tracked_input_selector
        .input_text_path
        .as_ref()
        .map(|text| SelectorList::parse(&text.joined()))
        .transpose()?;

    let kind = if tree.control_kind(input) == Some(ControlKind::Select) {
        TrackedKind::Select
    } else if tree.is_checkable(input) {
        TrackedKind::Checkable
    } else {
        TrackedKind::Text
    };
    tracing::debug!(?input, ?kind, label = %label_text, "tracking input");

    page.install_tracker(Tracker {
        input,
        field: field.node,
        kind,
        text_selector,
        label_text: label_text.to_string(),
        namespace: format!("change.{}", config.action("trackInput")),
        action: config.action("updateTrackedInput"),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::Document;

    fn field_with(children: &[(&str, &[(&str, &str)], &str)]) -> (Page, NodeId, Vec<NodeId>) {
        let mut doc = Document::new("https://example.test/");
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let field = tree.create_element("fieldset");
        tree.append_child(body, field).unwrap();
        let mut nodes = Vec::new();
        for (tag, attrs, text) in children {
            let el = tree.create_element(tag);
            for (name, value) in *attrs {
                tree.set_attribute(el, name, value).unwrap();
            }
            if !text.is_empty() {
                let t = tree.create_text(text);
                tree.append_child(el, t).unwrap();
            }
            tree.append_child(field, el).unwrap();
            nodes.push(el);
        }
        (Page::new(doc), field, nodes)
    }

    fn tracker(input: NodeId, field: NodeId, kind: TrackedKind, text: Option<&str>) -> Tracker {
        Tracker {
            input,
            field,
            kind,
            text_selector: text.map(|t| SelectorList::parse(t).unwrap()),
            label_text: "Label".into(),
            namespace: "change.__weft__trackInput".into(),
            action: "__weft__updateTrackedInput".into(),
        }
    }

    #[test]
    fn test_checkable_update_lists_checked_and_all() {
        let (mut page, field, nodes) = field_with(&[
            ("input", &[("type", "checkbox"), ("value", "red")], ""),
            ("input", &[("type", "checkbox"), ("value", "blue")], ""),
            ("div", &[("role", "checkbox")], "green"),
        ]);
        page.tree_mut().set_checked(nodes[1], true).unwrap();

        let update = tracker(nodes[0], field, TrackedKind::Checkable, None).update(page.tree());
        assert_eq!(update.input_value, serde_json::json!(["blue"]));
        assert_eq!(
            update.options,
            Some(vec!["red".to_string(), "blue".to_string(), "green".to_string()])
        );

        let labelled = tracker(nodes[0], field, TrackedKind::Checkable, Some("input:checked"));
        let update = labelled.update(page.tree());
        assert_eq!(update.input_value, serde_json::json!(["blue"]));
        assert_eq!(update.options, Some(vec!["blue".to_string()]));
    }

    #[test]
    fn test_text_update_prefers_selected_text() {
        let (mut page, field, nodes) = field_with(&[
            ("span", &[("class", "shown")], "  Ada L. "),
            ("span", &[("class", "hint")], "name"),
            ("input", &[], ""),
        ]);
        page.tree_mut().set_value(nodes[2], "ada").unwrap();

        let plain = tracker(nodes[2], field, TrackedKind::Text, None).update(page.tree());
        assert_eq!(plain.input_value, Value::String("ada".into()));

        let shown = tracker(nodes[2], field, TrackedKind::Text, Some(".shown")).update(page.tree());
        assert_eq!(shown.input_value, Value::String("Ada L.".into()));
        assert_eq!(shown.options, None);

        let missing = tracker(nodes[2], field, TrackedKind::Text, Some(".absent"));
        let missing = missing.update(page.tree());
        assert_eq!(missing.input_value, Value::String("ada".into()));
    }

    #[test]
    fn test_select_update_reads_option_text() {
        let mut doc = Document::new("https://example.test/");
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let select = tree.create_element("select");
        tree.append_child(body, select).unwrap();
        let mut options = Vec::new();
        for (value, text) in [("s", "Small"), ("m", "Medium")] {
            let opt = tree.create_element("option");
            tree.set_attribute(opt, "value", value).unwrap();
            let t = tree.create_text(text);
            tree.append_child(opt, t).unwrap();
            tree.append_child(select, opt).unwrap();
            options.push(opt);
        }
        let page = Page::new(doc);

        let default = tracker(select, body, TrackedKind::Select, None).update(page.tree());
        assert_eq!(default.input_value, Value::String("Small".into()));
        let last = tracker(select, body, TrackedKind::Select, Some("option:last-child"));
        assert_eq!(last.update(page.tree()).input_value, Value::String("Medium".into()));
    }

    #[test]
    fn test_replacing_tracker_in_same_namespace() {
        let (mut page, field, nodes) = field_with(&[("input", &[], "")]);
        page.install_tracker(tracker(nodes[0], field, TrackedKind::Text, None));
        page.install_tracker(tracker(nodes[0], field, TrackedKind::Text, None));
        assert_eq!(page.trackers().len(), 1);
    }

    #[test]
    fn test_track_method_names() {
        assert_eq!(TrackMethod::parse(Some("jQuery")), Some(TrackMethod::JQuery));
        assert_eq!(TrackMethod::parse(Some("react")), None);
        assert_eq!(TrackMethod::parse(None), None);
    }
}
