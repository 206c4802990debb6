//! Form Controls
//!
//! Value, checkedness and selectedness of input, textarea, select and
//! option elements. Dirty state lives in [`ControlState`]; until a property
//! is written it follows the corresponding content attribute.
//!
//! [`ControlState`]: crate::ControlState

use crate::{DomError, DomTree, NodeId};

/// HTML input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Text,
    Password,
    Email,
    Number,
    Tel,
    Url,
    Search,
    Date,
    Time,
    DatetimeLocal,
    Month,
    Week,
    Color,
    Range,
    File,
    Hidden,
    Checkbox,
    Radio,
    Submit,
    Reset,
    Button,
    Image,
}

impl InputType {
    /// Parse from the `type` attribute; unknown values fall back to text
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Self::Password,
            "email" => Self::Email,
            "number" => Self::Number,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "search" => Self::Search,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime-local" => Self::DatetimeLocal,
            "month" => Self::Month,
            "week" => Self::Week,
            "color" => Self::Color,
            "range" => Self::Range,
            "file" => Self::File,
            "hidden" => Self::Hidden,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "submit" => Self::Submit,
            "reset" => Self::Reset,
            "button" => Self::Button,
            "image" => Self::Image,
            _ => Self::Text,
        }
    }

    /// Checkbox or radio
    pub fn is_checkable(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }

    /// Check if this is a button type
    pub fn is_button(&self) -> bool {
        matches!(self, Self::Submit | Self::Reset | Self::Button | Self::Image)
    }
}

/// What kind of form control an element is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Input(InputType),
    TextArea,
    Select,
    Option,
    Button,
    Other,
}

impl DomTree {
    /// Classify an element as a form control
    pub fn control_kind(&self, id: NodeId) -> Option<ControlKind> {
        let kind = match self.tag_name(id)? {
            "input" => ControlKind::Input(InputType::parse(
                self.get_attribute(id, "type").unwrap_or_default(),
            )),
            "textarea" => ControlKind::TextArea,
            "select" => ControlKind::Select,
            "option" => ControlKind::Option,
            "button" => ControlKind::Button,
            _ => ControlKind::Other,
        };
        Some(kind)
    }

    /// Input or textarea
    pub fn is_text_control(&self, id: NodeId) -> bool {
        matches!(
            self.control_kind(id),
            Some(ControlKind::Input(_) | ControlKind::TextArea)
        )
    }

    /// Checkbox/radio input, or any element with an ARIA checkbox/radio role
    pub fn is_checkable(&self, id: NodeId) -> bool {
        if let Some(ControlKind::Input(ty)) = self.control_kind(id) {
            if ty.is_checkable() {
                return true;
            }
        }
        matches!(self.get_attribute(id, "role"), Some("checkbox" | "radio"))
    }

    /// `<button>` or an element with an ARIA button role
    pub fn is_button_like(&self, id: NodeId) -> bool {
        self.control_kind(id) == Some(ControlKind::Button)
            || self.get_attribute(id, "role") == Some("button")
    }

    /// Current value of a control. `None` for elements without a value.
    pub fn value(&self, id: NodeId) -> Option<String> {
        let elem = self.get(id)?.as_element()?;
        match self.control_kind(id)? {
            ControlKind::Input(_) => Some(
                elem.state
                    .value
                    .clone()
                    .or_else(|| elem.get_attr("value").map(str::to_string))
                    .unwrap_or_default(),
            ),
            ControlKind::TextArea => Some(
                elem.state.value.clone().unwrap_or_else(|| self.text_content(id)),
            ),
            ControlKind::Option => Some(self.option_value(id)),
            ControlKind::Select => Some(
                self.selected_options(id)
                    .first()
                    .map(|&opt| self.option_value(opt))
                    .unwrap_or_default(),
            ),
            ControlKind::Button => elem.get_attr("value").map(str::to_string),
            ControlKind::Other => elem.state.value.clone(),
        }
    }

    /// Write the value property and mirror it into the `value` attribute.
    ///
    /// For a select this selects the first option whose value matches and
    /// deselects the others; with no match nothing stays selected.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        if self.control_kind(id) == Some(ControlKind::Select) {
            let mut matched = false;
            for opt in self.options(id) {
                let hit = !matched && self.option_value(opt) == value;
                matched |= hit;
                self.element_mut(opt)?.state.selected = Some(hit);
            }
        }
        let elem = self.element_mut(id)?;
        elem.state.value = Some(value.to_string());
        elem.set_attr("value", value);
        Ok(())
    }

    /// Checkedness of a checkbox/radio (or `aria-checked` for role-based ones)
    pub fn checked(&self, id: NodeId) -> bool {
        let Some(elem) = self.get(id).and_then(|n| n.as_element()) else {
            return false;
        };
        if let Some(checked) = elem.state.checked {
            return checked;
        }
        match self.control_kind(id) {
            Some(ControlKind::Input(_)) => elem.has_attr("checked"),
            _ => elem.get_attr("aria-checked") == Some("true"),
        }
    }

    /// Set checkedness. Checking a radio unchecks same-name radios in the
    /// same tree.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        if checked && self.control_kind(id) == Some(ControlKind::Input(InputType::Radio)) {
            if let Some(name) = self.get_attribute(id, "name").map(str::to_string) {
                let root = self.tree_root(id);
                let peers: Vec<NodeId> = self
                    .descendants(root)
                    .into_iter()
                    .filter(|&n| {
                        n != id
                            && self.control_kind(n) == Some(ControlKind::Input(InputType::Radio))
                            && self.get_attribute(n, "name") == Some(name.as_str())
                    })
                    .collect();
                for peer in peers {
                    self.element_mut(peer)?.state.checked = Some(false);
                }
            }
        }
        self.element_mut(id)?.state.checked = Some(checked);
        Ok(())
    }

    /// Option elements of a select, in tree order
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|&n| self.tag_name(n) == Some("option"))
            .collect()
    }

    /// Selected options; a single-select with no explicit selection
    /// selects its first option.
    pub fn selected_options(&self, select: NodeId) -> Vec<NodeId> {
        let options = self.options(select);
        let selected: Vec<NodeId> = options
            .iter()
            .copied()
            .filter(|&opt| self.option_selected(opt))
            .collect();

        let explicit = options.iter().any(|&opt| {
            self.get(opt)
                .and_then(|n| n.as_element())
                .is_some_and(|e| e.state.selected.is_some())
        });
        let multiple = self.get_attribute(select, "multiple").is_some();

        if selected.is_empty() && !explicit && !multiple {
            options.into_iter().take(1).collect()
        } else {
            selected
        }
    }

    pub(crate) fn option_selected(&self, opt: NodeId) -> bool {
        self.get(opt)
            .and_then(|n| n.as_element())
            .map(|e| e.state.selected.unwrap_or_else(|| e.has_attr("selected")))
            .unwrap_or(false)
    }

    /// Option value: the `value` attribute, else its collapsed text
    pub fn option_value(&self, opt: NodeId) -> String {
        match self.get_attribute(opt, "value") {
            Some(v) => v.to_string(),
            None => self
                .text_content(opt)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tree: &mut DomTree, parent: NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = tree.create_element(name);
        for (k, v) in attrs {
            tree.set_attribute(id, k, v).unwrap();
        }
        tree.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_input_value_follows_attribute_until_dirty() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let input = element(&mut tree, root, "input", &[("value", "a")]);
        assert_eq!(tree.value(input).as_deref(), Some("a"));

        tree.set_value(input, "b").unwrap();
        assert_eq!(tree.value(input).as_deref(), Some("b"));
        assert_eq!(tree.get_attribute(input, "value"), Some("b"));
    }

    #[test]
    fn test_select_value() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let select = element(&mut tree, root, "select", &[]);
        let one = element(&mut tree, select, "option", &[("value", "1")]);
        let two = element(&mut tree, select, "option", &[]);
        let text = tree.create_text(" Two  options ");
        tree.append_child(two, text).unwrap();

        assert_eq!(tree.value(select).as_deref(), Some("1"));
        tree.set_value(select, "Two options").unwrap();
        assert_eq!(tree.selected_options(select), vec![two]);
        assert_eq!(tree.value(select).as_deref(), Some("Two options"));

        tree.set_value(select, "missing").unwrap();
        assert!(tree.selected_options(select).is_empty());
        let _ = one;
    }

    #[test]
    fn test_checkable_and_radio_group() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let a = element(
            &mut tree,
            root,
            "input",
            &[("type", "radio"), ("name", "g"), ("checked", "")],
        );
        let b = element(&mut tree, root, "input", &[("type", "RADIO"), ("name", "g")]);
        let aria =
            element(&mut tree, root, "div", &[("role", "checkbox"), ("aria-checked", "true")]);
        let text = element(&mut tree, root, "input", &[]);

        assert!(tree.is_checkable(a));
        assert!(tree.is_checkable(aria));
        assert!(!tree.is_checkable(text));
        assert!(tree.checked(a));
        assert!(tree.checked(aria));

        tree.set_checked(b, true).unwrap();
        assert!(tree.checked(b));
        assert!(!tree.checked(a));
    }

    #[test]
    fn test_button_like() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let button = element(&mut tree, root, "button", &[]);
        let fake = element(&mut tree, root, "span", &[("role", "button")]);
        let span = element(&mut tree, root, "span", &[]);
        assert!(tree.is_button_like(button));
        assert!(tree.is_button_like(fake));
        assert!(!tree.is_button_like(span));
    }
}
