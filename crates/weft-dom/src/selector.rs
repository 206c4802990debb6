//! CSS selectors
//!
//! Selector lists in the dialect jQuery's `find` is handed for form widgets:
//! compound selectors joined by descendant, child and sibling combinators,
//! attribute matchers, structural pseudo-classes and the form-state
//! pseudo-classes `:checked`, `:selected`, `:disabled` and `:enabled`.

use crate::{ControlKind, DomTree, Node, NodeId};

/// Selector syntax errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected {found:?} at offset {offset} in selector")]
    Unexpected { found: char, offset: usize },

    #[error("Unexpected end of selector")]
    UnexpectedEnd,

    #[error("Unsupported pseudo-class :{0}")]
    UnsupportedPseudo(String),

    #[error("Invalid An+B expression {0:?}")]
    InvalidNth(String),
}

/// An+B expression for `:nth-child` and `:nth-last-child`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpression {
    pub a: i32,
    pub b: i32,
}

impl NthExpression {
    /// Parse `odd`, `even`, `3`, `2n+1`, `-n+3`
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.to_ascii_lowercase().split_whitespace().collect();
        match s.as_str() {
            "odd" => return Some(Self { a: 2, b: 1 }),
            "even" => return Some(Self { a: 2, b: 0 }),
            _ => {}
        }
        if let Ok(b) = s.parse() {
            return Some(Self { a: 0, b });
        }

        let n_pos = s.find('n')?;
        let a = match &s[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            a => a.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() { 0 } else { rest.parse().ok()? };
        Some(Self { a, b })
    }

    /// Whether the 1-based position `n` matches
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeMatcher {
    /// `[attr=value]`
    Exact(String),
    /// `[attr~=value]`, whitespace-separated word
    Contains(String),
    /// `[attr|=value]`, exact or followed by a hyphen
    DashMatch(String),
    /// `[attr^=value]`
    Prefix(String),
    /// `[attr$=value]`
    Suffix(String),
    /// `[attr*=value]`
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

impl AttributeSelector {
    /// Check an attribute value, `None` when the attribute is absent
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let Some(matcher) = &self.matcher else {
            return true;
        };
        let fold = |s: &str| {
            if self.case_insensitive { s.to_lowercase() } else { s.to_string() }
        };
        let value = fold(value);
        match matcher {
            AttributeMatcher::Exact(expected) => value == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                value.split_whitespace().any(|word| word == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                value == expected || value.starts_with(&format!("{expected}-"))
            }
            AttributeMatcher::Prefix(expected) => {
                !expected.is_empty() && value.starts_with(&fold(expected))
            }
            AttributeMatcher::Suffix(expected) => {
                !expected.is_empty() && value.ends_with(&fold(expected))
            }
            AttributeMatcher::Substring(expected) => {
                !expected.is_empty() && value.contains(&fold(expected))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    /// Checked checkbox/radio inputs and selected options
    Checked,
    /// Selected options, including a single-select's implicit first option
    Selected,
    Disabled,
    Enabled,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    Not(SelectorList),
}

impl PseudoClass {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        match self {
            PseudoClass::Checked => match tree.control_kind(node) {
                Some(ControlKind::Input(ty)) => ty.is_checkable() && tree.checked(node),
                Some(ControlKind::Option) => option_is_selected(tree, node),
                _ => false,
            },
            PseudoClass::Selected => {
                tree.control_kind(node) == Some(ControlKind::Option)
                    && option_is_selected(tree, node)
            }
            PseudoClass::Disabled => {
                is_form_control(tree, node) && tree.get_attribute(node, "disabled").is_some()
            }
            PseudoClass::Enabled => {
                is_form_control(tree, node) && tree.get_attribute(node, "disabled").is_none()
            }
            PseudoClass::Empty => tree
                .children(node)
                .all(|(_, child)| !child.is_element() && child.as_text().is_none_or(str::is_empty)),
            PseudoClass::FirstChild => previous_element(tree, node).is_none(),
            PseudoClass::LastChild => next_element(tree, node).is_none(),
            PseudoClass::OnlyChild => {
                previous_element(tree, node).is_none() && next_element(tree, node).is_none()
            }
            PseudoClass::NthChild(nth) => nth.matches(position(tree, node, previous_element)),
            PseudoClass::NthLastChild(nth) => nth.matches(position(tree, node, next_element)),
            PseudoClass::Not(list) => !list.matches(tree, node),
        }
    }
}

/// A simple selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    Universal,
    /// Lowercase tag name
    Type(String),
    Id(String),
    Class(String),
    Attribute(AttributeSelector),
    PseudoClass(PseudoClass),
}

impl SelectorComponent {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(element) = tree.get(node).and_then(Node::as_element) else {
            return false;
        };
        match self {
            SelectorComponent::Universal => true,
            SelectorComponent::Type(name) => element.name == *name,
            SelectorComponent::Id(id) => element.id() == Some(id.as_str()),
            SelectorComponent::Class(class) => element.classes().any(|c| c == class),
            SelectorComponent::Attribute(attr) => attr.matches(element.get_attr(&attr.name)),
            SelectorComponent::PseudoClass(pseudo) => pseudo.matches(tree, node),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Compound selectors joined by combinators, matched right to left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    compounds: Vec<Vec<SelectorComponent>>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    fn matches(&self, tree: &DomTree, node: NodeId, scope: NodeId) -> bool {
        match self.compounds.len().checked_sub(1) {
            Some(last) => self.matches_at(tree, node, last, scope),
            None => false,
        }
    }

    fn matches_at(&self, tree: &DomTree, node: NodeId, index: usize, scope: NodeId) -> bool {
        if !self.compounds[index].iter().all(|c| c.matches(tree, node)) {
            return false;
        }
        let Some(prev) = index.checked_sub(1) else {
            return true;
        };
        match self.combinators[prev] {
            Combinator::Descendant => {
                let mut current = tree.parent_element(node);
                while let Some(ancestor) = current.filter(|&a| a != scope) {
                    if self.matches_at(tree, ancestor, prev, scope) {
                        return true;
                    }
                    current = tree.parent_element(ancestor);
                }
                false
            }
            Combinator::Child => tree
                .parent_element(node)
                .filter(|&p| p != scope)
                .is_some_and(|p| self.matches_at(tree, p, prev, scope)),
            Combinator::NextSibling => previous_element(tree, node)
                .is_some_and(|s| self.matches_at(tree, s, prev, scope)),
            Combinator::SubsequentSibling => {
                let mut current = previous_element(tree, node);
                while let Some(sibling) = current {
                    if self.matches_at(tree, sibling, prev, scope) {
                        return true;
                    }
                    current = previous_element(tree, sibling);
                }
                false
            }
        }
    }
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<ComplexSelector>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser::new(input);
        let list = parser.selector_list()?;
        if parser.peek().is_some() {
            return Err(parser.unexpected());
        }
        Ok(list)
    }

    /// Whether `node` matches any selector, with ancestors unrestricted
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.matches_within(tree, node, NodeId::NONE)
    }

    fn matches_within(&self, tree: &DomTree, node: NodeId, scope: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(tree, node, scope))
    }
}

impl DomTree {
    /// Descendants of `scope` matching `selectors`, in tree order. Every
    /// compound has to match inside `scope`, as with jQuery's `find`.
    pub fn select(&self, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selectors.matches_within(self, n, scope))
            .collect()
    }
}

fn previous_element(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    let mut current = tree.prev_sibling(node);
    while current.is_valid() && !tree.is_element(current) {
        current = tree.prev_sibling(current);
    }
    current.to_option()
}

fn next_element(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    let mut current = tree.next_sibling(node);
    while current.is_valid() && !tree.is_element(current) {
        current = tree.next_sibling(current);
    }
    current.to_option()
}

/// 1-based element position counted along `step`
fn position(tree: &DomTree, node: NodeId, step: fn(&DomTree, NodeId) -> Option<NodeId>) -> i32 {
    let mut n = 1;
    let mut current = step(tree, node);
    while let Some(sibling) = current {
        n += 1;
        current = step(tree, sibling);
    }
    n
}

fn is_form_control(tree: &DomTree, node: NodeId) -> bool {
    matches!(tree.control_kind(node), Some(kind) if kind != ControlKind::Other)
        || matches!(tree.tag_name(node), Some("fieldset" | "optgroup"))
}

fn option_is_selected(tree: &DomTree, opt: NodeId) -> bool {
    match tree.ancestors(opt).into_iter().find(|&a| tree.tag_name(a) == Some("select")) {
        Some(select) => tree.selected_options(select).contains(&opt),
        None => tree.option_selected(opt),
    }
}

struct Parser {
    input: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Skip whitespace, reporting whether any was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected { found, offset: self.pos },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SelectorError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn selector_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.complex()?);
            self.skip_ws();
            if self.peek() != Some(',') {
                return Ok(SelectorList(selectors));
            }
            self.pos += 1;
        }
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(',' | ')') | None => break,
                Some(_) if spaced => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_ws();
            }
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(ComplexSelector { compounds, combinators })
    }

    fn compound(&mut self) -> Result<Vec<SelectorComponent>, SelectorError> {
        let mut parts = Vec::new();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                parts.push(SelectorComponent::Universal);
            }
            Some(c) if is_ident_char(c) || c == '\\' => {
                parts.push(SelectorComponent::Type(self.ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            let part = match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    SelectorComponent::Id(self.ident()?)
                }
                Some('.') => {
                    self.pos += 1;
                    SelectorComponent::Class(self.ident()?)
                }
                Some('[') => {
                    self.pos += 1;
                    SelectorComponent::Attribute(self.attribute()?)
                }
                Some(':') => {
                    self.pos += 1;
                    SelectorComponent::PseudoClass(self.pseudo()?)
                }
                _ => break,
            };
            parts.push(part);
        }
        if parts.is_empty() {
            return Err(self.unexpected());
        }
        Ok(parts)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                out.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?);
            } else if is_ident_char(c) {
                self.pos += 1;
                out.push(c);
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let matcher = match self.peek() {
            Some(']') => None,
            Some(op) => {
                let make: fn(String) -> AttributeMatcher = match op {
                    '=' => AttributeMatcher::Exact,
                    '~' => AttributeMatcher::Contains,
                    '|' => AttributeMatcher::DashMatch,
                    '^' => AttributeMatcher::Prefix,
                    '$' => AttributeMatcher::Suffix,
                    '*' => AttributeMatcher::Substring,
                    _ => return Err(self.unexpected()),
                };
                self.pos += 1;
                if op != '=' {
                    self.expect('=')?;
                }
                self.skip_ws();
                Some(make(self.value()?))
            }
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.skip_ws();
        let case_insensitive = match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                self.skip_ws();
                true
            }
            Some('s' | 'S') => {
                self.pos += 1;
                self.skip_ws();
                false
            }
            _ => false,
        };
        self.expect(']')?;
        Ok(AttributeSelector { name, matcher, case_insensitive })
    }

    fn value(&mut self) -> Result<String, SelectorError> {
        let Some(quote @ ('"' | '\'')) = self.peek() else {
            return self.ident();
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?),
                Some(c) => out.push(c),
                None => return Err(SelectorError::UnexpectedEnd),
            }
        }
    }

    fn pseudo(&mut self) -> Result<PseudoClass, SelectorError> {
        let name = self.ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "checked" => PseudoClass::Checked,
            "selected" => PseudoClass::Selected,
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "nth-child" | "nth-last-child" => {
                let arg = self.argument()?;
                let nth = NthExpression::parse(&arg).ok_or(SelectorError::InvalidNth(arg))?;
                if name == "nth-child" {
                    PseudoClass::NthChild(nth)
                } else {
                    PseudoClass::NthLastChild(nth)
                }
            }
            "not" => {
                self.expect('(')?;
                let inner = self.selector_list()?;
                self.expect(')')?;
                PseudoClass::Not(inner)
            }
            _ => return Err(SelectorError::UnsupportedPseudo(name)),
        };
        Ok(pseudo)
    }

    /// Raw text of a parenthesized argument
    fn argument(&mut self) -> Result<String, SelectorError> {
        self.expect('(')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(')') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(SelectorError::UnexpectedEnd),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tree: &mut DomTree, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = tree.create_element(tag);
        for (name, value) in attrs {
            tree.set_attribute(id, name, value).unwrap();
        }
        tree.append_child(parent, id).unwrap();
        id
    }

    fn select(tree: &DomTree, scope: NodeId, selector: &str) -> Vec<NodeId> {
        tree.select(scope, &SelectorList::parse(selector).unwrap())
    }

    #[test]
    fn test_nth_expression() {
        assert_eq!(NthExpression::parse("odd"), Some(NthExpression { a: 2, b: 1 }));
        assert_eq!(NthExpression::parse("3"), Some(NthExpression { a: 0, b: 3 }));
        assert_eq!(NthExpression::parse("2n + 1"), Some(NthExpression { a: 2, b: 1 }));
        assert_eq!(NthExpression::parse("-n+3"), Some(NthExpression { a: -1, b: 3 }));
        assert_eq!(NthExpression::parse("x"), None);

        let first_three = NthExpression { a: -1, b: 3 };
        assert!(first_three.matches(1) && first_three.matches(3));
        assert!(!first_three.matches(4));
        let odd = NthExpression { a: 2, b: 1 };
        assert!(odd.matches(1) && odd.matches(5));
        assert!(!odd.matches(2));
    }

    #[test]
    fn test_attribute_selector() {
        let sel = AttributeSelector {
            name: "class".into(),
            matcher: Some(AttributeMatcher::Prefix("btn-".into())),
            case_insensitive: false,
        };
        assert!(sel.matches(Some("btn-primary")));
        assert!(!sel.matches(Some("button")));
        assert!(!sel.matches(None));

        let sel = AttributeSelector {
            name: "type".into(),
            matcher: Some(AttributeMatcher::Exact("text".into())),
            case_insensitive: true,
        };
        assert!(sel.matches(Some("TEXT")));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SelectorList::parse("  "), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("a,"), Err(SelectorError::UnexpectedEnd));
        assert_eq!(
            SelectorList::parse("div!"),
            Err(SelectorError::Unexpected { found: '!', offset: 3 })
        );
        assert_eq!(
            SelectorList::parse("li:eq(2)"),
            Err(SelectorError::UnsupportedPseudo("eq".into()))
        );
        assert!(SelectorList::parse("./option[@selected]").is_err());
        assert!(SelectorList::parse("[name='a b' i] > .x ~ p + *:not(.y, #z)").is_ok());
    }

    #[test]
    fn test_select_is_scoped() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let outer = el(&mut tree, root, "div", &[("class", "wrap")]);
        let field = el(&mut tree, outer, "fieldset", &[]);
        let span = el(&mut tree, field, "span", &[("class", "shown label")]);
        let inner = el(&mut tree, field, "div", &[("class", "wrap")]);
        let nested = el(&mut tree, inner, "span", &[]);

        assert_eq!(select(&tree, field, ".shown"), vec![span]);
        assert_eq!(select(&tree, field, "span"), vec![span, nested]);
        assert_eq!(select(&tree, field, ".wrap span"), vec![nested]);
        assert_eq!(select(&tree, root, ".wrap span"), vec![span, nested]);
        assert_eq!(select(&tree, field, "span + div > span"), vec![nested]);
        assert_eq!(select(&tree, field, "div, .label"), vec![span, inner]);
    }

    #[test]
    fn test_form_state_pseudo_classes() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let field = el(&mut tree, root, "fieldset", &[]);
        let red = el(&mut tree, field, "input", &[("type", "checkbox"), ("value", "red")]);
        let blue = el(&mut tree, field, "input", &[("type", "checkbox"), ("value", "blue")]);
        let label = el(&mut tree, field, "label", &[]);
        let select_el = el(&mut tree, field, "select", &[]);
        let small = el(&mut tree, select_el, "option", &[]);
        let large = el(&mut tree, select_el, "option", &[("disabled", "")]);
        tree.set_checked(blue, true).unwrap();

        assert_eq!(select(&tree, field, ":checked"), vec![blue, small]);
        assert_eq!(select(&tree, select_el, "option:selected"), vec![small]);
        assert_eq!(select(&tree, field, "input:not(:checked)"), vec![red]);
        assert_eq!(select(&tree, field, ":not(:checked)"), vec![red, label, select_el, large]);
        assert_eq!(select(&tree, select_el, ":disabled"), vec![large]);
        assert_eq!(select(&tree, select_el, "option:enabled"), vec![small]);
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let list = el(&mut tree, root, "ul", &[]);
        let items: Vec<NodeId> = (0..4).map(|_| el(&mut tree, list, "li", &[])).collect();
        let text = tree.create_text("x");
        tree.append_child(items[0], text).unwrap();

        assert_eq!(select(&tree, list, "li:first-child"), vec![items[0]]);
        assert_eq!(select(&tree, list, "li:last-child"), vec![items[3]]);
        assert_eq!(select(&tree, list, "li:nth-child(even)"), vec![items[1], items[3]]);
        assert_eq!(select(&tree, list, "li:nth-last-child(1)"), vec![items[3]]);
        assert_eq!(select(&tree, list, "li:empty"), items[1..].to_vec());
        assert!(select(&tree, list, "li:only-child").is_empty());
    }
}
