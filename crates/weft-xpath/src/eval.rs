//! XPath evaluation over a [`DomTree`]
//!
//! Node-sets are kept as vectors sorted in document order without
//! duplicates. Reverse axes number candidates in proximity order while
//! predicates run, and are re-sorted afterwards.

use std::cell::OnceCell;
use std::collections::HashSet;

use weft_dom::{DomTree, NodeData, NodeId};

use crate::ast::{ArithOp, Axis, CompareOp, Expr, NodeTest, PathExpr, PathStart, Step};
use crate::XPathError;

/// A node in the XPath data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XNode {
    /// Document, shadow root, element, text or comment node
    Node(NodeId),
    /// The `index`-th attribute of `owner`
    Attribute { owner: NodeId, index: usize },
}

impl XNode {
    /// The arena node, if this is not an attribute
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            XNode::Node(id) => Some(id),
            XNode::Attribute { .. } => None,
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    NodeSet(Vec<XNode>),
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Clone, Copy)]
struct Context {
    node: XNode,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'a> {
    tree: &'a DomTree,
    order: OnceCell<Vec<u32>>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(tree: &'a DomTree) -> Self {
        Self { tree, order: OnceCell::new() }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, context: NodeId) -> Result<Value, XPathError> {
        let ctx = Context { node: XNode::Node(context), position: 1, size: 1 };
        self.eval(expr, ctx)
    }

    fn eval(&self, expr: &Expr, ctx: Context) -> Result<Value, XPathError> {
        match expr {
            Expr::Or(a, b) => Ok(Value::Boolean(
                self.boolean(self.eval(a, ctx)?) || self.boolean(self.eval(b, ctx)?),
            )),
            Expr::And(a, b) => Ok(Value::Boolean(
                self.boolean(self.eval(a, ctx)?) && self.boolean(self.eval(b, ctx)?),
            )),
            Expr::Compare(op, a, b) => {
                let lhs = self.eval(a, ctx)?;
                let rhs = self.eval(b, ctx)?;
                Ok(Value::Boolean(self.compare(*op, &lhs, &rhs)))
            }
            Expr::Arith(op, a, b) => {
                let lhs = self.number(&self.eval(a, ctx)?);
                let rhs = self.number(&self.eval(b, ctx)?);
                let result = match op {
                    ArithOp::Add => lhs + rhs,
                    ArithOp::Sub => lhs - rhs,
                    ArithOp::Mul => lhs * rhs,
                    ArithOp::Div => lhs / rhs,
                    ArithOp::Mod => lhs % rhs,
                };
                Ok(Value::Number(result))
            }
            Expr::Negate(inner) => Ok(Value::Number(-self.number(&self.eval(inner, ctx)?))),
            Expr::Union(a, b) => {
                let mut nodes = self.node_set(self.eval(a, ctx)?)?;
                nodes.extend(self.node_set(self.eval(b, ctx)?)?);
                Ok(Value::NodeSet(self.sort_unique(nodes)))
            }
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Function(name, args) => self.call(name, args, ctx),
            Expr::Path(path) => self.path(path, ctx),
        }
    }

    fn path(&self, path: &PathExpr, ctx: Context) -> Result<Value, XPathError> {
        let mut current = match &path.start {
            PathStart::Root => {
                let anchor = match ctx.node {
                    XNode::Node(id) => id,
                    XNode::Attribute { owner, .. } => owner,
                };
                vec![XNode::Node(self.tree.tree_root(anchor))]
            }
            PathStart::Context => vec![ctx.node],
            PathStart::Filter(primary, predicates) => {
                let value = self.eval(primary, ctx)?;
                if predicates.is_empty() && path.steps.is_empty() {
                    return Ok(value);
                }
                let nodes = self.node_set(value)?;
                self.filter(nodes, predicates)?
            }
        };

        for step in &path.steps {
            let mut next = Vec::new();
            for &node in &current {
                let candidates: Vec<XNode> = self
                    .axis(step.axis, node)
                    .into_iter()
                    .filter(|&n| self.matches(step, n))
                    .collect();
                next.extend(self.filter(candidates, &step.predicates)?);
            }
            current = self.sort_unique(next);
        }

        Ok(Value::NodeSet(current))
    }

    /// Apply predicates to candidates given in axis order
    fn filter(&self, mut nodes: Vec<XNode>, predicates: &[Expr]) -> Result<Vec<XNode>, XPathError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (i, &node) in nodes.iter().enumerate() {
                let ctx = Context { node, position: i + 1, size };
                let keep = match self.eval(predicate, ctx)? {
                    Value::Number(n) => n == (i + 1) as f64,
                    other => self.boolean(other),
                };
                if keep {
                    kept.push(node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    fn matches(&self, step: &Step, node: XNode) -> bool {
        match node {
            XNode::Attribute { owner, index } => {
                if step.axis != Axis::Attribute {
                    return matches!(step.test, NodeTest::Node);
                }
                match &step.test {
                    NodeTest::Any | NodeTest::Node => true,
                    NodeTest::Name(name) => self
                        .attribute(owner, index)
                        .is_some_and(|(n, _)| n.eq_ignore_ascii_case(name)),
                    _ => false,
                }
            }
            XNode::Node(id) => {
                let Some(n) = self.tree.get(id) else { return false };
                match &step.test {
                    NodeTest::Node => !matches!(n.data, NodeData::Doctype { .. }),
                    NodeTest::Text => n.is_text(),
                    NodeTest::Comment => matches!(n.data, NodeData::Comment(_)),
                    NodeTest::ProcessingInstruction => false,
                    NodeTest::Any => n.is_element(),
                    NodeTest::Name(name) => n
                        .as_element()
                        .is_some_and(|e| e.name.eq_ignore_ascii_case(name)),
                }
            }
        }
    }

    /// Nodes along an axis, in axis (proximity) order
    fn axis(&self, axis: Axis, node: XNode) -> Vec<XNode> {
        let tree = self.tree;
        let id = match node {
            XNode::Node(id) => id,
            XNode::Attribute { owner, .. } => {
                return match axis {
                    Axis::SelfAxis => vec![node],
                    Axis::Parent => vec![XNode::Node(owner)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = Vec::new();
                        if axis == Axis::AncestorOrSelf {
                            out.push(node);
                        }
                        out.push(XNode::Node(owner));
                        out.extend(tree.ancestors(owner).into_iter().map(XNode::Node));
                        out
                    }
                    Axis::Following => {
                        let mut out: Vec<XNode> =
                            tree.descendants(owner).into_iter().map(XNode::Node).collect();
                        out.extend(self.axis(Axis::Following, XNode::Node(owner)));
                        out
                    }
                    Axis::Preceding => self.axis(Axis::Preceding, XNode::Node(owner)),
                    _ => Vec::new(),
                };
            }
        };

        let wrap = |ids: Vec<NodeId>| ids.into_iter().map(XNode::Node).collect::<Vec<_>>();

        match axis {
            Axis::Child => wrap(tree.child_ids(id)),
            Axis::Descendant => wrap(tree.descendants(id)),
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                out.extend(wrap(tree.descendants(id)));
                out
            }
            Axis::SelfAxis => vec![node],
            Axis::Parent => tree.parent(id).to_option().map(XNode::Node).into_iter().collect(),
            Axis::Ancestor => wrap(tree.ancestors(id)),
            Axis::AncestorOrSelf => {
                let mut out = vec![node];
                out.extend(wrap(tree.ancestors(id)));
                out
            }
            Axis::FollowingSibling => {
                let mut out = Vec::new();
                let mut sib = tree.next_sibling(id);
                while sib.is_valid() {
                    out.push(XNode::Node(sib));
                    sib = tree.next_sibling(sib);
                }
                out
            }
            Axis::PrecedingSibling => {
                let mut out = Vec::new();
                let mut sib = tree.prev_sibling(id);
                while sib.is_valid() {
                    out.push(XNode::Node(sib));
                    sib = tree.prev_sibling(sib);
                }
                out
            }
            Axis::Following => {
                let mut out = Vec::new();
                let mut cur = id;
                while cur.is_valid() {
                    let mut sib = tree.next_sibling(cur);
                    while sib.is_valid() {
                        out.push(XNode::Node(sib));
                        out.extend(wrap(tree.descendants(sib)));
                        sib = tree.next_sibling(sib);
                    }
                    cur = tree.parent(cur);
                }
                out
            }
            Axis::Preceding => {
                let ancestors: HashSet<NodeId> = tree.ancestors(id).into_iter().collect();
                let root = tree.tree_root(id);
                let mut out: Vec<XNode> = tree
                    .descendants(root)
                    .into_iter()
                    .take_while(|&n| n != id)
                    .filter(|n| !ancestors.contains(n))
                    .map(XNode::Node)
                    .collect();
                out.reverse();
                out
            }
            Axis::Attribute => tree
                .get(id)
                .and_then(|n| n.as_element())
                .map(|e| {
                    (0..e.attrs.len())
                        .map(|index| XNode::Attribute { owner: id, index })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn attribute(&self, owner: NodeId, index: usize) -> Option<(&'a str, &'a str)> {
        let elem = self.tree.get(owner)?.as_element()?;
        let attr = elem.attrs.get(index)?;
        Some((attr.name.as_str(), attr.value.as_str()))
    }

    /// Position of every arena node in document order. Each tree (document,
    /// shadow trees, detached subtrees) is ordered internally; trees follow
    /// one another in arena order.
    fn order(&self) -> &[u32] {
        self.order.get_or_init(|| {
            let tree = self.tree;
            let mut order = vec![u32::MAX; tree.len()];
            let mut next = 0u32;
            for (root_id, root) in tree.iter() {
                if root.parent.is_valid() {
                    continue;
                }
                order[root_id.index()] = next;
                next += 1;
                for desc in tree.descendants(root_id) {
                    order[desc.index()] = next;
                    next += 1;
                }
            }
            order
        })
    }

    fn sort_key(&self, node: XNode) -> (u32, usize) {
        let order = self.order();
        match node {
            XNode::Node(id) => (order.get(id.index()).copied().unwrap_or(u32::MAX), 0),
            XNode::Attribute { owner, index } => {
                (order.get(owner.index()).copied().unwrap_or(u32::MAX), index + 1)
            }
        }
    }

    fn sort_unique(&self, mut nodes: Vec<XNode>) -> Vec<XNode> {
        nodes.sort_by_key(|&n| self.sort_key(n));
        nodes.dedup();
        nodes
    }

    fn node_set(&self, value: Value) -> Result<Vec<XNode>, XPathError> {
        match value {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    pub(crate) fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Attribute { owner, index } => {
                self.attribute(owner, index).map(|(_, v)| v.to_string()).unwrap_or_default()
            }
            XNode::Node(id) => match self.tree.get(id).map(|n| &n.data) {
                Some(NodeData::Text(t)) => t.content.clone(),
                Some(NodeData::Comment(c)) => c.clone(),
                Some(NodeData::Doctype { .. }) | None => String::new(),
                Some(_) => self.tree.text_content(id),
            },
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::NodeSet(nodes) => {
                nodes.first().map(|&n| self.string_value(n)).unwrap_or_default()
            }
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::String(s) => string_to_number(s),
            Value::NodeSet(_) => string_to_number(&self.string(value)),
        }
    }

    fn boolean(&self, value: Value) -> bool {
        match value {
            Value::Boolean(b) => b,
            Value::Number(n) => n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    fn compare(&self, op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::NodeSet(a), Value::NodeSet(b)) => {
                let right: Vec<String> = b.iter().map(|&n| self.string_value(n)).collect();
                a.iter().any(|&n| {
                    let left = Atom::Str(self.string_value(n));
                    right.iter().any(|r| compare_atoms(op, &left, &Atom::Str(r.clone())))
                })
            }
            (Value::NodeSet(nodes), other) => self.compare_set(op, nodes, other, false),
            (other, Value::NodeSet(nodes)) => self.compare_set(op, nodes, other, true),
            _ => compare_atoms(op, &Atom::from_value(lhs, self), &Atom::from_value(rhs, self)),
        }
    }

    fn compare_set(&self, op: CompareOp, nodes: &[XNode], other: &Value, flipped: bool) -> bool {
        if let Value::Boolean(b) = other {
            let set = Atom::Bool(!nodes.is_empty());
            let other = Atom::Bool(*b);
            return if flipped {
                compare_atoms(op, &other, &set)
            } else {
                compare_atoms(op, &set, &other)
            };
        }
        let other = Atom::from_value(other, self);
        nodes.iter().any(|&n| {
            let value = self.string_value(n);
            let node_atom = match other {
                Atom::Num(_) => Atom::Num(string_to_number(&value)),
                _ => Atom::Str(value),
            };
            if flipped {
                compare_atoms(op, &other, &node_atom)
            } else {
                compare_atoms(op, &node_atom, &other)
            }
        })
    }

    // ------------------------------------------------------------------
    // Function library
    // ------------------------------------------------------------------

    fn call(&self, name: &str, args: &[Expr], ctx: Context) -> Result<Value, XPathError> {
        let arity = |min: usize, max: usize| -> Result<(), XPathError> {
            if args.len() < min || args.len() > max {
                Err(XPathError::Arity { name: name.to_string(), found: args.len() })
            } else {
                Ok(())
            }
        };
        let arg = |i: usize| self.eval(&args[i], ctx);
        let string_arg = |i: usize| -> Result<String, XPathError> {
            if args.len() > i {
                Ok(self.string(&arg(i)?))
            } else {
                Ok(self.string_value(ctx.node))
            }
        };

        let value = match name {
            "last" => {
                arity(0, 0)?;
                Value::Number(ctx.size as f64)
            }
            "position" => {
                arity(0, 0)?;
                Value::Number(ctx.position as f64)
            }
            "count" => {
                arity(1, 1)?;
                Value::Number(self.node_set(arg(0)?)?.len() as f64)
            }
            "not" => {
                arity(1, 1)?;
                Value::Boolean(!self.boolean(arg(0)?))
            }
            "true" => {
                arity(0, 0)?;
                Value::Boolean(true)
            }
            "false" => {
                arity(0, 0)?;
                Value::Boolean(false)
            }
            "boolean" => {
                arity(1, 1)?;
                Value::Boolean(self.boolean(arg(0)?))
            }
            "number" => {
                arity(0, 1)?;
                if args.is_empty() {
                    Value::Number(string_to_number(&self.string_value(ctx.node)))
                } else {
                    Value::Number(self.number(&arg(0)?))
                }
            }
            "string" => {
                arity(0, 1)?;
                Value::String(string_arg(0)?)
            }
            "concat" => {
                if args.len() < 2 {
                    return Err(XPathError::Arity { name: name.to_string(), found: args.len() });
                }
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(&self.string(&arg(i)?));
                }
                Value::String(out)
            }
            "contains" => {
                arity(2, 2)?;
                Value::Boolean(string_arg(0)?.contains(&string_arg(1)?))
            }
            "starts-with" => {
                arity(2, 2)?;
                Value::Boolean(string_arg(0)?.starts_with(&string_arg(1)?))
            }
            "ends-with" => {
                arity(2, 2)?;
                Value::Boolean(string_arg(0)?.ends_with(&string_arg(1)?))
            }
            "normalize-space" => {
                arity(0, 1)?;
                let s = string_arg(0)?;
                Value::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            "string-length" => {
                arity(0, 1)?;
                Value::Number(string_arg(0)?.chars().count() as f64)
            }
            "substring" => {
                arity(2, 3)?;
                let s = string_arg(0)?;
                let start = xpath_round(self.number(&arg(1)?));
                let end = if args.len() == 3 {
                    start + xpath_round(self.number(&arg(2)?))
                } else {
                    f64::INFINITY
                };
                let out: String = s
                    .chars()
                    .enumerate()
                    .filter(|&(i, _)| {
                        let p = (i + 1) as f64;
                        p >= start && p < end
                    })
                    .map(|(_, c)| c)
                    .collect();
                Value::String(out)
            }
            "substring-before" => {
                arity(2, 2)?;
                let s = string_arg(0)?;
                let pat = string_arg(1)?;
                Value::String(s.find(&pat).map(|i| s[..i].to_string()).unwrap_or_default())
            }
            "substring-after" => {
                arity(2, 2)?;
                let s = string_arg(0)?;
                let pat = string_arg(1)?;
                let after = s.find(&pat).map(|i| s[i + pat.len()..].to_string());
                Value::String(after.unwrap_or_default())
            }
            "translate" => {
                arity(3, 3)?;
                let s = string_arg(0)?;
                let from: Vec<char> = string_arg(1)?.chars().collect();
                let to: Vec<char> = string_arg(2)?.chars().collect();
                let out: String = s
                    .chars()
                    .filter_map(|c| match from.iter().position(|&f| f == c) {
                        Some(i) => to.get(i).copied(),
                        None => Some(c),
                    })
                    .collect();
                Value::String(out)
            }
            "name" | "local-name" => {
                arity(0, 1)?;
                let node = if args.is_empty() {
                    Some(ctx.node)
                } else {
                    let nodes = self.sort_unique(self.node_set(arg(0)?)?);
                    nodes.first().copied()
                };
                let local = name == "local-name";
                Value::String(node.map(|n| self.node_name(n, local)).unwrap_or_default())
            }
            "sum" => {
                arity(1, 1)?;
                let total = self
                    .node_set(arg(0)?)?
                    .into_iter()
                    .map(|n| string_to_number(&self.string_value(n)))
                    .sum();
                Value::Number(total)
            }
            "floor" => {
                arity(1, 1)?;
                Value::Number(self.number(&arg(0)?).floor())
            }
            "ceiling" => {
                arity(1, 1)?;
                Value::Number(self.number(&arg(0)?).ceil())
            }
            "round" => {
                arity(1, 1)?;
                Value::Number(xpath_round(self.number(&arg(0)?)))
            }
            _ => return Err(XPathError::UnknownFunction(name.to_string())),
        };
        Ok(value)
    }

    fn node_name(&self, node: XNode, local: bool) -> String {
        let full = match node {
            XNode::Attribute { owner, index } => {
                self.attribute(owner, index).map(|(n, _)| n.to_string()).unwrap_or_default()
            }
            XNode::Node(id) => self.tree.tag_name(id).unwrap_or_default().to_string(),
        };
        if local {
            full.rsplit(':').next().unwrap_or_default().to_string()
        } else {
            full
        }
    }
}

/// Scalar operand of a comparison
#[derive(Debug, Clone)]
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Atom {
    fn from_value(value: &Value, eval: &Evaluator<'_>) -> Self {
        match value {
            Value::String(s) => Atom::Str(s.clone()),
            Value::Number(n) => Atom::Num(*n),
            Value::Boolean(b) => Atom::Bool(*b),
            Value::NodeSet(_) => Atom::Str(eval.string(value)),
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Atom::Str(s) => string_to_number(s),
            Atom::Num(n) => *n,
            Atom::Bool(b) => f64::from(u8::from(*b)),
        }
    }

    fn to_bool(&self) -> bool {
        match self {
            Atom::Str(s) => !s.is_empty(),
            Atom::Num(n) => *n != 0.0 && !n.is_nan(),
            Atom::Bool(b) => *b,
        }
    }
}

fn compare_atoms(op: CompareOp, a: &Atom, b: &Atom) -> bool {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = match (a, b) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => a.to_bool() == b.to_bool(),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => a.to_number() == b.to_number(),
                (Atom::Str(x), Atom::Str(y)) => x == y,
            };
            if op == CompareOp::Eq { equal } else { !equal }
        }
        CompareOp::Lt => a.to_number() < b.to_number(),
        CompareOp::Le => a.to_number() <= b.to_number(),
        CompareOp::Gt => a.to_number() > b.to_number(),
        CompareOp::Ge => a.to_number() >= b.to_number(),
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.contains(|c: char| c == '+' || c.is_ascii_alphabetic()) {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == n.trunc() && n.abs() < 1e16 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(" 12 "), 12.0);
        assert_eq!(string_to_number("-1.5"), -1.5);
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("").is_nan());
        assert!(string_to_number("abc").is_nan());
    }

    #[test]
    fn test_round() {
        assert_eq!(xpath_round(1.5), 2.0);
        assert_eq!(xpath_round(-1.5), -1.0);
        assert_eq!(xpath_round(2.4), 2.0);
    }

    #[test]
    fn test_atom_equality_rules() {
        assert!(compare_atoms(CompareOp::Eq, &Atom::Str("1".into()), &Atom::Num(1.0)));
        assert!(compare_atoms(CompareOp::Eq, &Atom::Str("x".into()), &Atom::Bool(true)));
        assert!(compare_atoms(CompareOp::NotEq, &Atom::Str("a".into()), &Atom::Str("b".into())));
        assert!(compare_atoms(CompareOp::Lt, &Atom::Str("2".into()), &Atom::Num(10.0)));
    }
}
