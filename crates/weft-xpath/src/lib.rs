//! Weft XPath - path queries over the arena DOM
//!
//! An XPath 1.0 evaluator (minus variables and namespaces) plus the
//! [`PathResolver`], which extends plain XPath with a `/shadow-root/`
//! delimiter for crossing into open shadow trees.
//!
//! ```ignore
//! let matches = weft_xpath::select(doc.tree(), "//form//input[@name='email']", NodeId::ROOT)?;
//! ```

pub mod ast;
mod eval;
mod lexer;
mod parser;
mod resolver;

use weft_dom::{DomTree, NodeId};

pub use eval::{Value, XNode};
pub use parser::parse;
pub use resolver::{PathResolver, SHADOW_ROOT_DELIMITER};

use ast::Expr;
use eval::Evaluator;

/// XPath errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum XPathError {
    #[error("Empty expression")]
    EmptyExpression,

    #[error("Unexpected token {found} at {pos}")]
    UnexpectedToken { pos: usize, found: String },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unterminated string literal at {pos}")]
    UnterminatedLiteral { pos: usize },

    #[error("Invalid character {ch:?} at {pos}")]
    InvalidCharacter { pos: usize, ch: char },

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),

    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    #[error("Wrong number of arguments to {name}(): {found}")]
    Arity { name: String, found: usize },

    #[error("Expression does not evaluate to a node-set")]
    NotANodeSet,

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, XPathError>;

/// A parsed expression, reusable across evaluations
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Parse an expression
    pub fn compile(source: &str) -> Result<Self> {
        Ok(Self { source: source.to_string(), expr: parse(source)? })
    }

    /// The source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `context` as the context node
    pub fn evaluate(&self, tree: &DomTree, context: NodeId) -> Result<Value> {
        Evaluator::new(tree).evaluate(&self.expr, context)
    }

    /// Evaluate and return the matching nodes in document order. Fails if
    /// the expression yields a string, number or boolean.
    pub fn select(&self, tree: &DomTree, context: NodeId) -> Result<Vec<XNode>> {
        match self.evaluate(tree, context)? {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }
}

/// Parse and evaluate in one go
pub fn evaluate(tree: &DomTree, expr: &str, context: NodeId) -> Result<Value> {
    XPath::compile(expr)?.evaluate(tree, context)
}

/// Parse and select in one go
pub fn select(tree: &DomTree, expr: &str, context: NodeId) -> Result<Vec<XNode>> {
    XPath::compile(expr)?.select(tree, context)
}
