//! Shadow-root-aware path resolution
//!
//! A path such as `//x-card/shadow-root/input` is evaluated in two parts:
//! the prefix `//x-card` against the scope node, then `./input` with each
//! top-level child of every matched host's shadow root as context node.
//! The whole expression is then also evaluated as plain XPath and its
//! matches appended, so results may contain duplicates.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use weft_dom::{DomTree, NodeId};

use crate::{Result, XNode, XPath};

/// Separates a host path from the path inside its shadow tree
pub const SHADOW_ROOT_DELIMITER: &str = "/shadow-root/";

const DEFAULT_CACHE_ENTRIES: usize = 256;

/// Resolves path expressions, memoizing compiled expressions
#[derive(Debug)]
pub struct PathResolver {
    compiled: RefCell<HashMap<String, Rc<XPath>>>,
    max_entries: usize,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_ENTRIES)
    }

    /// Resolver keeping at most `max_entries` compiled expressions
    pub fn with_capacity(max_entries: usize) -> Self {
        Self { compiled: RefCell::new(HashMap::new()), max_entries: max_entries.max(1) }
    }

    /// Resolve `expr` with `scope` as the context node
    pub fn resolve(&self, tree: &DomTree, expr: &str, scope: NodeId) -> Result<Vec<XNode>> {
        let mut results = Vec::new();

        if let Some(idx) = expr.find(SHADOW_ROOT_DELIMITER) {
            let prefix = &expr[..idx];
            let suffix = format!("./{}", &expr[idx + SHADOW_ROOT_DELIMITER.len()..]);

            for host in self.compile(prefix)?.select(tree, scope)? {
                let Some(host) = host.node_id().filter(|&id| tree.is_element(id)) else {
                    continue;
                };
                let Some(shadow) = tree.shadow_root(host) else {
                    tracing::trace!(?host, "no shadow root, skipping suffix");
                    continue;
                };
                for child in tree.child_ids(shadow) {
                    results.extend(self.resolve(tree, &suffix, child)?);
                }
            }
        }

        results.extend(self.compile(expr)?.select(tree, scope)?);
        tracing::debug!(expr, matches = results.len(), "resolved path");
        Ok(results)
    }

    /// Resolve and keep only arena nodes, mapping text and comments to
    /// their parent element. Attribute matches map to `None`.
    pub fn resolve_elements(
        &self,
        tree: &DomTree,
        expr: &str,
        scope: NodeId,
    ) -> Result<Vec<Option<NodeId>>> {
        Ok(self
            .resolve(tree, expr, scope)?
            .into_iter()
            .map(|n| n.node_id().and_then(|id| tree.nearest_element(id)))
            .collect())
    }

    /// Number of compiled expressions held
    pub fn cached(&self) -> usize {
        self.compiled.borrow().len()
    }

    /// Drop every compiled expression
    pub fn clear(&self) {
        self.compiled.borrow_mut().clear();
    }

    fn compile(&self, expr: &str) -> Result<Rc<XPath>> {
        if let Some(hit) = self.compiled.borrow().get(expr) {
            return Ok(Rc::clone(hit));
        }
        let compiled = Rc::new(XPath::compile(expr)?);
        let mut cache = self.compiled.borrow_mut();
        if cache.len() >= self.max_entries {
            cache.clear();
        }
        cache.insert(expr.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}
