//! Container resolution

use weft_dom::{DomTree, NodeId};
use weft_xpath::{PathResolver, XNode};

use crate::descriptor::{ContainerDescriptor, ContainerQuery, FoundContainer};
use crate::{accept_all, document_element, ContentHash, FailReason, Predicate, Resolution};

/// Re-resolves container descriptors against the live DOM
#[derive(Debug, Default)]
pub struct ContainerCache {
    paths: PathResolver,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path resolver shared with element resolution
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// The sentinel root container, pinned to the document element
    pub fn root(&self, tree: &DomTree) -> FoundContainer {
        FoundContainer::root(document_element(tree))
    }

    /// Resolve `descriptor` (the root when absent). Candidates must also
    /// satisfy `predicate`; parents are resolved without one.
    pub fn resolve_container(
        &self,
        tree: &DomTree,
        descriptor: Option<&ContainerDescriptor>,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundContainer> {
        let Some(descriptor) = descriptor else {
            return Resolution::Resolved(self.root(tree));
        };
        if descriptor.is_root() {
            return Resolution::Resolved(self.root(tree));
        }
        match descriptor {
            ContainerDescriptor::Found(found) => self.revalidate(tree, found, predicate),
            ContainerDescriptor::Search(query) => self.find_container(tree, query, predicate),
        }
    }

    /// Re-locate a found container at its recorded path and index
    fn revalidate(
        &self,
        tree: &DomTree,
        found: &FoundContainer,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundContainer> {
        let parent = match self.resolve_container(tree, found.parent.as_deref(), &accept_all) {
            Resolution::FastPath(parent) | Resolution::Resolved(parent) => parent,
            Resolution::Failed(reason) => {
                let path = &found.container_path;
                tracing::debug!(%path, %reason, "parent container unresolved");
                return Resolution::Failed(FailReason::ParentUnresolved);
            }
        };

        let scope = self.scope(tree, &parent);
        let matches = match self.paths.resolve(tree, &found.container_path, scope) {
            Ok(matches) => matches,
            Err(err) => return Resolution::Failed(FailReason::QueryFailed(err.to_string())),
        };

        let Some(&candidate) = matches.get(found.container_index) else {
            return Resolution::Failed(FailReason::NoMatch {
                index: found.container_index,
                found: matches.len(),
            });
        };
        let Some(node) = as_element(tree, candidate) else {
            return Resolution::Failed(FailReason::NoMatch {
                index: found.container_index,
                found: matches.len(),
            });
        };
        if !predicate(tree, node) {
            return Resolution::Failed(FailReason::PredicateRejected);
        }
        if found.container.is_some_and(|pin| pin != node) {
            tracing::debug!(path = %found.container_path, "container no longer matches its pin");
            return Resolution::Failed(FailReason::IdentityMismatch);
        }

        let parent_held = found.parent_pin().is_some_and(|pin| Some(pin) == parent.container);
        if found.container.is_some() && parent_held {
            return Resolution::FastPath(found.clone());
        }

        Resolution::Resolved(FoundContainer {
            parent: Some(Box::new(ContainerDescriptor::Found(parent))),
            container_path: found.container_path.clone(),
            container_index: found.container_index,
            container_required: found.container_required,
            hash: ContentHash::container(&found.container_path, found.container_index),
            container: Some(node),
        })
    }

    /// Search mode: the first element matched by any path alternate that
    /// passes `predicate` becomes the container. Alternates whose query
    /// fails are skipped. Falls back to the root unless the container is
    /// required.
    pub fn find_container(
        &self,
        tree: &DomTree,
        query: &ContainerQuery,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundContainer> {
        let fallback = |reason: FailReason| {
            if query.container_required {
                Resolution::Failed(reason)
            } else {
                Resolution::Resolved(self.root(tree))
            }
        };

        let Some(paths) = &query.container_path else {
            return fallback(FailReason::NothingFound);
        };
        let parent = match self.resolve_container(tree, query.parent.as_deref(), &accept_all).ok() {
            Some(parent) => parent,
            None => return fallback(FailReason::ParentUnresolved),
        };
        let scope = self.scope(tree, &parent);

        for path in paths.alternates() {
            let matches = match self.paths.resolve(tree, path, scope) {
                Ok(matches) => matches,
                Err(err) => {
                    tracing::debug!(%path, %err, "skipping container alternate");
                    continue;
                }
            };
            for (index, &candidate) in matches.iter().enumerate() {
                let Some(node) = as_element(tree, candidate) else { continue };
                if predicate(tree, node) {
                    tracing::debug!(%path, index, "container found");
                    return Resolution::Resolved(FoundContainer {
                        parent: Some(Box::new(ContainerDescriptor::Found(parent))),
                        container_path: path.clone(),
                        container_index: index,
                        container_required: query.container_required,
                        hash: ContentHash::container(path, index),
                        container: Some(node),
                    });
                }
            }
        }

        fallback(FailReason::NothingFound)
    }

    /// Context node for paths evaluated under `container`
    pub(crate) fn scope(&self, tree: &DomTree, container: &FoundContainer) -> NodeId {
        container
            .container
            .or_else(|| document_element(tree))
            .unwrap_or_else(|| tree.root())
    }
}

/// Map a path match to the element it designates: elements themselves,
/// text and comments to their parent element, attributes to nothing.
pub(crate) fn as_element(tree: &DomTree, node: XNode) -> Option<NodeId> {
    node.node_id().and_then(|id| tree.nearest_element(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::Document;

    /// body > (form > fieldset > input) + (form#second)
    fn forms() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("about:blank");
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let first = tree.create_element("form");
        let fieldset = tree.create_element("fieldset");
        let input = tree.create_element("input");
        let second = tree.create_element("form");
        tree.set_attribute(second, "id", "second").unwrap();
        tree.append_child(body, first).unwrap();
        tree.append_child(first, fieldset).unwrap();
        tree.append_child(fieldset, input).unwrap();
        tree.append_child(body, second).unwrap();
        (doc, first, fieldset, second)
    }

    #[test]
    fn test_absent_descriptor_is_root() {
        let (doc, ..) = forms();
        let cache = ContainerCache::new();
        let root = cache.resolve_container(doc.tree(), None, &accept_all).ok().unwrap();
        assert_eq!(root.container, doc.document_element());
        assert_eq!(root.container_path, "//html");
        assert_eq!(root.hash, ContentHash::container("//html", 0));
    }

    #[test]
    fn test_found_container_revalidates() {
        let (doc, _, _, second) = forms();
        let cache = ContainerCache::new();
        let descriptor = ContainerDescriptor::from(FoundContainer::new(None, "//form", 1));

        let first = cache.resolve_container(doc.tree(), Some(&descriptor), &accept_all);
        assert!(matches!(first, Resolution::Resolved(_)));
        let first = first.ok().unwrap();
        assert_eq!(first.container, Some(second));

        let again = cache
            .resolve_container(doc.tree(), Some(&descriptor), &accept_all)
            .ok()
            .unwrap();
        assert_eq!(first.hash, again.hash);
    }

    #[test]
    fn test_fast_path_after_pinning() {
        let (doc, first_form, fieldset, _) = forms();
        let cache = ContainerCache::new();
        let parent = ContainerDescriptor::from(FoundContainer::new(None, "//form", 0));
        let nested = ContainerDescriptor::from(FoundContainer::new(Some(parent), "./fieldset", 0));

        let resolved = cache
            .resolve_container(doc.tree(), Some(&nested), &accept_all)
            .ok()
            .unwrap();
        assert_eq!(resolved.container, Some(fieldset));
        let parent_pin = resolved.parent.as_deref().and_then(ContainerDescriptor::pinned);
        assert_eq!(parent_pin, Some(first_form));

        let pinned = ContainerDescriptor::from(resolved.clone());
        let again = cache.resolve_container(doc.tree(), Some(&pinned), &accept_all);
        assert!(again.is_fast_path());
        assert_eq!(again.ok(), Some(resolved));
    }

    #[test]
    fn test_index_out_of_range() {
        let (doc, ..) = forms();
        let cache = ContainerCache::new();
        let descriptor = ContainerDescriptor::from(FoundContainer::new(None, "//form", 5));
        let result = cache.resolve_container(doc.tree(), Some(&descriptor), &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::NoMatch { index: 5, found: 2 }));
    }

    #[test]
    fn test_predicate_and_pin_checks() {
        let (doc, _, _, second) = forms();
        let cache = ContainerCache::new();
        let descriptor = ContainerDescriptor::from(FoundContainer::new(None, "//form", 0));

        let reject = |_: &DomTree, _: NodeId| false;
        let result = cache.resolve_container(doc.tree(), Some(&descriptor), &reject);
        assert_eq!(result.fail_reason(), Some(&FailReason::PredicateRejected));

        let mut pinned = FoundContainer::new(None, "//form", 0);
        pinned.container = Some(second);
        let pinned = ContainerDescriptor::from(pinned);
        let result = cache.resolve_container(doc.tree(), Some(&pinned), &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::IdentityMismatch));
    }

    #[test]
    fn test_failed_parent_propagates() {
        let (doc, ..) = forms();
        let cache = ContainerCache::new();
        let parent = ContainerDescriptor::from(FoundContainer::new(None, "//table", 0));
        let child = ContainerDescriptor::from(FoundContainer::new(Some(parent), "./tr", 0));
        let result = cache.resolve_container(doc.tree(), Some(&child), &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::ParentUnresolved));
    }

    #[test]
    fn test_search_tries_alternates_in_order() {
        let (doc, _, _, second) = forms();
        let cache = ContainerCache::new();
        let query = ContainerQuery {
            container_path: Some(crate::PathSpec::Alternates(vec![
                "//table".into(),
                "//form[".into(),
                "//form[@id='second']".into(),
            ])),
            ..Default::default()
        };
        let found = cache.find_container(doc.tree(), &query, &accept_all).ok().unwrap();
        assert_eq!(found.container, Some(second));
        assert_eq!(found.container_path, "//form[@id='second']");
        assert_eq!(found.container_index, 0);
        assert_eq!(found.hash, ContentHash::container("//form[@id='second']", 0));
    }

    #[test]
    fn test_search_fallback_depends_on_required() {
        let (doc, ..) = forms();
        let cache = ContainerCache::new();
        let mut query =
            ContainerQuery { container_path: Some("//table".into()), ..Default::default() };

        let fallback = cache.find_container(doc.tree(), &query, &accept_all).ok().unwrap();
        assert!(fallback.is_root());

        query.container_required = true;
        let result = cache.find_container(doc.tree(), &query, &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::NothingFound));
    }

    #[test]
    fn test_search_predicate_skips_candidates() {
        let (doc, _, _, second) = forms();
        let cache = ContainerCache::new();
        let query = ContainerQuery { container_path: Some("//form".into()), ..Default::default() };
        let has_id = |tree: &DomTree, id: NodeId| tree.get_attribute(id, "id").is_some();
        let found = cache.find_container(doc.tree(), &query, &has_id).ok().unwrap();
        assert_eq!(found.container, Some(second));
        assert_eq!(found.container_index, 1);
    }
}
