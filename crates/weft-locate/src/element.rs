//! Element resolution inside a resolved container

use weft_dom::{DomTree, NodeId};

use crate::container::as_element;
use crate::descriptor::{
    ContainerDescriptor, ElementDescriptor, ElementQuery, FoundContainer, FoundElement,
};
use crate::{accept_all, ContainerCache, ContentHash, FailReason, Predicate, Resolution};

/// A resolved descriptor together with the live element it points at
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedElement {
    pub descriptor: FoundElement,
    pub node: NodeId,
}

/// Re-resolves element descriptors against the live DOM
#[derive(Debug, Default)]
pub struct ElementResolver {
    containers: ContainerCache,
}

impl ElementResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn containers(&self) -> &ContainerCache {
        &self.containers
    }

    /// Resolve `descriptor`, requiring candidates to satisfy `predicate`
    pub fn resolve_element(
        &self,
        tree: &DomTree,
        descriptor: &ElementDescriptor,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundElement> {
        match descriptor {
            ElementDescriptor::Found(found) => self.revalidate(tree, found, predicate),
            ElementDescriptor::Search(query) => self.find_element(tree, query, predicate),
        }
    }

    /// Resolve and pair the result with its live node
    pub fn locate(
        &self,
        tree: &DomTree,
        descriptor: &ElementDescriptor,
        predicate: Predicate<'_>,
    ) -> Option<ResolvedElement> {
        let descriptor = self.resolve_element(tree, descriptor, predicate).ok()?;
        let node = descriptor.element?;
        Some(ResolvedElement { descriptor, node })
    }

    fn container(
        &self,
        tree: &DomTree,
        descriptor: Option<&ContainerDescriptor>,
    ) -> Result<(FoundContainer, NodeId), FailReason> {
        let container = self
            .containers
            .resolve_container(tree, descriptor, &accept_all)
            .ok()
            .ok_or(FailReason::ParentUnresolved)?;
        let node = container.container.ok_or(FailReason::ParentUnresolved)?;
        Ok((container, node))
    }

    fn revalidate(
        &self,
        tree: &DomTree,
        found: &FoundElement,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundElement> {
        let (container, scope) = match self.container(tree, found.container.as_ref()) {
            Ok(resolved) => resolved,
            Err(reason) => return Resolution::Failed(reason),
        };

        let matches = match self.containers.paths().resolve(tree, &found.element_path, scope) {
            Ok(matches) => matches,
            Err(err) => return Resolution::Failed(FailReason::QueryFailed(err.to_string())),
        };
        let no_match = FailReason::NoMatch { index: found.element_index, found: matches.len() };
        let Some(node) = matches.get(found.element_index).and_then(|&n| as_element(tree, n)) else {
            let (path, index) = (&found.element_path, found.element_index);
            tracing::debug!(%path, index, "element not found");
            return Resolution::Failed(no_match);
        };

        if !predicate(tree, node) {
            return Resolution::Failed(FailReason::PredicateRejected);
        }
        if found.element.is_some_and(|pin| pin != node) {
            return Resolution::Failed(FailReason::IdentityMismatch);
        }
        let container_pin = found.container_pin();
        if container_pin.is_some_and(|pin| pin != scope) {
            return Resolution::Failed(FailReason::IdentityMismatch);
        }

        if found.element.is_some() && container_pin.is_some() {
            return Resolution::FastPath(found.clone());
        }

        Resolution::Resolved(FoundElement {
            hash: ContentHash::element(&container.hash, &found.element_path, found.element_index),
            container: Some(ContainerDescriptor::Found(container)),
            element_path: found.element_path.clone(),
            element_index: found.element_index,
            element: Some(node),
        })
    }

    /// Search mode: the first element matched by any path alternate inside
    /// the container that passes `predicate`
    pub fn find_element(
        &self,
        tree: &DomTree,
        query: &ElementQuery,
        predicate: Predicate<'_>,
    ) -> Resolution<FoundElement> {
        let (container, scope) = match self.container(tree, query.container.as_ref()) {
            Ok(resolved) => resolved,
            Err(reason) => return Resolution::Failed(reason),
        };
        let Some(paths) = &query.element_path else {
            return Resolution::Failed(FailReason::NothingFound);
        };

        for path in paths.alternates() {
            let matches = match self.containers.paths().resolve(tree, path, scope) {
                Ok(matches) => matches,
                Err(err) => {
                    tracing::debug!(%path, %err, "skipping element alternate");
                    continue;
                }
            };
            for (index, &candidate) in matches.iter().enumerate() {
                let Some(node) = as_element(tree, candidate) else { continue };
                if predicate(tree, node) {
                    let mut found = FoundElement::new(container, path, index);
                    found.element = Some(node);
                    return Resolution::Resolved(found);
                }
            }
        }

        Resolution::Failed(FailReason::NothingFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathSpec;
    use weft_dom::Document;

    /// body > div#x > (input#a, input#b)
    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new("about:blank");
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let div = tree.create_element("div");
        tree.set_attribute(div, "id", "x").unwrap();
        tree.append_child(body, div).unwrap();
        let a = tree.create_element("input");
        tree.set_attribute(a, "id", "a").unwrap();
        let b = tree.create_element("input");
        tree.set_attribute(b, "id", "b").unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();
        (doc, a, b)
    }

    fn in_div(path: &str, index: usize) -> ElementDescriptor {
        let container = FoundContainer::new(None, "//div[@id='x']", 0);
        ElementDescriptor::from(FoundElement::new(container, path, index))
    }

    #[test]
    fn test_found_element() {
        let (doc, a, _) = page();
        let resolver = ElementResolver::new();
        let resolved = resolver.resolve_element(doc.tree(), &in_div("./input", 0), &accept_all);
        let found = resolved.ok().unwrap();
        assert_eq!(found.element, Some(a));
        assert!(!found.hash.is_empty());
    }

    #[test]
    fn test_index_beyond_matches() {
        let (doc, ..) = page();
        let resolver = ElementResolver::new();
        let resolved = resolver.resolve_element(doc.tree(), &in_div("./input", 2), &accept_all);
        assert_eq!(resolved.fail_reason(), Some(&FailReason::NoMatch { index: 2, found: 2 }));
    }

    #[test]
    fn test_fast_path_with_both_pins() {
        let (doc, _, b) = page();
        let resolver = ElementResolver::new();
        let fresh = resolver
            .resolve_element(doc.tree(), &in_div("./input", 1), &accept_all)
            .ok()
            .unwrap();
        assert_eq!(fresh.element, Some(b));
        assert!(fresh.container_pin().is_some());

        let descriptor = ElementDescriptor::from(fresh.clone());
        let again = resolver.resolve_element(doc.tree(), &descriptor, &accept_all);
        assert!(again.is_fast_path());
        assert_eq!(again.ok(), Some(fresh));
    }

    #[test]
    fn test_detached_element_fails_identity() {
        let (mut doc, a, _) = page();
        let resolver = ElementResolver::new();
        let pinned = resolver
            .resolve_element(doc.tree(), &in_div("./input", 0), &accept_all)
            .ok()
            .unwrap();

        doc.tree_mut().detach(a);
        let descriptor = ElementDescriptor::from(pinned);
        let result = resolver.resolve_element(doc.tree(), &descriptor, &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::IdentityMismatch));
    }

    #[test]
    fn test_search_mode() {
        let (doc, _, b) = page();
        let resolver = ElementResolver::new();
        let query = ElementQuery {
            container: None,
            element_path: Some(PathSpec::Alternates(vec![
                "//select".into(),
                "//input[@id='b']".into(),
            ])),
        };
        let resolved = resolver
            .locate(doc.tree(), &ElementDescriptor::from(query), &accept_all)
            .unwrap();
        assert_eq!(resolved.node, b);
        assert_eq!(resolved.descriptor.element_path, "//input[@id='b']");
        assert_eq!(
            resolved.descriptor.hash,
            ContentHash::element(&ContentHash::container("//html", 0), "//input[@id='b']", 0)
        );
    }

    #[test]
    fn test_search_without_path_fails() {
        let (doc, ..) = page();
        let resolver = ElementResolver::new();
        let query = ElementDescriptor::from(ElementQuery::default());
        let result = resolver.resolve_element(doc.tree(), &query, &accept_all);
        assert_eq!(result.fail_reason(), Some(&FailReason::NothingFound));
    }

    #[test]
    fn test_predicate_filters_search() {
        let (doc, _, b) = page();
        let resolver = ElementResolver::new();
        let query = ElementQuery { container: None, element_path: Some("//input".into()) };
        let not_a = |tree: &DomTree, id: NodeId| tree.get_attribute(id, "id") != Some("a");
        let resolved = resolver
            .locate(doc.tree(), &ElementDescriptor::from(query), &not_a)
            .unwrap();
        assert_eq!(resolved.node, b);
        assert_eq!(resolved.descriptor.element_index, 1);
    }
}
