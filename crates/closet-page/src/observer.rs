//! Child-list mutation observation.
//!
//! Host pages re-render their product sections freely. The observer
//! decides which queued [`MutationRecord`]s fall inside the watched scope;
//! the content script then reconciles injected nodes for those.

use ego_tree::NodeId;
use scraper::Selector;

use crate::document::{HostDocument, MutationRecord};

/// Subtree whose child-list changes are observed.
#[derive(Debug, Clone)]
pub enum ObserveScope {
    Body,
    /// First element matching the selector; the body when it is absent.
    Within(Selector),
}

#[derive(Debug, Clone)]
pub struct MutationObserver {
    scope: ObserveScope,
}

impl MutationObserver {
    #[must_use]
    pub fn new(scope: ObserveScope) -> Self {
        Self { scope }
    }

    #[must_use]
    pub fn body() -> Self {
        Self::new(ObserveScope::Body)
    }

    fn scope_root(&self, doc: &HostDocument) -> Option<NodeId> {
        let root = match &self.scope {
            ObserveScope::Body => doc.body(),
            ObserveScope::Within(selector) => doc.select_first(selector).or_else(|| doc.body()),
        };
        root.map(|el| el.id())
    }

    /// Records whose target lies within the observed scope.
    #[must_use]
    pub fn filter<'r>(
        &self,
        doc: &HostDocument,
        records: &'r [MutationRecord],
    ) -> Vec<&'r MutationRecord> {
        let Some(root) = self.scope_root(doc) else {
            return Vec::new();
        };
        records
            .iter()
            .filter(|record| doc.contains(root, record.target))
            .collect()
    }

    #[must_use]
    pub fn is_relevant(&self, doc: &HostDocument, records: &[MutationRecord]) -> bool {
        !self.filter(doc, records).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<div id="product"><h1 id="title">Coat</h1><div id="gallery"><img src="/a.jpg"></div></div>
<footer id="footer"><p>links</p></footer>
</body></html>"#;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).expect("test selector")
    }

    #[test]
    fn body_scope_sees_every_attached_change() {
        let mut doc = HostDocument::parse(PAGE);
        let footer = doc.select_first(&sel("#footer")).expect("footer").id();
        doc.append_html(footer, "<p>more</p>");

        let records = doc.take_records();
        assert!(MutationObserver::body().is_relevant(&doc, &records));
    }

    #[test]
    fn narrow_scope_ignores_changes_elsewhere() {
        let mut doc = HostDocument::parse(PAGE);
        let observer = MutationObserver::new(ObserveScope::Within(sel("#product")));

        let footer = doc.select_first(&sel("#footer")).expect("footer").id();
        doc.append_html(footer, "<p>more</p>");
        let records = doc.take_records();
        assert!(!observer.is_relevant(&doc, &records));

        let gallery = doc.select_first(&sel("#gallery")).expect("gallery").id();
        let title = doc.select_first(&sel("#title")).expect("title").id();
        doc.remove(title);
        doc.append_html(gallery, r#"<img src="/b.jpg">"#);
        let records = doc.take_records();
        assert_eq!(observer.filter(&doc, &records).len(), 2);
    }

    #[test]
    fn missing_scope_element_widens_to_body() {
        let mut doc = HostDocument::parse(PAGE);
        let observer = MutationObserver::new(ObserveScope::Within(sel("#product")));

        let product = doc.select_first(&sel("#product")).expect("product").id();
        doc.remove(product);
        let records = doc.take_records();

        assert!(observer.is_relevant(&doc, &records));
    }

    #[test]
    fn changes_inside_detached_subtrees_are_ignored() {
        let mut doc = HostDocument::parse(PAGE);
        let product = doc.select_first(&sel("#product")).expect("product").id();
        let title = doc.select_first(&sel("#title")).expect("title").id();
        doc.remove(product);
        doc.take_records();

        doc.remove(title);
        let records = doc.take_records();

        assert!(!MutationObserver::body().is_relevant(&doc, &records));
    }
}
