//! Mutable host-page document.
//!
//! Wraps a parsed [`Html`] tree and exposes the small set of DOM operations
//! the content script needs: scoped selection, fragment insertion, removal,
//! and attribute updates. Every child-list change is queued as a
//! [`MutationRecord`] so an observer can react to host re-renders the same
//! way it reacts to our own edits.

use std::sync::LazyLock;

use ego_tree::{NodeId, NodeMut, NodeRef};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector is valid"));

/// Kind of child-list change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildAdded,
    ChildRemoved,
}

/// A single child-list change: `node` was added to or removed from `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    After(NodeId),
    Prepend(NodeId),
    Append(NodeId),
}

pub struct HostDocument {
    html: Html,
    records: Vec<MutationRecord>,
}

impl HostDocument {
    #[must_use]
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            records: Vec::new(),
        }
    }

    /// The `<html>` element. All queries are scoped under it so detached
    /// subtrees never match.
    #[must_use]
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    #[must_use]
    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.select_first(&BODY)
    }

    #[must_use]
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.root().select(selector).next()
    }

    /// First element matching any of `selectors`, tried in order.
    #[must_use]
    pub fn select_first_of(&self, selectors: &[Selector]) -> Option<ElementRef<'_>> {
        selectors.iter().find_map(|selector| self.select_first(selector))
    }

    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.root().select(selector).collect()
    }

    #[must_use]
    pub fn exists(&self, selector: &Selector) -> bool {
        self.select_first(selector).is_some()
    }

    #[must_use]
    pub fn count(&self, selector: &Selector) -> usize {
        self.root().select(selector).count()
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Whether `node` is `ancestor` itself or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let Some(start) = self.html.tree.get(node) else {
            return false;
        };
        std::iter::successors(Some(start), NodeRef::parent).any(|n| n.id() == ancestor)
    }

    /// Whether `node` is still reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.html.tree.root().id(), node)
    }

    /// Parses `fragment` and inserts its top-level nodes right after `anchor`.
    /// Returns the first inserted element.
    pub fn insert_html_after(&mut self, anchor: NodeId, fragment: &str) -> Option<NodeId> {
        self.graft(fragment, Placement::After(anchor))
    }

    /// Parses `fragment` and inserts its nodes as the first children of `parent`.
    pub fn prepend_html(&mut self, parent: NodeId, fragment: &str) -> Option<NodeId> {
        self.graft(fragment, Placement::Prepend(parent))
    }

    /// Parses `fragment` and inserts its nodes as the last children of `parent`.
    pub fn append_html(&mut self, parent: NodeId, fragment: &str) -> Option<NodeId> {
        self.graft(fragment, Placement::Append(parent))
    }

    /// Replaces `target` with the nodes parsed from `fragment`.
    pub fn replace_html(&mut self, target: NodeId, fragment: &str) -> Option<NodeId> {
        let inserted = self.insert_html_after(target, fragment)?;
        self.remove(target);
        Some(inserted)
    }

    /// Detaches `node` from its parent. Returns `false` when it was not attached.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(parent) = self
            .html
            .tree
            .get(node)
            .and_then(|n| n.parent())
            .map(|p| p.id())
        else {
            return false;
        };
        if let Some(mut target) = self.html.tree.get_mut(node) {
            target.detach();
        }
        self.records.push(MutationRecord {
            kind: MutationKind::ChildRemoved,
            target: parent,
            node,
        });
        true
    }

    /// Removes every element matching `selector`. Returns how many were removed.
    pub fn remove_all(&mut self, selector: &Selector) -> usize {
        let ids: Vec<NodeId> = self.select_all(selector).iter().map(|el| el.id()).collect();
        ids.into_iter().filter(|id| self.remove(*id)).count()
    }

    /// Sets an attribute that is already present on the element.
    ///
    /// Only existing attributes can be updated; adding new ones would bypass
    /// the element's cached id and class lookups.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(mut target) = self.html.tree.get_mut(node) else {
            return false;
        };
        let Node::Element(element) = target.value() else {
            return false;
        };
        match element
            .attrs
            .iter_mut()
            .find(|(key, _)| key.local.as_ref() == name)
        {
            Some((_, slot)) => {
                *slot = StrTendril::from_slice(value);
                true
            }
            None => false,
        }
    }

    /// Drains the queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Serializes the whole document.
    #[must_use]
    pub fn html(&self) -> String {
        self.html.html()
    }

    fn graft(&mut self, fragment: &str, placement: Placement) -> Option<NodeId> {
        let (parent, mut cursor) = match placement {
            Placement::After(anchor) => {
                let parent = self.html.tree.get(anchor)?.parent()?.id();
                (parent, Some(anchor))
            }
            Placement::Prepend(parent) | Placement::Append(parent) => {
                self.html.tree.get(parent)?;
                (parent, None)
            }
        };

        let parsed = Html::parse_fragment(fragment);
        let mut first_element = None;
        for source in parsed.root_element().children() {
            let id = {
                let mut orphan = self.html.tree.orphan(source.value().clone());
                copy_children(source, &mut orphan);
                orphan.id()
            };
            let mut attached = match (placement, cursor) {
                (_, Some(previous)) => self.html.tree.get_mut(previous)?,
                (Placement::Prepend(_), None) => {
                    let mut parent_node = self.html.tree.get_mut(parent)?;
                    parent_node.prepend_id(id);
                    self.record_added(parent, id, &mut first_element, source.value());
                    cursor = Some(id);
                    continue;
                }
                (_, None) => self.html.tree.get_mut(parent)?,
            };
            if cursor.is_some() {
                attached.insert_id_after(id);
            } else {
                attached.append_id(id);
            }
            self.record_added(parent, id, &mut first_element, source.value());
            cursor = Some(id);
        }
        first_element
    }

    fn record_added(
        &mut self,
        parent: NodeId,
        id: NodeId,
        first_element: &mut Option<NodeId>,
        value: &Node,
    ) {
        if first_element.is_none() && value.is_element() {
            *first_element = Some(id);
        }
        self.records.push(MutationRecord {
            kind: MutationKind::ChildAdded,
            target: parent,
            node: id,
        });
    }
}

fn copy_children(source: NodeRef<'_, Node>, dest: &mut NodeMut<'_, Node>) {
    for child in source.children() {
        let mut appended = dest.append(child.value().clone());
        copy_children(child, &mut appended);
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
