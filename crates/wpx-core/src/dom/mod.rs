//! In-memory document with observable mutations.
//!
//! Stands in for the live browser DOM: elements live in an arena addressed by
//! [`ElementId`], attribute writes and child insertions are queued as
//! [`MutationRecord`]s for every matching observation, and
//! [`Document::take_records`] drains the queue in arrival order.

mod record;

pub use record::{MutationRecord, ObserveOptions};

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::adapter::AttributeHost;

/// Handle to an element. Stays valid until the element is removed; ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown element {0}")]
    UnknownElement(ElementId),
    #[error("element {0} already has a parent")]
    AlreadyAttached(ElementId),
    #[error("cannot insert {child} under its own descendant {parent}")]
    Hierarchy { parent: ElementId, child: ElementId },
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The element tree plus the pending mutation queue.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    root: ElementId,
    observations: Vec<(ElementId, ObserveOptions)>,
    records: VecDeque<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document with a single `html` root element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Element::new("html"))],
            root: ElementId(0),
            observations: Vec::new(),
            records: VecDeque::new(),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    fn node(&self, id: ElementId) -> Result<&Element, DomError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(DomError::UnknownElement(id))
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut Element, DomError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(DomError::UnknownElement(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.node(id).is_ok()
    }

    pub fn tag_name(&self, id: ElementId) -> Option<&str> {
        self.node(id).ok().map(|e| e.tag.as_str())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).ok().and_then(|e| e.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.node(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// True if `id` is reachable from the root.
    pub fn is_connected(&self, id: ElementId) -> bool {
        self.is_inclusive_ancestor(self.root, id)
    }

    fn is_inclusive_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Creates a detached element. Nothing is recorded until it is inserted.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.nodes.push(Some(Element::new(tag)));
        ElementId(self.nodes.len() - 1)
    }

    /// Appends `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        self.node(parent)?;
        if self.node(child)?.parent.is_some() || child == self.root {
            return Err(DomError::AlreadyAttached(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Hierarchy { parent, child });
        }

        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.record_child_list(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Creates an element with the given attributes and appends it to `parent`.
    ///
    /// Attributes are set before insertion, so observers only see the insertion.
    pub fn append_new(
        &mut self,
        parent: ElementId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ElementId, DomError> {
        self.node(parent)?;
        let id = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(id, name, value)?;
        }
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Detaches `id` from its parent and drops it with all its descendants.
    pub fn remove_element(&mut self, id: ElementId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::Hierarchy {
                parent: id,
                child: id,
            });
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
            self.record_child_list(parent, Vec::new(), vec![id]);
        }

        for dead in self.descendants(id) {
            if let Some(slot) = self.nodes.get_mut(dead.0) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// `id` followed by all its descendants in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn get_attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.node(id).ok()?.attribute(&name)
    }

    /// Sets an attribute, recording a mutation even if the value is unchanged.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.node_mut(id)?;
        let old_value = match element.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                element.attributes.push((name.clone(), value.to_string()));
                None
            }
        };
        self.record_attribute(id, name, old_value);
        Ok(())
    }

    /// Connected elements carrying `name`, in document order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<ElementId> {
        let name = name.to_ascii_lowercase();
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                self.node(*id)
                    .map(|e| e.attribute(&name).is_some())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Mutable view of one element for the attribute adapter.
    pub fn element_mut(&mut self, id: ElementId) -> Option<ElementMut<'_>> {
        if self.contains(id) {
            Some(ElementMut { doc: self, id })
        } else {
            None
        }
    }

    /// Starts reporting changes under `target`. Observing the same target again
    /// replaces its options.
    pub fn observe(&mut self, target: ElementId, options: ObserveOptions) -> Result<(), DomError> {
        self.node(target)?;
        match self.observations.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = options,
            None => self.observations.push((target, options)),
        }
        Ok(())
    }

    /// Stops all observations and discards queued records.
    pub fn disconnect(&mut self) {
        self.observations.clear();
        self.records.clear();
    }

    /// Drains queued records in arrival order.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.records.drain(..).collect()
    }

    pub fn has_pending_records(&self) -> bool {
        !self.records.is_empty()
    }

    fn observed_by(&self, target: ElementId) -> impl Iterator<Item = &ObserveOptions> + '_ {
        self.observations.iter().filter_map(move |(observed, options)| {
            let covers = *observed == target
                || (options.subtree && self.is_inclusive_ancestor(*observed, target));
            covers.then_some(options)
        })
    }

    fn record_attribute(&mut self, target: ElementId, name: String, old_value: Option<String>) {
        if self.observed_by(target).any(|o| o.wants_attribute(&name)) {
            self.records.push_back(MutationRecord::Attributes {
                target,
                name,
                old_value,
            });
        }
    }

    fn record_child_list(&mut self, target: ElementId, added: Vec<ElementId>, removed: Vec<ElementId>) {
        if self.observed_by(target).any(|o| o.child_list) {
            self.records.push_back(MutationRecord::ChildList {
                target,
                added,
                removed,
            });
        }
    }
}

/// One element of a [`Document`], borrowed for attribute access.
pub struct ElementMut<'a> {
    doc: &'a mut Document,
    id: ElementId,
}

impl AttributeHost for ElementMut<'_> {
    fn get_attribute(&self, name: &str) -> Option<String> {
        self.doc.get_attribute(self.id, name).map(str::to_string)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Err(err) = self.doc.set_attribute(self.id, name, value) {
            tracing::warn!(%err, attribute = name, "attribute write dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed_doc(options: ObserveOptions) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        doc.observe(root, options).unwrap();
        doc
    }

    fn subtree_attrs() -> ObserveOptions {
        ObserveOptions {
            subtree: true,
            attributes: true,
            child_list: true,
            attribute_filter: Some(vec!["href".into(), "src".into()]),
        }
    }

    #[test]
    fn attribute_writes_are_recorded_in_order() {
        let mut doc = observed_doc(subtree_attrs());
        let a = doc.append_new(doc.root(), "a", &[]).unwrap();
        doc.take_records();

        doc.set_attribute(a, "href", "/one").unwrap();
        doc.set_attribute(a, "HREF", "/two").unwrap();
        let records = doc.take_records();
        assert_eq!(
            records,
            vec![
                MutationRecord::Attributes {
                    target: a,
                    name: "href".into(),
                    old_value: None
                },
                MutationRecord::Attributes {
                    target: a,
                    name: "href".into(),
                    old_value: Some("/one".into())
                },
            ]
        );
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn filtered_attributes_are_ignored() {
        let mut doc = observed_doc(subtree_attrs());
        let a = doc.append_new(doc.root(), "a", &[]).unwrap();
        doc.take_records();
        doc.set_attribute(a, "class", "x").unwrap();
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn without_subtree_only_target_is_observed() {
        let mut doc = observed_doc(ObserveOptions {
            attributes: true,
            ..Default::default()
        });
        let a = doc.append_new(doc.root(), "a", &[]).unwrap();
        doc.set_attribute(a, "href", "/x").unwrap();
        assert!(doc.take_records().is_empty());
        let root = doc.root();
        doc.set_attribute(root, "lang", "en").unwrap();
        assert_eq!(doc.take_records().len(), 1);
    }

    #[test]
    fn insertion_records_child_list_only() {
        let mut doc = observed_doc(subtree_attrs());
        let img = doc
            .append_new(doc.root(), "img", &[("src", "a.png")])
            .unwrap();
        let records = doc.take_records();
        assert_eq!(
            records,
            vec![MutationRecord::ChildList {
                target: doc.root(),
                added: vec![img],
                removed: vec![]
            }]
        );
    }

    #[test]
    fn elements_with_attribute_in_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.append_new(root, "body", &[]).unwrap();
        let first = doc.append_new(body, "a", &[("href", "/1")]).unwrap();
        let nested = doc.append_new(first, "img", &[("src", "x")]).unwrap();
        let second = doc.append_new(body, "a", &[("href", "/2")]).unwrap();
        let detached = doc.create_element("a");
        doc.set_attribute(detached, "href", "/3").unwrap();

        assert_eq!(doc.elements_with_attribute("href"), vec![first, second]);
        assert_eq!(doc.elements_with_attribute("src"), vec![nested]);
    }

    #[test]
    fn removed_elements_become_unknown() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_new(root, "div", &[]).unwrap();
        let a = doc.append_new(div, "a", &[("href", "/")]).unwrap();
        doc.remove_element(div).unwrap();
        assert!(!doc.contains(div));
        assert!(!doc.contains(a));
        assert!(doc.element_mut(a).is_none());
        assert_eq!(doc.set_attribute(a, "href", "x"), Err(DomError::UnknownElement(a)));
    }

    #[test]
    fn hierarchy_errors() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_new(root, "div", &[]).unwrap();
        let b = doc.append_new(a, "div", &[]).unwrap();
        assert_eq!(doc.append_child(b, a), Err(DomError::AlreadyAttached(a)));
        let c = doc.create_element("div");
        doc.append_child(b, c).unwrap();
        assert!(doc.remove_element(root).is_err());
    }

    #[test]
    fn disconnect_clears_queue() {
        let mut doc = observed_doc(subtree_attrs());
        doc.append_new(doc.root(), "a", &[]).unwrap();
        assert!(doc.has_pending_records());
        doc.disconnect();
        assert!(!doc.has_pending_records());
        doc.append_new(doc.root(), "a", &[]).unwrap();
        assert!(!doc.has_pending_records());
    }
}
