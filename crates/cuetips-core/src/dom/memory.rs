#![forbid(unsafe_code)]

//! Deterministic in-memory [`Document`] host.
//!
//! `MemoryDocument` keeps a `scraper` HTML tree rooted at `<html><body>` and
//! evaluates selectors with `scraper::Selector`, so anything a browser's
//! `querySelectorAll` accepts works here too. Mutations made while a
//! subscription is connected are queued per subscription and only delivered
//! when the host calls [`MemoryDocument::flush`], which plays the role of the
//! browser's mutation observer microtask. Records are only queued for targets
//! inside the subscribed subtree, and disconnecting discards anything still
//! queued.
//!
//! Handles are cheap clones sharing the same tree, so tip callbacks can hold
//! one and mutate the document while a batch is being processed. A
//! [`NodeId`] from another document is never an element here.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ego_tree::NodeRef;
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;

use super::{Document, DomError, MutationCallback, MutationRecord, Observation};

/// Flush rounds after which a self-feeding callback loop is abandoned.
const MAX_FLUSH_ROUNDS: usize = 256;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Handle of a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(ego_tree::NodeId);

struct ObserverSlot {
    id: u64,
    root: NodeId,
    callback: MutationCallback<NodeId>,
    pending: Vec<MutationRecord<NodeId>>,
}

struct Tree {
    html: Html,
    document_element: NodeId,
    body: NodeId,
    observers: Vec<ObserverSlot>,
    next_observer_id: u64,
}

fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|err| DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{err:?}"),
    })
}

/// An HTML element named `tag` carrying `attrs`, in order.
fn html_element<'a>(tag: &str, attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Node {
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from_slice(value),
        })
        .collect();
    let name = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from(tag.to_ascii_lowercase()),
    );
    Node::Element(Element::new(name, attributes))
}

impl Tree {
    fn get(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id)?.value().as_element()
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?
            .parent()
            .filter(|parent| parent.value().is_element())
            .map(|parent| NodeId(parent.id()))
    }

    fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.get(node);
        while let Some(n) = current {
            if n.id() == ancestor.0 {
                return true;
            }
            current = n.parent();
        }
        false
    }

    fn record(&mut self, record: MutationRecord<NodeId>) {
        let target = record.target;
        let interested: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, slot)| self.is_inclusive_descendant(target, slot.root))
            .map(|(idx, _)| idx)
            .collect();
        for idx in interested {
            self.observers[idx].pending.push(record.clone());
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        NodeId(self.html.tree.orphan(node).id())
    }

    /// Rebuild `id`'s element with `edit` applied to its attribute list.
    /// Returns whether the element exists.
    fn edit_attributes(&mut self, id: NodeId, edit: impl FnOnce(&mut Vec<(String, String)>)) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        let tag = element.name().to_string();
        let mut attrs: Vec<(String, String)> = element
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        edit(&mut attrs);
        let rebuilt = html_element(&tag, attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        match self.html.tree.get_mut(id.0) {
            Some(mut node) => {
                *node.value() = rebuilt;
                true
            }
            None => false,
        }
    }

    fn write_attribute(&mut self, id: NodeId, name: &str, value: String) {
        let written = self.edit_attributes(id, |attrs| {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value,
                None => attrs.push((name.to_string(), value)),
            }
        });
        if written {
            self.record(MutationRecord::attribute(id, name));
        }
    }

    fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if self.attribute(id, name).is_none() {
            return;
        }
        if self.edit_attributes(id, |attrs| attrs.retain(|(n, _)| n != name)) {
            self.record(MutationRecord::attribute(id, name));
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.get(child).and_then(|n| n.parent()).map(|p| NodeId(p.id())) else {
            return;
        };
        if let Some(mut node) = self.html.tree.get_mut(child.0) {
            node.detach();
        }
        self.record(MutationRecord::child_list(parent, Vec::new(), vec![child]));
    }

    fn append(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            warn!(?parent, ?child, "refusing to append a node from another document");
            return;
        }
        if self.is_inclusive_descendant(parent, child) {
            warn!(?parent, ?child, "refusing to append a node into its own subtree");
            return;
        }
        self.detach(child);
        if let Some(mut node) = self.html.tree.get_mut(parent.0) {
            node.append_id(child.0);
        }
        self.record(MutationRecord::child_list(parent, vec![child], Vec::new()));
    }

    fn select(
        &self,
        scope: NodeId,
        include_scope: bool,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let selector = parse_selector(selector)?;
        let Some(scope) = self.get(scope) else {
            return Ok(Vec::new());
        };
        Ok(scope
            .descendants()
            .skip(usize::from(!include_scope))
            .filter(|node| ElementRef::wrap(*node).is_some_and(|el| selector.matches(&el)))
            .map(|node| NodeId(node.id()))
            .collect())
    }
}

/// Shared handle to an in-memory document tree.
#[derive(Clone)]
pub struct MemoryDocument {
    tree: Rc<RefCell<Tree>>,
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("MemoryDocument")
            .field("nodes", &tree.html.tree.nodes().count())
            .field("observers", &tree.observers.len())
            .finish()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty `<html><body></body></html>` document.
    #[must_use]
    pub fn new() -> Self {
        let mut html = Html::new_document();
        let document_element = html.tree.root_mut().append(html_element("html", [])).id();
        let body = match html.tree.get_mut(document_element) {
            Some(mut root) => root.append(html_element("body", [])).id(),
            None => html.tree.orphan(html_element("body", [])).id(),
        };
        Self {
            tree: Rc::new(RefCell::new(Tree {
                html,
                document_element: NodeId(document_element),
                body: NodeId(body),
                observers: Vec::new(),
                next_observer_id: 1,
            })),
        }
    }

    #[must_use]
    pub fn document_element(&self) -> NodeId {
        self.tree.borrow().document_element
    }

    #[must_use]
    pub fn body_element(&self) -> NodeId {
        self.tree.borrow().body
    }

    /// Create a detached element carrying `attrs`. No records are queued
    /// until it is inserted.
    pub fn create_element(&self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.tree
            .borrow_mut()
            .push(html_element(tag, attrs.iter().copied()))
    }

    pub fn create_text(&self) -> NodeId {
        self.tree.borrow_mut().push(Node::Text(Text {
            text: StrTendril::new(),
        }))
    }

    /// Insert `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.tree.borrow_mut().append(parent, child);
    }

    /// Create an element and append it to `parent` in one step.
    pub fn append_element(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let child = self.create_element(tag, attrs);
        self.append_child(parent, child);
        child
    }

    /// Detach `node` from its parent.
    pub fn remove(&self, node: NodeId) {
        self.tree.borrow_mut().detach(node);
    }

    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) {
        self.tree
            .borrow_mut()
            .write_attribute(element, name, value.to_string());
    }

    /// Only queues a record if the attribute was present.
    pub fn remove_attribute(&self, element: NodeId, name: &str) {
        self.tree.borrow_mut().remove_attribute(element, name);
    }

    #[must_use]
    pub fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        self.tree
            .borrow()
            .attribute(element, name)
            .map(str::to_string)
    }

    #[must_use]
    pub fn has_class(&self, element: NodeId, class: &str) -> bool {
        self.tree
            .borrow()
            .attribute(element, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Parent element; `None` for detached nodes and `<html>`.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().parent_element(node)
    }

    /// Number of connected subscriptions.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tree.borrow().observers.len()
    }

    /// Records queued across all subscriptions and not yet delivered.
    #[must_use]
    pub fn pending_records(&self) -> usize {
        self.tree
            .borrow()
            .observers
            .iter()
            .map(|slot| slot.pending.len())
            .sum()
    }

    /// Deliver queued batches until no subscription has pending records.
    ///
    /// Callbacks run without any borrow of the tree held, so they may mutate
    /// the document; records they produce are delivered in a later round.
    /// Returns the number of batches delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let ready: Vec<u64> = self
                .tree
                .borrow()
                .observers
                .iter()
                .filter(|slot| !slot.pending.is_empty())
                .map(|slot| slot.id)
                .collect();
            if ready.is_empty() {
                return delivered;
            }
            for id in ready {
                let batch = {
                    let mut tree = self.tree.borrow_mut();
                    tree.observers
                        .iter_mut()
                        .find(|slot| slot.id == id)
                        .map(|slot| (Rc::clone(&slot.callback), std::mem::take(&mut slot.pending)))
                };
                if let Some((callback, records)) = batch {
                    if !records.is_empty() {
                        callback(records.as_slice());
                        delivered += 1;
                    }
                }
            }
        }
        warn!(
            rounds = MAX_FLUSH_ROUNDS,
            pending = self.pending_records(),
            "mutation flush did not settle"
        );
        delivered
    }
}

struct MemoryObservation {
    tree: Weak<RefCell<Tree>>,
    id: u64,
}

impl Observation for MemoryObservation {
    fn disconnect(&self) {
        if let Some(tree) = self.tree.upgrade() {
            tree.borrow_mut().observers.retain(|slot| slot.id != self.id);
        }
    }
}

impl Document for MemoryDocument {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(self.body_element())
    }

    fn is_element(&self, node: &NodeId) -> bool {
        self.tree.borrow().element(*node).is_some()
    }

    fn has_attribute(&self, element: &NodeId, name: &str) -> bool {
        self.tree.borrow().attribute(*element, name).is_some()
    }

    fn query_selector_all(&self, scope: &NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.tree.borrow().select(*scope, false, selector)
    }

    fn query_document(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let tree = self.tree.borrow();
        tree.select(tree.document_element, true, selector)
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.parent(*node)
    }

    fn matches(&self, element: &NodeId, selector: &str) -> Result<bool, DomError> {
        let selector = parse_selector(selector)?;
        let tree = self.tree.borrow();
        Ok(tree
            .get(*element)
            .and_then(ElementRef::wrap)
            .is_some_and(|el| selector.matches(&el)))
    }

    fn add_class(&self, element: &NodeId, class: &str) {
        if self.has_class(*element, class) {
            return;
        }
        let mut tree = self.tree.borrow_mut();
        let value = match tree.attribute(*element, "class") {
            Some(list) if !list.trim().is_empty() => format!("{} {class}", list.trim_end()),
            _ => class.to_string(),
        };
        tree.write_attribute(*element, "class", value);
    }

    fn remove_class(&self, element: &NodeId, class: &str) {
        if !self.has_class(*element, class) {
            return;
        }
        let mut tree = self.tree.borrow_mut();
        let value = tree
            .attribute(*element, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        tree.write_attribute(*element, "class", value);
    }

    fn observe(
        &self,
        root: &NodeId,
        callback: MutationCallback<NodeId>,
    ) -> Result<Box<dyn Observation>, DomError> {
        if !self.is_element(root) {
            return Err(DomError::MissingRoot);
        }
        let mut tree = self.tree.borrow_mut();
        let id = tree.next_observer_id;
        tree.next_observer_id += 1;
        tree.observers.push(ObserverSlot {
            id,
            root: *root,
            callback,
            pending: Vec::new(),
        });
        Ok(Box::new(MemoryObservation {
            tree: Rc::downgrade(&self.tree),
            id,
        }))
    }
}
