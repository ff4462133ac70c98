#![forbid(unsafe_code)]

//! Host document boundary.
//!
//! The engine never touches a concrete DOM. Everything it needs from the host
//! is expressed by the [`Document`] trait: attribute presence, selector
//! queries, ancestor walks, a marker class, and a subtree mutation
//! subscription. The browser implementation lives in `cuetips-web`;
//! [`memory::MemoryDocument`] is a deterministic in-process host.

#[cfg(feature = "memory")]
pub mod memory;

use std::fmt;
use std::rc::Rc;

/// Errors reported by a [`Document`] host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The host refused to parse a selector.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// No element was found to attach the mutation subscription to.
    #[error("observation root not found")]
    MissingRoot,
    /// The host failed to create or arm a mutation subscription.
    #[error("mutation subscription failed: {0}")]
    Subscription(String),
}

/// What changed in a single mutation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind<N> {
    /// Children were inserted under and/or removed from the target.
    ChildList { added: Vec<N>, removed: Vec<N> },
    /// An attribute on the target was set, changed or removed.
    Attributes { name: String },
}

/// One mutation record delivered in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub target: N,
    pub kind: MutationKind<N>,
}

impl<N> MutationRecord<N> {
    #[must_use]
    pub fn child_list(target: N, added: Vec<N>, removed: Vec<N>) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList { added, removed },
        }
    }

    #[must_use]
    pub fn attribute(target: N, name: impl Into<String>) -> Self {
        Self {
            target,
            kind: MutationKind::Attributes { name: name.into() },
        }
    }

    /// Nodes inserted by this record, empty for attribute records.
    #[must_use]
    pub fn added_nodes(&self) -> &[N] {
        match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            MutationKind::Attributes { .. } => &[],
        }
    }

    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            MutationKind::Attributes { name } => Some(name),
            MutationKind::ChildList { .. } => None,
        }
    }
}

/// Callback invoked by the host with each batch of mutation records.
pub type MutationCallback<N> = Rc<dyn Fn(&[MutationRecord<N>])>;

/// A live host subscription. Dropping it does not disconnect; callers must
/// call [`Observation::disconnect`].
pub trait Observation {
    /// Stop delivering batches. Pending, undelivered records are discarded.
    fn disconnect(&self);
}

/// Capability set the engine consumes from the host document.
///
/// Selector strings are passed through verbatim. Hosts report malformed
/// selectors as [`DomError::InvalidSelector`] rather than panicking.
pub trait Document: 'static {
    /// Opaque node handle. Equality must be node identity.
    type Node: Clone + PartialEq + fmt::Debug + 'static;

    /// The default observation root (the document body).
    fn body(&self) -> Option<Self::Node>;

    fn is_element(&self, node: &Self::Node) -> bool;

    fn has_attribute(&self, element: &Self::Node, name: &str) -> bool;

    /// Descendants of `scope` (excluding `scope`) matching `selector`, in
    /// document order.
    fn query_selector_all(
        &self,
        scope: &Self::Node,
        selector: &str,
    ) -> Result<Vec<Self::Node>, DomError>;

    /// Every element in the document matching `selector`, in document order.
    fn query_document(&self, selector: &str) -> Result<Vec<Self::Node>, DomError>;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    fn matches(&self, element: &Self::Node, selector: &str) -> Result<bool, DomError>;

    fn add_class(&self, element: &Self::Node, class: &str);

    fn remove_class(&self, element: &Self::Node, class: &str);

    /// Subscribe to child-list and attribute mutations anywhere in the
    /// subtree rooted at `root`.
    fn observe(
        &self,
        root: &Self::Node,
        callback: MutationCallback<Self::Node>,
    ) -> Result<Box<dyn Observation>, DomError>;

    /// Whether any proper ancestor of `element` matches `selector`.
    fn has_ancestor_matching(&self, element: &Self::Node, selector: &str) -> Result<bool, DomError> {
        let mut current = self.parent_element(element);
        while let Some(parent) = current {
            if self.matches(&parent, selector)? {
                return Ok(true);
            }
            current = self.parent_element(&parent);
        }
        Ok(false)
    }
}
