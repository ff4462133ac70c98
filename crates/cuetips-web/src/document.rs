#![forbid(unsafe_code)]

//! `Document` over the browser DOM.

use cuetips_core::dom::{
    Document, DomError, MutationCallback, MutationKind, MutationRecord, Observation,
};
use js_sys::Array;
use tracing::{trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, Node, NodeList};

/// A browser document.
#[derive(Debug, Clone)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    #[must_use]
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The document of the current window, if there is one.
    #[must_use]
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    #[must_use]
    pub fn inner(&self) -> &web_sys::Document {
        &self.document
    }
}

/// Readable message for a thrown JS value.
pub(crate) fn describe_js_error(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn invalid_selector(selector: &str, err: &JsValue) -> DomError {
    DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: describe_js_error(err),
    }
}

fn collect_nodes(list: &NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|idx| list.item(idx)).collect()
}

/// Observer records the engine understands. `characterData` and anything
/// else is dropped.
fn convert_record(record: &web_sys::MutationRecord) -> Option<MutationRecord<Node>> {
    let target = record.target()?;
    let kind = match record.type_().as_str() {
        "childList" => MutationKind::ChildList {
            added: collect_nodes(&record.added_nodes()),
            removed: collect_nodes(&record.removed_nodes()),
        },
        "attributes" => MutationKind::Attributes {
            name: record.attribute_name()?,
        },
        _ => return None,
    };
    Some(MutationRecord { target, kind })
}

/// A connected `MutationObserver` and the closure it calls.
struct WebObservation {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl Observation for WebObservation {
    fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Document for WebDocument {
    type Node = Node;

    fn body(&self) -> Option<Node> {
        self.document.body().map(Node::from)
    }

    fn is_element(&self, node: &Node) -> bool {
        node.node_type() == Node::ELEMENT_NODE
    }

    fn has_attribute(&self, element: &Node, name: &str) -> bool {
        element
            .dyn_ref::<Element>()
            .is_some_and(|el| el.has_attribute(name))
    }

    fn query_selector_all(&self, scope: &Node, selector: &str) -> Result<Vec<Node>, DomError> {
        let Some(scope) = scope.dyn_ref::<Element>() else {
            return Ok(Vec::new());
        };
        let list = scope
            .query_selector_all(selector)
            .map_err(|err| invalid_selector(selector, &err))?;
        Ok(collect_nodes(&list))
    }

    fn query_document(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|err| invalid_selector(selector, &err))?;
        Ok(collect_nodes(&list))
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn matches(&self, element: &Node, selector: &str) -> Result<bool, DomError> {
        match element.dyn_ref::<Element>() {
            Some(el) => el
                .matches(selector)
                .map_err(|err| invalid_selector(selector, &err)),
            None => Ok(false),
        }
    }

    fn add_class(&self, element: &Node, class: &str) {
        if let Some(el) = element.dyn_ref::<Element>() {
            if let Err(err) = el.class_list().add_1(class) {
                warn!(class, error = %describe_js_error(&err), "classList.add failed");
            }
        }
    }

    fn remove_class(&self, element: &Node, class: &str) {
        if let Some(el) = element.dyn_ref::<Element>() {
            if let Err(err) = el.class_list().remove_1(class) {
                warn!(class, error = %describe_js_error(&err), "classList.remove failed");
            }
        }
    }

    fn observe(
        &self,
        root: &Node,
        callback: MutationCallback<Node>,
    ) -> Result<Box<dyn Observation>, DomError> {
        let closure = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |records: Array, _observer: MutationObserver| {
                let batch: Vec<MutationRecord<Node>> = records
                    .iter()
                    .filter_map(|value| value.dyn_into::<web_sys::MutationRecord>().ok())
                    .filter_map(|record| convert_record(&record))
                    .collect();
                trace!(records = batch.len(), "mutation observer batch");
                if !batch.is_empty() {
                    callback(batch.as_slice());
                }
            },
        );
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())
            .map_err(|err| DomError::Subscription(describe_js_error(&err)))?;

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_attributes(true);
        observer
            .observe_with_options(root, &init)
            .map_err(|err| DomError::Subscription(describe_js_error(&err)))?;

        Ok(Box::new(WebObservation {
            observer,
            _callback: closure,
        }))
    }
}
