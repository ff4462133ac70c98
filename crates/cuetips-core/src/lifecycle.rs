#![forbid(unsafe_code)]

//! Observation lifecycle: one subscription per instance, armed while there
//! is at least one tracked attribute.
//!
//! ```text
//! Unwatched --(build with configs | add while unwatched)--> Watching
//! Watching  --(last config retired | stop)----------------> Unwatched
//! ```

use std::rc::Rc;

use tracing::{debug, error};

use crate::dom::{Document, DomError, MutationCallback, MutationRecord};
use crate::error::Result;
use crate::instance::Inner;
use crate::{matcher, registry};

/// The element scanned and observed: `root_selector`'s first match, or the
/// document body.
fn resolve_root<D: Document>(inner: &Inner<D>) -> Result<D::Node> {
    let root = match &inner.options.root_selector {
        Some(selector) => inner.document.query_document(selector)?.into_iter().next(),
        None => inner.document.body(),
    };
    Ok(root.ok_or(DomError::MissingRoot)?)
}

/// Scan the root for elements that already carry tracked attributes, then
/// subscribe to future mutations.
///
/// A subscription never reports pre-existing state, hence the scan. The scan
/// may retire every config, in which case nothing is subscribed. A scan
/// error still leaves the instance armed and is returned afterwards.
pub(crate) fn start<D: Document>(inner: &Rc<Inner<D>>) -> Result<()> {
    if inner.state.borrow().index.is_empty() {
        return Ok(());
    }
    let root = resolve_root(inner)?;
    let scan = matcher::scan_subtree_for_matches(inner, &root);

    let needs_subscription = {
        let state = inner.state.borrow();
        !state.index.is_empty() && !state.is_watching()
    };
    if needs_subscription {
        subscribe(inner, &root)?;
    }
    scan
}

fn subscribe<D: Document>(inner: &Rc<Inner<D>>, root: &D::Node) -> Result<()> {
    let weak = Rc::downgrade(inner);
    let callback: MutationCallback<D::Node> = Rc::new(move |records: &[MutationRecord<D::Node>]| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if let Err(err) = matcher::on_mutation_batch(&inner, records) {
            error!(%err, records = records.len(), "cue-tips mutation batch aborted");
        }
    });
    let handle = inner.document.observe(root, callback)?;
    let subscription = registry::register(handle);
    debug!(subscription = subscription.id().get(), "watching for cue attributes");
    let stale = inner.state.borrow_mut().subscription.replace(subscription);
    if let Some(stale) = stale {
        registry::disconnect(&stale);
    }
    Ok(())
}

/// Rescan the root without touching the subscription.
pub(crate) fn rescan<D: Document>(inner: &Inner<D>) -> Result<()> {
    let root = resolve_root(inner)?;
    matcher::scan_subtree_for_matches(inner, &root)
}

/// Disconnect and forget the subscription. Idempotent.
pub(crate) fn stop<D: Document>(inner: &Inner<D>) {
    let subscription = inner.state.borrow_mut().subscription.take();
    if let Some(subscription) = subscription {
        registry::disconnect(&subscription);
        debug!(subscription = subscription.id().get(), "stopped watching");
    }
}

/// Stop once no config is left to watch for.
pub(crate) fn stop_if_idle<D: Document>(inner: &Inner<D>) {
    let idle = inner.state.borrow().configs.is_empty();
    if idle {
        stop(inner);
    }
}
