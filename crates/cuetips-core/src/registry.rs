#![forbid(unsafe_code)]

//! Process-wide registry of live mutation subscriptions.
//!
//! Every instance that is watching the document registers its subscription
//! here and removes it on disconnect. Matching never consults the registry;
//! it exists so harnesses and page-unload hooks can inspect or tear down all
//! subscriptions at once. The engine is single-threaded, so the registry is
//! thread-local.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::dom::Observation;

/// Registry-assigned identifier of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A host observation plus its registry identity.
pub struct Subscription {
    id: SubscriptionId,
    handle: RefCell<Option<Box<dyn Observation>>>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.borrow().is_some()
    }

    /// Disconnect the host observation. Returns `false` if it was already
    /// disconnected.
    fn close(&self) -> bool {
        let handle = self.handle.borrow_mut().take();
        match handle {
            Some(handle) => {
                handle.disconnect();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

thread_local! {
    static LIVE: RefCell<Vec<Rc<Subscription>>> = const { RefCell::new(Vec::new()) };
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Wrap a freshly armed host observation and record it as live.
pub(crate) fn register(handle: Box<dyn Observation>) -> Rc<Subscription> {
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        SubscriptionId(id)
    });
    let subscription = Rc::new(Subscription {
        id,
        handle: RefCell::new(Some(handle)),
    });
    LIVE.with(|live| live.borrow_mut().push(Rc::clone(&subscription)));
    debug!(subscription = id.0, "registered mutation subscription");
    subscription
}

/// Disconnect `subscription` and drop it from the registry. Idempotent.
pub fn disconnect(subscription: &Subscription) {
    let closed = subscription.close();
    LIVE.with(|live| live.borrow_mut().retain(|s| s.id != subscription.id));
    if closed {
        debug!(subscription = subscription.id.0, "disconnected mutation subscription");
    }
}

/// Identifiers of every live subscription, oldest first.
#[must_use]
pub fn live_subscriptions() -> Vec<SubscriptionId> {
    LIVE.with(|live| live.borrow().iter().map(|s| s.id).collect())
}

#[must_use]
pub fn live_count() -> usize {
    LIVE.with(|live| live.borrow().len())
}

/// Disconnect every live subscription. Instances torn down this way re-arm
/// on their next `add`. Returns how many were disconnected.
pub fn disconnect_all() -> usize {
    let live = LIVE.with(|live| std::mem::take(&mut *live.borrow_mut()));
    let count = live.len();
    for subscription in &live {
        subscription.close();
    }
    if count > 0 {
        debug!(count, "disconnected all mutation subscriptions");
    }
    count
}
