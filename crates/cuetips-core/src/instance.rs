#![forbid(unsafe_code)]

//! The caller-facing instance: `add`, `remove`, `stop`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::CueRef;
use crate::dom::Document;
use crate::error::{CueTipsError, Result};
use crate::index::{AttributeIndex, find_config_for_attribute};
use crate::options::CueTipsOptions;
use crate::registry::{Subscription, SubscriptionId};
use crate::tip::{OnRemove, Removal, TipInterface};
use crate::validate::validate_configs;
use crate::{lifecycle, matcher};

/// Mutable per-instance state. Never borrowed across a consumer callback.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) configs: Vec<CueRef>,
    pub(crate) index: AttributeIndex,
    pub(crate) subscription: Option<Rc<Subscription>>,
}

impl State {
    pub(crate) fn position(&self, config: &CueRef) -> Option<usize> {
        self.configs.iter().position(|c| c == config)
    }

    pub(crate) fn find(&self, attribute: &str) -> Option<CueRef> {
        find_config_for_attribute(&self.configs, attribute).cloned()
    }

    pub(crate) fn reindex(&mut self) {
        self.index = AttributeIndex::from_configs(&self.configs);
    }

    pub(crate) fn is_watching(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_connected())
    }
}

pub(crate) struct Inner<D: Document> {
    pub(crate) document: D,
    pub(crate) options: CueTipsOptions,
    pub(crate) tips: Box<dyn TipInterface<D::Node>>,
    pub(crate) on_remove: Option<OnRemove>,
    pub(crate) state: RefCell<State>,
}

impl<D: Document> Drop for Inner<D> {
    fn drop(&mut self) {
        if let Some(subscription) = self.state.get_mut().subscription.take() {
            crate::registry::disconnect(&subscription);
        }
    }
}

/// Configures and creates a [`CueTips`] instance.
pub struct CueTipsBuilder<D: Document> {
    document: D,
    options: CueTipsOptions,
    tips: Option<Box<dyn TipInterface<D::Node>>>,
    on_remove: Option<OnRemove>,
}

impl<D: Document> CueTipsBuilder<D> {
    #[must_use]
    pub fn options(mut self, options: CueTipsOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn tip_interface(mut self, tips: impl TipInterface<D::Node> + 'static) -> Self {
        self.tips = Some(Box::new(tips));
        self
    }

    /// Hook run before a config is dropped. Returning `false` keeps the
    /// config active; returning `true` or `()` lets the removal proceed.
    #[must_use]
    pub fn on_remove<F, R>(mut self, hook: F) -> Self
    where
        F: Fn(&CueRef) -> R + 'static,
        R: Into<Removal>,
    {
        self.on_remove = Some(Box::new(move |config| hook(config).into()));
        self
    }

    /// Validate everything, then scan the document and start watching if any
    /// attribute is tracked.
    ///
    /// The list is copied; a config handle listed twice is kept once.
    pub fn build(self, configs: impl IntoIterator<Item = CueRef>) -> Result<CueTips<D>> {
        let mut unique: Vec<CueRef> = Vec::new();
        for config in configs {
            if !unique.contains(&config) {
                unique.push(config);
            }
        }
        validate_configs(&unique)?;
        let tips = self.tips.ok_or(CueTipsError::InvalidTipInterface)?;
        let options = self.options.checked()?;

        let mut state = State {
            configs: unique,
            ..State::default()
        };
        state.reindex();
        let inner = Rc::new(Inner {
            document: self.document,
            options,
            tips,
            on_remove: self.on_remove,
            state: RefCell::new(state),
        });
        debug!(
            configs = inner.state.borrow().configs.len(),
            "creating cue-tips instance"
        );

        if let Err(err) = lifecycle::start(&inner) {
            lifecycle::stop(&inner);
            return Err(err);
        }
        Ok(CueTips { inner })
    }
}

/// Shortcut for `CueTips::builder(document).tip_interface(tips).build(configs)`.
pub fn create<D, T>(
    document: D,
    configs: impl IntoIterator<Item = CueRef>,
    tips: T,
) -> Result<CueTips<D>>
where
    D: Document,
    T: TipInterface<D::Node> + 'static,
{
    CueTips::builder(document).tip_interface(tips).build(configs)
}

/// Handle to a running instance. Clones share the same instance; dropping
/// the last strong handle disconnects its subscription.
pub struct CueTips<D: Document> {
    inner: Rc<Inner<D>>,
}

impl<D: Document> Clone for CueTips<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Document> fmt::Debug for CueTips<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CueTips")
            .field("configs", &state.configs)
            .field("attributes", &state.index.attributes())
            .field("watching", &state.is_watching())
            .finish()
    }
}

impl<D: Document> CueTips<D> {
    #[must_use]
    pub fn builder(document: D) -> CueTipsBuilder<D> {
        CueTipsBuilder {
            document,
            options: CueTipsOptions::default(),
            tips: None,
            on_remove: None,
        }
    }

    /// Register another config.
    ///
    /// A handle that is already active is ignored. If the instance is not
    /// watching (it was empty or stopped), it is re-armed with a fresh scan
    /// and subscription; otherwise the root is rescanned, since an existing
    /// subscription never reports elements that are already present.
    ///
    /// Scan errors are returned after the config has been registered and the
    /// instance re-armed.
    pub fn add(&self, config: CueRef) -> Result<()> {
        validate_configs(std::slice::from_ref(&config))?;
        let was_watching = {
            let mut state = self.inner.state.borrow_mut();
            if state.position(&config).is_some() {
                return Ok(());
            }
            debug!(cue_attr = %config.cue_attr, "adding cue config");
            state.configs.push(config);
            state.reindex();
            state.is_watching()
        };
        if was_watching {
            lifecycle::rescan(&self.inner)
        } else {
            lifecycle::start(&self.inner)
        }
    }

    /// Retire `config` now, subject to the `onRemove` hook. Absent configs
    /// are ignored.
    pub fn remove(&self, config: &CueRef) {
        matcher::retire(&self.inner, config);
    }

    /// Stop watching. Batches already being processed run to completion.
    pub fn stop(&self) {
        lifecycle::stop(&self.inner);
    }

    #[must_use]
    pub fn active_configs(&self) -> Vec<CueRef> {
        self.inner.state.borrow().configs.clone()
    }

    #[must_use]
    pub fn attributes(&self) -> Vec<String> {
        self.inner.state.borrow().index.attributes().to_vec()
    }

    /// The combined attribute selector, empty when nothing is tracked.
    #[must_use]
    pub fn selector(&self) -> String {
        self.inner.state.borrow().index.selector().to_string()
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.inner.state.borrow().is_watching()
    }

    #[must_use]
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        let state = self.inner.state.borrow();
        state
            .subscription
            .as_ref()
            .filter(|s| s.is_connected())
            .map(|s| s.id())
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.inner.document
    }

    #[must_use]
    pub fn options(&self) -> &CueTipsOptions {
        &self.inner.options
    }

    /// A handle that does not keep the instance alive, for use inside tip
    /// callbacks and the `onRemove` hook.
    #[must_use]
    pub fn downgrade(&self) -> WeakCueTips<D> {
        WeakCueTips {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Non-owning handle to a [`CueTips`] instance.
pub struct WeakCueTips<D: Document> {
    inner: Weak<Inner<D>>,
}

impl<D: Document> Clone for WeakCueTips<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<D: Document> Default for WeakCueTips<D> {
    fn default() -> Self {
        Self { inner: Weak::new() }
    }
}

impl<D: Document> WeakCueTips<D> {
    #[must_use]
    pub fn upgrade(&self) -> Option<CueTips<D>> {
        self.inner.upgrade().map(|inner| CueTips { inner })
    }
}
