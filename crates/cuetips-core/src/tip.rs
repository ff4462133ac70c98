#![forbid(unsafe_code)]

//! Rendering capabilities consumed by the engine, and the removal veto hook.
//!
//! The engine never renders anything. It calls into a [`TipInterface`] at
//! three points of a config's life: when a cue target is found, right before
//! the tip is shown, and to show the tip itself.

use crate::config::CueRef;
use crate::error::{CueTipsError, Result};
use crate::validate::{TipCapabilities, validate_tip_capabilities};

/// Consumer-supplied renderer.
///
/// Methods take `&self` and may call back into the owning
/// [`CueTips`](crate::CueTips) instance (through a
/// [`WeakCueTips`](crate::WeakCueTips)); the engine holds no internal borrow
/// while they run.
pub trait TipInterface<N> {
    /// Show the tip for `config`, anchored at the element that carried its
    /// tip attribute.
    fn show_cue_tip(&self, config: &CueRef, element: &N);

    /// A cue target for `config` was found and decorated.
    fn show_cue_target_tip(&self, config: &CueRef, element: &N) {
        let _ = (config, element);
    }

    /// Called right before [`TipInterface::show_cue_tip`] so any target tip
    /// for `config` can be taken down.
    fn hide_cue_target_tip(&self, config: &CueRef) {
        let _ = config;
    }
}

type ShowFn<N> = Box<dyn Fn(&CueRef, &N)>;
type HideFn = Box<dyn Fn(&CueRef)>;

/// Closure-based tip interface builder.
///
/// ```
/// use cuetips_core::{CueRef, TipCallbacks};
///
/// let tips = TipCallbacks::<u32>::new()
///     .on_show_cue_tip(|config: &CueRef, _el: &u32| println!("tip for {}", config.cue_attr))
///     .build()
///     .expect("showCueTip supplied");
/// # let _ = tips;
/// ```
pub struct TipCallbacks<N> {
    show_cue_tip: Option<ShowFn<N>>,
    show_cue_target_tip: Option<ShowFn<N>>,
    hide_cue_target_tip: Option<HideFn>,
}

impl<N> Default for TipCallbacks<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> TipCallbacks<N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            show_cue_tip: None,
            show_cue_target_tip: None,
            hide_cue_target_tip: None,
        }
    }

    #[must_use]
    pub fn on_show_cue_tip(mut self, f: impl Fn(&CueRef, &N) + 'static) -> Self {
        self.show_cue_tip = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_show_cue_target_tip(mut self, f: impl Fn(&CueRef, &N) + 'static) -> Self {
        self.show_cue_target_tip = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_hide_cue_target_tip(mut self, f: impl Fn(&CueRef) + 'static) -> Self {
        self.hide_cue_target_tip = Some(Box::new(f));
        self
    }

    /// Fill the optional capabilities with no-ops and check that
    /// `showCueTip` was supplied.
    pub fn build(self) -> Result<ClosureTips<N>> {
        validate_tip_capabilities(TipCapabilities::defaulted(self.show_cue_tip.is_some()))?;
        let show_cue_tip = self
            .show_cue_tip
            .ok_or(CueTipsError::MissingCapability("showCueTip"))?;
        Ok(ClosureTips {
            show_cue_tip,
            show_cue_target_tip: self.show_cue_target_tip,
            hide_cue_target_tip: self.hide_cue_target_tip,
        })
    }
}

/// A validated [`TipCallbacks`].
pub struct ClosureTips<N> {
    show_cue_tip: ShowFn<N>,
    show_cue_target_tip: Option<ShowFn<N>>,
    hide_cue_target_tip: Option<HideFn>,
}

impl<N> TipInterface<N> for ClosureTips<N> {
    fn show_cue_tip(&self, config: &CueRef, element: &N) {
        (self.show_cue_tip)(config, element);
    }

    fn show_cue_target_tip(&self, config: &CueRef, element: &N) {
        if let Some(f) = &self.show_cue_target_tip {
            f(config, element);
        }
    }

    fn hide_cue_target_tip(&self, config: &CueRef) {
        if let Some(f) = &self.hide_cue_target_tip {
            f(config);
        }
    }
}

/// Outcome of the `onRemove` hook. Only an explicit `false` vetoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Proceed,
    Veto,
}

impl From<bool> for Removal {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Proceed } else { Self::Veto }
    }
}

impl From<()> for Removal {
    fn from((): ()) -> Self {
        Self::Proceed
    }
}

pub(crate) type OnRemove = Box<dyn Fn(&CueRef) -> Removal>;
