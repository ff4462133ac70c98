#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use cuetips_core::dom::memory::{MemoryDocument, NodeId};
use cuetips_core::{CueRef, TipInterface, WeakCueTips};

/// One call into the tip interface, labelled by the config's `cue_attr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipEvent {
    TargetTip(String, NodeId),
    HideTargetTip(String),
    Tip(String, NodeId),
}

pub fn target_tip(attr: &str, el: NodeId) -> TipEvent {
    TipEvent::TargetTip(attr.to_string(), el)
}

pub fn hide_target_tip(attr: &str) -> TipEvent {
    TipEvent::HideTargetTip(attr.to_string())
}

pub fn tip(attr: &str, el: NodeId) -> TipEvent {
    TipEvent::Tip(attr.to_string(), el)
}

type Hook = Box<dyn Fn(&CueRef, &NodeId)>;

/// Tip interface recording every call. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingTips {
    events: Rc<RefCell<Vec<TipEvent>>>,
    on_target_tip: Rc<RefCell<Option<Hook>>>,
}

impl RecordingTips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TipEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, wanted: &TipEvent) -> usize {
        self.events.borrow().iter().filter(|e| *e == wanted).count()
    }

    /// Run `hook` after recording every `show_cue_target_tip` call.
    pub fn set_target_tip_hook(&self, hook: impl Fn(&CueRef, &NodeId) + 'static) {
        *self.on_target_tip.borrow_mut() = Some(Box::new(hook));
    }
}

impl TipInterface<NodeId> for RecordingTips {
    fn show_cue_tip(&self, config: &CueRef, element: &NodeId) {
        self.events
            .borrow_mut()
            .push(TipEvent::Tip(config.cue_attr.clone(), *element));
    }

    fn show_cue_target_tip(&self, config: &CueRef, element: &NodeId) {
        self.events
            .borrow_mut()
            .push(TipEvent::TargetTip(config.cue_attr.clone(), *element));
        if let Some(hook) = self.on_target_tip.borrow().as_ref() {
            hook(config, element);
        }
    }

    fn hide_cue_target_tip(&self, config: &CueRef) {
        self.events
            .borrow_mut()
            .push(TipEvent::HideTargetTip(config.cue_attr.clone()));
    }
}

/// Slot for a weak instance handle, filled after the instance is built so
/// callbacks created earlier can reach it.
pub type HandleSlot = Rc<RefCell<WeakCueTips<MemoryDocument>>>;

pub fn handle_slot() -> HandleSlot {
    Rc::new(RefCell::new(WeakCueTips::default()))
}
