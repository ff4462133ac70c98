#![forbid(unsafe_code)]

//! Attribute-driven cue and tip sequencing over an observed document.
//!
//! # Role in cuetips
//! `cuetips-core` is the host-agnostic engine. A consumer registers
//! [`CueConfig`] rules ("decorate elements carrying `cueAttr`; when an element
//! carrying `cueTipAttr` appears, show the tip and retire the rule") and a
//! [`TipInterface`] that does the actual rendering. The engine scans the
//! document once, then follows mutation batches delivered by the host.
//!
//! # Primary responsibilities
//! - **Validation**: config lists and tip interfaces are checked before
//!   anything is registered ([`validate`]).
//! - **Attribute index**: the tracked attribute names and one combined
//!   selector, rebuilt whenever the config list changes ([`index`]).
//! - **Matching**: inserted subtrees and changed attributes are matched
//!   against configs, first declared wins.
//! - **Lifecycle**: one subscription per instance while anything is tracked,
//!   recorded in a thread-local [`registry`].
//!
//! # Host boundary
//! The [`dom::Document`] trait is everything the engine needs from a DOM.
//! `cuetips-web` implements it over `web-sys`; [`dom::memory::MemoryDocument`]
//! is a deterministic in-memory host whose mutation queue is flushed
//! explicitly.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use cuetips_core::dom::memory::{MemoryDocument, NodeId};
//! use cuetips_core::{CueConfig, CueTips, TipCallbacks};
//!
//! let doc = MemoryDocument::new();
//! let shown = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&shown);
//! let tips = TipCallbacks::<NodeId>::new()
//!     .on_show_cue_tip(move |_, _| counter.set(counter.get() + 1))
//!     .build()?;
//! let cue = CueConfig::new("data-cue").with_tip_attr("data-cue-tip").into_ref();
//! let cues = CueTips::builder(doc.clone()).tip_interface(tips).build([cue])?;
//!
//! doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
//! doc.append_element(doc.body_element(), "div", &[("data-cue-tip", "")]);
//! doc.flush();
//!
//! assert_eq!(shown.get(), 1);
//! assert!(cues.active_configs().is_empty());
//! assert!(!cues.is_watching());
//! # Ok::<(), cuetips_core::CueTipsError>(())
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod index;
pub mod options;
pub mod registry;
pub mod tip;
pub mod validate;

mod instance;
mod lifecycle;
mod matcher;

pub use config::{CueConfig, CueRef, cue_configs_from_json, cue_configs_from_value};
pub use error::{CueTipsError, Result};
pub use instance::{CueTips, CueTipsBuilder, WeakCueTips, create};
pub use options::{CueTipsOptions, DEFAULT_CUE_CLASS};
pub use tip::{ClosureTips, Removal, TipCallbacks, TipInterface};
