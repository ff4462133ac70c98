#![forbid(unsafe_code)]

//! Browser frontend for `cuetips-core`.
//!
//! # Role in cuetips
//! `cuetips-web` connects the host-agnostic engine to a real page:
//! [`WebDocument`] implements [`cuetips_core::dom::Document`] over `web-sys`
//! (`MutationObserver`, `querySelectorAll`, `Element.matches`, `classList`),
//! and the exported `CueTips` class lets JavaScript callers pass plain config
//! objects, a `tipInterface` object and an `onRemove` function.
//!
//! # How it fits in the system
//! Mutation batches arrive as observer microtasks. Each batch is converted
//! to engine records and handed to the instance, which calls back into the
//! JS tip interface with the caller's original config objects.
//!
//! Everything here is compiled only for `wasm32`.

#[cfg(target_arch = "wasm32")]
mod document;
#[cfg(target_arch = "wasm32")]
mod interop;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use document::WebDocument;
#[cfg(target_arch = "wasm32")]
pub use interop::{ConfigTable, JsOnRemove, JsTipInterface};
#[cfg(target_arch = "wasm32")]
pub use wasm::{CueTips, disconnect_all};
