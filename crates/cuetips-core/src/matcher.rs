#![forbid(unsafe_code)]

//! Matching elements against active configs and retiring configs.
//!
//! Every function here re-reads instance state after each consumer callback.
//! Callbacks may add or remove configs (including the one being matched) or
//! stop the instance, so no index or config list is cached across them.

use tracing::{debug, trace};

use crate::config::CueRef;
use crate::dom::{Document, MutationRecord};
use crate::error::{CueTipsError, Result};
use crate::instance::Inner;
use crate::lifecycle;
use crate::tip::Removal;

/// Process one batch of mutation records.
///
/// Insertions trigger a full scan of each inserted subtree, since inserted
/// descendants may already carry tracked attributes. Attribute records only
/// check the changed attribute on the record's target.
pub(crate) fn on_mutation_batch<D: Document>(
    inner: &Inner<D>,
    records: &[MutationRecord<D::Node>],
) -> Result<()> {
    for record in records {
        let added = record.added_nodes();
        if !added.is_empty() {
            for node in added {
                scan_subtree_for_matches(inner, node)?;
            }
        } else if let Some(name) = record.attribute_name() {
            let tracked = inner.state.borrow().index.contains(name);
            if tracked {
                check_attributes(inner, &record.target, Some(&[name.to_string()]))?;
            }
        }
    }
    Ok(())
}

/// Check `root` itself, then every descendant matched by the combined
/// selector. A descendant query never returns its scope, hence the two steps.
pub(crate) fn scan_subtree_for_matches<D: Document>(inner: &Inner<D>, root: &D::Node) -> Result<()> {
    if !inner.document.is_element(root) {
        return Ok(());
    }
    check_attributes(inner, root, None)?;

    // Empty once the root check retired the last config.
    let selector = inner.state.borrow().index.selector().to_string();
    if selector.is_empty() {
        return Ok(());
    }
    for descendant in inner.document.query_selector_all(root, &selector)? {
        check_attributes(inner, &descendant, None)?;
    }
    Ok(())
}

/// Dispatch every attribute in `names` (or every tracked attribute) that
/// `element` carries. The name list is snapshotted before the first dispatch.
pub(crate) fn check_attributes<D: Document>(
    inner: &Inner<D>,
    element: &D::Node,
    names: Option<&[String]>,
) -> Result<()> {
    let names = match names {
        Some(names) => names.to_vec(),
        None => inner.state.borrow().index.attributes().to_vec(),
    };
    for name in &names {
        if inner.document.has_attribute(element, name) {
            dispatch_match(inner, name, element)?;
        }
    }
    Ok(())
}

/// Route an attribute hit to the first config referencing it.
pub(crate) fn dispatch_match<D: Document>(
    inner: &Inner<D>,
    attribute: &str,
    element: &D::Node,
) -> Result<()> {
    let Some(config) = inner.state.borrow().find(attribute) else {
        trace!(attribute, "no active config for attribute");
        return Ok(());
    };
    trace!(attribute, cue_attr = %config.cue_attr, ?element, "dispatching match");
    if config.cue_attr == attribute {
        apply_cue(inner, &config, element)
    } else if config.cue_tip_attr.as_deref() == Some(attribute) {
        show_tip(inner, &config, element)
    } else {
        Err(CueTipsError::InvalidCueConfigForAttribute(attribute.to_string()))
    }
}

fn apply_cue<D: Document>(inner: &Inner<D>, config: &CueRef, element: &D::Node) -> Result<()> {
    if let Some(parent) = &config.cue_parent_selector {
        if !inner.document.has_ancestor_matching(element, parent)? {
            return Ok(());
        }
    }
    if config.cue_class {
        inner.document.add_class(element, &inner.options.cue_class);
    }
    inner.tips.show_cue_target_tip(config, element);
    if config.cue_tip_attr.is_none() {
        retire(inner, config);
    }
    Ok(())
}

/// Hide any target tip, show the tip, retire, then strip the marker class
/// from the cue targets that were present before the tip was shown.
fn show_tip<D: Document>(inner: &Inner<D>, config: &CueRef, element: &D::Node) -> Result<()> {
    if let Some(parent) = &config.cue_tip_parent_selector {
        if !inner.document.has_ancestor_matching(element, parent)? {
            return Ok(());
        }
    }
    let cue_targets = inner.document.query_document(&config.cue_target_selector())?;
    inner.tips.hide_cue_target_tip(config);
    inner.tips.show_cue_tip(config, element);
    retire(inner, config);
    for target in &cue_targets {
        inner.document.remove_class(target, &inner.options.cue_class);
    }
    Ok(())
}

/// Drop `config` from the active set unless the `onRemove` hook vetoes, then
/// stop watching if nothing is left. Absent configs are ignored.
pub(crate) fn retire<D: Document>(inner: &Inner<D>, config: &CueRef) {
    let present = inner.state.borrow().position(config).is_some();
    if present {
        let verdict = match &inner.on_remove {
            Some(hook) => hook(config),
            None => Removal::Proceed,
        };
        match verdict {
            Removal::Proceed => {
                let mut state = inner.state.borrow_mut();
                // The hook may have changed the list.
                if let Some(idx) = state.position(config) {
                    state.configs.remove(idx);
                    state.reindex();
                    debug!(cue_attr = %config.cue_attr, remaining = state.configs.len(), "retired cue config");
                }
            }
            Removal::Veto => debug!(cue_attr = %config.cue_attr, "cue config removal vetoed"),
        }
    }
    lifecycle::stop_if_idle(inner);
}
