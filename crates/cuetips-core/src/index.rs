#![forbid(unsafe_code)]

//! Attribute index derived from the active configs.
//!
//! The index is always rebuilt from scratch when the config list changes; it
//! is never patched in place.

use crate::config::CueRef;

/// Attribute names in config order: each config contributes `cue_attr`, then
/// `cue_tip_attr` when present. Duplicates across configs are kept.
#[must_use]
pub fn derive_attributes(configs: &[CueRef]) -> Vec<String> {
    let mut attributes = Vec::with_capacity(configs.len() * 2);
    for config in configs {
        attributes.push(config.cue_attr.clone());
        if let Some(tip) = &config.cue_tip_attr {
            attributes.push(tip.clone());
        }
    }
    attributes
}

/// `[a],[b],...`, or the empty string for no attributes.
///
/// Names are not escaped. A name that is not a valid CSS identifier yields a
/// selector the host will reject.
#[must_use]
pub fn build_selector(attributes: &[String]) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    format!("[{}]", attributes.join("],["))
}

/// First config (lowest index) referencing `attribute` through either its
/// cue or its tip attribute.
#[must_use]
pub fn find_config_for_attribute<'a>(configs: &'a [CueRef], attribute: &str) -> Option<&'a CueRef> {
    configs.iter().find(|c| {
        c.cue_attr == attribute || c.cue_tip_attr.as_deref() == Some(attribute)
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeIndex {
    attributes: Vec<String>,
    selector: String,
}

impl AttributeIndex {
    #[must_use]
    pub fn from_configs(configs: &[CueRef]) -> Self {
        let attributes = derive_attributes(configs);
        let selector = build_selector(&attributes);
        Self {
            attributes,
            selector,
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
