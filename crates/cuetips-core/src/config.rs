#![forbid(unsafe_code)]

//! Cue configuration records and their shared, identity-compared handle.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CueTipsError, Result};
use crate::validate::validate_config_list;

/// One cue rule.
///
/// Field names serialize as `cueAttr`, `cueTipAttr`, `cueParentSelector`,
/// `cueTipParentSelector` and `cueClass`. Any other JSON fields are kept in
/// [`CueConfig::payload`] and handed back to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueConfig {
    /// Presence of this attribute marks an element as a cue target.
    pub cue_attr: String,
    /// Presence of this attribute on any element shows the tip and retires
    /// the config. Without it, showing the cue retires the config.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub cue_tip_attr: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub cue_parent_selector: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub cue_tip_parent_selector: Option<String>,
    /// Apply the marker class to cue targets. Only a literal `false` in JSON
    /// turns this off.
    #[serde(default = "default_cue_class", deserialize_with = "cue_class_flag")]
    pub cue_class: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

fn default_cue_class() -> bool {
    true
}

fn cue_class_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(!matches!(Value::deserialize(deserializer)?, Value::Bool(false)))
}

fn non_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

impl CueConfig {
    #[must_use]
    pub fn new(cue_attr: impl Into<String>) -> Self {
        Self {
            cue_attr: cue_attr.into(),
            cue_tip_attr: None,
            cue_parent_selector: None,
            cue_tip_parent_selector: None,
            cue_class: true,
            payload: Map::new(),
        }
    }

    #[must_use]
    pub fn with_tip_attr(mut self, attr: impl Into<String>) -> Self {
        self.cue_tip_attr = Some(attr.into());
        self
    }

    #[must_use]
    pub fn with_parent_selector(mut self, selector: impl Into<String>) -> Self {
        self.cue_parent_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_tip_parent_selector(mut self, selector: impl Into<String>) -> Self {
        self.cue_tip_parent_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn without_cue_class(mut self) -> Self {
        self.cue_class = false;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Selector for every element currently cued by this config.
    #[must_use]
    pub fn cue_target_selector(&self) -> String {
        format!(
            "{} [{}]",
            self.cue_parent_selector.as_deref().unwrap_or(""),
            self.cue_attr
        )
        .trim()
        .to_string()
    }

    #[must_use]
    pub fn into_ref(self) -> CueRef {
        CueRef::new(self)
    }
}

/// Shared handle to a [`CueConfig`].
///
/// Equality is pointer identity: two handles are equal only if they were
/// cloned from the same [`CueRef::new`] call, whatever their contents.
#[derive(Clone)]
pub struct CueRef(Rc<CueConfig>);

impl CueRef {
    #[must_use]
    pub fn new(config: CueConfig) -> Self {
        Self(Rc::new(config))
    }

    #[must_use]
    pub fn config(&self) -> &CueConfig {
        &self.0
    }
}

impl Deref for CueRef {
    type Target = CueConfig;

    fn deref(&self) -> &CueConfig {
        &self.0
    }
}

impl PartialEq for CueRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CueRef {}

impl fmt::Debug for CueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CueRef")
            .field(&Rc::as_ptr(&self.0))
            .field(&self.0.cue_attr)
            .finish()
    }
}

impl From<CueConfig> for CueRef {
    fn from(config: CueConfig) -> Self {
        Self::new(config)
    }
}

/// Parse a JSON array of cue configs. The list shape is validated before any
/// entry is deserialized.
pub fn cue_configs_from_json(input: &str) -> Result<Vec<CueRef>> {
    let value: Value = serde_json::from_str(input).map_err(|_| CueTipsError::InvalidConfigList)?;
    cue_configs_from_value(value)
}

pub fn cue_configs_from_value(value: Value) -> Result<Vec<CueRef>> {
    validate_config_list(&value)?;
    let Value::Array(items) = value else {
        return Err(CueTipsError::InvalidConfigList);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<CueConfig>(item)
                .map(CueRef::new)
                .map_err(|_| CueTipsError::InvalidConfigEntry { index })
        })
        .collect()
}
