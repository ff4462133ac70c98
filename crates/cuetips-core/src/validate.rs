#![forbid(unsafe_code)]

//! Shape checks run before anything is registered. All functions here are
//! side-effect free.

use serde_json::Value;

use crate::config::CueRef;
use crate::error::{CueTipsError, Result};

/// Check an untyped config list: it must be an array whose entries are
/// objects carrying a non-empty string `cueAttr`. Entries are checked in
/// order and the first bad entry decides the error.
pub fn validate_config_list(list: &Value) -> Result<()> {
    let Value::Array(items) = list else {
        return Err(CueTipsError::InvalidConfigList);
    };
    for (index, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(CueTipsError::InvalidConfigList);
        };
        match fields.get("cueAttr") {
            Some(Value::String(attr)) if !attr.is_empty() => {}
            _ => return Err(CueTipsError::InvalidConfigEntry { index }),
        }
    }
    Ok(())
}

/// Check typed configs: every `cue_attr` must be non-empty.
pub fn validate_configs(configs: &[CueRef]) -> Result<()> {
    match configs.iter().position(|c| c.cue_attr.is_empty()) {
        Some(index) => Err(CueTipsError::InvalidConfigEntry { index }),
        None => Ok(()),
    }
}

/// Which rendering capabilities a tip interface exposes, after the optional
/// ones have been defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipCapabilities {
    pub show_cue_tip: bool,
    pub show_cue_target_tip: bool,
    pub hide_cue_target_tip: bool,
}

impl TipCapabilities {
    /// Only `showCueTip` supplied; the optional two are defaulted.
    #[must_use]
    pub const fn defaulted(show_cue_tip: bool) -> Self {
        Self {
            show_cue_tip,
            show_cue_target_tip: true,
            hide_cue_target_tip: true,
        }
    }
}

/// Reports the first missing capability in declaration order.
pub fn validate_tip_capabilities(caps: TipCapabilities) -> Result<()> {
    let checks = [
        ("showCueTip", caps.show_cue_tip),
        ("showCueTargetTip", caps.show_cue_target_tip),
        ("hideCueTargetTip", caps.hide_cue_target_tip),
    ];
    match checks.into_iter().find(|(_, present)| !present) {
        Some((name, _)) => Err(CueTipsError::MissingCapability(name)),
        None => Ok(()),
    }
}
