#![forbid(unsafe_code)]

//! Instance options.
//!
//! ```toml
//! # cuetips.toml
//! cue_class = "onboarding-cue"
//! root_selector = "#app"
//! ```
//!
//! Every field has a default, so an empty document yields
//! [`CueTipsOptions::default`].

#[cfg(feature = "toml-config")]
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CueTipsError, Result};

/// Marker class applied to cued elements unless overridden.
pub const DEFAULT_CUE_CLASS: &str = "cue-tips-cue";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueTipsOptions {
    /// Class added to cue targets and stripped once their tip is shown.
    #[serde(alias = "cueClass")]
    pub cue_class: String,
    /// Element to observe and scan instead of the document body. The first
    /// match in document order is used.
    #[serde(alias = "rootSelector")]
    pub root_selector: Option<String>,
}

impl Default for CueTipsOptions {
    fn default() -> Self {
        Self {
            cue_class: DEFAULT_CUE_CLASS.to_string(),
            root_selector: None,
        }
    }
}

impl CueTipsOptions {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(s).map_err(|err| CueTipsError::Options(err.to_string()))?;
        options.checked()
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: Self =
            toml::from_str(s).map_err(|err| CueTipsError::Options(err.to_string()))?;
        options.checked()
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|err| CueTipsError::Options(err.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Problems with the current values. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.cue_class.is_empty() {
            errors.push("cue_class must not be empty".to_string());
        } else if self.cue_class.chars().any(char::is_whitespace) {
            errors.push(format!(
                "cue_class must be a single class name, got {:?}",
                self.cue_class
            ));
        }
        if self.root_selector.as_deref().is_some_and(|s| s.trim().is_empty()) {
            errors.push("root_selector must not be blank".to_string());
        }
        errors
    }

    pub(crate) fn checked(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(CueTipsError::Options(errors.join("; ")))
        }
    }
}
