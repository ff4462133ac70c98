#![forbid(unsafe_code)]

use crate::dom::DomError;

/// Errors raised by validation, configuration loading and match dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CueTipsError {
    /// The configuration list is not a sequence of objects.
    #[error("cue-tips: requires the cue config list to be an array of cue config objects")]
    InvalidConfigList,
    /// A configuration lacks a non-empty string `cueAttr`.
    #[error("cue-tips: cue config at index {index} requires a non-empty `cueAttr` attribute name")]
    InvalidConfigEntry { index: usize },
    /// The tip interface is not an object.
    #[error("cue-tips: invalid tipInterface")]
    InvalidTipInterface,
    /// The tip interface lacks a required capability.
    #[error("cue-tips: tipInterface requires a {0} function")]
    MissingCapability(&'static str),
    /// A tracked attribute resolved to a config that references it through
    /// neither `cueAttr` nor `cueTipAttr`.
    #[error("cue-tips: invalid cue config for attribute {0:?}")]
    InvalidCueConfigForAttribute(String),
    /// Options failed to parse or validate.
    #[error("cue-tips: invalid options: {0}")]
    Options(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type Result<T, E = CueTipsError> = std::result::Result<T, E>;
