#![forbid(unsafe_code)]

//! Adapters between JavaScript values and engine types.
//!
//! JS callers identify configs by object identity, so every JS config object
//! is paired with the [`CueRef`] created for it, and callbacks receive the
//! original object back.

use std::cell::RefCell;
use std::rc::Rc;

use cuetips_core::validate::{TipCapabilities, validate_tip_capabilities};
use cuetips_core::{CueRef, CueTipsError, Removal, TipInterface, cue_configs_from_value};
use js_sys::{Array, Function, Object, Reflect};
use serde_json::Value;
use tracing::error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Node;

use crate::document::describe_js_error;

/// Pairs of engine handles and the JS objects they were created from.
#[derive(Debug, Default)]
pub struct ConfigTable {
    entries: RefCell<Vec<(CueRef, JsValue)>>,
}

impl ConfigTable {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Handle previously created for `object`.
    #[must_use]
    pub fn lookup(&self, object: &JsValue) -> Option<CueRef> {
        self.entries
            .borrow()
            .iter()
            .find(|(_, js)| Object::is(js, object))
            .map(|(config, _)| config.clone())
    }

    /// The JS object `config` was created from, or `undefined`.
    #[must_use]
    pub fn object_for(&self, config: &CueRef) -> JsValue {
        self.entries
            .borrow()
            .iter()
            .find(|(known, _)| known == config)
            .map_or(JsValue::UNDEFINED, |(_, js)| js.clone())
    }

    /// Convert a JS array of config objects. Objects seen before keep their
    /// handle; the list shape is validated before anything is recorded.
    pub fn intern_list(&self, list: &JsValue) -> Result<Vec<CueRef>, CueTipsError> {
        if !Array::is_array(list) {
            return Err(CueTipsError::InvalidConfigList);
        }
        let objects: &Array = list.unchecked_ref();
        let fields = objects.iter().map(|object| config_fields(&object)).collect();
        let parsed = cue_configs_from_value(Value::Array(fields))?;
        let mut out = Vec::with_capacity(parsed.len());
        for (object, fresh) in objects.iter().zip(parsed) {
            out.push(self.intern_parsed(object, fresh));
        }
        Ok(out)
    }

    /// Convert one JS config object, reusing its handle if it has one.
    pub fn intern(&self, object: &JsValue) -> Result<CueRef, CueTipsError> {
        if let Some(known) = self.lookup(object) {
            return Ok(known);
        }
        let fresh = cue_configs_from_value(Value::Array(vec![config_fields(object)]))?
            .pop()
            .ok_or(CueTipsError::InvalidConfigEntry { index: 0 })?;
        Ok(self.intern_parsed(object.clone(), fresh))
    }

    fn intern_parsed(&self, object: JsValue, fresh: CueRef) -> CueRef {
        if let Some(known) = self.lookup(&object) {
            return known;
        }
        self.entries.borrow_mut().push((fresh.clone(), object));
        fresh
    }

    /// Forget every entry whose handle is not in `active`.
    pub fn retain_active(&self, active: &[CueRef]) {
        self.entries
            .borrow_mut()
            .retain(|(config, _)| active.contains(config));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

const STRING_FIELDS: [&str; 4] = [
    "cueAttr",
    "cueTipAttr",
    "cueParentSelector",
    "cueTipParentSelector",
];

/// The fields the engine reads from a JS config object. Everything else on
/// the object stays in JS and reaches callbacks through the original object,
/// so cycles, `BigInt`s and functions elsewhere on it are fine. A non-string
/// value counts as absent; a non-object yields a non-object entry.
fn config_fields(object: &JsValue) -> Value {
    if !object.is_object() || Array::is_array(object) {
        return Value::Null;
    }
    let mut fields = serde_json::Map::new();
    for name in STRING_FIELDS {
        if let Some(text) = Reflect::get(object, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_string())
        {
            fields.insert(name.to_string(), Value::String(text));
        }
    }
    let cue_class = Reflect::get(object, &JsValue::from_str("cueClass")).ok();
    if cue_class.is_some_and(|v| v.as_bool() == Some(false)) {
        fields.insert("cueClass".to_string(), Value::Bool(false));
    }
    Value::Object(fields)
}

/// A method on `target`: `Ok(None)` when the property is falsy, `Err` when it
/// is set to something that cannot be called.
fn method(target: &JsValue, name: &'static str) -> Result<Option<Function>, &'static str> {
    let value = Reflect::get(target, &JsValue::from_str(name)).map_err(|_| name)?;
    if !value.is_truthy() {
        return Ok(None);
    }
    value.dyn_into::<Function>().map(Some).map_err(|_| name)
}

/// A JS object with `showCueTip` and optional `showCueTargetTip` /
/// `hideCueTargetTip` methods, called with the interface as `this`.
pub struct JsTipInterface {
    target: JsValue,
    show_cue_tip: Function,
    show_cue_target_tip: Option<Function>,
    hide_cue_target_tip: Option<Function>,
    configs: Rc<ConfigTable>,
}

impl JsTipInterface {
    pub fn from_js(target: JsValue, configs: Rc<ConfigTable>) -> Result<Self, CueTipsError> {
        if !target.is_object() || Array::is_array(&target) {
            return Err(CueTipsError::InvalidTipInterface);
        }
        let show_cue_tip = method(&target, "showCueTip");
        let show_cue_target_tip = method(&target, "showCueTargetTip");
        let hide_cue_target_tip = method(&target, "hideCueTargetTip");
        validate_tip_capabilities(TipCapabilities {
            show_cue_tip: matches!(show_cue_tip, Ok(Some(_))),
            show_cue_target_tip: show_cue_target_tip.is_ok(),
            hide_cue_target_tip: hide_cue_target_tip.is_ok(),
        })?;
        let Ok(Some(show_cue_tip)) = show_cue_tip else {
            return Err(CueTipsError::MissingCapability("showCueTip"));
        };
        Ok(Self {
            target,
            show_cue_tip,
            show_cue_target_tip: show_cue_target_tip.ok().flatten(),
            hide_cue_target_tip: hide_cue_target_tip.ok().flatten(),
            configs,
        })
    }

    fn report(name: &str, result: Result<JsValue, JsValue>) {
        if let Err(err) = result {
            error!(callback = name, error = %describe_js_error(&err), "tipInterface callback threw");
        }
    }
}

impl TipInterface<Node> for JsTipInterface {
    fn show_cue_tip(&self, config: &CueRef, element: &Node) {
        let object = self.configs.object_for(config);
        Self::report("showCueTip", self.show_cue_tip.call2(&self.target, &object, element));
    }

    fn show_cue_target_tip(&self, config: &CueRef, element: &Node) {
        if let Some(f) = &self.show_cue_target_tip {
            let object = self.configs.object_for(config);
            Self::report("showCueTargetTip", f.call2(&self.target, &object, element));
        }
    }

    fn hide_cue_target_tip(&self, config: &CueRef) {
        if let Some(f) = &self.hide_cue_target_tip {
            let object = self.configs.object_for(config);
            Self::report("hideCueTargetTip", f.call1(&self.target, &object));
        }
    }
}

/// A JS `onRemove(config)` function. Only a returned `false` vetoes; a throw
/// also keeps the config.
pub struct JsOnRemove {
    hook: Function,
    configs: Rc<ConfigTable>,
}

impl JsOnRemove {
    #[must_use]
    pub fn new(hook: Function, configs: Rc<ConfigTable>) -> Self {
        Self { hook, configs }
    }

    pub fn call(&self, config: &CueRef) -> Removal {
        let object = self.configs.object_for(config);
        match self.hook.call1(&JsValue::UNDEFINED, &object) {
            Ok(verdict) if verdict.as_bool() == Some(false) => Removal::Veto,
            Ok(_) => Removal::Proceed,
            Err(err) => {
                error!(error = %describe_js_error(&err), "onRemove threw");
                Removal::Veto
            }
        }
    }
}
